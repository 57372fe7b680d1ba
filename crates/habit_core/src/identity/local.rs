use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::password::{hash_password, verify_password};
use super::{
    Credentials, IdentityProvider, ListenerRegistry, Session, SessionListener, Subscription,
};
use crate::error::AuthError;
use crate::habit::UserId;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Account {
    user_id: UserId,
    email: String,
    password_hash: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct IdentityState {
    accounts: Vec<Account>,
    session: Option<Session>,
}

/// Account registry plus the signed-in session, optionally persisted as JSON.
pub struct LocalIdentityProvider {
    path: Option<PathBuf>,
    state: RwLock<IdentityState>,
    listeners: Arc<ListenerRegistry>,
}

impl LocalIdentityProvider {
    pub fn in_memory() -> Self {
        Self {
            path: None,
            state: RwLock::new(IdentityState::default()),
            listeners: ListenerRegistry::new(),
        }
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self, AuthError> {
        let path = path.as_ref().to_path_buf();
        let state = if path.exists() {
            let raw = fs::read_to_string(&path).map_err(provider_error)?;
            if raw.trim().is_empty() {
                IdentityState::default()
            } else {
                serde_json::from_str(&raw).map_err(provider_error)?
            }
        } else {
            IdentityState::default()
        };
        Ok(Self {
            path: Some(path),
            state: RwLock::new(state),
            listeners: ListenerRegistry::new(),
        })
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    fn persist(&self, state: &IdentityState) -> Result<(), AuthError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(provider_error)?;
            }
        }
        let payload = serde_json::to_string_pretty(state).map_err(provider_error)?;
        fs::write(path, payload).map_err(provider_error)
    }

    /// Stages `change` on a copy and swaps it in after a successful write.
    fn commit(
        &self,
        change: impl FnOnce(&mut IdentityState) -> Result<(), AuthError>,
    ) -> Result<(), AuthError> {
        let mut state = self.state.write();
        let mut next = state.clone();
        change(&mut next)?;
        self.persist(&next)?;
        *state = next;
        Ok(())
    }
}

fn provider_error(err: impl std::fmt::Display) -> AuthError {
    AuthError::Provider(err.to_string())
}

fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

#[async_trait]
impl IdentityProvider for LocalIdentityProvider {
    async fn current_session(&self) -> Result<Option<Session>, AuthError> {
        Ok(self.state.read().session.clone())
    }

    fn on_session_change(&self, listener: SessionListener) -> Subscription {
        self.listeners.subscribe(listener)
    }

    async fn sign_in(&self, credentials: &Credentials) -> Result<Session, AuthError> {
        let email = normalize_email(&credentials.email);
        let account = self
            .state
            .read()
            .accounts
            .iter()
            .find(|account| account.email == email)
            .cloned()
            .ok_or(AuthError::InvalidCredentials)?;
        if !verify_password(&credentials.password, &account.password_hash)? {
            return Err(AuthError::InvalidCredentials);
        }
        let session = Session {
            user_id: account.user_id,
            email: account.email,
            signed_in_at: Utc::now(),
        };
        self.commit(|next| {
            next.session = Some(session.clone());
            Ok(())
        })?;
        tracing::info!(user = %session.user_id, "signed in");
        self.listeners.notify(Some(&session));
        Ok(session)
    }

    async fn sign_up(&self, credentials: &Credentials) -> Result<UserId, AuthError> {
        let email = normalize_email(&credentials.email);
        let password_hash = hash_password(&credentials.password)?;
        let user_id = UserId::generate();
        self.commit(|next| {
            if next.accounts.iter().any(|account| account.email == email) {
                return Err(AuthError::AlreadyRegistered);
            }
            next.accounts.push(Account {
                user_id: user_id.clone(),
                email,
                password_hash,
                created_at: Utc::now(),
            });
            Ok(())
        })?;
        tracing::info!(user = %user_id, "account created");
        Ok(user_id)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        if self.state.read().session.is_none() {
            return Ok(());
        }
        self.commit(|next| {
            next.session = None;
            Ok(())
        })?;
        tracing::info!("signed out");
        self.listeners.notify(None);
        Ok(())
    }
}
