//! Identity port: sessions, credentials and change notifications.

mod local;
mod password;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::{AuthError, ValidationError, MIN_PASSWORD_LEN};
use crate::habit::UserId;

pub use local::LocalIdentityProvider;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: UserId,
    pub email: String,
    pub signed_in_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

/// Registration form, checked locally before anything reaches the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignUpForm {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl SignUpForm {
    pub fn validate(&self) -> Result<Credentials, ValidationError> {
        if self.email.trim().is_empty() {
            return Err(ValidationError::EmptyEmail);
        }
        if self.password != self.confirm_password {
            return Err(ValidationError::PasswordMismatch);
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ValidationError::PasswordTooShort {
                min: MIN_PASSWORD_LEN,
            });
        }
        Ok(Credentials::new(self.email.trim(), self.password.clone()))
    }
}

pub type SessionListener = Arc<dyn Fn(Option<&Session>) + Send + Sync>;

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn current_session(&self) -> Result<Option<Session>, AuthError>;

    /// Registers `listener` until the returned handle is dropped.
    fn on_session_change(&self, listener: SessionListener) -> Subscription;

    async fn sign_in(&self, credentials: &Credentials) -> Result<Session, AuthError>;

    /// Creates an account. Duplicate emails fail with [`AuthError::AlreadyRegistered`].
    async fn sign_up(&self, credentials: &Credentials) -> Result<UserId, AuthError>;

    async fn sign_out(&self) -> Result<(), AuthError>;
}

/// Listener bookkeeping shared by provider implementations.
#[derive(Default)]
pub struct ListenerRegistry {
    next_id: AtomicU64,
    listeners: Mutex<Vec<(u64, SessionListener)>>,
}

impl ListenerRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn subscribe(self: &Arc<Self>, listener: SessionListener) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners.lock().push((id, listener));
        Subscription {
            id,
            registry: Arc::downgrade(self),
        }
    }

    pub fn notify(&self, session: Option<&Session>) {
        // Snapshot so listeners may subscribe or unsubscribe while being called.
        let snapshot: Vec<SessionListener> = self
            .listeners
            .lock()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in snapshot {
            listener(session);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn remove(&self, id: u64) {
        self.listeners.lock().retain(|(existing, _)| *existing != id);
    }
}

/// Handle returned by [`IdentityProvider::on_session_change`]; dropping it unsubscribes.
#[must_use = "dropping a subscription unsubscribes immediately"]
pub struct Subscription {
    id: u64,
    registry: Weak<ListenerRegistry>,
}

impl Subscription {
    /// Same as dropping the handle; [`Drop`] removes the listener.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.id);
        }
    }
}
