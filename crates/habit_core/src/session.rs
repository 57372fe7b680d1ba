use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{AuthError, Result};
use crate::habit::UserId;
use crate::identity::{
    Credentials, IdentityProvider, Session, SessionListener, SignUpForm, Subscription,
};

/// Explicit auth context handed to whatever needs the signed-in user.
///
/// Attaching subscribes to provider changes and keeps a cached session; dropping the
/// context releases the subscription.
pub struct SessionContext {
    provider: Arc<dyn IdentityProvider>,
    current: Arc<RwLock<Option<Session>>>,
    _subscription: Subscription,
}

impl SessionContext {
    pub async fn attach(provider: Arc<dyn IdentityProvider>) -> Result<Self> {
        let session = provider.current_session().await?;
        let current = Arc::new(RwLock::new(session));
        let sink = Arc::clone(&current);
        let subscription = provider.on_session_change(Arc::new(move |session: Option<&Session>| {
            *sink.write() = session.cloned();
        }));
        Ok(Self {
            provider,
            current,
            _subscription: subscription,
        })
    }

    pub fn session(&self) -> Option<Session> {
        self.current.read().clone()
    }

    pub fn is_signed_in(&self) -> bool {
        self.current.read().is_some()
    }

    pub fn require_user(&self) -> std::result::Result<UserId, AuthError> {
        self.current
            .read()
            .as_ref()
            .map(|session| session.user_id.clone())
            .ok_or(AuthError::NotSignedIn)
    }

    pub fn subscribe(&self, listener: SessionListener) -> Subscription {
        self.provider.on_session_change(listener)
    }

    pub async fn sign_in(&self, credentials: &Credentials) -> Result<Session> {
        let session = self.provider.sign_in(credentials).await?;
        Ok(session)
    }

    /// Validates the form locally, then registers with the provider.
    pub async fn sign_up(&self, form: &SignUpForm) -> Result<UserId> {
        let credentials = form.validate()?;
        let user_id = self.provider.sign_up(&credentials).await?;
        Ok(user_id)
    }

    pub async fn sign_out(&self) -> Result<()> {
        self.provider.sign_out().await?;
        Ok(())
    }
}
