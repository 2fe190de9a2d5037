//! Sign-in state
//!
//! [`Session`] owns the state and publishes it on a watch channel. Anything
//! that needs the token or the current user holds a [`SessionHandle`].

use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tokio::sync::watch;

use crate::api::{ApiRequest, Transport};
use crate::error::ApiError;

mod firebase;
mod store;

pub use firebase::{FirebaseIdentity, IdentityProvider, IdentityUser};
pub use store::{ActiveSession, SessionError, SessionStore, SESSION_LIFETIME_DAYS};

const MIRROR_PATH: &str = "/auth/signup/firebase";
const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("Password too weak: {}", .0.join(", "))]
    WeakPassword(Vec<&'static str>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl UserProfile {
    /// Split a provider display name on its first space. A missing first
    /// name becomes "User".
    pub fn from_display_name(email: &str, display_name: Option<&str>) -> Self {
        let name = display_name.unwrap_or_default().trim();
        let (first, last) = name.split_once(' ').unwrap_or((name, ""));
        let first = if first.is_empty() { "User" } else { first };
        Self {
            email: email.to_string(),
            first_name: first.to_string(),
            last_name: last.trim().to_string(),
        }
    }

    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Authenticating,
    Authenticated(ActiveSession),
    SignedOut,
}

/// Read-only view of the session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    rx: watch::Receiver<SessionState>,
}

impl SessionHandle {
    pub fn state(&self) -> SessionState {
        self.rx.borrow().clone()
    }

    pub fn token(&self) -> Option<String> {
        match &*self.rx.borrow() {
            SessionState::Authenticated(session) => Some(session.token.clone()),
            _ => None,
        }
    }

    pub fn user(&self) -> Option<UserProfile> {
        match &*self.rx.borrow() {
            SessionState::Authenticated(session) => Some(session.user.clone()),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(&*self.rx.borrow(), SessionState::Authenticated(_))
    }
}

pub struct Session {
    tx: watch::Sender<SessionState>,
    store: Option<SessionStore>,
}

impl Session {
    /// Start from whatever the store holds. A missing, expired or unreadable
    /// file means signed out.
    pub fn restore(store: SessionStore) -> Self {
        let state = match store.load() {
            Ok(Some(session)) => {
                tracing::debug!(email = %session.user.email, "restored session");
                SessionState::Authenticated(session)
            }
            Ok(None) => SessionState::Unauthenticated,
            Err(e) => {
                tracing::warn!(error = %e, "ignoring unreadable session file");
                SessionState::Unauthenticated
            }
        };
        Self {
            tx: watch::channel(state).0,
            store: Some(store),
        }
    }

    /// A session that is never persisted.
    pub fn signed_out() -> Self {
        Self {
            tx: watch::channel(SessionState::Unauthenticated).0,
            store: None,
        }
    }

    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            rx: self.tx.subscribe(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.tx.borrow().clone()
    }

    /// Email and password sign-in. The backend is not called.
    pub async fn sign_in(
        &self,
        provider: &dyn IdentityProvider,
        email: &str,
        password: &str,
    ) -> Result<UserProfile, AuthError> {
        self.tx.send_replace(SessionState::Authenticating);
        match provider.sign_in_with_password(email, password).await {
            Ok(identity) => self.establish(identity),
            Err(e) => {
                self.tx.send_replace(SessionState::Unauthenticated);
                Err(e.into())
            }
        }
    }

    /// Create an account and register it with the backend. The new user
    /// still has to sign in afterwards.
    pub async fn sign_up(
        &self,
        provider: &dyn IdentityProvider,
        transport: &dyn Transport,
        profile: &UserProfile,
        password: &str,
    ) -> Result<(), AuthError> {
        let problems = password_problems(password);
        if !problems.is_empty() {
            return Err(AuthError::WeakPassword(problems));
        }

        let identity = provider
            .sign_up(&profile.email, password, &profile.display_name())
            .await?;
        mirror_user(transport, profile, &identity.id_token).await?;
        tracing::info!(email = %profile.email, "account created");
        Ok(())
    }

    /// Finish a federated sign-in whose token was issued elsewhere. The
    /// user is mirrored into the backend before the session is stored.
    pub async fn complete_federated(
        &self,
        transport: &dyn Transport,
        identity: IdentityUser,
    ) -> Result<UserProfile, AuthError> {
        self.tx.send_replace(SessionState::Authenticating);
        let profile = UserProfile::from_display_name(&identity.email, identity.display_name.as_deref());
        if let Err(e) = mirror_user(transport, &profile, &identity.id_token).await {
            self.tx.send_replace(SessionState::Unauthenticated);
            return Err(e.into());
        }
        self.establish(identity)
    }

    pub fn sign_out(&self) -> Result<(), AuthError> {
        if let Some(store) = &self.store {
            store.clear()?;
        }
        self.tx.send_replace(SessionState::SignedOut);
        tracing::info!("signed out");
        Ok(())
    }

    fn establish(&self, identity: IdentityUser) -> Result<UserProfile, AuthError> {
        let user = UserProfile::from_display_name(&identity.email, identity.display_name.as_deref());
        let session = ActiveSession::new(user.clone(), identity.id_token);
        if let Some(store) = &self.store {
            if let Err(e) = store.save(&session) {
                self.tx.send_replace(SessionState::Unauthenticated);
                return Err(e.into());
            }
        }
        self.tx.send_replace(SessionState::Authenticated(session));
        tracing::info!(email = %user.email, "signed in");
        Ok(user)
    }
}

async fn mirror_user(
    transport: &dyn Transport,
    profile: &UserProfile,
    id_token: &str,
) -> Result<(), ApiError> {
    let body = json!({
        "first_name": profile.first_name,
        "last_name": profile.last_name,
        "email": profile.email,
        "firebase_id_token": id_token,
    });
    transport.send(ApiRequest::post(MIRROR_PATH, Some(body))).await?;
    Ok(())
}

/// Unmet sign-up password rules, empty when the password is acceptable.
pub fn password_problems(password: &str) -> Vec<&'static str> {
    let mut problems = Vec::new();
    if password.chars().count() < MIN_PASSWORD_LEN {
        problems.push("at least 8 characters");
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        problems.push("an uppercase letter");
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        problems.push("a lowercase letter");
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        problems.push("a number");
    }
    if !password.chars().any(|c| "!@#$%^&*(),.?\":{}|<>".contains(c)) {
        problems.push("a special character");
    }
    problems
}
