//! Authenticated-session lifecycle.
//!
//! The [`SessionManager`] exclusively owns the credential and profile for
//! the client session: it logs in against the backend, persists the
//! resulting state through the [`SessionStore`] seam, rehydrates once at
//! construction, and publishes the current session on a replay-latest
//! stream. Token-expiry checks are total and never surface an error.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::storage::{
    SessionStore, ACCESS_TOKEN_KEY, REGION_KEY, SELECTED_ENVIRONMENT_KEY, USER_KEY,
};
use crate::token::is_token_live;
use crate::transport::{AuthApi, AuthApiError, LoginRequest};

const LOGIN_FALLBACK_MESSAGE: &str = "Login failed. Please try again.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    pub region: String,
}

/// The authenticated identity held for the client session. Exists only
/// while authenticated; destroyed wholesale on logout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub access_token: String,
    pub user: UserProfile,
    pub region: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// The backend rejected the credentials; the message is the server's,
    /// verbatim.
    #[error("{0}")]
    InvalidCredentials(String),
    /// The call never produced a usable response.
    #[error("{0}")]
    Network(String),
    /// The operation needs a held token and none is present.
    #[error("no_active_session")]
    NotAuthenticated,
}

impl SessionError {
    fn from_api(error: AuthApiError) -> Self {
        match error {
            AuthApiError::Rejected { message } => {
                let message = if message.trim().is_empty() {
                    LOGIN_FALLBACK_MESSAGE.to_string()
                } else {
                    message
                };
                Self::InvalidCredentials(message)
            }
            AuthApiError::Transport { message } if message.trim().is_empty() => {
                Self::Network(LOGIN_FALLBACK_MESSAGE.to_string())
            }
            other => Self::Network(other.to_string()),
        }
    }
}

/// Owner of the authenticated session and the legacy environment slot.
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    api: Arc<dyn AuthApi>,
    session_tx: watch::Sender<Option<Session>>,
    legacy_env_tx: watch::Sender<Option<String>>,
}

impl SessionManager {
    /// Rehydrates once from the store: a stored token plus a parseable
    /// stored user seed the session stream; malformed stored user JSON is
    /// treated as absent. The stored legacy selection seeds its stream.
    #[must_use]
    pub fn new(store: Arc<dyn SessionStore>, api: Arc<dyn AuthApi>) -> Self {
        let token = store.get(ACCESS_TOKEN_KEY);
        let user = store
            .get(USER_KEY)
            .and_then(|raw| serde_json::from_str::<UserProfile>(&raw).ok());

        let initial = match (token, user) {
            (Some(access_token), Some(user)) => {
                let region = store
                    .get(REGION_KEY)
                    .unwrap_or_else(|| user.region.clone());
                Some(Session {
                    access_token,
                    user,
                    region,
                })
            }
            _ => None,
        };

        let (session_tx, _) = watch::channel(initial);
        let (legacy_env_tx, _) = watch::channel(store.get(SELECTED_ENVIRONMENT_KEY));

        Self {
            store,
            api,
            session_tx,
            legacy_env_tx,
        }
    }

    /// Authenticates against the backend. One call, no retry. On success
    /// the session is persisted before it is published, and the session
    /// stream emits exactly one new value.
    pub async fn login(&self, username: &str, password: &str) -> Result<Session, SessionError> {
        let response = self
            .api
            .login(LoginRequest {
                username: username.to_string(),
                password: password.to_string(),
            })
            .await
            .map_err(SessionError::from_api)?;

        let session = Session {
            access_token: response.access_token,
            user: response.user,
            region: response.region,
        };

        self.persist(&session);
        self.session_tx.send_replace(Some(session.clone()));
        tracing::debug!(username = %session.user.username, region = %session.region, "session established");
        Ok(session)
    }

    /// Ends the session unconditionally. Cannot fail: persisted-key
    /// removal failures are logged and in-memory state is still reset.
    /// Emits `None` on the session stream and the legacy selection stream
    /// regardless of prior state.
    pub fn logout(&self) {
        for key in [
            ACCESS_TOKEN_KEY,
            USER_KEY,
            REGION_KEY,
            SELECTED_ENVIRONMENT_KEY,
        ] {
            if let Err(error) = self.store.remove(key) {
                tracing::warn!(key, error = %error, "failed to clear persisted session key");
            }
        }
        self.session_tx.send_replace(None);
        self.legacy_env_tx.send_replace(None);
        tracing::debug!("session cleared");
    }

    /// Total over every stored token shape: true iff a token is held and
    /// its `exp` claim is strictly in the future.
    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        self.token()
            .is_some_and(|token| is_token_live(&token, Utc::now()))
    }

    /// Validates the held token with the backend.
    pub async fn verify(&self) -> Result<(), SessionError> {
        let token = self.token().ok_or(SessionError::NotAuthenticated)?;
        self.api
            .verify_token(&token)
            .await
            .map_err(SessionError::from_api)
    }

    /// Replay-latest session stream: subscribers immediately observe the
    /// current value, then every emission in order.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.session_tx.subscribe()
    }

    #[must_use]
    pub fn current_session(&self) -> Option<Session> {
        self.session_tx.borrow().clone()
    }

    #[must_use]
    pub fn current_user(&self) -> Option<UserProfile> {
        self.session_tx.borrow().as_ref().map(|session| session.user.clone())
    }

    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.store.get(ACCESS_TOKEN_KEY)
    }

    #[must_use]
    pub fn region(&self) -> Option<String> {
        self.store.get(REGION_KEY)
    }

    /// The legacy single-slot selection, kept for consumers not yet
    /// migrated to per-dashboard selection. Written only through the
    /// selection coordinator's TPR path.
    #[must_use]
    pub fn legacy_environment(&self) -> Option<String> {
        self.legacy_env_tx.borrow().clone()
    }

    #[must_use]
    pub fn subscribe_legacy_environment(&self) -> watch::Receiver<Option<String>> {
        self.legacy_env_tx.subscribe()
    }

    pub(crate) fn set_legacy_environment(&self, key: &str) {
        if let Err(error) = self.store.set(SELECTED_ENVIRONMENT_KEY, key) {
            tracing::warn!(key, error = %error, "failed to persist legacy environment selection");
        }
        self.legacy_env_tx.send_replace(Some(key.to_string()));
    }

    fn persist(&self, session: &Session) {
        if let Err(error) = self.store.set(ACCESS_TOKEN_KEY, &session.access_token) {
            tracing::warn!(error = %error, "failed to persist access token");
        }
        match serde_json::to_string(&session.user) {
            Ok(serialized) => {
                if let Err(error) = self.store.set(USER_KEY, &serialized) {
                    tracing::warn!(error = %error, "failed to persist user profile");
                }
            }
            Err(error) => {
                tracing::warn!(error = %error, "failed to serialize user profile");
            }
        }
        if let Err(error) = self.store.set(REGION_KEY, &session.region) {
            tracing::warn!(error = %error, "failed to persist region");
        }
    }
}
