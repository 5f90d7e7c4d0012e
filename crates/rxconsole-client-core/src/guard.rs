//! Navigation guard for protected views.

use std::sync::Arc;

use crate::session::SessionManager;

/// Route the guard redirects to when navigation is denied.
pub const LOGIN_ROUTE: &str = "/login";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    Allow,
    Deny { redirect_to: &'static str },
}

impl RouteDecision {
    #[must_use]
    pub fn is_allowed(self) -> bool {
        matches!(self, Self::Allow)
    }
}

/// Pure predicate over session state, evaluated synchronously at
/// navigation time. Never performs I/O.
pub struct RouteGuard {
    session: Arc<SessionManager>,
}

impl RouteGuard {
    #[must_use]
    pub fn new(session: Arc<SessionManager>) -> Self {
        Self { session }
    }

    #[must_use]
    pub fn can_activate(&self) -> RouteDecision {
        if self.session.is_logged_in() {
            RouteDecision::Allow
        } else {
            tracing::debug!(redirect_to = LOGIN_ROUTE, "navigation denied");
            RouteDecision::Deny {
                redirect_to: LOGIN_ROUTE,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    use crate::session::tests::{login_response, make_token, MockAuthApi};
    use crate::storage::{MemoryStore, SessionStore, ACCESS_TOKEN_KEY};

    fn guard_with_token(token: Option<&str>) -> RouteGuard {
        let store = Arc::new(MemoryStore::new());
        if let Some(token) = token {
            store.set(ACCESS_TOKEN_KEY, token).expect("set token");
        }
        let api = Arc::new(MockAuthApi::new(login_response("alice", "US")));
        RouteGuard::new(Arc::new(SessionManager::new(store, api)))
    }

    #[test]
    fn live_session_is_allowed() {
        let token = make_token((Utc::now() + Duration::hours(1)).timestamp());
        let guard = guard_with_token(Some(&token));
        assert_eq!(guard.can_activate(), RouteDecision::Allow);
    }

    #[test]
    fn missing_token_denies_and_redirects_to_login() {
        let guard = guard_with_token(None);
        assert_eq!(
            guard.can_activate(),
            RouteDecision::Deny {
                redirect_to: LOGIN_ROUTE
            }
        );
        assert!(!guard.can_activate().is_allowed());
    }

    #[test]
    fn expired_token_denies() {
        let token = make_token((Utc::now() - Duration::minutes(1)).timestamp());
        let guard = guard_with_token(Some(&token));
        assert!(!guard.can_activate().is_allowed());
    }
}
