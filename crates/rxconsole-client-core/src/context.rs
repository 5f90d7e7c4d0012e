//! Explicit application-wide context.
//!
//! One shared source of truth constructed once at process start and
//! handed to consumers, replacing ambient singleton access. The context
//! also owns the cross-component wiring: a new login discards the prior
//! catalog, logout resets the selections, and a catalog load runs
//! default auto-selection.

use std::sync::Arc;

use crate::catalog::{CatalogError, EnvironmentCatalog, EnvironmentCatalogLoader};
use crate::guard::RouteGuard;
use crate::selection::SelectionCoordinator;
use crate::session::{Session, SessionError, SessionManager};
use crate::storage::SessionStore;
use crate::transport::AuthApi;

pub struct DashboardContext {
    session: Arc<SessionManager>,
    catalog: Arc<EnvironmentCatalogLoader>,
    selection: Arc<SelectionCoordinator>,
    guard: RouteGuard,
}

impl DashboardContext {
    #[must_use]
    pub fn new(store: Arc<dyn SessionStore>, api: Arc<dyn AuthApi>) -> Self {
        let session = Arc::new(SessionManager::new(store, api.clone()));
        let catalog = Arc::new(EnvironmentCatalogLoader::new(session.clone(), api));
        let selection = Arc::new(SelectionCoordinator::new(session.clone(), catalog.clone()));
        let guard = RouteGuard::new(session.clone());
        Self {
            session,
            catalog,
            selection,
            guard,
        }
    }

    /// Logs in and discards any catalog cached under the previous session.
    pub async fn login(&self, username: &str, password: &str) -> Result<Session, SessionError> {
        let session = self.session.login(username, password).await?;
        self.catalog.invalidate();
        Ok(session)
    }

    /// Ends the session, discards the catalog, and clears the
    /// per-dashboard selections. Unconditional.
    pub fn logout(&self) {
        self.session.logout();
        self.catalog.invalidate();
        self.selection.reset();
    }

    /// Loads the catalog for the current user and auto-selects defaults
    /// for any dashboard still without an effective environment.
    pub async fn load_environments(&self) -> Result<EnvironmentCatalog, CatalogError> {
        let catalog = self.catalog.load_for_current_user().await?;
        self.selection.auto_select_default(&catalog);
        Ok(catalog)
    }

    #[must_use]
    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    #[must_use]
    pub fn catalog(&self) -> &Arc<EnvironmentCatalogLoader> {
        &self.catalog
    }

    #[must_use]
    pub fn selection(&self) -> &Arc<SelectionCoordinator> {
        &self.selection
    }

    #[must_use]
    pub fn guard(&self) -> &RouteGuard {
        &self.guard
    }
}
