//! Per-dashboard environment selection.
//!
//! Two dashboards were retrofitted onto a single legacy selection slot.
//! The coordinator holds the canonical per-dashboard slots and the
//! active-dashboard pointer; the legacy slot has exactly one writable
//! path (the TPR selection) and reads delegate to the session manager,
//! which persists it.

use std::sync::Arc;

use tokio::sync::watch;

use crate::catalog::{EnvironmentCatalog, EnvironmentCatalogLoader};
use crate::session::SessionManager;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DashboardType {
    Tpr,
    Formulary,
}

impl DashboardType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tpr => "tpr",
            Self::Formulary => "formulary",
        }
    }
}

/// Coordinates which environment each dashboard points at.
///
/// Selection state is memory-only apart from the legacy slot; a fresh
/// process re-runs auto-selection for the per-dashboard slots.
pub struct SelectionCoordinator {
    session: Arc<SessionManager>,
    catalog: Arc<EnvironmentCatalogLoader>,
    active_tx: watch::Sender<DashboardType>,
    tpr_tx: watch::Sender<Option<String>>,
    formulary_tx: watch::Sender<Option<String>>,
}

impl SelectionCoordinator {
    #[must_use]
    pub fn new(session: Arc<SessionManager>, catalog: Arc<EnvironmentCatalogLoader>) -> Self {
        let (active_tx, _) = watch::channel(DashboardType::Tpr);
        let (tpr_tx, _) = watch::channel(None);
        let (formulary_tx, _) = watch::channel(None);
        Self {
            session,
            catalog,
            active_tx,
            tpr_tx,
            formulary_tx,
        }
    }

    /// Records `key` for `dashboard` and emits it on that dashboard's
    /// stream. The TPR path also writes the persisted legacy slot.
    ///
    /// Validation against the loaded catalog is advisory: an unknown key
    /// is logged and still accepted, and downstream consumers see it
    /// as-is.
    pub fn set_dashboard_environment(&self, dashboard: DashboardType, key: &str) {
        if let Some(catalog) = self.catalog.current() {
            if !catalog.contains_key(key) {
                tracing::warn!(
                    dashboard = dashboard.as_str(),
                    key,
                    "selected environment key is not in the loaded catalog"
                );
            }
        }

        self.slot(dashboard).send_replace(Some(key.to_string()));
        if dashboard == DashboardType::Tpr {
            self.session.set_legacy_environment(key);
        }
    }

    /// The environment resolved for `dashboard`: its own slot when set,
    /// else the legacy slot, else `None`. The per-dashboard slot always
    /// wins once populated.
    #[must_use]
    pub fn effective_environment(&self, dashboard: DashboardType) -> Option<String> {
        self.slot(dashboard)
            .borrow()
            .clone()
            .or_else(|| self.session.legacy_environment())
    }

    /// Selects `available_keys[0]` for every dashboard whose effective
    /// selection is still unset. An empty catalog selects nothing.
    pub fn auto_select_default(&self, catalog: &EnvironmentCatalog) {
        let Some(first) = catalog.available_keys.first() else {
            return;
        };
        for dashboard in [DashboardType::Tpr, DashboardType::Formulary] {
            if self.effective_environment(dashboard).is_none() {
                self.set_dashboard_environment(dashboard, first);
            }
        }
    }

    /// Pure pointer update; never touches either selection slot.
    pub fn set_active_dashboard(&self, dashboard: DashboardType) {
        self.active_tx.send_replace(dashboard);
    }

    #[must_use]
    pub fn active_dashboard(&self) -> DashboardType {
        *self.active_tx.borrow()
    }

    #[must_use]
    pub fn subscribe_active_dashboard(&self) -> watch::Receiver<DashboardType> {
        self.active_tx.subscribe()
    }

    #[must_use]
    pub fn subscribe(&self, dashboard: DashboardType) -> watch::Receiver<Option<String>> {
        self.slot(dashboard).subscribe()
    }

    /// Clears both in-memory slots and emits `None` on their streams.
    /// The persisted legacy slot is the session manager's to clear.
    pub fn reset(&self) {
        self.tpr_tx.send_replace(None);
        self.formulary_tx.send_replace(None);
    }

    fn slot(&self, dashboard: DashboardType) -> &watch::Sender<Option<String>> {
        match dashboard {
            DashboardType::Tpr => &self.tpr_tx,
            DashboardType::Formulary => &self.formulary_tx,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use crate::session::tests::{login_response, MockAuthApi};
    use crate::storage::{MemoryStore, SessionStore, SELECTED_ENVIRONMENT_KEY};

    struct Fixture {
        store: Arc<MemoryStore>,
        api: Arc<MockAuthApi>,
        session: Arc<SessionManager>,
        coordinator: SelectionCoordinator,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let api = Arc::new(MockAuthApi::new(login_response("alice", "IND")));
        let session = Arc::new(SessionManager::new(store.clone(), api.clone()));
        let catalog = Arc::new(EnvironmentCatalogLoader::new(session.clone(), api.clone()));
        let coordinator = SelectionCoordinator::new(session.clone(), catalog);
        Fixture {
            store,
            api,
            session,
            coordinator,
        }
    }

    fn catalog(keys: &[&str]) -> EnvironmentCatalog {
        EnvironmentCatalog {
            region: "IND".to_string(),
            environments: HashMap::new(),
            available_keys: keys.iter().map(|key| (*key).to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn tpr_selection_mirrors_into_the_legacy_slot() {
        let fx = fixture();
        fx.coordinator
            .set_dashboard_environment(DashboardType::Tpr, "qa");

        assert_eq!(
            fx.coordinator.effective_environment(DashboardType::Tpr),
            Some("qa".to_string())
        );
        assert_eq!(fx.session.legacy_environment(), Some("qa".to_string()));
        assert_eq!(
            fx.store.get(SELECTED_ENVIRONMENT_KEY),
            Some("qa".to_string())
        );
    }

    #[tokio::test]
    async fn formulary_selection_never_touches_the_legacy_slot() {
        let fx = fixture();
        fx.coordinator
            .set_dashboard_environment(DashboardType::Formulary, "stage");

        assert_eq!(
            fx.coordinator
                .effective_environment(DashboardType::Formulary),
            Some("stage".to_string())
        );
        assert_eq!(fx.session.legacy_environment(), None);
        assert_eq!(fx.store.get(SELECTED_ENVIRONMENT_KEY), None);
    }

    #[tokio::test]
    async fn formulary_falls_back_to_legacy_then_none() {
        let fx = fixture();
        assert_eq!(
            fx.coordinator
                .effective_environment(DashboardType::Formulary),
            None
        );

        fx.coordinator
            .set_dashboard_environment(DashboardType::Tpr, "dev");
        assert_eq!(
            fx.coordinator
                .effective_environment(DashboardType::Formulary),
            Some("dev".to_string())
        );

        fx.coordinator
            .set_dashboard_environment(DashboardType::Formulary, "qa");
        assert_eq!(
            fx.coordinator
                .effective_environment(DashboardType::Formulary),
            Some("qa".to_string())
        );
        // Per-dashboard slot wins; legacy still holds the TPR value.
        assert_eq!(fx.session.legacy_environment(), Some("dev".to_string()));
    }

    #[tokio::test]
    async fn auto_select_takes_the_first_available_key_for_both_dashboards() {
        let fx = fixture();
        fx.coordinator.auto_select_default(&catalog(&["dev", "qa"]));

        assert_eq!(
            fx.coordinator.effective_environment(DashboardType::Tpr),
            Some("dev".to_string())
        );
        assert_eq!(
            fx.coordinator
                .effective_environment(DashboardType::Formulary),
            Some("dev".to_string())
        );
    }

    #[tokio::test]
    async fn auto_select_with_empty_catalog_selects_nothing() {
        let fx = fixture();
        fx.coordinator.auto_select_default(&catalog(&[]));

        assert_eq!(
            fx.coordinator.effective_environment(DashboardType::Tpr),
            None
        );
        assert_eq!(
            fx.coordinator
                .effective_environment(DashboardType::Formulary),
            None
        );
        assert_eq!(fx.session.legacy_environment(), None);
    }

    #[tokio::test]
    async fn auto_select_skips_dashboards_that_already_resolve() {
        let fx = fixture();
        fx.coordinator
            .set_dashboard_environment(DashboardType::Formulary, "qa");
        fx.coordinator.auto_select_default(&catalog(&["dev", "qa"]));

        assert_eq!(
            fx.coordinator.effective_environment(DashboardType::Tpr),
            Some("dev".to_string())
        );
        assert_eq!(
            fx.coordinator
                .effective_environment(DashboardType::Formulary),
            Some("qa".to_string())
        );
    }

    #[tokio::test]
    async fn unknown_keys_are_accepted_and_surfaced_as_is() {
        let fx = fixture();
        let store = fx.store.clone();
        store
            .set(crate::storage::ACCESS_TOKEN_KEY, "tok")
            .expect("set token");
        fx.api.set_user_environments(catalog(&["dev", "qa"]));
        let loader = Arc::new(EnvironmentCatalogLoader::new(
            fx.session.clone(),
            fx.api.clone(),
        ));
        loader.load_for_current_user().await.expect("load");
        let coordinator = SelectionCoordinator::new(fx.session.clone(), loader);

        coordinator.set_dashboard_environment(DashboardType::Tpr, "nope");
        assert_eq!(
            coordinator.effective_environment(DashboardType::Tpr),
            Some("nope".to_string())
        );
    }

    #[tokio::test]
    async fn active_dashboard_defaults_to_tpr_and_updates_without_side_effects() {
        let fx = fixture();
        assert_eq!(fx.coordinator.active_dashboard(), DashboardType::Tpr);

        fx.coordinator
            .set_dashboard_environment(DashboardType::Tpr, "dev");
        fx.coordinator.set_active_dashboard(DashboardType::Formulary);

        assert_eq!(fx.coordinator.active_dashboard(), DashboardType::Formulary);
        assert_eq!(
            fx.coordinator.effective_environment(DashboardType::Tpr),
            Some("dev".to_string())
        );
        assert_eq!(fx.session.legacy_environment(), Some("dev".to_string()));
    }

    #[tokio::test]
    async fn reset_clears_slots_and_notifies_subscribers() {
        let fx = fixture();
        fx.coordinator
            .set_dashboard_environment(DashboardType::Tpr, "dev");
        let mut tpr_rx = fx.coordinator.subscribe(DashboardType::Tpr);
        tpr_rx.borrow_and_update();

        fx.coordinator.reset();

        assert!(tpr_rx.has_changed().expect("stream open"));
        assert_eq!(*tpr_rx.borrow_and_update(), None);
        // The legacy slot is cleared by the session manager's logout, not
        // by reset.
        assert_eq!(fx.session.legacy_environment(), Some("dev".to_string()));
    }

    #[tokio::test]
    async fn selection_streams_replay_the_latest_value() {
        let fx = fixture();
        fx.coordinator
            .set_dashboard_environment(DashboardType::Formulary, "prod");

        let late_rx = fx.coordinator.subscribe(DashboardType::Formulary);
        assert_eq!(*late_rx.borrow(), Some("prod".to_string()));
    }
}
