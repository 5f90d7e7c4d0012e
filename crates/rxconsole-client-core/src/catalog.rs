//! Region-scoped environment catalog and its pull-based loader.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::session::SessionManager;
use crate::transport::{AuthApi, AuthApiError, GlobalEnvironmentsResponse};

/// Per-environment configuration bundle. The core routes descriptors by
/// key and never interprets the fields; names are wire-exact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentDescriptor {
    #[serde(rename = "DB_CONN")]
    pub db_conn: String,
    #[serde(rename = "NR_KAFKA_HOST_URL")]
    pub kafka_host_url: String,
    #[serde(rename = "PATIENT_PREPROCESSOR_KAFKA_TOPIC")]
    pub preprocessor_topic: String,
    #[serde(rename = "ENV_PREFIX_KAFKA_TOPIC")]
    pub env_prefix_topic: String,
}

/// The environments available to the current user's region.
///
/// `available_keys` preserves server-delivered order; auto-selection takes
/// the first element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentCatalog {
    pub region: String,
    pub environments: HashMap<String, EnvironmentDescriptor>,
    pub available_keys: Vec<String>,
}

impl EnvironmentCatalog {
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.available_keys.iter().any(|known| known == key)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("catalog_requires_authenticated_session")]
    NotAuthenticated,
    #[error("catalog_load_failed:{0}")]
    Load(#[from] AuthApiError),
}

/// Fetches and caches the per-user environment catalog.
///
/// Pull-based: one network call per [`load_for_current_user`] invocation,
/// no background refresh. A failed load leaves the previously cached
/// catalog untouched; [`invalidate`] discards it (login/logout paths).
///
/// [`load_for_current_user`]: EnvironmentCatalogLoader::load_for_current_user
/// [`invalidate`]: EnvironmentCatalogLoader::invalidate
pub struct EnvironmentCatalogLoader {
    session: Arc<SessionManager>,
    api: Arc<dyn AuthApi>,
    current: Mutex<Option<EnvironmentCatalog>>,
}

impl EnvironmentCatalogLoader {
    #[must_use]
    pub fn new(session: Arc<SessionManager>, api: Arc<dyn AuthApi>) -> Self {
        Self {
            session,
            api,
            current: Mutex::new(None),
        }
    }

    /// Loads the catalog for the session's user, replacing the cached
    /// catalog wholesale on success.
    pub async fn load_for_current_user(&self) -> Result<EnvironmentCatalog, CatalogError> {
        let token = self.session.token().ok_or(CatalogError::NotAuthenticated)?;
        let catalog = self.api.user_environments(&token).await?;
        if let Ok(mut current) = self.current.lock() {
            *current = Some(catalog.clone());
        }
        tracing::debug!(region = %catalog.region, keys = catalog.available_keys.len(), "environment catalog loaded");
        Ok(catalog)
    }

    /// Unauthenticated full catalog plus region mapping.
    pub async fn global_catalog(&self) -> Result<GlobalEnvironmentsResponse, CatalogError> {
        self.api
            .global_environments()
            .await
            .map_err(CatalogError::Load)
    }

    /// The last successfully loaded catalog, if any.
    #[must_use]
    pub fn current(&self) -> Option<EnvironmentCatalog> {
        self.current
            .lock()
            .map(|current| current.clone())
            .unwrap_or_default()
    }

    /// Discards the cached catalog. There is no cross-session caching: the
    /// context calls this on login and logout.
    pub fn invalidate(&self) {
        if let Ok(mut current) = self.current.lock() {
            *current = None;
        }
    }
}
