//! Session and environment-context core for the rxconsole client.
//!
//! Owns the authenticated session (login, logout, expiry detection,
//! rehydration from a pluggable store), the region-scoped environment
//! catalog, and the per-dashboard environment selections with their
//! legacy single-slot fallback. Transport is abstracted behind the
//! [`transport::AuthApi`] trait; state is published through
//! replay-latest `tokio::sync::watch` streams.

pub mod catalog;
pub mod context;
pub mod guard;
pub mod selection;
pub mod session;
pub mod storage;
pub mod token;
pub mod transport;

pub use catalog::{CatalogError, EnvironmentCatalog, EnvironmentCatalogLoader, EnvironmentDescriptor};
pub use context::DashboardContext;
pub use guard::{RouteDecision, RouteGuard, LOGIN_ROUTE};
pub use selection::{DashboardType, SelectionCoordinator};
pub use session::{Session, SessionError, SessionManager, UserProfile};
pub use storage::{JsonFileStore, MemoryStore, NoopStore, SessionStore, StorageError};
pub use transport::{AuthApi, AuthApiError, GlobalEnvironmentsResponse, LoginRequest, LoginResponse, RegionMapping};
