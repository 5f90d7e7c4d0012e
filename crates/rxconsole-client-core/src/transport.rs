//! Backend transport seam.
//!
//! The core never issues network calls directly; it talks through
//! [`AuthApi`], which the HTTP client crate implements and tests mock.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::catalog::{EnvironmentCatalog, EnvironmentDescriptor};
use crate::session::UserProfile;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    pub user: UserProfile,
    pub region: String,
}

/// Region-to-environment-keys mapping served with the global catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionMapping {
    #[serde(rename = "IND")]
    pub ind: Vec<String>,
    #[serde(rename = "US")]
    pub us: Vec<String>,
}

/// Full environment catalog, not scoped to any user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalEnvironmentsResponse {
    pub environments: HashMap<String, EnvironmentDescriptor>,
    pub region_mapping: RegionMapping,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthApiError {
    /// The backend rejected the request and supplied a message; the
    /// message is surfaced verbatim.
    #[error("{message}")]
    Rejected { message: String },
    /// Non-success HTTP response without a usable rejection message.
    #[error("auth_http_{status}:{body}")]
    Http { status: u16, body: String },
    /// Transport-level failure before any response arrived.
    #[error("auth_request_failed:{message}")]
    Transport { message: String },
    /// The response body could not be decoded.
    #[error("auth_decode_failed:{message}")]
    Decode { message: String },
}

/// Backend operations under `/auth`.
#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn login(&self, request: LoginRequest) -> Result<LoginResponse, AuthApiError>;

    /// Validates the bearer token with the backend. Success is opaque.
    async fn verify_token(&self, access_token: &str) -> Result<(), AuthApiError>;

    /// Unauthenticated full catalog plus region mapping.
    async fn global_environments(&self) -> Result<GlobalEnvironmentsResponse, AuthApiError>;

    /// Region-scoped catalog for the bearer token's user.
    async fn user_environments(&self, access_token: &str)
    -> Result<EnvironmentCatalog, AuthApiError>;
}
