//! Reqwest-backed [`AuthApi`] implementation for the backend's `/auth`
//! endpoints.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use uuid::Uuid;

use rxconsole_client_core::{
    AuthApi, AuthApiError, EnvironmentCatalog, GlobalEnvironmentsResponse, LoginRequest,
    LoginResponse,
};

pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8000";
pub const ENV_API_BASE_URL: &str = "RXCONSOLE_API_BASE_URL";
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthClientConfigError {
    #[error("base url must not be empty")]
    EmptyBaseUrl,
    #[error("base url must use http:// or https:// and include a host")]
    InvalidBaseUrl,
}

#[derive(Debug, Clone)]
pub struct AuthClientConfig {
    pub base_url: String,
    pub timeout_ms: u64,
}

impl AuthClientConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

/// Resolves the backend base URL: the `RXCONSOLE_API_BASE_URL` environment
/// variable when set and non-empty, else the local default. Returns the
/// resolved URL and its source.
pub fn resolve_api_base_url() -> Result<(String, &'static str), AuthClientConfigError> {
    if let Some(base_url) = env_non_empty(ENV_API_BASE_URL) {
        return normalize_base_url(&base_url).map(|normalized| (normalized, ENV_API_BASE_URL));
    }
    normalize_base_url(DEFAULT_API_BASE_URL).map(|normalized| (normalized, "default_local"))
}

pub fn normalize_base_url(raw: &str) -> Result<String, AuthClientConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(AuthClientConfigError::EmptyBaseUrl);
    }
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(AuthClientConfigError::InvalidBaseUrl);
    }
    let Some((_, remainder)) = trimmed.split_once("://") else {
        return Err(AuthClientConfigError::InvalidBaseUrl);
    };
    if remainder.trim().is_empty() || remainder.starts_with('/') {
        return Err(AuthClientConfigError::InvalidBaseUrl);
    }
    Ok(trimmed.to_string())
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[derive(Debug, Clone)]
pub struct AuthClient {
    base_url: String,
    timeout: Duration,
    http: reqwest::Client,
}

impl AuthClient {
    pub fn new(config: AuthClientConfig) -> Result<Self, AuthClientConfigError> {
        let base_url = normalize_base_url(&config.base_url)?;
        Ok(Self {
            base_url,
            timeout: Duration::from_millis(config.timeout_ms.max(250)),
            http: reqwest::Client::new(),
        })
    }

    /// Client against the environment-resolved base URL.
    pub fn from_env() -> Result<Self, AuthClientConfigError> {
        let (base_url, _source) = resolve_api_base_url()?;
        Self::new(AuthClientConfig::new(base_url))
    }

    #[must_use]
    pub fn endpoint(&self, path: &str) -> Option<String> {
        let trimmed = path.trim();
        if trimmed.is_empty() {
            return None;
        }
        if trimmed.starts_with('/') {
            Some(format!("{}{}", self.base_url, trimmed))
        } else {
            Some(format!("{}/{}", self.base_url, trimmed))
        }
    }

    #[must_use]
    pub fn login_path() -> &'static str {
        "/auth/login"
    }

    #[must_use]
    pub fn verify_path() -> &'static str {
        "/auth/verify"
    }

    #[must_use]
    pub fn environments_path() -> &'static str {
        "/auth/environments"
    }

    #[must_use]
    pub fn user_environments_path() -> &'static str {
        "/auth/user-environments"
    }

    async fn get_json<T>(&self, path: &str, bearer: Option<&str>) -> Result<T, AuthApiError>
    where
        T: for<'de> serde::Deserialize<'de>,
    {
        let response = self.send_get(path, bearer).await?;
        decode_json_response(response).await
    }

    async fn post_json<Req, Res>(&self, path: &str, payload: &Req) -> Result<Res, AuthApiError>
    where
        Req: serde::Serialize + ?Sized,
        Res: for<'de> serde::Deserialize<'de>,
    {
        let url = self.endpoint(path).ok_or(AuthApiError::Transport {
            message: "invalid request path".to_string(),
        })?;

        let response = self
            .http
            .post(url.as_str())
            .header("x-request-id", format!("req_{}", Uuid::new_v4().simple()))
            .timeout(self.timeout)
            .json(payload)
            .send()
            .await
            .map_err(|error| AuthApiError::Transport {
                message: error.to_string(),
            })?;

        decode_json_response(response).await
    }

    async fn send_get(
        &self,
        path: &str,
        bearer: Option<&str>,
    ) -> Result<reqwest::Response, AuthApiError> {
        let url = self.endpoint(path).ok_or(AuthApiError::Transport {
            message: "invalid request path".to_string(),
        })?;

        let mut request = self
            .http
            .get(url.as_str())
            .header("x-request-id", format!("req_{}", Uuid::new_v4().simple()))
            .timeout(self.timeout);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }

        request.send().await.map_err(|error| AuthApiError::Transport {
            message: error.to_string(),
        })
    }
}

#[async_trait]
impl AuthApi for AuthClient {
    async fn login(&self, request: LoginRequest) -> Result<LoginResponse, AuthApiError> {
        self.post_json(Self::login_path(), &request).await
    }

    async fn verify_token(&self, access_token: &str) -> Result<(), AuthApiError> {
        let response = self.send_get(Self::verify_path(), Some(access_token)).await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let bytes = response.bytes().await.unwrap_or_default();
        Err(error_from_response(status, &bytes))
    }

    async fn global_environments(&self) -> Result<GlobalEnvironmentsResponse, AuthApiError> {
        self.get_json(Self::environments_path(), None).await
    }

    async fn user_environments(
        &self,
        access_token: &str,
    ) -> Result<EnvironmentCatalog, AuthApiError> {
        self.get_json(Self::user_environments_path(), Some(access_token))
            .await
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: Option<serde_json::Value>,
}

/// Maps a non-success response to an error. Client errors carrying a
/// `detail` message become rejections with the message passed verbatim;
/// everything else keeps the raw status and body.
pub fn error_from_response(status: StatusCode, body: &[u8]) -> AuthApiError {
    if status.is_client_error() {
        if let Some(message) = rejection_detail(body) {
            return AuthApiError::Rejected { message };
        }
    }
    let body = String::from_utf8_lossy(body).trim().to_string();
    let body = if body.is_empty() {
        "<empty>".to_string()
    } else {
        body
    };
    AuthApiError::Http {
        status: status.as_u16(),
        body,
    }
}

fn rejection_detail(body: &[u8]) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_slice(body).ok()?;
    match parsed.detail? {
        serde_json::Value::String(message) if !message.trim().is_empty() => Some(message),
        _ => None,
    }
}

async fn decode_json_response<T>(response: reqwest::Response) -> Result<T, AuthApiError>
where
    T: for<'de> serde::Deserialize<'de>,
{
    let status = response.status();
    let bytes = response.bytes().await.map_err(|error| AuthApiError::Transport {
        message: error.to_string(),
    })?;

    if !status.is_success() {
        return Err(error_from_response(status, &bytes));
    }

    serde_json::from_slice::<T>(&bytes).map_err(|error| AuthApiError::Decode {
        message: error.to_string(),
    })
}
