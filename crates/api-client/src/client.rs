use std::env;
use std::time::Duration;

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder, Response, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::ApiError;
use crate::models::{
    AuthResponse, CreateTokenRequest, CreatedToken, CredentialsRequest, License,
    MachinePingRequest, Plan, Token, TokenCreateResponse, UpdatePlanRequest, User,
};

pub const DEFAULT_API_URL: &str = "http://localhost:8080";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Either the upstream API itself or a gateway mount such as `https://app.local/api`.
    pub base_url: String,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Reads `API_URL` and `API_TIMEOUT_SECS`, loading `.env` first.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let base_url = env::var("API_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let timeout_secs = env::var("API_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Self::new(base_url).with_timeout(Duration::from_secs(timeout_secs))
    }
}

/// Typed client for the account API. One instance is one session: it holds
/// at most one bearer token, set explicitly by the caller.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    auth_token: Option<String>,
}

impl ApiClient {
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        let base_url = Url::parse(config.base_url.trim_end_matches('/'))
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| ApiError::Validation(format!("Invalid base URL: {}", config.base_url)))?;

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            http,
            base_url,
            auth_token: None,
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    pub fn set_auth_token(&mut self, token: Option<String>) {
        self.auth_token = token.filter(|t| !t.is_empty());
    }

    pub fn auth_token(&self) -> Option<&str> {
        self.auth_token.as_deref()
    }

    pub async fn register(&self, email: &str, password: &str) -> Result<AuthResponse, ApiError> {
        let body = CredentialsRequest { email, password };
        self.request(Method::POST, &["v1", "auth", "register"], Some(&body))
            .await
    }

    /// Rejected credentials surface as [`ApiError::Unauthorized`].
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, ApiError> {
        let body = CredentialsRequest { email, password };
        self.request(Method::POST, &["v1", "auth", "login"], Some(&body))
            .await
    }

    pub async fn get_user(&self) -> Result<User, ApiError> {
        self.require_token()?;
        self.request::<(), _>(Method::GET, &["v1", "user"], None).await
    }

    pub async fn list_tokens(&self) -> Result<Vec<Token>, ApiError> {
        self.request::<(), _>(Method::GET, &["v1", "tokens"], None).await
    }

    pub async fn create_token(&self, name: &str) -> Result<CreatedToken, ApiError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ApiError::Validation("Token name is required".to_string()));
        }

        let created: TokenCreateResponse = self
            .request(Method::POST, &["v1", "tokens"], Some(&CreateTokenRequest { name }))
            .await?;

        Ok(created.into())
    }

    /// The id always travels as a single escaped path segment.
    pub async fn delete_token(&self, id: &str) -> Result<(), ApiError> {
        let id = id.trim();
        if id.is_empty() {
            return Err(ApiError::Validation("Token id is required".to_string()));
        }
        // Dot segments cannot be escaped and never name a token.
        if id == "." || id == ".." {
            return Err(ApiError::NotFound("Token not found".to_string()));
        }

        self.request_empty(Method::DELETE, &["v1", "tokens", id])
            .await
    }

    pub async fn update_plan(&self, plan: Plan) -> Result<User, ApiError> {
        self.request(Method::POST, &["v1", "user", "plan"], Some(&UpdatePlanRequest { plan }))
            .await
    }

    /// Plan limits for the holder of a personal access token.
    pub async fn license(&self) -> Result<License, ApiError> {
        self.request::<(), _>(Method::GET, &["v1", "license"], None).await
    }

    /// Current user as seen through a personal access token.
    pub async fn me(&self) -> Result<User, ApiError> {
        self.require_token()?;
        self.request::<(), _>(Method::GET, &["v1", "me"], None).await
    }

    /// Registers this machine against the personal access token in use.
    pub async fn machine_ping(&self, hostname: &str, os: &str, arch: &str) -> Result<(), ApiError> {
        self.require_token()?;

        if [hostname, os, arch].iter().any(|v| v.trim().is_empty()) {
            return Err(ApiError::Validation(
                "Hostname, os and arch are required".to_string(),
            ));
        }

        let body = MachinePingRequest { hostname, os, arch };
        self.send(Method::POST, &["v1", "machines", "ping"], Some(&body))
            .await?;
        Ok(())
    }

    fn require_token(&self) -> Result<(), ApiError> {
        match self.auth_token {
            Some(_) => Ok(()),
            None => Err(ApiError::Unauthorized("Authentication required".to_string())),
        }
    }

    /// Appends `segments` to the base URL, percent-encoding each one.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::Validation(format!("Invalid base URL: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn builder(&self, method: Method, url: Url) -> RequestBuilder {
        let mut builder = self
            .http
            .request(method, url)
            .header(ACCEPT, "application/json");

        if let Some(token) = &self.auth_token {
            builder = builder.bearer_auth(token);
        }

        builder
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&B>,
    ) -> Result<Response, ApiError> {
        let url = self.endpoint(segments)?;
        let path = url.path().to_string();
        tracing::debug!(method = %method, path = %path, "Sending API request");

        let mut builder = self.builder(method.clone(), url);
        if let Some(body) = body {
            let json = serde_json::to_vec(body)
                .map_err(|e| ApiError::Validation(e.to_string()))?;
            builder = builder.header(CONTENT_TYPE, "application/json").body(json);
        }

        let response = builder.send().await.map_err(|err| {
            tracing::warn!(method = %method, path = %path, error = %err, "API request failed");
            ApiError::from(err)
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.bytes().await.unwrap_or_default();
        let err = ApiError::from_response(status, &body);
        tracing::debug!(method = %method, path = %path, status = status.as_u16(), error = %err, "API returned an error");

        Err(err)
    }

    async fn request<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&B>,
    ) -> Result<T, ApiError> {
        let response = self.send(method, segments, body).await?;

        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::Transport(format!("Invalid response body: {e}")))
    }

    async fn request_empty(&self, method: Method, segments: &[&str]) -> Result<(), ApiError> {
        // Any success body (a 204 or a JSON acknowledgement) is discarded.
        self.send::<()>(method, segments, None).await?;
        Ok(())
    }
}
