//! HTTP client for the Config Center service.
//!
//! The panel engine talks to the service only through the [`ConfigApi`] trait;
//! [`ConfigClient`] is the reqwest implementation. Module names travel as the
//! `module` query parameter.

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::models::{Module, RegisterModuleInput, ScanReport};

/// Default URL for a locally running service.
pub const DEFAULT_URL: &str = "http://127.0.0.1:8000";

/// HTTP client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Server error: {status}: {body}")]
    Server { status: StatusCode, body: String },
}

impl ClientError {
    /// The error text as the server sent it, for showing to the operator.
    pub fn detail(&self) -> String {
        match self {
            Self::NotFound(body)
            | Self::BadRequest(body)
            | Self::Forbidden(body)
            | Self::Unauthorized(body)
            | Self::Server { body, .. } => body.clone(),
            other => other.to_string(),
        }
    }
}

/// The remote operations the panel engine consumes.
#[async_trait]
pub trait ConfigApi: Send + Sync {
    /// `GET /config/list`
    async fn list_modules(&self) -> Result<Vec<Module>, ClientError>;

    /// `GET /config/get?module={name}`
    async fn get_structured(&self, name: &str) -> Result<Value, ClientError>;

    /// `GET /config/raw?module={name}`
    async fn get_raw(&self, name: &str) -> Result<String, ClientError>;

    /// `PUT /config/set?module={name}` with the full text as body.
    async fn put_raw(&self, name: &str, text: &str) -> Result<(), ClientError>;

    /// `POST /config/scan`
    async fn scan(&self) -> Result<ScanReport, ClientError>;

    /// `POST /config/register`
    async fn register(&self, input: &RegisterModuleInput) -> Result<(), ClientError>;
}

/// reqwest client for the Config Center HTTP API.
#[derive(Debug, Clone)]
pub struct ConfigClient {
    base_url: String,
    api_key: Option<String>,
    client: Client,
}

impl ConfigClient {
    /// Create with explicit configuration.
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            client: Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build a request with optional auth header.
    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self.client.request(method, &url);
        if let Some(ref key) = self.api_key {
            req = req.bearer_auth(key);
        }
        req
    }

    /// Build a request addressed to one module.
    fn module_request(&self, method: Method, path: &str, name: &str) -> reqwest::RequestBuilder {
        self.request(method, path).query(&[("module", name)])
    }

    /// Convert a non-success response into a ClientError.
    async fn error_for(response: reqwest::Response) -> ClientError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        match status {
            StatusCode::NOT_FOUND => ClientError::NotFound(body),
            StatusCode::BAD_REQUEST => ClientError::BadRequest(body),
            StatusCode::FORBIDDEN => ClientError::Forbidden(body),
            StatusCode::UNAUTHORIZED => ClientError::Unauthorized(body),
            _ => ClientError::Server { status, body },
        }
    }

    /// Handle a JSON response.
    async fn handle_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            Err(Self::error_for(response).await)
        }
    }

    /// Handle a plain-text response.
    async fn handle_text_response(response: reqwest::Response) -> Result<String, ClientError> {
        if response.status().is_success() {
            Ok(response.text().await?)
        } else {
            Err(Self::error_for(response).await)
        }
    }

    /// Handle a response whose body is not needed beyond success.
    async fn handle_empty_response(response: reqwest::Response) -> Result<(), ClientError> {
        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::error_for(response).await)
        }
    }
}

#[async_trait]
impl ConfigApi for ConfigClient {
    async fn list_modules(&self) -> Result<Vec<Module>, ClientError> {
        let response = self.request(Method::GET, "/config/list").send().await?;
        Self::handle_response(response).await
    }

    async fn get_structured(&self, name: &str) -> Result<Value, ClientError> {
        let response = self
            .module_request(Method::GET, "/config/get", name)
            .send()
            .await?;
        Self::handle_response(response).await
    }

    async fn get_raw(&self, name: &str) -> Result<String, ClientError> {
        let response = self
            .module_request(Method::GET, "/config/raw", name)
            .send()
            .await?;
        Self::handle_text_response(response).await
    }

    async fn put_raw(&self, name: &str, text: &str) -> Result<(), ClientError> {
        tracing::debug!(module = name, bytes = text.len(), "writing module");
        let response = self
            .module_request(Method::PUT, "/config/set", name)
            .header(reqwest::header::CONTENT_TYPE, "text/plain")
            .body(text.to_string())
            .send()
            .await?;
        Self::handle_empty_response(response).await
    }

    async fn scan(&self) -> Result<ScanReport, ClientError> {
        let response = self.request(Method::POST, "/config/scan").send().await?;
        Self::handle_response(response).await
    }

    async fn register(&self, input: &RegisterModuleInput) -> Result<(), ClientError> {
        let response = self
            .request(Method::POST, "/config/register")
            .json(input)
            .send()
            .await?;
        Self::handle_empty_response(response).await
    }
}
