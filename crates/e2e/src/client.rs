//! HTTP client for the Earth REST API

use std::time::{Duration, Instant};

use reqwest::{Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::error::{ApiError, E2eError, E2eResult};

/// Query parameters appended to a request URL
pub type Query<'a> = &'a [(&'a str, &'a str)];

/// Low-level response descriptor: status and raw body, not yet judged
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub url: String,
    pub content_type: Option<String>,
    pub body: String,
}

impl ApiResponse {
    async fn read(resp: reqwest::Response) -> E2eResult<Self> {
        let status = resp.status();
        let url = resp.url().to_string();
        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = resp.text().await?;
        Ok(Self {
            status,
            url,
            content_type,
            body,
        })
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn is_json(&self) -> bool {
        self.content_type
            .as_deref()
            .map(|ct| ct.starts_with("application/json"))
            .unwrap_or(false)
    }

    /// Apply the success/failure contract.
    ///
    /// A non-success status becomes [`ApiError::Structured`] when the body is
    /// JSON, otherwise [`ApiError::Status`] naming status, reason and URL.
    pub fn error_for_status(self) -> Result<Self, ApiError> {
        if self.is_success() {
            return Ok(self);
        }
        if self.is_json() {
            if let Ok(data) = serde_json::from_str(&self.body) {
                return Err(ApiError::Structured(data));
            }
        }
        Err(ApiError::Status(format!(
            "{} {} - {}",
            self.status.as_u16(),
            self.status.canonical_reason().unwrap_or(""),
            self.url
        )))
    }

    /// Decode the body, after checking the status
    pub fn json<T: DeserializeOwned>(self) -> E2eResult<T> {
        let resp = self.error_for_status()?;
        Ok(serde_json::from_str(&resp.body)?)
    }
}

/// Thin wrapper over `reqwest` bound to one base URL
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Create a client with a 30 second request timeout
    pub fn new(base_url: impl Into<String>) -> E2eResult<Self> {
        Self::with_timeout(base_url, Duration::from_secs(30))
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> E2eResult<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Url::parse(&base_url)
            .map_err(|e| E2eError::Config(format!("invalid base URL {base_url}: {e}")))?;
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Resolve `path` against the base URL, prefixing a missing `/`
    pub fn url(&self, path: &str, query: Query<'_>) -> E2eResult<Url> {
        let mut full = self.base_url.clone();
        if !path.starts_with('/') {
            full.push('/');
        }
        full.push_str(path);

        let mut url =
            Url::parse(&full).map_err(|e| E2eError::Config(format!("invalid URL {full}: {e}")))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        query: Query<'_>,
        body: Option<serde_json::Value>,
    ) -> E2eResult<ApiResponse> {
        let url = self.url(path, query)?;
        debug!("{} {}", method, url);

        let mut request = self.http.request(method, url);
        if let Some(body) = body {
            // Sets content-type: application/json
            request = request.json(&body);
        }
        let resp = request.send().await?;
        ApiResponse::read(resp).await
    }

    /// GET, returning the raw descriptor whatever the status
    pub async fn get(&self, path: &str, query: Query<'_>) -> E2eResult<ApiResponse> {
        self.send(Method::GET, path, query, None).await
    }

    /// GET and decode a JSON body
    pub async fn json<T: DeserializeOwned>(&self, path: &str, query: Query<'_>) -> E2eResult<T> {
        self.get(path, query).await?.json()
    }

    /// POST a JSON body and decode the JSON answer
    pub async fn post<T, B>(&self, path: &str, body: &B) -> E2eResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.post_query(path, &[], Some(serde_json::to_value(body)?))
            .await
    }

    pub async fn post_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: Query<'_>,
        body: Option<serde_json::Value>,
    ) -> E2eResult<T> {
        self.send(Method::POST, path, query, body).await?.json()
    }

    /// PUT a JSON body and decode the JSON answer
    pub async fn update<T, B>(&self, path: &str, body: &B) -> E2eResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.update_query(path, &[], Some(serde_json::to_value(body)?))
            .await
    }

    pub async fn update_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: Query<'_>,
        body: Option<serde_json::Value>,
    ) -> E2eResult<T> {
        self.send(Method::PUT, path, query, body).await?.json()
    }

    /// DELETE; non-success statuses fail like [`ApiClient::json`]
    pub async fn delete(&self, path: &str, query: Query<'_>) -> E2eResult<ApiResponse> {
        let resp = self.send(Method::DELETE, path, query, None).await?;
        Ok(resp.error_for_status()?)
    }

    /// Poll `path` until it answers with a success status
    pub async fn wait_until_ready(&self, path: &str, timeout_duration: Duration) -> E2eResult<()> {
        let start = Instant::now();
        let mut attempts = 0;

        while start.elapsed() < timeout_duration {
            attempts += 1;

            match self.get(path, &[]).await {
                Ok(resp) if resp.is_success() => {
                    info!("API is ready at {}", self.base_url);
                    return Ok(());
                }
                Ok(resp) => {
                    warn!("Readiness check returned {}", resp.status);
                }
                Err(E2eError::Http(e)) if e.is_connect() => {
                    if attempts == 1 {
                        info!("Waiting for API at {}...", self.base_url);
                    }
                }
                Err(e) => {
                    warn!("Readiness check error: {}", e);
                }
            }

            sleep(Duration::from_millis(100)).await;
        }

        Err(E2eError::ServerHealthCheck(attempts))
    }
}
