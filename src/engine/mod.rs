use crate::config::EngineConfig;
use crate::http::HttpClient;
use crate::models::{Feed, User};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

const DISCOVERY_TIMEOUT: Duration = Duration::from_secs(10);
// The engine's first on-deck query is slow until its cache warms up.
const FEED_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    #[error("Engine rejected the API key")]
    Unauthorized,

    #[error("Engine endpoint not found: {0}")]
    NotFound(String),

    #[error("Engine returned {status}: {detail}")]
    Status { status: StatusCode, detail: String },

    #[error("Engine request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Engine returned a malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

pub struct EngineClient {
    http: HttpClient,
    config: EngineConfig,
}

impl EngineClient {
    pub fn new(http: HttpClient, config: EngineConfig) -> Self {
        Self { http, config }
    }

    /// Headers for every engine request: `X-API-Key` when a key is
    /// configured, nothing otherwise.
    pub fn auth_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(ref key) = self.config.api_key {
            match HeaderValue::from_str(key) {
                Ok(value) => {
                    headers.insert("X-API-Key", value);
                }
                Err(_) => warn!("Configured API key is not a valid header value, sending without it"),
            }
        }
        headers
    }

    #[instrument(skip(self))]
    pub async fn health(&self) -> Result<(), EngineError> {
        let body: serde_json::Value = self.get_json("/health", DISCOVERY_TIMEOUT).await?;
        debug!("Engine health: {}", body.get("status").unwrap_or(&body));
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn get_users(&self) -> Result<Vec<User>, EngineError> {
        info!("Fetching engine user list");
        let users: Vec<User> = self.get_json("/api/users", DISCOVERY_TIMEOUT).await?;
        info!("Engine knows {} users", users.len());
        Ok(users)
    }

    #[instrument(skip(self))]
    pub async fn get_recommendations(&self, user_id: &str) -> Result<Feed, EngineError> {
        self.get_json(&Self::recommendations_path(user_id), FEED_TIMEOUT)
            .await
    }

    #[instrument(skip(self))]
    pub async fn get_recent(&self, user_id: &str) -> Result<Feed, EngineError> {
        self.get_json(&Self::recent_path(user_id), FEED_TIMEOUT).await
    }

    fn recommendations_path(user_id: &str) -> String {
        format!("/api/recommendations/{}", urlencoding::encode(user_id))
    }

    fn recent_path(user_id: &str) -> String {
        format!("/api/recent/{}", urlencoding::encode(user_id))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        timeout: Duration,
    ) -> Result<T, EngineError> {
        let response = self.get(path, timeout).await?;
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn get(&self, path: &str, timeout: Duration) -> Result<Response, EngineError> {
        let url = format!("{}{}", self.config.base_url(), path);
        debug!("GET {}", url);

        let response = self
            .http
            .request(Method::GET, &url)
            .headers(self.auth_headers())
            .timeout(timeout)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => Ok(response),
            StatusCode::UNAUTHORIZED => Err(EngineError::Unauthorized),
            StatusCode::NOT_FOUND => Err(EngineError::NotFound(path.to_string())),
            status => {
                let detail = error_detail(response)
                    .await
                    .unwrap_or_else(|| format!("HTTP {}", status));
                Err(EngineError::Status { status, detail })
            }
        }
    }
}

/// Pull the `detail` message out of an engine error body, if there is one.
async fn error_detail(response: Response) -> Option<String> {
    let body: serde_json::Value = response.json().await.ok()?;
    body.get("detail")
        .and_then(|d| d.as_str())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(api_key: Option<&str>) -> EngineClient {
        EngineClient::new(
            HttpClient::new(),
            EngineConfig {
                api_url: "http://engine:8000".to_string(),
                api_key: api_key.map(str::to_string),
            },
        )
    }

    #[test]
    fn api_key_sent_as_header_when_configured() {
        let headers = client(Some("secret")).auth_headers();
        assert_eq!(headers.get("X-API-Key").unwrap(), "secret");
    }

    #[test]
    fn no_auth_header_without_api_key() {
        let headers = client(None).auth_headers();
        assert!(headers.get("X-API-Key").is_none());
    }

    #[test]
    fn user_ids_are_encoded_into_paths() {
        assert_eq!(
            EngineClient::recommendations_path("daniel"),
            "/api/recommendations/daniel"
        );
        assert_eq!(
            EngineClient::recent_path("us er/1"),
            "/api/recent/us%20er%2F1"
        );
    }
}
