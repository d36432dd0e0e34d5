//! HTTP client for OpenSearch / Elasticsearch clusters.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use crate::backend::{BulkResponse, ScanPage, SearchBackend};
use crate::error::{Result, StoreError};
use crate::query::ScanRequest;
use crate::sink::BulkBatch;

pub const DEFAULT_URL: &str = "http://localhost:9200";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Connection settings for [`SearchClient`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            username: None,
            password: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// REST client for one cluster endpoint.
#[derive(Clone, Debug)]
pub struct SearchClient {
    http: reqwest::Client,
    base_url: String,
    username: Option<String>,
    password: Option<String>,
}

impl SearchClient {
    pub fn new(options: ClientOptions) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(options.timeout).build()?;
        Ok(Self {
            http,
            base_url: options.url.trim_end_matches('/').to_string(),
            username: options.username,
            password: options.password,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let builder = self.http.request(method, url);
        match &self.username {
            Some(user) => builder.basic_auth(user, self.password.as_deref()),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let response = builder.send().await?;
        let response = check_status(response).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    Err(StoreError::Api {
        status: status.as_u16(),
        body: response.text().await.unwrap_or_default(),
    })
}

#[async_trait]
impl SearchBackend for SearchClient {
    async fn open_scan(&self, request: &ScanRequest) -> Result<ScanPage> {
        debug!("Opening scan on {}", request.index);
        let builder = self
            .request(Method::POST, &format!("{}/_search", request.index))
            .query(&[("scroll", request.keep_alive.as_str())])
            .json(&request.body());
        self.send(builder).await
    }

    async fn next_page(&self, cursor: &str, keep_alive: &str) -> Result<ScanPage> {
        let builder = self
            .request(Method::POST, "_search/scroll")
            .json(&json!({ "scroll": keep_alive, "scroll_id": cursor }));
        self.send(builder).await
    }

    async fn release(&self, cursor: &str) -> Result<()> {
        let response = self
            .request(Method::DELETE, "_search/scroll")
            .json(&json!({ "scroll_id": [cursor] }))
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }

    async fn bulk(&self, batch: &BulkBatch) -> Result<BulkResponse> {
        debug!("Submitting {} operations ({} bytes)", batch.len(), batch.bytes());
        let builder = self
            .request(Method::POST, "_bulk")
            .query(&[("require_alias", "true")])
            .header(CONTENT_TYPE, "application/x-ndjson")
            .body(batch.to_ndjson());
        self.send(builder).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = SearchClient::new(ClientOptions {
            url: "http://search.internal:9200/".to_string(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(client.base_url(), "http://search.internal:9200");
    }

    #[test]
    fn test_default_options() {
        let options = ClientOptions::default();
        assert_eq!(options.url, "http://localhost:9200");
        assert!(options.username.is_none());
        assert_eq!(options.timeout, Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_unreachable_is_transport_error() {
        let client = SearchClient::new(ClientOptions {
            url: "http://127.0.0.1:1".to_string(),
            timeout: Duration::from_secs(2),
            ..Default::default()
        })
        .unwrap();

        let err = client.release("cursor").await.unwrap_err();
        assert!(matches!(err, StoreError::Transport(_)));
    }
}
