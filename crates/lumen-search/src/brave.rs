//! Brave Search API adapter for web and image lookups.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use lumen_core::errors::GatewayError;
use lumen_core::provider::{ImageHit, SearchProvider, WebHit};
use lumen_core::security::ApiKey;

const BRAVE_BASE_URL: &str = "https://api.search.brave.com";
const WEB_PATH: &str = "/res/v1/web/search";
const IMAGES_PATH: &str = "/res/v1/images/search";

/// Brave rejects larger page sizes.
const MAX_WEB_COUNT: usize = 20;
const MAX_IMAGE_COUNT: usize = 100;

pub struct BraveSearchProvider {
    client: reqwest::Client,
    api_key: Option<ApiKey>,
    base_url: String,
    timeout: Duration,
}

impl BraveSearchProvider {
    pub fn new(api_key: Option<ApiKey>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent("Lumen/0.1")
            .build()
            .unwrap_or_default();
        Self {
            client,
            api_key,
            base_url: BRAVE_BASE_URL.to_string(),
            timeout,
        }
    }

    /// Point at a different host (self-hosted proxy, test server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn get_json(&self, path: &str, query: &str, count: usize) -> Result<Value, GatewayError> {
        let api_key = self.api_key.as_ref().ok_or_else(|| {
            GatewayError::MissingCredentials("search API key is not configured".into())
        })?;

        let response = self
            .client
            .get(format!("{}{path}", self.base_url))
            .header("X-Subscription-Token", api_key.expose())
            .header("Accept", "application/json")
            .query(&[("q", query), ("count", &count.to_string())])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GatewayError::Timeout(self.timeout)
                } else {
                    GatewayError::NetworkError(format!("search request failed: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::from_status(status.as_u16(), body));
        }

        response
            .json()
            .await
            .map_err(|e| GatewayError::MalformedResponse(format!("failed to parse response: {e}")))
    }
}

#[async_trait]
impl SearchProvider for BraveSearchProvider {
    fn name(&self) -> &str {
        "brave"
    }

    async fn text_search(&self, query: &str, bound: usize) -> Result<Vec<WebHit>, GatewayError> {
        let count = bound.clamp(1, MAX_WEB_COUNT);
        let body = self.get_json(WEB_PATH, query, count).await?;
        let mut hits = parse_web_results(&body);
        hits.truncate(bound);
        tracing::debug!(query, hits = hits.len(), "web search complete");
        Ok(hits)
    }

    async fn image_search(
        &self,
        query: &str,
        bound: usize,
    ) -> Result<Vec<ImageHit>, GatewayError> {
        let count = bound.clamp(1, MAX_IMAGE_COUNT);
        let body = self.get_json(IMAGES_PATH, query, count).await?;
        let mut hits = parse_image_results(&body);
        hits.truncate(bound);
        tracing::debug!(query, hits = hits.len(), "image search complete");
        Ok(hits)
    }
}

fn str_field(value: &Value, key: &str) -> Option<String> {
    value[key]
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Pull `web.results[]` out of a web search body. Missing sections yield an
/// empty list rather than an error.
fn parse_web_results(body: &Value) -> Vec<WebHit> {
    let Some(results) = body["web"]["results"].as_array() else {
        return Vec::new();
    };
    results
        .iter()
        .map(|r| WebHit {
            title: str_field(r, "title").unwrap_or_default(),
            url: str_field(r, "url"),
            snippet: str_field(r, "description").unwrap_or_default(),
            score: None,
        })
        .collect()
}

/// Pull `results[]` out of an image search body. The full image lives under
/// `properties.url`; `url` is the source page and only used as a fallback.
fn parse_image_results(body: &Value) -> Vec<ImageHit> {
    let Some(results) = body["results"].as_array() else {
        return Vec::new();
    };
    results
        .iter()
        .filter_map(|r| {
            let thumbnail = str_field(&r["thumbnail"], "src");
            let url = str_field(&r["properties"], "url")
                .or_else(|| thumbnail.clone())
                .or_else(|| str_field(r, "url"))?;
            Some(ImageHit {
                title: str_field(r, "title"),
                url,
                thumbnail,
            })
        })
        .collect()
}
