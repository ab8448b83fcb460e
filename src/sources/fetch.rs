/// Remote retrieval capabilities used by the source adapters
use crate::error::FetchError;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Browser-like user agent used when none is configured
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Plain HTTP GET returning the response body
#[async_trait]
pub trait HttpFetcher: Send + Sync {
    async fn get_text(&self, url: &str) -> Result<String, FetchError>;
}

/// Retrieves the final markup of a page
#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn render(&self, url: &str) -> Result<String, FetchError>;
}

/// reqwest-backed implementation of both capabilities.
///
/// Rendering is a static GET: pages that only build their listing in
/// client-side script yield fewer candidates, which the layered extraction
/// tolerates.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Create a client with optional user agent and proxy
    pub fn new(
        user_agent: Option<&str>,
        proxy: Option<&str>,
        timeout_seconds: u64,
    ) -> Result<Self, FetchError> {
        let mut builder = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .user_agent(user_agent.unwrap_or(DEFAULT_USER_AGENT));

        if let Some(proxy) = proxy {
            let proxy = reqwest::Proxy::all(proxy).map_err(|source| FetchError::Proxy {
                proxy: proxy.to_string(),
                source,
            })?;
            builder = builder.proxy(proxy);
        }

        Ok(Self {
            client: builder.build()?,
        })
    }

    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        debug!("GET {}", url);
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(FetchError::Status {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.text().await?;
        debug!("Downloaded {} characters from {}", body.len(), url);
        Ok(body)
    }
}

#[async_trait]
impl HttpFetcher for HttpClient {
    async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        self.fetch(url).await
    }
}

#[async_trait]
impl PageRenderer for HttpClient {
    async fn render(&self, url: &str) -> Result<String, FetchError> {
        self.fetch(url).await
    }
}
