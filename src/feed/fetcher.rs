use chrono::Utc;
use futures::StreamExt;
use std::time::Duration;
use thiserror::Error;

use super::document::{parse_document, DocumentError, ParsedDocument};
use crate::config::Config;
use crate::storage::FeedCache;

/// Errors that can occur while acquiring the feed.
///
/// Everything except [`FetchError::Parse`] means the feed is unavailable:
/// nothing usable came back from the network. No variant is retried.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Download did not finish within the configured timeout
    #[error("Request timed out")]
    Timeout,
    /// Response body exceeded the configured size limit
    #[error("Response too large")]
    ResponseTooLarge,
    /// Response body was not valid UTF-8
    #[error("Invalid UTF-8 in response")]
    InvalidUtf8,
    /// Feed body (fresh or cached) is not well-formed XML
    #[error("Parse error: {0}")]
    Parse(#[from] DocumentError),
}

impl FetchError {
    /// True when the failure happened before a body was obtained.
    pub fn is_unavailable(&self) -> bool {
        !matches!(self, FetchError::Parse(_))
    }
}

/// Outcome of [`FeedFetcher::fetch_feed`].
pub type FetchResult = Result<ParsedDocument, FetchError>;

/// Retrieves the feed, serving it from [`FeedCache`] while fresh.
#[derive(Clone)]
pub struct FeedFetcher {
    client: reqwest::Client,
    cache: FeedCache,
    feed_url: String,
    timeout: Duration,
    max_bytes: usize,
}

impl FeedFetcher {
    pub fn new(client: reqwest::Client, cache: FeedCache, config: &Config) -> Self {
        Self {
            client,
            cache,
            feed_url: config.feed_url.clone(),
            timeout: config.fetch_timeout(),
            max_bytes: config.max_feed_bytes,
        }
    }

    /// Returns the parsed feed.
    ///
    /// A fresh cache entry is parsed and returned without touching the
    /// network; one that fails to parse counts as a miss. Otherwise the feed is downloaded, written to the cache, and
    /// parsed. The cache is only written after a successful download; a
    /// failed download leaves any stale entry in place.
    ///
    /// # Errors
    ///
    /// - [`FetchError::Network`] - Connection or TLS errors
    /// - [`FetchError::Timeout`] - Download exceeded the configured timeout
    /// - [`FetchError::HttpStatus`] - Non-2xx HTTP response
    /// - [`FetchError::ResponseTooLarge`] - Body exceeded `max_feed_bytes`
    /// - [`FetchError::InvalidUtf8`] - Body is not UTF-8 text
    /// - [`FetchError::Parse`] - Body is not well-formed XML
    pub async fn fetch_feed(&self) -> FetchResult {
        let now = Utc::now().timestamp_millis();
        if let Some(entry) = self.cache.read().await {
            if !self.cache.is_fresh(&entry, now) {
                tracing::debug!("Cached feed is stale, refetching");
            } else {
                match parse_document(&entry.raw_payload) {
                    Ok(doc) => {
                        tracing::debug!(
                            age_ms = now.saturating_sub(entry.fetched_at_ms),
                            "Serving feed from cache"
                        );
                        return Ok(doc);
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Cached feed does not parse, refetching");
                    }
                }
            }
        }

        let text = tokio::time::timeout(self.timeout, self.download())
            .await
            .map_err(|_| FetchError::Timeout)??;

        if let Err(e) = self
            .cache
            .write(&text, Utc::now().timestamp_millis())
            .await
        {
            tracing::warn!(error = %e, "Failed to store feed in cache");
        }

        Ok(parse_document(&text)?)
    }

    async fn download(&self) -> Result<String, FetchError> {
        tracing::debug!(url = %self.feed_url, "Fetching feed");
        let response = self.client.get(&self.feed_url).send().await?;

        if !response.status().is_success() {
            return Err(FetchError::HttpStatus(response.status().as_u16()));
        }

        let bytes = read_limited_bytes(response, self.max_bytes).await?;
        String::from_utf8(bytes).map_err(|_| FetchError::InvalidUtf8)
    }
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    // Fast path: check Content-Length header
    if let Some(len) = response.content_length() {
        if len > limit as u64 {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        // SEC-003: Use saturating_add to prevent integer overflow in size check
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}
