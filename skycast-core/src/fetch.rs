use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use std::time::Duration;
use thiserror::Error;

/// Responses larger than this are dropped rather than buffered; the body is
/// provider controlled and a sane forecast payload is a few kilobytes.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// A failed network round trip. Every variant maps to the transport-failure
/// sync outcome; none is retried.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to forecast endpoint failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("failed to read forecast response body: {0}")]
    Body(#[source] reqwest::Error),

    #[error("forecast response body exceeded {MAX_BODY_BYTES} bytes")]
    BodyTooLarge,

    #[error("forecast response body is not valid UTF-8")]
    Encoding,
}

/// Performs the forecast network round trip.
///
/// The raw body is returned for any HTTP status: the provider reports errors
/// in-band through the `cod` field, so status mapping belongs to the parser.
#[async_trait]
pub trait ForecastFetcher: Send + Sync {
    async fn fetch(&self, url: Url) -> Result<String, FetchError>;
}

/// reqwest-backed fetcher with a bounded per-request timeout.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    http: Client,
}

impl HttpFetcher {
    /// Builds a fetcher whose requests time out after `timeout`, so a stalled
    /// connection cannot hold the sync lock open.
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { http })
    }
}

#[async_trait]
impl ForecastFetcher for HttpFetcher {
    async fn fetch(&self, url: Url) -> Result<String, FetchError> {
        let mut res = self.http.get(url).send().await.map_err(FetchError::Request)?;

        // Reject oversized bodies before reading anything when the provider
        // declares a length, and bail mid-stream otherwise: the body must
        // never be buffered past the cap.
        if res.content_length().is_some_and(|len| len > MAX_BODY_BYTES as u64) {
            return Err(FetchError::BodyTooLarge);
        }

        let mut body = Vec::new();
        while let Some(chunk) = res.chunk().await.map_err(FetchError::Body)? {
            if body.len() + chunk.len() > MAX_BODY_BYTES {
                return Err(FetchError::BodyTooLarge);
            }
            body.extend_from_slice(&chunk);
        }

        String::from_utf8(body).map_err(|_| FetchError::Encoding)
    }
}
