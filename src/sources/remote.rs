//! Remote HTTP/HTTPS content fetcher.

use super::ContentFetcher;
use crate::error::{RefresherError, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use std::time::Duration;

/// HTTP-based content fetcher.
///
/// Fetches the raw body of a source location. Only a 2xx status counts as
/// valid content; every request is bounded by the configured timeout.
///
/// # Examples
///
/// ```rust,no_run
/// use config_refresher::sources::HttpFetcher;
/// use std::time::Duration;
///
/// # fn example() -> config_refresher::error::Result<()> {
/// let fetcher = HttpFetcher::builder()
///     .with_auth_token("secret-token")
///     .with_timeout(Duration::from_secs(5))
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct HttpFetcher {
    client: Client,
    bearer_token: Option<String>,
    timeout: Duration,
}

impl HttpFetcher {
    /// Create a new builder for constructing an HTTP fetcher.
    pub fn builder() -> HttpFetcherBuilder {
        HttpFetcherBuilder::new()
    }

    /// The per-request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl ContentFetcher for HttpFetcher {
    async fn fetch(&self, location: &Url) -> Result<Vec<u8>> {
        let mut request = self.client.get(location.clone());
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| RefresherError::Fetch(format!("could not reach url: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RefresherError::FetchStatus {
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| RefresherError::Fetch(format!("could not read body: {}", e)))?;

        Ok(body.to_vec())
    }

}

/// Builder for constructing an `HttpFetcher`.
pub struct HttpFetcherBuilder {
    bearer_token: Option<String>,
    timeout: Duration,
}

impl HttpFetcherBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bearer_token: None,
            timeout: Duration::from_secs(10),
        }
    }

    /// Send `Authorization: Bearer <token>` with every request.
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    /// Set the request timeout.
    ///
    /// Default is 10 seconds.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build the HTTP fetcher.
    ///
    /// # Errors
    ///
    /// Returns an error if the timeout is zero or the HTTP client cannot be constructed.
    pub fn build(self) -> Result<HttpFetcher> {
        if self.timeout.is_zero() {
            return Err(RefresherError::Other(
                "HttpFetcher timeout must be greater than zero".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("config-refresher/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RefresherError::Other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(HttpFetcher {
            client,
            bearer_token: self.bearer_token,
            timeout: self.timeout,
        })
    }
}

impl Default for HttpFetcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}
