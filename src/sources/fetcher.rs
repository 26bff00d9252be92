//! Content fetcher trait.

use crate::error::Result;
use async_trait::async_trait;
use reqwest::Url;

/// Trait for retrieving the current content of a watched source.
///
/// Implement this trait to watch something other than plain HTTP(S)
/// endpoints, or to script fetch results in tests.
///
/// Any error returned is treated as a soft failure: the watcher logs it,
/// skips the current check, and leaves the source state untouched.
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    /// Fetch the full content at `location`.
    ///
    /// # Errors
    ///
    /// Returns [`RefresherError::Fetch`](crate::error::RefresherError::Fetch) when
    /// the location is unreachable or the body is unreadable, and
    /// [`RefresherError::FetchStatus`](crate::error::RefresherError::FetchStatus)
    /// for a non-success status.
    async fn fetch(&self, location: &Url) -> Result<Vec<u8>>;
}
