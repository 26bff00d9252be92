//! Static list of watched sources.

use super::Source;
use crate::error::{RefresherError, Result};
use reqwest::Url;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info};

/// Parsed `id = location` source list.
///
/// The list is read once at startup; any malformed entry rejects the whole
/// file so the daemon never runs with a partial set of sources.
///
/// # Examples
///
/// ```rust
/// use config_refresher::sources::SourceList;
///
/// let list = SourceList::parse(
///     "# shared settings\n\
///      payments = https://config.example.com/payments.yaml\n",
/// )
/// .unwrap();
/// assert_eq!(list.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct SourceList {
    sources: Vec<Source>,
}

impl SourceList {
    /// Read and parse a source list file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or fails [`SourceList::parse`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "parsing sources list");

        let contents = std::fs::read_to_string(path)?;
        let list = Self::parse(&contents)?;

        info!(count = list.len(), "parsed sources");
        Ok(list)
    }

    /// Parse source list contents.
    ///
    /// Each non-blank line not starting with `#` must be `id = location`.
    /// The line is split on the first `=` so locations may carry query strings.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - A line has no `=` or an empty id
    /// - A location is not an absolute http(s) URL
    /// - An id appears twice
    /// - No sources remain after parsing
    pub fn parse(contents: &str) -> Result<Self> {
        let mut sources = Vec::new();
        let mut seen = HashSet::new();

        for (index, raw) in contents.lines().enumerate() {
            let line = index + 1;
            let trimmed = raw.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let (id, location) = trimmed.split_once('=').ok_or_else(|| {
                RefresherError::SourceList {
                    line,
                    reason: "expected 'id = location'".to_string(),
                }
            })?;

            let id = id.trim();
            if id.is_empty() {
                return Err(RefresherError::SourceList {
                    line,
                    reason: "source id is empty".to_string(),
                });
            }

            let url = parse_location(location.trim()).map_err(|reason| {
                RefresherError::SourceList { line, reason }
            })?;

            if !seen.insert(id.to_string()) {
                return Err(RefresherError::DuplicateSource {
                    id: id.to_string(),
                    line,
                });
            }

            debug!(id, location = %url, "adding source");
            sources.push(Source::new(id, url));
        }

        if sources.is_empty() {
            return Err(RefresherError::EmptySourceList);
        }

        Ok(Self { sources })
    }

    /// Number of sources in the list.
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Whether the list is empty (never true for a parsed list).
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Iterate over the sources.
    pub fn iter(&self) -> impl Iterator<Item = &Source> {
        self.sources.iter()
    }
}

impl IntoIterator for SourceList {
    type Item = Source;
    type IntoIter = std::vec::IntoIter<Source>;

    fn into_iter(self) -> Self::IntoIter {
        self.sources.into_iter()
    }
}

fn parse_location(location: &str) -> std::result::Result<Url, String> {
    let url = Url::parse(location).map_err(|e| format!("invalid location '{}': {}", location, e))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(format!("unsupported scheme '{}' in '{}'", other, location)),
    }
}
