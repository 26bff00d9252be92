//! Watched sources: fingerprints, per-source state, the source list, and fetchers.

mod fetcher;
mod fingerprint;
mod list;
mod remote;
mod source;

pub use fetcher::ContentFetcher;
pub use fingerprint::Fingerprint;
pub use list::SourceList;
pub use remote::{HttpFetcher, HttpFetcherBuilder};
pub use source::{ChangeEvent, MatchPolicy, Observation, Source, SourceState};
