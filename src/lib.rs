//! # config-refresher
//!
//! Watches remotely hosted configuration for confirmed content changes and
//! rolls the Kubernetes deployments that depend on it.
//!
//! ## Overview
//!
//! `config-refresher` combines:
//! - One independent watcher per source, each on its own timer
//! - Debounce-by-confirmation: a new fingerprint must persist across
//!   consecutive checks before it is acted on
//! - A single dispatcher that serializes reloads for every watcher
//! - A stateless reload trigger that touches every deployment annotated
//!   with the changed source id
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use config_refresher::prelude::*;
//! use config_refresher::reload::KubeDeployments;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<()> {
//! let settings = Settings::loader()
//!     .with_file("/etc/refresher/settings.yaml")
//!     .with_env_prefix("REFRESHER")
//!     .load()?;
//!
//! let backend = KubeDeployments::try_default().await?;
//! let refresher = Refresher::builder()
//!     .with_settings(settings)
//!     .with_backend(Arc::new(backend))
//!     .build()?;
//!
//! // Stop cleanly on Ctrl-C
//! let cancel = refresher.cancellation_token();
//! tokio::spawn(async move {
//!     let _ = tokio::signal::ctrl_c().await;
//!     cancel.cancel();
//! });
//!
//! refresher.run().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Source List
//!
//! Sources are read once at startup from an `id = location` file:
//!
//! ```text
//! # id = location
//! payments = https://config.example.com/payments.yaml
//! flags    = https://flags.example.com/v1/flags?env=prod
//! ```
//!
//! A deployment depends on a source when its `refresher.mrl/source`
//! annotation equals the source id.
//!
//! ## Feature Flags
//!
//! - `metrics`: OpenTelemetry counters for checks, changes, and reloads

#![warn(missing_docs, rust_2024_compatibility)]
#![deny(unsafe_code)]

pub mod core;
pub mod error;
pub mod notify;
pub mod reload;
pub mod sources;

#[cfg(feature = "metrics")]
pub mod metrics;

/// Convenient re-exports for common usage patterns.
pub mod prelude {
    pub use crate::core::{Refresher, RefresherBuilder, Settings, Validate};
    pub use crate::error::{RefresherError, Result, ValidationError};
    pub use crate::reload::{ReloadTrigger, WorkloadApi};
    pub use crate::sources::{ChangeEvent, ContentFetcher, MatchPolicy, SourceList};
}
