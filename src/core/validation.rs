//! Settings validation support.

use crate::error::ValidationError;

/// Trait for settings validation.
///
/// Settings are validated once at startup; a failure aborts the process
/// before any source is watched.
///
/// # Examples
///
/// ```rust
/// use config_refresher::core::{Settings, Validate};
///
/// let mut settings = Settings::default();
/// assert!(settings.validate().is_ok());
///
/// settings.check_interval_secs = 0;
/// assert!(settings.validate().is_err());
/// ```
pub trait Validate {
    /// Validate the settings.
    ///
    /// # Errors
    ///
    /// Should return a `ValidationError` describing what validation failed.
    fn validate(&self) -> Result<(), ValidationError>;
}
