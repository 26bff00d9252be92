//! Operator-facing settings with layered loading.

use super::Validate;
use crate::error::{RefresherError, Result, ValidationError};
use crate::notify::WatchOptions;
use crate::sources::MatchPolicy;
use config::{Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default seconds between checks of a source.
pub const DEFAULT_CHECK_INTERVAL_SECS: u64 = 10;
/// Default number of confirmations before a change is acted on.
pub const DEFAULT_CONFIRMATION_THRESHOLD: u32 = 3;
/// Default location of the source list.
pub const DEFAULT_SOURCES_FILE: &str = "/etc/refresher/refresher.conf";
/// Default annotation matched against source ids.
pub const DEFAULT_ANNOTATION_KEY: &str = "refresher.mrl/source";
/// Default annotation written to trigger a reload.
pub const DEFAULT_RELOAD_KEY: &str = "refresher.mrl/reloaded-at";
/// Default per-fetch timeout.
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;
/// Default prefix for environment overrides.
pub const DEFAULT_ENV_PREFIX: &str = "REFRESHER";

/// Runtime settings for the refresher daemon.
///
/// Missing keys fall back to [`Settings::default`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Seconds between checks of each source
    pub check_interval_secs: u64,
    /// Differing observations required before a reload is triggered
    pub confirmation_threshold: u32,
    /// Emit JSON logs at info level instead of human-readable debug logs
    pub production_logging: bool,
    /// Path of the `id = location` source list
    pub sources_file: PathBuf,
    /// Annotation whose value names the source a workload depends on
    pub annotation_key: String,
    /// Pod template annotation touched to trigger a reload
    pub reload_key: String,
    /// Detect and log changes without patching any workload
    pub dry_run: bool,
    /// Seconds before a single fetch is abandoned
    pub fetch_timeout_secs: u64,
    /// Whether a baseline match cancels an in-progress confirmation
    pub match_policy: MatchPolicy,
    /// Bearer token sent with every fetch, if the sources require one
    pub fetch_bearer_token: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            check_interval_secs: DEFAULT_CHECK_INTERVAL_SECS,
            confirmation_threshold: DEFAULT_CONFIRMATION_THRESHOLD,
            production_logging: false,
            sources_file: PathBuf::from(DEFAULT_SOURCES_FILE),
            annotation_key: DEFAULT_ANNOTATION_KEY.to_string(),
            reload_key: DEFAULT_RELOAD_KEY.to_string(),
            dry_run: true,
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            match_policy: MatchPolicy::default(),
            fetch_bearer_token: None,
        }
    }
}

impl Settings {
    /// Create a loader for layering a settings file and environment overrides.
    pub fn loader() -> SettingsLoader {
        SettingsLoader::new()
    }

    /// Time between checks of each source.
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }

    /// Per-fetch timeout.
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// Watcher parameters derived from these settings.
    pub fn watch_options(&self) -> WatchOptions {
        WatchOptions {
            interval: self.check_interval(),
            threshold: self.confirmation_threshold,
            policy: self.match_policy,
        }
    }
}

impl Validate for Settings {
    fn validate(&self) -> std::result::Result<(), ValidationError> {
        let mut errors = Vec::new();

        if self.check_interval_secs == 0 {
            errors.push(ValidationError::invalid_field(
                "check_interval_secs",
                "must be greater than 0",
            ));
        }
        if self.fetch_timeout_secs == 0 {
            errors.push(ValidationError::invalid_field(
                "fetch_timeout_secs",
                "must be greater than 0",
            ));
        }
        if self.annotation_key.trim().is_empty() {
            errors.push(ValidationError::invalid_field(
                "annotation_key",
                "must not be empty",
            ));
        }
        if self.reload_key.trim().is_empty() {
            errors.push(ValidationError::invalid_field("reload_key", "must not be empty"));
        }
        if self
            .fetch_bearer_token
            .as_deref()
            .is_some_and(|token| token.trim().is_empty())
        {
            errors.push(ValidationError::invalid_field(
                "fetch_bearer_token",
                "must not be empty when set",
            ));
        }
        if !self.annotation_key.is_empty() && self.annotation_key == self.reload_key {
            errors.push(ValidationError::custom(
                "annotation_key and reload_key must differ",
            ));
        }

        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(ValidationError::Multiple(errors)),
        }
    }
}

/// Loads [`Settings`] from defaults, an optional file, then environment variables.
///
/// # Examples
///
/// ```rust,no_run
/// use config_refresher::core::Settings;
///
/// # fn example() -> config_refresher::error::Result<()> {
/// // REFRESHER_DRY_RUN=false -> dry_run = false
/// let settings = Settings::loader()
///     .with_file("/etc/refresher/settings.yaml")
///     .with_env_prefix("REFRESHER")
///     .load()?;
/// # Ok(())
/// # }
/// ```
pub struct SettingsLoader {
    file: Option<PathBuf>,
    env_prefix: Option<String>,
}

impl SettingsLoader {
    /// Create a loader that only yields defaults.
    pub fn new() -> Self {
        Self {
            file: None,
            env_prefix: None,
        }
    }

    /// Layer a YAML, TOML, or JSON file over the defaults.
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Layer `<PREFIX>_<KEY>` environment variables over the file.
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = Some(prefix.into());
        self
    }

    /// Load the settings.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file has an unsupported extension or cannot be read
    /// - A value cannot be deserialized into its field
    pub fn load(self) -> Result<Settings> {
        let mut builder = config::Config::builder();

        if let Some(path) = &self.file {
            validate_extension(path)?;
            builder = builder.add_source(File::from(path.clone()).required(true));
        }

        if let Some(prefix) = &self.env_prefix {
            builder = builder.add_source(
                Environment::with_prefix(prefix)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );
        }

        let config = builder
            .build()
            .map_err(|e| RefresherError::Settings(format!("Failed to build settings: {}", e)))?;

        config
            .try_deserialize::<Settings>()
            .map_err(|e| RefresherError::Settings(format!("Failed to deserialize settings: {}", e)))
    }
}

impl Default for SettingsLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_extension(path: &Path) -> Result<()> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .ok_or_else(|| {
            RefresherError::Settings(format!(
                "Unable to determine file format for: {}",
                path.display()
            ))
        })?;

    match extension {
        "yaml" | "yml" | "toml" | "json" => Ok(()),
        _ => Err(RefresherError::Settings(format!(
            "Unsupported file extension: {}. Supported: .yaml, .yml, .toml, .json",
            extension
        ))),
    }
}

#[cfg(test)]
#[allow(unsafe_code)] // For env var manipulation in tests
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let settings = Settings::loader().load().unwrap();
        assert_eq!(settings, Settings::default());
        assert!(settings.dry_run);
        assert_eq!(settings.check_interval(), Duration::from_secs(10));
        assert_eq!(settings.confirmation_threshold, 3);
        assert_eq!(settings.match_policy, MatchPolicy::KeepStreak);
    }

    #[test]
    fn test_yaml_file_overrides_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("settings.yaml");
        fs::write(
            &path,
            r#"
check_interval_secs: 30
confirmation_threshold: 1
dry_run: false
match_policy: reset-streak
annotation_key: example.com/config-source
fetch_bearer_token: s3cret
"#,
        )
        .unwrap();

        let settings = Settings::loader().with_file(&path).load().unwrap();
        assert_eq!(settings.check_interval_secs, 30);
        assert_eq!(settings.confirmation_threshold, 1);
        assert!(!settings.dry_run);
        assert_eq!(settings.match_policy, MatchPolicy::ResetStreak);
        assert_eq!(settings.annotation_key, "example.com/config-source");
        assert_eq!(settings.reload_key, DEFAULT_RELOAD_KEY);
        assert_eq!(settings.fetch_bearer_token.as_deref(), Some("s3cret"));
    }

    #[test]
    fn test_toml_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("settings.toml");
        fs::write(&path, "sources_file = \"/tmp/sources.conf\"\nproduction_logging = true\n")
            .unwrap();

        let settings = Settings::loader().with_file(&path).load().unwrap();
        assert_eq!(settings.sources_file, PathBuf::from("/tmp/sources.conf"));
        assert!(settings.production_logging);
    }

    #[test]
    fn test_unsupported_extension() {
        let result = Settings::loader().with_file("settings.txt").load();
        assert!(matches!(result, Err(RefresherError::Settings(_))));
    }

    #[test]
    fn test_missing_file() {
        let result = Settings::loader()
            .with_file("/nonexistent/settings.yaml")
            .load();
        assert!(result.is_err());
    }

    #[test]
    fn test_env_overrides_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("settings.yaml");
        fs::write(&path, "confirmation_threshold: 5\n").unwrap();

        unsafe {
            std::env::set_var("TEST_REFRESHER_SETTINGS_CONFIRMATION_THRESHOLD", "2");
        }
        let settings = Settings::loader()
            .with_file(&path)
            .with_env_prefix("TEST_REFRESHER_SETTINGS")
            .load()
            .unwrap();
        unsafe {
            std::env::remove_var("TEST_REFRESHER_SETTINGS_CONFIRMATION_THRESHOLD");
        }

        assert_eq!(settings.confirmation_threshold, 2);
    }

    #[test]
    fn test_validation_collects_errors() {
        let settings = Settings {
            check_interval_secs: 0,
            reload_key: String::new(),
            ..Settings::default()
        };

        match settings.validate() {
            Err(ValidationError::Multiple(errors)) => assert_eq!(errors.len(), 2),
            other => panic!("expected multiple errors, got {:?}", other),
        }
    }

    #[test]
    fn test_validation_rejects_identical_keys() {
        let settings = Settings {
            reload_key: DEFAULT_ANNOTATION_KEY.to_string(),
            ..Settings::default()
        };
        assert!(matches!(settings.validate(), Err(ValidationError::Custom(_))));
    }

    #[test]
    fn test_validation_rejects_blank_bearer_token() {
        let settings = Settings {
            fetch_bearer_token: Some("  ".to_string()),
            ..Settings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(ValidationError::InvalidField { .. })
        ));
    }

    #[test]
    fn test_watch_options() {
        let settings = Settings {
            check_interval_secs: 7,
            confirmation_threshold: 2,
            ..Settings::default()
        };
        let options = settings.watch_options();
        assert_eq!(options.interval, Duration::from_secs(7));
        assert_eq!(options.threshold, 2);
    }
}
