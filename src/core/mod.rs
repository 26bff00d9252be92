//! Core refresher types: settings, validation, and the running refresher.

mod builder;
mod refresher;
mod settings;
mod validation;

pub use builder::RefresherBuilder;
pub use refresher::Refresher;
pub use settings::{
    DEFAULT_ANNOTATION_KEY, DEFAULT_CHECK_INTERVAL_SECS, DEFAULT_CONFIRMATION_THRESHOLD,
    DEFAULT_ENV_PREFIX, DEFAULT_FETCH_TIMEOUT_SECS, DEFAULT_RELOAD_KEY, DEFAULT_SOURCES_FILE,
    Settings, SettingsLoader,
};
pub use validation::Validate;
