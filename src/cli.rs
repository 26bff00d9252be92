use clap::{Parser, ValueEnum};
use config_refresher::core::Settings;
use config_refresher::sources::MatchPolicy;
use std::path::PathBuf;

/// Watch remote configuration and roll the deployments that depend on it.
///
/// Every flag overrides the settings file and `REFRESHER_*` environment
/// variables.
#[derive(Parser, Debug)]
#[command(name = "config-refresher", version, about)]
pub struct CliArgs {
    /// Optional settings file (YAML, TOML, or JSON)
    #[arg(long, env = "REFRESHER_SETTINGS")]
    pub settings: Option<PathBuf>,

    /// How often to run the check, in seconds
    #[arg(long)]
    pub check_interval: Option<u64>,

    /// Emit JSON logs at info level
    #[arg(long)]
    pub production_logging: Option<bool>,

    /// Path of the `id = location` sources file
    #[arg(long)]
    pub sources_file: Option<PathBuf>,

    /// How many times a change must be confirmed before a reload is triggered
    #[arg(long)]
    pub check_threshold: Option<u32>,

    /// Annotation checked against the changed source id
    #[arg(long)]
    pub annotation_key: Option<String>,

    /// Annotation touched to trigger a reload
    #[arg(long)]
    pub reload_key: Option<String>,

    /// Skip the Kubernetes API calls
    #[arg(long)]
    pub dry_run: Option<bool>,

    /// Per-fetch timeout, in seconds
    #[arg(long)]
    pub fetch_timeout: Option<u64>,

    /// Whether a match with the old content cancels a pending confirmation
    #[arg(long, value_enum)]
    pub match_policy: Option<MatchPolicyArg>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum MatchPolicyArg {
    KeepStreak,
    ResetStreak,
}

impl From<MatchPolicyArg> for MatchPolicy {
    fn from(arg: MatchPolicyArg) -> Self {
        match arg {
            MatchPolicyArg::KeepStreak => MatchPolicy::KeepStreak,
            MatchPolicyArg::ResetStreak => MatchPolicy::ResetStreak,
        }
    }
}

impl CliArgs {
    /// Apply every flag that was given on top of `settings`.
    pub fn apply_to(&self, settings: &mut Settings) {
        if let Some(secs) = self.check_interval {
            settings.check_interval_secs = secs;
        }
        if let Some(production) = self.production_logging {
            settings.production_logging = production;
        }
        if let Some(path) = &self.sources_file {
            settings.sources_file = path.clone();
        }
        if let Some(threshold) = self.check_threshold {
            settings.confirmation_threshold = threshold;
        }
        if let Some(key) = &self.annotation_key {
            settings.annotation_key = key.clone();
        }
        if let Some(key) = &self.reload_key {
            settings.reload_key = key.clone();
        }
        if let Some(dry_run) = self.dry_run {
            settings.dry_run = dry_run;
        }
        if let Some(secs) = self.fetch_timeout {
            settings.fetch_timeout_secs = secs;
        }
        if let Some(policy) = self.match_policy {
            settings.match_policy = policy.into();
        }
    }
}
