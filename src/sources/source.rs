//! Per-source change detection state.

use super::Fingerprint;
use reqwest::Url;
use serde::Deserialize;

/// How a check that matches the baseline affects an in-progress confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchPolicy {
    /// A reversion to the baseline leaves the confirmation count untouched.
    #[default]
    KeepStreak,
    /// A reversion to the baseline cancels the confirmation streak.
    ResetStreak,
}

/// Where a source is in its confirmation cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceState {
    /// No successful fetch yet.
    Uninitialized,
    /// Baseline set, nothing pending.
    Stable,
    /// A differing fingerprint has been seen and is being confirmed.
    Suspect {
        /// Differing observations counted so far
        confirmations: u32,
    },
}

/// A confirmed change, carrying the id of the source that changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    /// Identity of the changed source
    pub source_id: String,
    /// Fingerprint that became the new baseline
    pub fingerprint: Fingerprint,
}

/// Result of feeding one successful observation into a [`Source`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    /// First content seen; adopted as baseline without an event.
    BaselineAdopted,
    /// Content matches the baseline.
    Unchanged,
    /// Content differs but is not yet confirmed.
    Suspected {
        /// Differing observations counted so far
        confirmations: u32,
    },
    /// The change is confirmed and the new fingerprint is the baseline.
    Confirmed(ChangeEvent),
}

/// A watched resource and its change-detection state.
///
/// Owned exclusively by one watcher; events refer back to it by id only.
#[derive(Debug, Clone)]
pub struct Source {
    id: String,
    location: Url,
    fingerprint: Option<Fingerprint>,
    candidate: Option<Fingerprint>,
    confirmation_count: u32,
}

impl Source {
    /// Create a source that has not been fetched yet.
    pub fn new(id: impl Into<String>, location: Url) -> Self {
        Self {
            id: id.into(),
            location,
            fingerprint: None,
            candidate: None,
            confirmation_count: 0,
        }
    }

    /// Identity of this source.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Network location fetched on every check.
    pub fn location(&self) -> &Url {
        &self.location
    }

    /// The current baseline fingerprint, if any.
    pub fn fingerprint(&self) -> Option<&Fingerprint> {
        self.fingerprint.as_ref()
    }

    /// Number of differing observations counted towards the pending change.
    pub fn confirmation_count(&self) -> u32 {
        self.confirmation_count
    }

    /// Current state in the confirmation cycle.
    pub fn state(&self) -> SourceState {
        match (&self.fingerprint, self.confirmation_count) {
            (None, _) => SourceState::Uninitialized,
            (Some(_), 0) => SourceState::Stable,
            (Some(_), confirmations) => SourceState::Suspect { confirmations },
        }
    }

    /// Feed a freshly computed fingerprint into the state machine.
    ///
    /// A change is confirmed once the same differing fingerprint has been
    /// observed `threshold + 1` times since the last baseline. A differing
    /// fingerprint that is not the one being confirmed restarts the streak.
    pub fn observe(
        &mut self,
        fingerprint: Fingerprint,
        threshold: u32,
        policy: MatchPolicy,
    ) -> Observation {
        let Some(baseline) = &self.fingerprint else {
            self.fingerprint = Some(fingerprint);
            return Observation::BaselineAdopted;
        };

        if *baseline == fingerprint {
            if policy == MatchPolicy::ResetStreak {
                self.clear_pending();
            }
            return Observation::Unchanged;
        }

        if self.candidate.as_ref() != Some(&fingerprint) {
            self.candidate = Some(fingerprint.clone());
            self.confirmation_count = 0;
        }

        if self.confirmation_count < threshold {
            self.confirmation_count += 1;
            return Observation::Suspected {
                confirmations: self.confirmation_count,
            };
        }

        self.fingerprint = Some(fingerprint.clone());
        self.clear_pending();
        Observation::Confirmed(ChangeEvent {
            source_id: self.id.clone(),
            fingerprint,
        })
    }

    fn clear_pending(&mut self) {
        self.candidate = None;
        self.confirmation_count = 0;
    }
}
