//! Orchestration backend trait.

use crate::error::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;

/// A workload as seen by the reload trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workload {
    /// Namespace the workload lives in
    pub namespace: String,
    /// Name of the workload
    pub name: String,
    /// Workload metadata annotations
    pub annotations: BTreeMap<String, String>,
}

impl Workload {
    /// Value of an annotation, if present.
    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.annotations.get(key).map(String::as_str)
    }
}

/// Trait for the orchestration platform holding dependent workloads.
///
/// The trigger reads then writes with no transaction in between; a workload
/// changed between the two calls is not specially handled.
#[async_trait]
pub trait WorkloadApi: Send + Sync {
    /// List every workload across all namespaces.
    async fn list_workloads(&self) -> Result<Vec<Workload>>;

    /// Set `key` to `value` on the workload's pod template, causing a redeploy.
    async fn patch_annotation(
        &self,
        namespace: &str,
        name: &str,
        key: &str,
        value: &str,
    ) -> Result<()>;
}
