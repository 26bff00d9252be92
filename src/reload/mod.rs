//! Reloading workloads that depend on a changed source.

mod deployments;
mod trigger;
mod workloads;

pub use deployments::{FIELD_MANAGER, KubeDeployments};
pub use trigger::{ReloadReport, ReloadTrigger, ReloadTriggerBuilder};
pub use workloads::{Workload, WorkloadApi};
