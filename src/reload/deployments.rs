//! Kubernetes deployments as reload targets.

use super::{Workload, WorkloadApi};
use crate::error::Result;
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use kube::api::{Api, ListParams, Patch, PatchParams};
use kube::{Client, ResourceExt};
use serde_json::json;

/// Field manager recorded on every patch.
pub const FIELD_MANAGER: &str = "config-refresher";

/// [`WorkloadApi`] over the apps/v1 `Deployment` resource.
#[derive(Clone)]
pub struct KubeDeployments {
    client: Client,
}

impl KubeDeployments {
    /// Wrap an existing client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from the in-cluster environment or local kubeconfig.
    ///
    /// # Errors
    ///
    /// Returns an error if no usable cluster configuration is found.
    pub async fn try_default() -> Result<Self> {
        let client = Client::try_default().await?;
        Ok(Self::new(client))
    }
}

/// Merge patch that touches a pod template annotation.
pub(crate) fn template_annotation_patch(key: &str, value: &str) -> serde_json::Value {
    let mut annotations = serde_json::Map::new();
    annotations.insert(key.to_string(), json!(value));

    json!({
        "spec": {
            "template": {
                "metadata": {
                    "annotations": annotations
                }
            }
        }
    })
}

#[async_trait]
impl WorkloadApi for KubeDeployments {
    async fn list_workloads(&self) -> Result<Vec<Workload>> {
        let api: Api<Deployment> = Api::all(self.client.clone());
        let deployments = api.list(&ListParams::default()).await?;

        Ok(deployments
            .items
            .into_iter()
            .map(|deployment| Workload {
                namespace: deployment.namespace().unwrap_or_default(),
                name: deployment.name_any(),
                annotations: deployment.metadata.annotations.unwrap_or_default(),
            })
            .collect())
    }

    async fn patch_annotation(
        &self,
        namespace: &str,
        name: &str,
        key: &str,
        value: &str,
    ) -> Result<()> {
        let api: Api<Deployment> = Api::namespaced(self.client.clone(), namespace);
        let patch = template_annotation_patch(key, value);
        let params = PatchParams {
            field_manager: Some(FIELD_MANAGER.to_string()),
            ..Default::default()
        };

        api.patch(name, &params, &Patch::Merge(&patch)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_annotation_patch_shape() {
        let patch = template_annotation_patch("refresher.mrl/reloaded-at", "1700000000");
        assert_eq!(
            patch["spec"]["template"]["metadata"]["annotations"]["refresher.mrl/reloaded-at"],
            "1700000000"
        );
    }
}
