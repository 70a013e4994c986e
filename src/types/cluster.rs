// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::constants::kubeconfig::SECRET_SUFFIX;
use kube::{CustomResource, ResourceExt};
use serde::{Deserialize, Serialize};

/// The subset of a Cluster API `Cluster` the operator reads.
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, schemars::JsonSchema)]
#[kube(group = "cluster.x-k8s.io", version = "v1beta1", kind = "Cluster")]
#[kube(namespaced)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub infrastructure_ref: Option<InfrastructureRef>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct InfrastructureRef {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl Cluster {
    /// Namespace and name of the secret holding the workload cluster kubeconfig.
    ///
    /// The secret is named after the infrastructure reference and lives next to it.
    /// Returns `None` when the cluster has no named infrastructure reference yet.
    pub fn kubeconfig_secret_key(&self) -> Option<(String, String)> {
        let infra = self.spec.infrastructure_ref.as_ref()?;
        let name = infra.name.as_deref().filter(|n| !n.is_empty())?;
        let namespace = infra
            .namespace
            .clone()
            .filter(|ns| !ns.is_empty())
            .or_else(|| self.namespace())
            .unwrap_or_default();

        Some((namespace, format!("{}{}", name, SECRET_SUFFIX)))
    }
}
