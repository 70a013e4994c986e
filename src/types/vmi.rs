// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use kube::{CustomResource, ResourceExt};
use serde::{Deserialize, Serialize};

/// A KubeVirt `VirtualMachineInstance`. Only the fields the operator reads are modelled,
/// everything else is ignored on deserialization.
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, schemars::JsonSchema)]
#[kube(group = "kubevirt.io", version = "v1", kind = "VirtualMachineInstance")]
#[kube(namespaced)]
#[kube(status = "VirtualMachineInstanceStatus")]
pub struct VirtualMachineInstanceSpec {}

#[derive(Serialize, Deserialize, Clone, Debug, Default, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VirtualMachineInstanceStatus {
    /// Set by KubeVirt when the instance has to move off its node
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evacuation_node_name: Option<String>,
}

impl VirtualMachineInstance {
    /// Name of the workload cluster node to drain, if KubeVirt marked this instance for eviction
    pub fn evacuation_node_name(&self) -> Option<&str> {
        self.status
            .as_ref()
            .and_then(|s| s.evacuation_node_name.as_deref())
            .filter(|n| !n.is_empty())
    }

    /// `namespace/name` used to identify the instance in log output
    pub fn key(&self) -> String {
        format!("{}/{}", self.namespace().unwrap_or_default(), self.name_any())
    }
}
