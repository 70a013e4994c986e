// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Lookup of the Cluster API cluster owning an instance

use crate::constants::labels;
use crate::error::{EvacuatorError, Result};
use crate::types::{Cluster, VirtualMachineInstance};
use kube::{Api, Client, ResourceExt};
use tracing::{debug, instrument};

/// Resolve the Cluster owning the instance from its cluster labels
#[instrument(skip(client, vmi), fields(instance = %vmi.key()))]
pub async fn resolve_cluster(client: &Client, vmi: &VirtualMachineInstance) -> Result<Cluster> {
    let vmi_labels = vmi.labels();

    let Some(namespace) = vmi_labels.get(labels::KUBEVIRT_MACHINE_NAMESPACE) else {
        return Err(EvacuatorError::MissingLabel(format!(
            "can't find the cluster namespace of {}; missing {} label",
            vmi.key(),
            labels::KUBEVIRT_MACHINE_NAMESPACE
        )));
    };

    let Some(name) = vmi_labels.get(labels::CLUSTER_NAME) else {
        return Err(EvacuatorError::MissingLabel(format!(
            "can't find the cluster name of {}; missing {} label",
            vmi.key(),
            labels::CLUSTER_NAME
        )));
    };

    debug!("Resolving cluster {}/{}", namespace, name);

    let clusters: Api<Cluster> = Api::namespaced(client.clone(), namespace);
    clusters
        .get_opt(name)
        .await?
        .ok_or_else(|| EvacuatorError::ClusterNotFound(format!("{}/{}", namespace, name)))
}
