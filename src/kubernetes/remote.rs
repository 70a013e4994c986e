// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Access to the node being evacuated in a workload cluster

use crate::error::{EvacuatorError, Result};
use crate::kubernetes::drain::{DrainOptions, KubeNodeDrainer, NodeDrainer};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Node;
use kube::{Api, Client};

#[cfg(test)]
use mockall::automock;

/// Operations the evacuation needs against a workload cluster
#[cfg_attr(test, automock)]
#[async_trait]
pub trait RemoteClusterClient: Send + Sync {
    /// Fetch a node, `None` when it does not exist
    async fn get_node(&self, name: &str) -> Result<Option<Node>>;

    /// Mark the node unschedulable
    async fn cordon_node(&self, node: &Node) -> Result<()>;

    /// Evict or delete the drainable pods on the node
    async fn evict_pods(&self, node_name: &str, options: &DrainOptions) -> Result<()>;
}

/// [`RemoteClusterClient`] talking to a workload cluster API server
pub struct KubeRemoteClient<D = KubeNodeDrainer> {
    nodes: Api<Node>,
    drainer: D,
}

impl KubeRemoteClient {
    pub fn new(client: Client) -> Self {
        Self::with_drainer(client.clone(), KubeNodeDrainer::new(client))
    }
}

impl<D: NodeDrainer> KubeRemoteClient<D> {
    pub fn with_drainer(client: Client, drainer: D) -> Self {
        Self {
            nodes: Api::all(client),
            drainer,
        }
    }
}

#[async_trait]
impl<D: NodeDrainer> RemoteClusterClient for KubeRemoteClient<D> {
    async fn get_node(&self, name: &str) -> Result<Option<Node>> {
        self.nodes
            .get_opt(name)
            .await
            .map_err(|e| EvacuatorError::NodeError(format!("unable to get node {}: {}", name, e)))
    }

    async fn cordon_node(&self, node: &Node) -> Result<()> {
        self.drainer.cordon(node).await
    }

    async fn evict_pods(&self, node_name: &str, options: &DrainOptions) -> Result<()> {
        self.drainer.drain(node_name, options).await
    }
}
