// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Workload cluster client creation from kubeconfig secrets

use crate::constants::kubeconfig::DATA_KEY;
use crate::error::{EvacuatorError, Result};
use crate::kubernetes::remote::{KubeRemoteClient, RemoteClusterClient};
use crate::types::cluster::Cluster;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::{
    config::{KubeConfigOptions, Kubeconfig},
    Api, Client, ResourceExt,
};
use tracing::{debug, instrument};

#[cfg(test)]
use mockall::automock;

/// Builds clients for the workload cluster described by a Cluster API cluster
#[cfg_attr(test, automock)]
#[async_trait]
pub trait RemoteClientFactory: Send + Sync {
    /// Create a client for the cluster's workload cluster.
    ///
    /// Missing or unusable credentials fail with [`EvacuatorError::KubeconfigError`],
    /// other failures to read them with [`EvacuatorError::CredentialFetchError`].
    async fn remote_client_for(&self, cluster: &Cluster) -> Result<Box<dyn RemoteClusterClient>>;
}

/// [`RemoteClientFactory`] reading the `<infrastructure-ref>-kubeconfig` secret from the
/// management cluster
#[derive(Clone)]
pub struct KubeconfigClientFactory {
    client: Client,
}

impl KubeconfigClientFactory {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RemoteClientFactory for KubeconfigClientFactory {
    #[instrument(skip(self, cluster), fields(cluster = %format!("{}/{}", cluster.namespace().unwrap_or_default(), cluster.name_any())))]
    async fn remote_client_for(&self, cluster: &Cluster) -> Result<Box<dyn RemoteClusterClient>> {
        let kubeconfig = get_cluster_kubeconfig(&self.client, cluster).await?;
        let client = create_client_from_kubeconfig(&kubeconfig).await?;
        Ok(Box::new(KubeRemoteClient::new(client)))
    }
}

/// Get the kubeconfig of a workload cluster from its secret in the management cluster
async fn get_cluster_kubeconfig(client: &Client, cluster: &Cluster) -> Result<String> {
    let cluster_name = cluster.name_any();
    let Some((namespace, secret_name)) = cluster.kubeconfig_secret_key() else {
        return Err(EvacuatorError::KubeconfigError(format!(
            "Cluster {} has no infrastructure reference",
            cluster_name
        )));
    };
    let secrets: Api<Secret> = Api::namespaced(client.clone(), &namespace);

    debug!(
        "Getting kubeconfig secret '{}/{}' for cluster '{}'...",
        namespace, secret_name, cluster_name
    );

    let secret = secrets
        .get_opt(&secret_name)
        .await
        .map_err(|e| {
            EvacuatorError::CredentialFetchError(format!(
                "Failed to get kubeconfig secret {}/{} for cluster {}: {}",
                namespace, secret_name, cluster_name, e
            ))
        })?
        .ok_or_else(|| {
            EvacuatorError::KubeconfigError(format!(
                "Kubeconfig secret {}/{} for cluster {} not found",
                namespace, secret_name, cluster_name
            ))
        })?;

    kubeconfig_from_secret(&secret, &cluster_name)
}

/// Extract the kubeconfig stored under the `value` key
fn kubeconfig_from_secret(secret: &Secret, cluster_name: &str) -> Result<String> {
    let Some(data) = secret.data.as_ref() else {
        return Err(EvacuatorError::KubeconfigError(format!(
            "Kubeconfig secret for cluster {} has no data",
            cluster_name
        )));
    };

    let Some(kubeconfig_data) = data.get(DATA_KEY) else {
        return Err(EvacuatorError::KubeconfigError(format!(
            "Kubeconfig secret for cluster {} does not contain '{}' key",
            cluster_name, DATA_KEY
        )));
    };

    String::from_utf8(kubeconfig_data.0.clone()).map_err(|e| {
        EvacuatorError::KubeconfigError(format!(
            "Failed to decode kubeconfig for cluster {}: {}",
            cluster_name, e
        ))
    })
}

fn parse_kubeconfig(kubeconfig: &str) -> Result<Kubeconfig> {
    serde_yaml::from_str(kubeconfig)
        .map_err(|e| EvacuatorError::KubeconfigError(format!("Failed to parse kubeconfig: {}", e)))
}

/// Create a Kubernetes client from a kubeconfig string
async fn create_client_from_kubeconfig(kubeconfig: &str) -> Result<Client> {
    let kubeconfig_parsed = parse_kubeconfig(kubeconfig)?;

    let client_config =
        kube::Config::from_custom_kubeconfig(kubeconfig_parsed, &KubeConfigOptions::default())
            .await
            .map_err(|e| {
                EvacuatorError::KubeconfigError(format!("Failed to create config: {}", e))
            })?;

    Client::try_from(client_config)
        .map_err(|e| EvacuatorError::KubeconfigError(format!("Failed to create client: {}", e)))
}
