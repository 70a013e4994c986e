// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::constants::timing::DELETE_RETRY_DELAY;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EvacuatorError {
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("Missing label: {0}")]
    MissingLabel(String),

    #[error("Cluster not found: {0}")]
    ClusterNotFound(String),

    /// The stored remote credentials are absent or unusable. Retrying will not help
    /// until the secret is repaired.
    #[error("Failed to load kubeconfig: {0}")]
    KubeconfigError(String),

    /// Reading the credential secret failed for a reason other than it being absent.
    #[error("Failed to fetch kubeconfig secret: {0}")]
    CredentialFetchError(String),

    #[error("Failed to get node: {0}")]
    NodeError(String),

    #[error("Cordon failed: {0}")]
    CordonError(String),

    #[error("Drain failed: {0}")]
    DrainError(String),

    #[error("Drain of node {node} did not finish within {timeout:?}")]
    DrainTimeout { node: String, timeout: Duration },

    #[error("Failed to delete instance {name}: {source}")]
    DeleteError {
        name: String,
        #[source]
        source: kube::Error,
    },
}

impl EvacuatorError {
    /// Fixed requeue delay for errors retried at a constant cadence instead of the
    /// exponential error backoff.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            EvacuatorError::DeleteError { .. } => Some(DELETE_RETRY_DELAY),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, EvacuatorError>;
