// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Cordon and drain of the workload cluster node an instance is evicted from.
//!
//! A drain attempt is bounded by the drain timeout. A drain that does not finish in
//! time is retried at a fixed cadence rather than reported as an error, so one slow
//! node does not push the instance into ever growing error backoff.

use crate::constants::timing::{DRAIN_RETRY_DELAY, UNREACHABLE_SKIP_WAIT_FOR_DELETE};
use crate::error::EvacuatorError;
use crate::kubernetes::drain::DrainOptions;
use crate::kubernetes::node::is_node_unreachable;
use crate::kubernetes::remote::RemoteClusterClient;
use k8s_openapi::api::core::v1::Node;
use std::time::Duration;
use tracing::{error, info, instrument, warn};

/// Result of one drain attempt
#[derive(Debug)]
pub enum DrainOutcome {
    /// The node is cordoned and empty, or no longer exists
    Drained,
    /// The drain did not complete; try again after the delay
    RetryAfter(Duration),
    /// The attempt failed in a way that has to be surfaced as an error
    Fatal(EvacuatorError),
}

/// Drain options for a node. Pods on an unreachable node may never confirm their
/// deletion, so after five minutes of terminating they are no longer waited for.
pub fn drain_options_for(node: &Node) -> DrainOptions {
    let mut options = DrainOptions::default();
    if is_node_unreachable(node) {
        options.skip_wait_for_delete_timeout = Some(UNREACHABLE_SKIP_WAIT_FOR_DELETE);
    }
    options
}

/// Cordon and drain `node_name` in the workload cluster
#[instrument(skip(remote, node_name), fields(node = %node_name))]
pub async fn drain_node(remote: &dyn RemoteClusterClient, node_name: &str) -> DrainOutcome {
    let node = match remote.get_node(node_name).await {
        Ok(Some(node)) => node,
        Ok(None) => {
            // Removed out of band, e.g. by an admin
            warn!("Node {} not found, it may have already been deleted", node_name);
            return DrainOutcome::Drained;
        }
        Err(e) => {
            error!("Unable to get node {}: {}", node_name, e);
            return DrainOutcome::Fatal(e);
        }
    };

    let options = drain_options_for(&node);
    if options.skip_wait_for_delete_timeout.is_some() {
        info!("Node {} is unreachable, ignoring pods stuck terminating", node_name);
    }

    if let Err(e) = remote.cordon_node(&node).await {
        error!("Cordon of node {} failed: {}", node_name, e);
        return DrainOutcome::Fatal(e);
    }

    if let Err(e) = remote.evict_pods(node_name, &options).await {
        warn!(
            "Drain of node {} failed, retry in {:?}: {}",
            node_name, DRAIN_RETRY_DELAY, e
        );
        return DrainOutcome::RetryAfter(DRAIN_RETRY_DELAY);
    }

    info!("Drain of node {} successful", node_name);
    DrainOutcome::Drained
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kubernetes::remote::MockRemoteClusterClient;
    use crate::test_utils::node_json;

    fn node(ready: &str) -> Node {
        serde_json::from_str(&node_json("node-7", ready, false)).unwrap()
    }

    #[test]
    fn test_drain_options_for_reachable_node() {
        let options = drain_options_for(&node("True"));

        assert_eq!(options.skip_wait_for_delete_timeout, None);
        assert_eq!(options.timeout, Duration::from_secs(20));
    }

    #[test]
    fn test_drain_options_for_unreachable_node() {
        let options = drain_options_for(&node("Unknown"));

        assert_eq!(options.skip_wait_for_delete_timeout, Some(Duration::from_secs(300)));
    }

    #[tokio::test]
    async fn test_missing_node_is_drained() {
        let mut remote = MockRemoteClusterClient::new();
        remote.expect_get_node().times(1).returning(|_| Ok(None));
        remote.expect_cordon_node().never();
        remote.expect_evict_pods().never();

        let outcome = drain_node(&remote, "node-7").await;

        assert!(matches!(outcome, DrainOutcome::Drained));
    }

    #[tokio::test]
    async fn test_node_lookup_failure_is_fatal() {
        let mut remote = MockRemoteClusterClient::new();
        remote
            .expect_get_node()
            .returning(|_| Err(EvacuatorError::NodeError("connection refused".to_string())));
        remote.expect_cordon_node().never();
        remote.expect_evict_pods().never();

        let outcome = drain_node(&remote, "node-7").await;

        assert!(matches!(outcome, DrainOutcome::Fatal(EvacuatorError::NodeError(_))));
    }

    #[tokio::test]
    async fn test_cordon_failure_is_fatal() {
        let mut remote = MockRemoteClusterClient::new();
        remote.expect_get_node().returning(|_| Ok(Some(node("True"))));
        remote
            .expect_cordon_node()
            .times(1)
            .returning(|_| Err(EvacuatorError::CordonError("forbidden".to_string())));
        remote.expect_evict_pods().never();

        let outcome = drain_node(&remote, "node-7").await;

        assert!(matches!(outcome, DrainOutcome::Fatal(EvacuatorError::CordonError(_))));
    }

    #[tokio::test]
    async fn test_drain_failure_retries_after_fixed_delay() {
        let mut remote = MockRemoteClusterClient::new();
        remote.expect_get_node().returning(|_| Ok(Some(node("True"))));
        remote.expect_cordon_node().returning(|_| Ok(()));
        remote.expect_evict_pods().times(1).returning(|name, options| {
            Err(EvacuatorError::DrainTimeout {
                node: name.to_string(),
                timeout: options.timeout,
            })
        });

        let outcome = drain_node(&remote, "node-7").await;

        assert!(matches!(outcome, DrainOutcome::RetryAfter(d) if d == Duration::from_secs(20)));
    }

    #[tokio::test]
    async fn test_successful_drain() {
        let mut remote = MockRemoteClusterClient::new();
        remote
            .expect_get_node()
            .withf(|name| name == "node-7")
            .returning(|_| Ok(Some(node("True"))));
        remote.expect_cordon_node().times(1).returning(|_| Ok(()));
        remote
            .expect_evict_pods()
            .withf(|name, options| {
                name == "node-7"
                    && options.force
                    && options.ignore_all_daemon_sets
                    && options.delete_empty_dir_data
                    && options.skip_wait_for_delete_timeout.is_none()
            })
            .times(1)
            .returning(|_, _| Ok(()));

        let outcome = drain_node(&remote, "node-7").await;

        assert!(matches!(outcome, DrainOutcome::Drained));
    }

    #[tokio::test]
    async fn test_unreachable_node_raises_stuck_pod_tolerance() {
        let mut remote = MockRemoteClusterClient::new();
        remote.expect_get_node().returning(|_| Ok(Some(node("Unknown"))));
        remote.expect_cordon_node().returning(|_| Ok(()));
        remote
            .expect_evict_pods()
            .withf(|_, options| options.skip_wait_for_delete_timeout == Some(Duration::from_secs(300)))
            .times(1)
            .returning(|_, _| Ok(()));

        let outcome = drain_node(&remote, "node-7").await;

        assert!(matches!(outcome, DrainOutcome::Drained));
    }
}
