// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Cordon and drain of workload cluster nodes, similar to `kubectl drain`.
//!
//! Pods are removed through the Eviction API. In force mode, pods without a controller
//! are removed as well and evictions refused by a PodDisruptionBudget fall back to a
//! plain delete. DaemonSet pods and static mirror pods are left alone.
//!
//! Evictions refused by a disruption budget or failing with a server error are retried
//! with exponential backoff until the drain timeout.

use crate::constants::timing::{
    CONCURRENT_EVICTIONS, DRAIN_TIMEOUT, EVICTION_RETRY_MAX_DELAY, POD_POLL_INTERVAL,
};
use crate::error::{EvacuatorError, Result};
use crate::kubernetes::node::{
    controller_kind, has_empty_dir, is_cordoned, is_mirror_pod, terminating_longer_than,
};
use async_trait::async_trait;
use futures::{stream, StreamExt, TryStreamExt};
use k8s_openapi::api::core::v1::{Node, Pod};
use kube::{
    api::{DeleteParams, EvictParams, ListParams},
    Api, Client, ResourceExt,
};
use std::time::Duration;
use tokio::time::sleep;
use tokio_retry::{
    strategy::{jitter, ExponentialBackoff},
    Condition, RetryIf,
};
use tracing::{debug, info, instrument, warn};

#[cfg(test)]
use mockall::automock;

/// Options for a single drain attempt
#[derive(Debug, Clone, PartialEq)]
pub struct DrainOptions {
    /// Upper bound for the whole drain; exceeding it fails the attempt
    pub timeout: Duration,
    /// Remove pods without a controller and delete pods whose eviction a disruption budget refuses
    pub force: bool,
    /// Skip DaemonSet pods instead of failing the drain
    pub ignore_all_daemon_sets: bool,
    /// Remove pods using emptyDir volumes, losing their data
    pub delete_empty_dir_data: bool,
    /// Grace period for evicted pods; `None` uses each pod's own grace period
    pub grace_period_seconds: Option<u32>,
    /// Pods terminating for longer than this are treated as gone
    pub skip_wait_for_delete_timeout: Option<Duration>,
    /// Delay between deletion checks and before the first eviction retry
    pub poll_interval: Duration,
}

impl Default for DrainOptions {
    fn default() -> Self {
        DrainOptions {
            timeout: DRAIN_TIMEOUT,
            force: true,
            ignore_all_daemon_sets: true,
            delete_empty_dir_data: true,
            grace_period_seconds: None,
            skip_wait_for_delete_timeout: None,
            poll_interval: POD_POLL_INTERVAL,
        }
    }
}

/// The cordon and drain primitives run against a workload cluster node.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait NodeDrainer: Send + Sync {
    /// Mark the node unschedulable. A node that is already cordoned is left untouched.
    async fn cordon(&self, node: &Node) -> Result<()>;

    /// Remove all drainable pods from the node and wait for them to be gone.
    async fn drain(&self, node_name: &str, options: &DrainOptions) -> Result<()>;
}

/// [`NodeDrainer`] backed by the Kubernetes API of the workload cluster
#[derive(Clone)]
pub struct KubeNodeDrainer {
    client: Client,
}

impl KubeNodeDrainer {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// List the pods on the node that have to be removed, failing when a pod is
    /// not allowed to be removed under the given options.
    async fn pods_to_remove(&self, node_name: &str, options: &DrainOptions) -> Result<Vec<Pod>> {
        let pods: Api<Pod> = Api::all(self.client.clone());
        let lp = ListParams::default().fields(&format!("spec.nodeName={}", node_name));
        let pod_list = pods.list(&lp).await?;

        let mut targets = Vec::new();
        for pod in pod_list.items {
            if should_remove(&pod, options)? {
                targets.push(pod);
            }
        }
        Ok(targets)
    }

    async fn remove_pod(&self, pod: Pod, options: &DrainOptions) -> Result<()> {
        let pods = namespaced_pod_api(&self.client, &pod);
        let name = pod.name_any();
        let pod_key = format!("{}/{}", pod.namespace().unwrap_or_default(), name);

        let delete_params = DeleteParams {
            grace_period_seconds: options.grace_period_seconds,
            ..Default::default()
        };
        let evict_params = EvictParams {
            delete_options: Some(delete_params.clone()),
            ..Default::default()
        };

        let removal = RetryIf::spawn(
            eviction_retry_strategy(options),
            || async {
                match pods.evict(&name, &evict_params).await {
                    Ok(_) => {
                        info!(pod = %pod_key, "Evicted pod from node");
                        Ok(Removal::Removed)
                    }
                    Err(kube::Error::Api(err)) if err.code == 404 => Ok(Removal::AlreadyGone),
                    // A disruption budget does not allow the eviction right now
                    Err(kube::Error::Api(err)) if err.code == 429 && options.force => {
                        match pods.delete(&name, &delete_params).await {
                            Ok(_) => {
                                info!(pod = %pod_key, "Deleted pod from node");
                                Ok(Removal::Removed)
                            }
                            Err(kube::Error::Api(err)) if err.code == 404 => Ok(Removal::AlreadyGone),
                            Err(e) => Err(RemovalError::from(e)),
                        }
                    }
                    Err(e) => {
                        warn!("Eviction of pod {} failed: {}", pod_key, e);
                        Err(RemovalError::from(e))
                    }
                }
            },
            RemovalRetryCondition,
        )
        .await
        .map_err(|e| EvacuatorError::DrainError(format!("failed to evict pod {}: {}", pod_key, e.kube_error())))?;

        match removal {
            Removal::Removed => self.wait_for_deletion(&pods, &pod, options).await,
            Removal::AlreadyGone => {
                debug!("Pod {} already gone", pod_key);
                Ok(())
            }
        }
    }

    /// Wait until the pod is gone or replaced by a new pod with the same name.
    async fn wait_for_deletion(&self, pods: &Api<Pod>, pod: &Pod, options: &DrainOptions) -> Result<()> {
        let name = pod.name_any();

        loop {
            match pods.get_opt(&name).await? {
                None => return Ok(()),
                Some(current) if current.metadata.uid != pod.metadata.uid => return Ok(()),
                Some(current) => {
                    if let Some(threshold) = options.skip_wait_for_delete_timeout {
                        if terminating_longer_than(&current, threshold) {
                            warn!(
                                "Pod {}/{} has been terminating for more than {:?}, not waiting for it",
                                current.namespace().unwrap_or_default(),
                                name,
                                threshold
                            );
                            return Ok(());
                        }
                    }
                }
            }
            sleep(options.poll_interval).await;
        }
    }
}

#[async_trait]
impl NodeDrainer for KubeNodeDrainer {
    #[instrument(skip(self, node), fields(node = %node.name_any()))]
    async fn cordon(&self, node: &Node) -> Result<()> {
        let name = node.name_any();
        if is_cordoned(node) {
            debug!("Node {} is already cordoned", name);
            return Ok(());
        }

        let nodes: Api<Node> = Api::all(self.client.clone());
        nodes
            .cordon(&name)
            .await
            .map_err(|e| EvacuatorError::CordonError(format!("unable to cordon node {}: {}", name, e)))?;

        info!("Cordoned node {}", name);
        Ok(())
    }

    #[instrument(skip(self, options), fields(node = %node_name))]
    async fn drain(&self, node_name: &str, options: &DrainOptions) -> Result<()> {
        let drain = async {
            let targets = self.pods_to_remove(node_name, options).await?;
            info!("Removing {} pods from node {}", targets.len(), node_name);

            stream::iter(targets.into_iter().map(Ok))
                .try_for_each_concurrent(CONCURRENT_EVICTIONS, |pod| self.remove_pod(pod, options))
                .await
        };

        tokio::time::timeout(options.timeout, drain)
            .await
            .map_err(|_| EvacuatorError::DrainTimeout {
                node: node_name.to_string(),
                timeout: options.timeout,
            })?
    }
}

/// Decide whether a pod found on the node has to be removed. Pods that can never be
/// removed under the given options fail the drain.
fn should_remove(pod: &Pod, options: &DrainOptions) -> Result<bool> {
    let pod_key = format!("{}/{}", pod.namespace().unwrap_or_default(), pod.name_any());

    if let Some(threshold) = options.skip_wait_for_delete_timeout {
        if terminating_longer_than(pod, threshold) {
            debug!("Skipping pod {}: terminating for more than {:?}", pod_key, threshold);
            return Ok(false);
        }
    }

    if is_mirror_pod(pod) {
        debug!("Skipping pod {}: static mirror pod", pod_key);
        return Ok(false);
    }

    match controller_kind(pod) {
        Some("DaemonSet") => {
            if options.ignore_all_daemon_sets {
                debug!("Skipping pod {}: managed by a DaemonSet", pod_key);
                return Ok(false);
            }
            return Err(EvacuatorError::DrainError(format!(
                "pod {} is managed by a DaemonSet",
                pod_key
            )));
        }
        None if !options.force => {
            return Err(EvacuatorError::DrainError(format!(
                "pod {} is not managed by a controller",
                pod_key
            )));
        }
        _ => {}
    }

    if has_empty_dir(pod) && !options.delete_empty_dir_data {
        return Err(EvacuatorError::DrainError(format!(
            "pod {} uses emptyDir storage",
            pod_key
        )));
    }

    Ok(true)
}

/// Outcome of removing a single pod
enum Removal {
    Removed,
    AlreadyGone,
}

/// Failed eviction or delete of a pod
#[derive(Debug)]
enum RemovalError {
    /// Disruption budget refusals, server errors and transport errors
    Retriable(kube::Error),
    Fatal(kube::Error),
}

impl RemovalError {
    fn kube_error(&self) -> &kube::Error {
        match self {
            RemovalError::Retriable(e) | RemovalError::Fatal(e) => e,
        }
    }
}

impl From<kube::Error> for RemovalError {
    fn from(e: kube::Error) -> Self {
        let retriable = match &e {
            kube::Error::Api(err) => err.code == 429 || err.code >= 500,
            _ => true,
        };
        if retriable {
            RemovalError::Retriable(e)
        } else {
            RemovalError::Fatal(e)
        }
    }
}

struct RemovalRetryCondition;

impl Condition<RemovalError> for RemovalRetryCondition {
    fn should_retry(&mut self, error: &RemovalError) -> bool {
        matches!(error, RemovalError::Retriable(_))
    }
}

/// Delays between eviction attempts of one pod, starting at the poll interval. There is
/// no retry limit, the drain timeout bounds the attempts.
fn eviction_retry_strategy(options: &DrainOptions) -> impl Iterator<Item = Duration> {
    let first = (options.poll_interval.as_millis() as u64).max(2);
    ExponentialBackoff::from_millis(2)
        .factor(first / 2)
        .max_delay(EVICTION_RETRY_MAX_DELAY)
        .map(jitter)
}

fn namespaced_pod_api(client: &Client, pod: &Pod) -> Api<Pod> {
    match pod.namespace() {
        Some(ns) => Api::namespaced(client.clone(), &ns),
        None => Api::default_namespaced(client.clone()),
    }
}
