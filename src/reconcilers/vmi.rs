// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! VirtualMachineInstance reconciler - drains the workload cluster node of an evicted
//! instance and deletes the instance once the node is empty.

use crate::config::Config;
use crate::constants::labels;
use crate::error::{EvacuatorError, Result};
use crate::evacuation::{drain_node, resolve_cluster, DrainOutcome};
use crate::kubernetes::client::{KubeconfigClientFactory, RemoteClientFactory};
use crate::reconcilers::backoff::ErrorBackoff;
use crate::types::VirtualMachineInstance;
use futures::StreamExt;
use kube::{
    api::{DeleteParams, Preconditions},
    runtime::{controller, controller::Action, Controller},
    Api, Client, ResourceExt,
};
use kube_runtime::watcher::Config as WatcherConfig;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn, Span};

pub struct VmiReconciler {
    client: Client,
    client_factory: Box<dyn RemoteClientFactory>,
    backoff: ErrorBackoff,
    config: Config,
}

impl VmiReconciler {
    pub fn new(client: Client, config: Config) -> Self {
        let client_factory = Box::new(KubeconfigClientFactory::new(client.clone()));
        Self::with_client_factory(client, client_factory, config)
    }

    pub fn with_client_factory(
        client: Client,
        client_factory: Box<dyn RemoteClientFactory>,
        config: Config,
    ) -> Self {
        let backoff = ErrorBackoff::new(config.error_backoff_base, config.error_backoff_max);
        Self {
            client,
            client_factory,
            backoff,
            config,
        }
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let vmis: Api<VirtualMachineInstance> = match &self.config.watch_namespace {
            Some(ns) => Api::namespaced(self.client.clone(), ns),
            None => Api::all(self.client.clone()),
        };
        // Only instances created for Cluster API machines
        let watcher_config = WatcherConfig::default().labels(labels::KUBEVIRT_MACHINE_NAME);
        let controller_config =
            controller::Config::default().concurrency(self.config.max_concurrent_reconciles);
        let context = Arc::new(self);

        Controller::new(vmis, watcher_config)
            .with_config(controller_config)
            .shutdown_on_signal()
            .run(reconcile, error_policy, context)
            .for_each(|res| async move {
                match res {
                    Ok(o) => debug!("Reconciled instance: {:?}", o),
                    Err(e) => warn!("Reconciliation error: {:?}", e),
                }
            })
            .await;

        Ok(())
    }

    /// Drive one instance towards deletion. Every step checks the current state, so
    /// running it again for the same instance is safe.
    #[instrument(
        skip(self, namespace, name),
        fields(instance = %format!("{}/{}", namespace, name), cluster, node)
    )]
    pub async fn evacuate(&self, namespace: &str, name: &str) -> Result<Action> {
        let vmis: Api<VirtualMachineInstance> = Api::namespaced(self.client.clone(), namespace);

        let Some(vmi) = vmis.get_opt(name).await? else {
            debug!("Can't find instance {}/{}; it was already deleted", namespace, name);
            return Ok(Action::await_change());
        };

        // KubeVirt sets the evacuation node name when the instance has to leave its node
        let Some(node_name) = vmi.evacuation_node_name() else {
            debug!("Instance {}/{} is not marked for eviction, nothing to do", namespace, name);
            return Ok(Action::await_change());
        };
        Span::current().record("node", node_name);

        let cluster = resolve_cluster(&self.client, &vmi).await.inspect_err(|e| {
            error!("Can't get the cluster of instance {}/{}: {}", namespace, name, e);
        })?;
        let cluster_key = format!("{}/{}", cluster.namespace().unwrap_or_default(), cluster.name_any());
        Span::current().record("cluster", cluster_key.as_str());

        let remote = match self.client_factory.remote_client_for(&cluster).await {
            Ok(remote) => remote,
            Err(EvacuatorError::KubeconfigError(msg)) => {
                // Needs the secret to be repaired; the next change event retries
                error!(
                    "Error creating a client for cluster {} while evacuating instance {}/{}, won't retry: {}",
                    cluster_key, namespace, name, msg
                );
                return Ok(Action::await_change());
            }
            Err(e) => {
                error!("Error reading credentials of cluster {}: {}", cluster_key, e);
                return Err(e);
            }
        };

        match drain_node(remote.as_ref(), node_name).await {
            DrainOutcome::Drained => {}
            DrainOutcome::RetryAfter(delay) => return Ok(Action::requeue(delay)),
            DrainOutcome::Fatal(e) => return Err(e),
        }

        delete_instance(&vmis, &vmi).await?;
        info!(
            "Node {} of cluster {} drained, deleted instance {}/{}",
            node_name, cluster_key, namespace, name
        );
        Ok(Action::await_change())
    }
}

/// Delete the instance, removing its dependents first. The delete only applies to the
/// object that was drained for; a same-named replacement is left alone.
async fn delete_instance(vmis: &Api<VirtualMachineInstance>, vmi: &VirtualMachineInstance) -> Result<()> {
    let name = vmi.name_any();
    let params = DeleteParams {
        preconditions: Some(Preconditions {
            uid: vmi.uid(),
            ..Default::default()
        }),
        ..DeleteParams::foreground()
    };

    match vmis.delete(&name, &params).await {
        Ok(_) => Ok(()),
        Err(kube::Error::Api(err)) if err.code == 404 => {
            debug!("Instance {} already deleted", name);
            Ok(())
        }
        // UID precondition failed: the instance was deleted and recreated meanwhile
        Err(kube::Error::Api(err)) if err.code == 409 => {
            debug!("Instance {} was replaced, not deleting the new instance", name);
            Ok(())
        }
        Err(e) => {
            error!("Failed to delete instance {}: {}", name, e);
            Err(EvacuatorError::DeleteError {
                name,
                source: e,
            })
        }
    }
}

async fn reconcile(vmi: Arc<VirtualMachineInstance>, ctx: Arc<VmiReconciler>) -> Result<Action> {
    let key = vmi.key();
    let namespace = vmi.namespace().unwrap_or_default();

    let action = ctx.evacuate(&namespace, &vmi.name_any()).await?;
    ctx.backoff.reset(&key);
    Ok(action)
}

fn error_policy(
    vmi: Arc<VirtualMachineInstance>,
    error: &EvacuatorError,
    ctx: Arc<VmiReconciler>,
) -> Action {
    let key = vmi.key();
    let delay = match error.retry_after() {
        Some(delay) => {
            ctx.backoff.reset(&key);
            delay
        }
        None => ctx.backoff.next_delay(&key),
    };

    error!("Reconciliation of {} failed, retrying in {:?}: {}", key, delay, error);
    Action::requeue(delay)
}
