// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::Result;
use kube::Client;
use tracing::info;

use evacuator::config::Config;
use evacuator::constants::OPERATOR_NAME;
use evacuator::kubernetes::wait_for_crd;
use evacuator::reconcilers::VmiReconciler;
use evacuator::types::{Cluster, VirtualMachineInstance};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    info!("Starting {} operator", OPERATOR_NAME);

    // Load configuration
    let config = Config::from_env()?;
    info!(
        "Configuration loaded: watch_namespace={}, max_concurrent_reconciles={}",
        config.watch_namespace.as_deref().unwrap_or("<all>"),
        config.max_concurrent_reconciles
    );

    // Create Kubernetes client for the management cluster
    let client = Client::try_default().await?;
    info!("Connected to management cluster");

    info!("Waiting for KubeVirt and Cluster API CRDs to become available...");
    wait_for_crd::<VirtualMachineInstance>(&client).await?;
    wait_for_crd::<Cluster>(&client).await?;

    let reconciler = VmiReconciler::new(client, config);

    info!("Starting reconciler...");
    reconciler.run().await?;

    info!("Reconciler stopped, shutting down");
    Ok(())
}
