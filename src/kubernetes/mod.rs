// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes utilities for CRD discovery, workload cluster clients and node draining.

pub mod client;
pub mod crd;
pub mod drain;
pub mod node;
pub mod remote;

pub use client::{KubeconfigClientFactory, RemoteClientFactory};
pub use crd::wait_for_crd;
pub use drain::{DrainOptions, KubeNodeDrainer, NodeDrainer};
pub use remote::{KubeRemoteClient, RemoteClusterClient};
