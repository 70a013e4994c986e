// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Cluster resolution and node drain orchestration for evicted instances.

pub mod orchestrator;
pub mod resolver;

pub use orchestrator::{drain_node, drain_options_for, DrainOutcome};
pub use resolver::resolve_cluster;
