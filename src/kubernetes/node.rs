// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Node and pod classification used while draining

use crate::constants::node::{MIRROR_POD_ANNOTATION, UNREACHABLE_TAINT};
use k8s_openapi::api::core::v1::{Node, Pod};
use k8s_openapi::chrono::Utc;
use std::time::Duration;

/// A node is unreachable when its kubelet stopped reporting: the Ready condition is
/// `Unknown` or the node controller applied the unreachable taint.
pub fn is_node_unreachable(node: &Node) -> bool {
    let ready_unknown = node
        .status
        .as_ref()
        .and_then(|s| s.conditions.as_ref())
        .is_some_and(|conditions| {
            conditions
                .iter()
                .any(|c| c.type_ == "Ready" && c.status == "Unknown")
        });

    let unreachable_taint = node
        .spec
        .as_ref()
        .and_then(|s| s.taints.as_ref())
        .is_some_and(|taints| taints.iter().any(|t| t.key == UNREACHABLE_TAINT));

    ready_unknown || unreachable_taint
}

/// Whether the node is already marked unschedulable
pub fn is_cordoned(node: &Node) -> bool {
    node.spec
        .as_ref()
        .and_then(|s| s.unschedulable)
        .unwrap_or(false)
}

/// Kind of the controlling owner of a pod, if any
pub fn controller_kind(pod: &Pod) -> Option<&str> {
    pod.metadata
        .owner_references
        .as_ref()?
        .iter()
        .find(|r| r.controller == Some(true))
        .map(|r| r.kind.as_str())
}

pub fn is_mirror_pod(pod: &Pod) -> bool {
    pod.metadata
        .annotations
        .as_ref()
        .is_some_and(|a| a.contains_key(MIRROR_POD_ANNOTATION))
}

pub fn has_empty_dir(pod: &Pod) -> bool {
    pod.spec
        .as_ref()
        .and_then(|s| s.volumes.as_ref())
        .is_some_and(|volumes| volumes.iter().any(|v| v.empty_dir.is_some()))
}

/// Whether the pod has been terminating for longer than `threshold`
pub fn terminating_longer_than(pod: &Pod, threshold: Duration) -> bool {
    let Some(deleted_at) = pod.metadata.deletion_timestamp.as_ref() else {
        return false;
    };

    Utc::now()
        .signed_duration_since(deleted_at.0)
        .to_std()
        .is_ok_and(|age| age > threshold)
}
