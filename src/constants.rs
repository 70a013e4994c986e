// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

/// Labels set on VirtualMachineInstances by the KubeVirt infrastructure provider
pub mod labels {
    /// Name of the Cluster API cluster owning the instance
    pub const CLUSTER_NAME: &str = "cluster.x-k8s.io/cluster-name";
    /// Namespace of the Cluster API cluster owning the instance
    pub const KUBEVIRT_MACHINE_NAMESPACE: &str = "capk.cluster.x-k8s.io/kubevirt-machine-namespace";
    /// Only instances carrying this label are watched
    pub const KUBEVIRT_MACHINE_NAME: &str = "capk.cluster.x-k8s.io/kubevirt-machine-name";
}

/// Workload cluster kubeconfig secrets
pub mod kubeconfig {
    /// Suffix appended to the infrastructure reference name
    pub const SECRET_SUFFIX: &str = "-kubeconfig";
    /// Data key holding the serialized kubeconfig
    pub const DATA_KEY: &str = "value";
}

/// Fixed drain and retry timings
pub mod timing {
    use std::time::Duration;

    /// Upper bound for a single drain attempt
    pub const DRAIN_TIMEOUT: Duration = Duration::from_secs(20);
    /// Pods stuck terminating this long on an unreachable node are ignored
    pub const UNREACHABLE_SKIP_WAIT_FOR_DELETE: Duration = Duration::from_secs(5 * 60);
    /// Requeue delay after a drain attempt that did not complete
    pub const DRAIN_RETRY_DELAY: Duration = Duration::from_secs(20);
    /// Requeue delay after a failed instance deletion
    pub const DELETE_RETRY_DELAY: Duration = Duration::from_secs(20);
    /// Interval between pod deletion checks, and the first eviction retry delay
    pub const POD_POLL_INTERVAL: Duration = Duration::from_secs(1);
    /// Longest delay between two eviction attempts of the same pod
    pub const EVICTION_RETRY_MAX_DELAY: Duration = Duration::from_secs(5);
    /// Maximum number of pods evicted at the same time
    pub const CONCURRENT_EVICTIONS: usize = 5;
}

/// Node taints and annotations consulted while draining
pub mod node {
    pub const UNREACHABLE_TAINT: &str = "node.kubernetes.io/unreachable";
    pub const MIRROR_POD_ANNOTATION: &str = "kubernetes.io/config.mirror";
}

/// The operator name used in log output
pub const OPERATOR_NAME: &str = "evacuator";

/// CRD polling configuration
pub mod crd {
    /// Initial polling interval in seconds when waiting for CRD
    pub const POLL_INTERVAL_SECS: u64 = 10;
    /// Maximum polling interval in seconds (exponential backoff cap)
    pub const POLL_MAX_INTERVAL_SECS: u64 = 60;
}
