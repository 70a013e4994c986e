// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Test utilities for mocking Kubernetes API responses.

use http::{Request, Response};
use http_body_util::BodyExt;
use kube::client::Body;
use kube::Client;
use serde_json::json;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tower::Service;

/// A request received by [`MockService`]
#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: String,
    pub body: String,
}

/// A mock HTTP service that returns predefined responses based on request paths
/// and records every request it receives.
#[derive(Clone)]
pub struct MockService {
    responses: Arc<Mutex<HashMap<(String, String), (u16, String)>>>,
    one_shot: Arc<Mutex<HashMap<(String, String), VecDeque<(u16, String)>>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockService {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(HashMap::new())),
            one_shot: Arc::new(Mutex::new(HashMap::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Add a response for GET requests matching the path
    pub fn on_get(self, path: &str, status: u16, body: &str) -> Self {
        self.on("GET", path, status, body)
    }

    /// Add a response for POST requests matching the path
    pub fn on_post(self, path: &str, status: u16, body: &str) -> Self {
        self.on("POST", path, status, body)
    }

    /// Answer the next POST to exactly this path with the given response, before
    /// falling back to the responses registered with [`MockService::on_post`]
    pub fn on_post_once(self, path: &str, status: u16, body: &str) -> Self {
        self.one_shot
            .lock()
            .unwrap()
            .entry(("POST".to_string(), path.to_string()))
            .or_default()
            .push_back((status, body.to_string()));
        self
    }

    /// Add a response for PATCH requests matching the path
    pub fn on_patch(self, path: &str, status: u16, body: &str) -> Self {
        self.on("PATCH", path, status, body)
    }

    /// Add a response for DELETE requests matching the path
    pub fn on_delete(self, path: &str, status: u16, body: &str) -> Self {
        self.on("DELETE", path, status, body)
    }

    fn on(self, method: &str, path: &str, status: u16, body: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert((method.to_string(), path.to_string()), (status, body.to_string()));
        self
    }

    /// Build a kube Client from this mock service. The service stays usable for
    /// inspecting recorded requests.
    pub fn client(&self) -> Client {
        Client::new(self.clone(), "default")
    }

    /// Build a kube Client from this mock service
    pub fn into_client(self) -> Client {
        Client::new(self, "default")
    }

    /// All requests received so far, in arrival order
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Requests received with the given method
    pub fn requests_with_method(&self, method: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method)
            .collect()
    }

    fn find_response(&self, method: &str, path: &str) -> Option<(u16, String)> {
        if let Some(resp) = self
            .one_shot
            .lock()
            .unwrap()
            .get_mut(&(method.to_string(), path.to_string()))
            .and_then(|queue| queue.pop_front())
        {
            return Some(resp);
        }

        let responses = self.responses.lock().unwrap();

        // Try exact match first
        if let Some(resp) = responses.get(&(method.to_string(), path.to_string())) {
            return Some(resp.clone());
        }

        // Try prefix match for paths like /api/v1/namespaces/foo
        for ((m, p), resp) in responses.iter() {
            if m == method && path.starts_with(p) {
                return Some(resp.clone());
            }
        }

        None
    }
}

impl Default for MockService {
    fn default() -> Self {
        Self::new()
    }
}

impl Service<Request<Body>> for MockService {
    type Response = Response<Body>;
    type Error = tower::BoxError;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let method = req.method().to_string();
        let path = req.uri().path().to_string();
        let query = req.uri().query().unwrap_or_default().to_string();

        let response = self.find_response(&method, &path);
        let requests = self.requests.clone();

        Box::pin(async move {
            let body = req.into_body().collect().await?.to_bytes();
            requests.lock().unwrap().push(RecordedRequest {
                method,
                path,
                query,
                body: String::from_utf8_lossy(&body).to_string(),
            });

            match response {
                Some((status, body)) => Ok(Response::builder()
                    .status(status)
                    .header("content-type", "application/json")
                    .body(Body::from(body.into_bytes()))
                    .unwrap()),
                None => {
                    // Default 404 for unmatched requests
                    let body = r#"{"kind":"Status","apiVersion":"v1","status":"Failure","message":"not found","reason":"NotFound","code":404}"#;
                    Ok(Response::builder()
                        .status(404)
                        .header("content-type", "application/json")
                        .body(Body::from(body.as_bytes().to_vec()))
                        .unwrap())
                }
            }
        })
    }
}

/// Build a `kube::Error::Api` with the given status code
pub fn api_error(code: u16, reason: &str) -> kube::Error {
    kube::Error::Api(kube::core::ErrorResponse {
        status: "Failure".to_string(),
        message: format!("{} ({})", reason, code),
        reason: reason.to_string(),
        code,
    })
}

/// Create a failure Status response body
pub fn status_json(code: u16, reason: &str) -> String {
    json!({
        "kind": "Status",
        "apiVersion": "v1",
        "metadata": {},
        "status": "Failure",
        "message": reason,
        "reason": reason,
        "code": code
    })
    .to_string()
}

/// Create a success Status response body
pub fn success_json() -> String {
    json!({
        "kind": "Status",
        "apiVersion": "v1",
        "metadata": {},
        "status": "Success",
        "code": 201
    })
    .to_string()
}

/// Create a 404 not found response
pub fn not_found_json(resource: &str, name: &str) -> String {
    json!({
        "kind": "Status",
        "apiVersion": "v1",
        "status": "Failure",
        "message": format!("{} \"{}\" not found", resource, name),
        "reason": "NotFound",
        "code": 404
    })
    .to_string()
}

/// Create a VirtualMachineInstance owned by cluster `clusters/tenant-a`
pub fn vmi_json(namespace: &str, name: &str, evacuation_node_name: Option<&str>) -> String {
    json!({
        "apiVersion": "kubevirt.io/v1",
        "kind": "VirtualMachineInstance",
        "metadata": {
            "name": name,
            "namespace": namespace,
            "uid": "vmi-uid",
            "labels": {
                "cluster.x-k8s.io/cluster-name": "tenant-a",
                "capk.cluster.x-k8s.io/kubevirt-machine-namespace": "clusters",
                "capk.cluster.x-k8s.io/kubevirt-machine-name": name
            }
        },
        "spec": {},
        "status": {
            "phase": "Running",
            "evacuationNodeName": evacuation_node_name
        }
    })
    .to_string()
}

/// Create a Cluster API Cluster whose infrastructure reference shares its name
pub fn cluster_json(namespace: &str, name: &str) -> String {
    json!({
        "apiVersion": "cluster.x-k8s.io/v1beta1",
        "kind": "Cluster",
        "metadata": {
            "name": name,
            "namespace": namespace,
            "uid": "cluster-uid"
        },
        "spec": {
            "infrastructureRef": {
                "apiVersion": "infrastructure.cluster.x-k8s.io/v1alpha1",
                "kind": "KubevirtCluster",
                "name": name,
                "namespace": namespace
            }
        }
    })
    .to_string()
}

/// Create a Secret response body with the given data map (values base64 encoded)
pub fn secret_json(namespace: &str, name: &str, data: serde_json::Value) -> String {
    json!({
        "apiVersion": "v1",
        "kind": "Secret",
        "metadata": {
            "name": name,
            "namespace": namespace
        },
        "type": "cluster.x-k8s.io/secret",
        "data": data
    })
    .to_string()
}

/// Create a Node with the given Ready condition status and unschedulable flag
pub fn node_json(name: &str, ready: &str, unschedulable: bool) -> String {
    json!({
        "apiVersion": "v1",
        "kind": "Node",
        "metadata": {
            "name": name,
            "uid": "node-uid"
        },
        "spec": {
            "unschedulable": unschedulable
        },
        "status": {
            "conditions": [
                {"type": "Ready", "status": ready}
            ]
        }
    })
    .to_string()
}

/// Create a Pod managed by the given controller kind, `None` for an unmanaged pod
pub fn pod_value(namespace: &str, name: &str, controller_kind: Option<&str>) -> serde_json::Value {
    let owner_references = match controller_kind {
        Some(kind) => json!([{
            "apiVersion": "apps/v1",
            "kind": kind,
            "name": format!("{}-owner", name),
            "uid": "owner-uid",
            "controller": true
        }]),
        None => json!([]),
    };

    json!({
        "apiVersion": "v1",
        "kind": "Pod",
        "metadata": {
            "name": name,
            "namespace": namespace,
            "uid": format!("{}-uid", name),
            "ownerReferences": owner_references
        },
        "spec": {
            "nodeName": "node-7",
            "containers": [{"name": "app", "image": "busybox"}]
        },
        "status": {"phase": "Running"}
    })
}

/// Create a PodList response body
pub fn pod_list_json(pods: Vec<serde_json::Value>) -> String {
    json!({
        "apiVersion": "v1",
        "kind": "PodList",
        "metadata": {"resourceVersion": "1"},
        "items": pods
    })
    .to_string()
}
