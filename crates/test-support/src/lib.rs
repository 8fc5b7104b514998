//! Deterministic test doubles and in-process HTTP helpers shared by the
//! pub/sub core and its connectors: a sequential id generator, an in-memory
//! [`pubsub_core::Adapter`], and a one-shot JSON request helper over an
//! `axum::Router`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use bayeux::IdGenerator;
use http_body_util::BodyExt;
use pubsub_core::{Adapter, NodeName};
use serde_json::Value;
use tower::ServiceExt;

/// Produces `session-0`, `session-1`, ... in order, for assertions that
/// depend on a predictable client id.
#[derive(Debug, Default)]
pub struct SequentialIdGenerator(AtomicU64);

impl IdGenerator for SequentialIdGenerator {
    fn next_id(&self) -> String {
        format!("session-{}", self.0.fetch_add(1, Ordering::SeqCst))
    }
}

/// An [`Adapter`] with no backing store: every node name validates, every
/// subscriber is authorized, and new nodes start out holding `initial_value`
/// (or, if set, whatever [`InMemoryAdapter::fail_init_for`] marked as a
/// forced initialization failure).
#[derive(Debug)]
pub struct InMemoryAdapter {
    initial_value: Value,
    reject_validate: Mutex<Vec<NodeName>>,
    reject_authorize: Mutex<Vec<NodeName>>,
    fail_init: Mutex<Vec<NodeName>>,
}

impl Default for InMemoryAdapter {
    fn default() -> Self {
        Self::new(Value::Object(serde_json::Map::new()))
    }
}

impl InMemoryAdapter {
    #[must_use]
    pub fn new(initial_value: Value) -> Self {
        Self {
            initial_value,
            reject_validate: Mutex::new(Vec::new()),
            reject_authorize: Mutex::new(Vec::new()),
            fail_init: Mutex::new(Vec::new()),
        }
    }

    pub fn reject_validation_for(&self, name: NodeName) {
        self.reject_validate.lock().unwrap().push(name);
    }

    pub fn reject_authorization_for(&self, name: NodeName) {
        self.reject_authorize.lock().unwrap().push(name);
    }

    pub fn fail_init_for(&self, name: NodeName) {
        self.fail_init.lock().unwrap().push(name);
    }
}

#[async_trait]
impl Adapter for InMemoryAdapter {
    async fn validate_node(&self, name: &NodeName) -> bool {
        !self.reject_validate.lock().unwrap().contains(name)
    }

    async fn authorize(&self, _subscriber_id: &str, name: &NodeName) -> bool {
        !self.reject_authorize.lock().unwrap().contains(name)
    }

    async fn node_init(&self, name: &NodeName) -> Result<Value, ()> {
        if self.fail_init.lock().unwrap().contains(name) {
            Err(())
        } else {
            Ok(self.initial_value.clone())
        }
    }
}

/// Sends `body` as a JSON `POST` to `path` against `router` and returns the
/// decoded status and response body, without binding a real socket.
///
/// # Panics
/// Panics if the response body is not valid JSON.
pub async fn post_json(router: Router, path: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(path)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&body).expect("request body serializes")))
        .expect("request builds");

    let response = router.oneshot(request).await.expect("router is infallible");
    let status = response.status();
    let bytes = response.into_body().collect().await.expect("body collects").to_bytes();

    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("response body is valid JSON")
    };

    (status, value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequential_ids_increase_in_order() {
        let generator = SequentialIdGenerator::default();
        assert_eq!(generator.next_id(), "session-0");
        assert_eq!(generator.next_id(), "session-1");
    }

    #[tokio::test]
    async fn adapter_defaults_allow_everything_and_init_to_empty_object() {
        use pubsub_core::Key;

        let adapter = InMemoryAdapter::default();
        let name = NodeName::from_keys(vec![Key::new("p1", "a")]);

        assert!(adapter.validate_node(&name).await);
        assert!(adapter.authorize("sub", &name).await);
        assert_eq!(adapter.node_init(&name).await, Ok(Value::Object(serde_json::Map::new())));
    }

    #[tokio::test]
    async fn adapter_can_be_told_to_reject_specific_nodes() {
        use pubsub_core::Key;

        let adapter = InMemoryAdapter::default();
        let blocked = NodeName::from_keys(vec![Key::new("p1", "blocked")]);
        adapter.reject_validation_for(blocked.clone());

        assert!(!adapter.validate_node(&blocked).await);
        assert!(adapter.validate_node(&NodeName::from_keys(vec![Key::new("p1", "ok")])).await);
    }
}
