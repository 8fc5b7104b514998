use async_trait::async_trait;
use pubsub_core::{Adapter, NodeName};
use serde_json::Value;

/// The default adapter for the standalone binary: every node name is valid,
/// every subscriber is authorized, and nodes start out as an empty JSON
/// object. Embedders with their own validation/authorization/initialization
/// rules supply their own [`Adapter`] instead of using this one.
#[derive(Debug, Default)]
pub struct OpenAdapter;

#[async_trait]
impl Adapter for OpenAdapter {
    async fn validate_node(&self, _name: &NodeName) -> bool {
        true
    }

    async fn authorize(&self, _subscriber_id: &str, _name: &NodeName) -> bool {
        true
    }

    async fn node_init(&self, _name: &NodeName) -> Result<Value, ()> {
        Ok(Value::Object(serde_json::Map::new()))
    }
}
