use async_trait::async_trait;
use serde_json::Value;

use crate::node_name::NodeName;

/// Host-supplied policy hooks consulted by [`crate::Root`] on the cold path
/// of a subscription: is this node name well-formed, may this subscriber see
/// it, and what is its initial value.
///
/// Implementations must not block the executor; `Root` awaits each call with
/// no internal lock held, so slow adapters only delay the subscribing
/// client, not other sessions.
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Rejects node names the application never intends to serve, before a
    /// node entry is created for them.
    async fn validate_node(&self, name: &NodeName) -> bool;

    /// Decides whether `subscriber_id` may subscribe to `name`. Only
    /// consulted when [`crate::PubsubConfig::authorization_required`] is set.
    async fn authorize(&self, subscriber_id: &str, name: &NodeName) -> bool;

    /// Produces the initial data for a node the first time it is
    /// subscribed to. `Err(())` fails the subscription without creating the
    /// node.
    async fn node_init(&self, name: &NodeName) -> Result<Value, ()>;
}
