use crate::node::NodeSnapshot;
use crate::node_name::NodeName;

/// A listener attached to one or more nodes. [`crate::Root`] holds only a
/// weak reference to each subscriber so a client going away never keeps its
/// subscribed nodes alive past their timeout.
///
/// Callbacks run synchronously on whatever task called into `Root`; they
/// must not re-enter `Root` and should do no more than hand the update off
/// to the subscriber's own state (e.g. enqueue a message on a session).
pub trait Subscriber: Send + Sync {
    /// A stable identifier used to key this subscriber's entry in a node's
    /// subscriber set, and to detect re-subscription by the same party.
    fn subscriber_id(&self) -> &str;

    /// Called with the node's current value, both right after a successful
    /// subscription and on every subsequent change.
    fn on_update(&self, name: &NodeName, node: &NodeSnapshot);

    /// The node name failed [`crate::Adapter::validate_node`].
    fn on_invalid_node_subscription(&self, name: &NodeName);

    /// The subscriber failed [`crate::Adapter::authorize`].
    fn on_unauthorized_node_subscription(&self, name: &NodeName);

    /// The node exists (or would be created) but [`crate::Adapter::node_init`]
    /// failed, or the node was reaped before the subscription could
    /// complete.
    fn on_failed_node_subscription(&self, name: &NodeName);
}
