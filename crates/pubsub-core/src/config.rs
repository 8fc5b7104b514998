use std::time::Duration;

/// Tunables for the [`crate::Root`] engine.
#[derive(Debug, Clone)]
pub struct PubsubConfig {
    /// How long an unsubscribed node is kept around before it is reaped, in
    /// case a subscriber reconnects.
    pub node_timeout: Duration,
    /// The minimum gap between two accepted updates to the same node;
    /// updates arriving sooner are silently dropped.
    pub min_update_period: Duration,
    /// Retained history size as a percentage of the node's current
    /// serialized data size.
    pub max_update_history_ratio: u32,
    /// Whether [`crate::Adapter::authorize`] must be consulted before a
    /// subscription is accepted.
    pub authorization_required: bool,
}

impl Default for PubsubConfig {
    fn default() -> Self {
        Self {
            node_timeout: Duration::from_secs(60),
            min_update_period: Duration::from_millis(0),
            max_update_history_ratio: 200,
            authorization_required: false,
        }
    }
}
