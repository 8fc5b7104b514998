use std::sync::Arc;

use pubsub_core::{Clock, Root};
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::channel::node_name_from_channel;
use crate::config::BayeuxConfig;
use crate::error::CoreError;
use crate::message::{self, Message};
use crate::session_registry::SessionRegistry;

/// One message from an incoming Bayeux batch. Fields beyond `channel` are
/// only required by the meta-channels that use them.
#[derive(Debug, Clone, Deserialize)]
pub struct IncomingMessage {
    pub channel: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, rename = "clientId")]
    pub client_id: Option<String>,
    #[serde(default)]
    pub subscription: Option<String>,
    #[serde(default, rename = "connectionType")]
    pub connection_type: Option<String>,
}

/// Accepts either a bare JSON object or an array of objects, matching
/// Bayeux's tolerance for a single-message "batch".
pub fn parse_batch(body: Value) -> Result<Vec<IncomingMessage>, CoreError> {
    let items = match body {
        Value::Array(items) => items,
        object @ Value::Object(_) => vec![object],
        _ => return Err(CoreError::MalformedBody("expected a JSON object or array of objects".to_string())),
    };

    items
        .into_iter()
        .map(|item| serde_json::from_value(item).map_err(|err| CoreError::MalformedBody(err.to_string())))
        .collect()
}

/// Dispatches a parsed Bayeux batch against the session registry and root,
/// implementing the per-request state machine described for `/meta/connect`:
/// only the last message in a batch may park the response, and any message
/// preceding it that already produced output rules out parking even then.
pub struct BayeuxEngine {
    registry: Arc<SessionRegistry>,
    root: Arc<Root>,
    clock: Arc<dyn Clock>,
    config: BayeuxConfig,
}

impl BayeuxEngine {
    #[must_use]
    pub fn new(registry: Arc<SessionRegistry>, root: Arc<Root>, clock: Arc<dyn Clock>, config: BayeuxConfig) -> Self {
        Self { registry, root, clock, config }
    }

    pub async fn handle_batch(&self, body: Value) -> Result<Vec<Message>, CoreError> {
        let incoming = parse_batch(body)?;
        let last_index = incoming.len().saturating_sub(1);
        let mut reply = Vec::new();
        let mut touched: Vec<Arc<crate::session::Session>> = Vec::new();

        for (index, message) in incoming.into_iter().enumerate() {
            let is_last = index == last_index;
            match message.channel.as_str() {
                "/meta/handshake" => reply.push(self.handle_handshake(&message)),
                "/meta/connect" => reply.extend(self.handle_connect(&message, is_last).await),
                "/meta/disconnect" => reply.push(self.handle_disconnect(&message)),
                "/meta/subscribe" => {
                    if let Some(session) = self.handle_subscribe(&message, &mut reply).await {
                        touched.push(session);
                    }
                }
                "/meta/unsubscribe" => {
                    if let Some(session) = self.handle_unsubscribe(&message, &mut reply) {
                        touched.push(session);
                    }
                }
                other => warn!(channel = %other, "ignoring message on unrecognized channel"),
            }
        }

        // Subscribe/unsubscribe acks and any resulting data are queued on the
        // session's mailbox rather than returned directly, so that a later
        // /meta/connect in the same batch drains them together with its own
        // ack. If no later connect claimed them, flush here.
        let mut seen = std::collections::HashSet::new();
        for session in touched {
            if seen.insert(session.client_id().to_string()) {
                reply.extend(session.drain_now());
            }
        }

        Ok(reply)
    }

    fn handle_handshake(&self, message: &IncomingMessage) -> Message {
        let session = self.registry.create();
        message::handshake_reply(session.client_id(), &self.config, true, None).with_id(message.id.clone())
    }

    fn handle_disconnect(&self, message: &IncomingMessage) -> Message {
        let client_id = message.client_id.clone().unwrap_or_default();
        let existed = self.registry.disconnect(&client_id);
        message::disconnect_reply(&client_id, existed).with_id(message.id.clone())
    }

    async fn handle_connect(&self, message: &IncomingMessage, is_last: bool) -> Vec<Message> {
        let client_id = message.client_id.clone().unwrap_or_default();
        let echo_id = message.id.clone();

        if message.connection_type.as_deref() != Some("long-polling") {
            return vec![message::connect_reply(&client_id, &self.config, false)
                .with_id(echo_id)
                .with_error("unsupported connection type")];
        }

        let Some(session) = self.registry.get(&client_id) else {
            return vec![message::connect_reply(&client_id, &self.config, false).with_id(echo_id)];
        };

        self.registry.touch(&client_id);

        let mut out = if is_last {
            session.wait_for_events(self.clock.as_ref(), self.config.long_polling_timeout).await
        } else {
            session.drain_now()
        };

        out.push(message::connect_reply(&client_id, &self.config, true).with_id(echo_id));
        out
    }

    /// Performs the subscribe and returns the session it touched; its ack
    /// and any initial data stay queued on the session's mailbox. On
    /// failure (unknown client or missing subscription) the failure reply
    /// is appended directly since there is no session mailbox to carry it.
    async fn handle_subscribe(&self, message: &IncomingMessage, reply: &mut Vec<Message>) -> Option<Arc<crate::session::Session>> {
        let client_id = message.client_id.clone().unwrap_or_default();
        let echo_id = message.id.clone();

        let Some(session) = self.registry.get(&client_id) else {
            reply.push(failed_subscription_reply(message::subscribe_reply, &client_id, message, "invalid clientId"));
            return None;
        };

        let Some(subscription) = non_empty(message.subscription.as_deref()) else {
            reply.push(failed_subscription_reply(message::subscribe_reply, &client_id, message, "invalid clientId"));
            return None;
        };

        self.registry.touch(&client_id);
        let name = node_name_from_channel(subscription);
        session.subscribe(&self.root, name, echo_id).await;
        Some(session)
    }

    fn handle_unsubscribe(&self, message: &IncomingMessage, reply: &mut Vec<Message>) -> Option<Arc<crate::session::Session>> {
        let client_id = message.client_id.clone().unwrap_or_default();
        let echo_id = message.id.clone();

        let Some(session) = self.registry.get(&client_id) else {
            reply.push(failed_subscription_reply(message::unsubscribe_reply, &client_id, message, "invalid clientId"));
            return None;
        };

        let Some(subscription) = non_empty(message.subscription.as_deref()) else {
            reply.push(failed_subscription_reply(message::unsubscribe_reply, &client_id, message, "invalid clientId"));
            return None;
        };

        self.registry.touch(&client_id);
        let name = node_name_from_channel(subscription);
        session.unsubscribe(&self.root, name, echo_id);
        Some(session)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.is_empty())
}

fn failed_subscription_reply(
    builder: fn(&str, &str, bool, Option<String>) -> Message,
    client_id: &str,
    message: &IncomingMessage,
    error: &str,
) -> Message {
    let subscription = message.subscription.as_deref().unwrap_or_default();
    builder(client_id, subscription, false, Some(error.to_string())).with_id(message.id.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pubsub_core::{PubsubConfig, VirtualClock};
    use serde_json::json;

    struct EchoAdapter;

    #[async_trait::async_trait]
    impl pubsub_core::Adapter for EchoAdapter {
        async fn validate_node(&self, _name: &pubsub_core::NodeName) -> bool {
            true
        }
        async fn authorize(&self, _subscriber_id: &str, _name: &pubsub_core::NodeName) -> bool {
            true
        }
        async fn node_init(&self, name: &pubsub_core::NodeName) -> Result<Value, ()> {
            Ok(json!({ "channel": crate::channel::channel_from_node_name(name) }))
        }
    }

    fn engine(clock: Arc<VirtualClock>) -> BayeuxEngine {
        let root = Root::new(PubsubConfig::default(), Arc::new(EchoAdapter), clock.clone());
        let registry = SessionRegistry::new(
            BayeuxConfig::default(),
            clock.clone(),
            Arc::new(crate::session_registry::UuidIdGenerator),
            root.clone(),
        );
        BayeuxEngine::new(registry, root, clock, BayeuxConfig::default())
    }

    #[tokio::test]
    async fn s1_handshake_subscribe_connect_returns_in_order() {
        let clock = VirtualClock::new();
        let engine = engine(clock);

        let handshake = engine
            .handle_batch(json!([{"channel": "/meta/handshake", "version": "1.0", "id": "connect_id"}]))
            .await
            .unwrap();
        let client_id = handshake[0].client_id.clone().unwrap();

        let batch = json!([
            {"channel": "/meta/subscribe", "clientId": client_id, "subscription": "/foo/bar"},
            {"channel": "/meta/connect", "clientId": client_id, "connectionType": "long-polling"},
        ]);

        let reply = engine.handle_batch(batch).await.unwrap();

        assert_eq!(reply.len(), 3);
        assert_eq!(reply[0].channel, "/meta/subscribe");
        assert_eq!(reply[0].successful, Some(true));
        assert_eq!(reply[1].channel, "/foo/bar");
        assert_eq!(reply[1].data, Some(json!({"channel": "/foo/bar"})));
        assert_eq!(reply[2].channel, "/meta/connect");
        assert_eq!(reply[2].successful, Some(true));
    }

    #[tokio::test]
    async fn s4_connect_with_unknown_client_id_fails() {
        let clock = VirtualClock::new();
        let engine = engine(clock);

        let reply = engine
            .handle_batch(json!({"channel": "/meta/connect", "clientId": "does-not-exist", "connectionType": "long-polling"}))
            .await
            .unwrap();

        assert_eq!(reply.len(), 1);
        assert_eq!(reply[0].successful, Some(false));
        assert_eq!(reply[0].error.as_deref(), Some("invalid clientId"));
        assert_eq!(reply[0].client_id.as_deref(), Some("does-not-exist"));
    }

    #[tokio::test]
    async fn s5_long_poll_times_out_with_only_connect_ack() {
        let clock = VirtualClock::new();
        let engine = engine(clock.clone());

        let handshake = engine.handle_batch(json!({"channel": "/meta/handshake"})).await.unwrap();
        let client_id = handshake[0].client_id.clone().unwrap();

        let connect = json!({"channel": "/meta/connect", "clientId": client_id, "connectionType": "long-polling"});

        let pending = engine.handle_batch(connect);
        tokio::pin!(pending);
        let _ = futures_util::poll!(&mut pending);

        clock.advance(BayeuxConfig::default().long_polling_timeout + std::time::Duration::from_secs(1));

        let reply = pending.await.unwrap();
        assert_eq!(reply.len(), 1);
        assert_eq!(reply[0].channel, "/meta/connect");
        assert_eq!(reply[0].successful, Some(true));
    }

    #[tokio::test]
    async fn s6_queue_cap_keeps_the_most_recent_messages() {
        let clock = VirtualClock::new();
        let mut config = BayeuxConfig::default();
        config.max_messages_per_client = 3;
        let root = Root::new(PubsubConfig::default(), Arc::new(EchoAdapter), clock.clone() as Arc<dyn Clock>);
        let registry = SessionRegistry::new(
            config.clone(),
            clock.clone() as Arc<dyn Clock>,
            Arc::new(crate::session_registry::UuidIdGenerator),
            root.clone(),
        );
        let engine = BayeuxEngine::new(registry.clone(), root.clone(), clock.clone() as Arc<dyn Clock>, config);

        let handshake = engine.handle_batch(json!({"channel": "/meta/handshake"})).await.unwrap();
        let client_id = handshake[0].client_id.clone().unwrap();

        engine
            .handle_batch(json!({"channel": "/meta/subscribe", "clientId": client_id, "subscription": "/topic"}))
            .await
            .unwrap();

        for i in 0..5 {
            root.update_node(node_name_from_channel("/topic"), json!({"n": i}));
        }

        let reply = engine
            .handle_batch(json!({"channel": "/meta/connect", "clientId": client_id, "connectionType": "long-polling"}))
            .await
            .unwrap();

        let data: Vec<_> = reply.iter().filter(|m| m.channel == "/topic").map(|m| m.data.clone().unwrap()).collect();
        assert_eq!(data, vec![json!({"n": 2}), json!({"n": 3}), json!({"n": 4})]);
        assert_eq!(reply.last().unwrap().channel, "/meta/connect");
    }

    #[tokio::test]
    async fn disconnect_releases_subscriptions_without_evicting_the_registry_entry() {
        let clock = VirtualClock::new();
        let engine = engine(clock);

        let handshake = engine.handle_batch(json!({"channel": "/meta/handshake"})).await.unwrap();
        let client_id = handshake[0].client_id.clone().unwrap();

        engine
            .handle_batch(json!({"channel": "/meta/subscribe", "clientId": client_id, "subscription": "/topic"}))
            .await
            .unwrap();
        assert!(engine.root.peek(&node_name_from_channel("/topic")).is_some());

        let reply = engine
            .handle_batch(json!({"channel": "/meta/disconnect", "clientId": client_id}))
            .await
            .unwrap();
        assert_eq!(reply[0].successful, Some(true));

        // The registry entry survives a disconnect; only the node's
        // subscriber edge is released immediately.
        assert!(engine.registry.get(&client_id).is_some());
        assert!(engine.root.peek(&node_name_from_channel("/topic")).is_none());
    }

    #[tokio::test]
    async fn disconnect_with_unknown_client_id_reports_failure() {
        let clock = VirtualClock::new();
        let engine = engine(clock);

        let reply = engine
            .handle_batch(json!({"channel": "/meta/disconnect", "clientId": "does-not-exist"}))
            .await
            .unwrap();

        assert_eq!(reply[0].successful, Some(false));
    }
}
