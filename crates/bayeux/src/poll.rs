use std::sync::Arc;

use pubsub_core::{Clock, Root};
use serde::{Deserialize, Serialize};

use crate::channel::node_name_from_channel;
use crate::config::BayeuxConfig;
use crate::message::Message;
use crate::session::Session;
use crate::session_registry::SessionRegistry;

/// A single request to the bespoke JSON polling connector. Folds handshake
/// and connect into one call: a missing or unknown `client_id` creates a
/// fresh session rather than failing.
#[derive(Debug, Clone, Deserialize)]
pub struct PollRequest {
    #[serde(default, rename = "clientId")]
    pub client_id: Option<String>,
    #[serde(default)]
    pub subscribe: Vec<String>,
    #[serde(default)]
    pub unsubscribe: Vec<String>,
}

/// The polling connector's response envelope.
#[derive(Debug, Clone, Serialize)]
pub struct PollResponse {
    #[serde(rename = "clientId")]
    pub client_id: String,
    pub messages: Vec<Message>,
}

/// Drives the polling connector over the same [`Root`] and [`SessionRegistry`]
/// the Bayeux connector uses, via the shared [`Session`] machinery.
pub struct PollEngine {
    registry: Arc<SessionRegistry>,
    root: Arc<Root>,
    clock: Arc<dyn Clock>,
    config: BayeuxConfig,
}

impl PollEngine {
    #[must_use]
    pub fn new(registry: Arc<SessionRegistry>, root: Arc<Root>, clock: Arc<dyn Clock>, config: BayeuxConfig) -> Self {
        Self { registry, root, clock, config }
    }

    pub async fn handle_poll(&self, request: PollRequest) -> PollResponse {
        let session = self.resolve_session(request.client_id.as_deref());
        let client_id = session.client_id().to_string();
        self.registry.touch(&client_id);

        for channel in &request.subscribe {
            let name = node_name_from_channel(channel);
            session.subscribe(&self.root, name, None).await;
        }

        for channel in &request.unsubscribe {
            let name = node_name_from_channel(channel);
            session.unsubscribe(&self.root, name, None);
        }

        let messages = session.wait_for_events(self.clock.as_ref(), self.config.long_polling_timeout).await;

        PollResponse { client_id, messages }
    }

    fn resolve_session(&self, client_id: Option<&str>) -> Arc<Session> {
        client_id.and_then(|id| self.registry.get(id)).unwrap_or_else(|| self.registry.create())
    }
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
        async fn node_init(&self, name: &pubsub_core::NodeName) -> Result<serde_json::Value, ()> {
            Ok(json!({ "channel": crate::channel::channel_from_node_name(name) }))
        }
    }

    fn engine(clock: Arc<VirtualClock>) -> PollEngine {
        let root = Root::new(PubsubConfig::default(), Arc::new(EchoAdapter), clock.clone() as Arc<dyn Clock>);
        let registry = SessionRegistry::new(
            BayeuxConfig::default(),
            clock.clone() as Arc<dyn Clock>,
            Arc::new(crate::session_registry::UuidIdGenerator),
            root.clone(),
        );
        PollEngine::new(registry, root, clock as Arc<dyn Clock>, BayeuxConfig::default())
    }

    #[tokio::test]
    async fn first_poll_with_no_client_id_creates_a_session_and_delivers_initial_data() {
        let engine = engine(VirtualClock::new());

        let response = engine
            .handle_poll(PollRequest { client_id: None, subscribe: vec!["/foo/bar".to_string()], unsubscribe: vec![] })
            .await;

        assert!(!response.client_id.is_empty());
        assert_eq!(response.messages.len(), 2);
        assert_eq!(response.messages[0].channel, "/meta/subscribe");
        assert_eq!(response.messages[0].successful, Some(true));
        assert_eq!(response.messages[1].channel, "/foo/bar");
    }

    #[tokio::test]
    async fn unknown_client_id_falls_back_to_a_new_session_instead_of_failing() {
        let engine = engine(VirtualClock::new());

        let response = engine
            .handle_poll(PollRequest {
                client_id: Some("does-not-exist".to_string()),
                subscribe: vec![],
                unsubscribe: vec![],
            })
            .await;

        assert_ne!(response.client_id, "does-not-exist");
    }

    #[tokio::test]
    async fn second_poll_reuses_the_session_and_can_unsubscribe() {
        let clock = VirtualClock::new();
        let engine = engine(clock.clone());

        let first = engine
            .handle_poll(PollRequest { client_id: None, subscribe: vec!["/a/b".to_string()], unsubscribe: vec![] })
            .await;

        let pending = engine.handle_poll(PollRequest {
            client_id: Some(first.client_id.clone()),
            subscribe: vec![],
            unsubscribe: vec!["/a/b".to_string()],
        });
        tokio::pin!(pending);
        let _ = futures_util::poll!(&mut pending);

        clock.advance(BayeuxConfig::default().long_polling_timeout + std::time::Duration::from_secs(1));
        let second = pending.await;

        assert_eq!(second.client_id, first.client_id);
        assert_eq!(second.messages.len(), 1);
        assert_eq!(second.messages[0].channel, "/meta/unsubscribe");
        assert_eq!(second.messages[0].successful, Some(true));
    }
}
