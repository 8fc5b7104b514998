use std::sync::Arc;

use bayeux::{BayeuxConfig, BayeuxEngine, SessionRegistry};
use pubsub_core::{Clock, PubsubConfig, Root, VirtualClock};
use serde_json::json;
use server::AppState;
use test_support::{post_json, InMemoryAdapter, SequentialIdGenerator};

fn router(clock: Arc<VirtualClock>) -> axum::Router {
    let root = Root::new(PubsubConfig::default(), Arc::new(InMemoryAdapter::default()), clock.clone() as Arc<dyn Clock>);
    let registry = SessionRegistry::new(
        BayeuxConfig::default(),
        clock.clone() as Arc<dyn Clock>,
        Arc::new(SequentialIdGenerator::default()),
        root.clone(),
    );
    let bayeux = Arc::new(BayeuxEngine::new(registry.clone(), root.clone(), clock.clone() as Arc<dyn Clock>, BayeuxConfig::default()));
    let poll = Arc::new(bayeux::PollEngine::new(registry, root, clock as Arc<dyn Clock>, BayeuxConfig::default()));
    server::build_router(AppState { bayeux, poll })
}

#[tokio::test]
async fn first_poll_creates_a_session_and_returns_subscribed_data() {
    let router = router(VirtualClock::new());

    let (status, reply) = post_json(router, "/poll", json!({"subscribe": ["/foo/bar"]})).await;

    assert_eq!(status, axum::http::StatusCode::OK);
    assert!(reply["clientId"].as_str().is_some());
    let messages = reply["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["channel"], "/meta/subscribe");
    assert_eq!(messages[0]["successful"], true);
    assert_eq!(messages[1]["channel"], "/foo/bar");
}

#[tokio::test]
async fn second_poll_reuses_the_session_across_requests() {
    let router = router(VirtualClock::new());

    let (_, first) = post_json(router.clone(), "/poll", json!({"subscribe": ["/a/b"]})).await;
    let client_id = first["clientId"].as_str().unwrap().to_string();

    let (status, second) =
        post_json(router, "/poll", json!({"clientId": client_id, "subscribe": [], "unsubscribe": ["/a/b"]})).await;

    assert_eq!(status, axum::http::StatusCode::OK);
    assert_eq!(second["clientId"], client_id);
    let messages = second["messages"].as_array().unwrap();
    assert_eq!(messages[0]["channel"], "/meta/unsubscribe");
    assert_eq!(messages[0]["successful"], true);
}
