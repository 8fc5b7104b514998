use std::sync::Arc;

use bayeux::{BayeuxEngine, PollEngine, SessionRegistry, UuidIdGenerator};
use pubsub_core::{Root, SystemClock};

use crate::adapter::OpenAdapter;
use crate::config::ServerConfig;

/// Shared state behind every route: the pub/sub root and the two protocol
/// engines layered over it, all driven by the real-time system clock.
#[derive(Clone)]
pub struct AppState {
    pub bayeux: Arc<BayeuxEngine>,
    pub poll: Arc<PollEngine>,
}

impl AppState {
    #[must_use]
    pub fn new(config: &ServerConfig) -> Self {
        let clock = Arc::new(SystemClock);
        let root = Root::new(config.pubsub.clone(), Arc::new(OpenAdapter), clock.clone());
        let registry = SessionRegistry::new(config.bayeux.clone(), clock.clone(), Arc::new(UuidIdGenerator), root.clone());

        let bayeux = Arc::new(BayeuxEngine::new(registry.clone(), root.clone(), clock.clone(), config.bayeux.clone()));
        let poll = Arc::new(PollEngine::new(registry, root, clock, config.bayeux.clone()));

        Self { bayeux, poll }
    }
}
