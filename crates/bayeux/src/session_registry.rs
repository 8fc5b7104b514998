use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

use pubsub_core::{Clock, Root};
use tokio::time::Instant;
use tracing::info;

use crate::config::BayeuxConfig;
use crate::session::Session;

/// Produces client ids for newly created sessions. Injected so tests can
/// supply deterministic ids instead of random ones.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> String;
}

/// The default generator, used in production.
#[derive(Debug, Default)]
pub struct UuidIdGenerator;

impl IdGenerator for UuidIdGenerator {
    fn next_id(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

struct Entry {
    session: Arc<Session>,
    last_seen: Instant,
}

/// Owns every active [`Session`], keyed by client id, and reaps sessions
/// that have gone quiet for longer than [`BayeuxConfig::session_timeout`].
pub struct SessionRegistry {
    config: BayeuxConfig,
    clock: Arc<dyn Clock>,
    id_generator: Arc<dyn IdGenerator>,
    root: Arc<Root>,
    sessions: Mutex<HashMap<String, Entry>>,
    self_weak: Weak<SessionRegistry>,
}

impl SessionRegistry {
    #[must_use]
    pub fn new(
        config: BayeuxConfig,
        clock: Arc<dyn Clock>,
        id_generator: Arc<dyn IdGenerator>,
        root: Arc<Root>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|self_weak| Self {
            config,
            clock,
            id_generator,
            root,
            sessions: Mutex::new(HashMap::new()),
            self_weak: self_weak.clone(),
        })
    }

    fn arc(&self) -> Arc<Self> {
        self.self_weak.upgrade().expect("registry outlives its own reaper tasks")
    }

    /// Creates a new session, registers it, and starts its idle reaper.
    pub fn create(&self) -> Arc<Session> {
        let client_id = self.id_generator.next_id();
        let session = Session::new(client_id.clone(), self.config.clone());

        self.sessions.lock().unwrap().insert(
            client_id.clone(),
            Entry {
                session: session.clone(),
                last_seen: self.clock.now(),
            },
        );

        self.spawn_reaper(client_id);
        session
    }

    #[must_use]
    pub fn get(&self, client_id: &str) -> Option<Arc<Session>> {
        self.sessions.lock().unwrap().get(client_id).map(|entry| entry.session.clone())
    }

    /// Resets a session's idle deadline; call on every `/meta/connect` and
    /// poll.
    pub fn touch(&self, client_id: &str) {
        if let Some(entry) = self.sessions.lock().unwrap().get_mut(client_id) {
            entry.last_seen = self.clock.now();
        }
    }

    /// Releases a session's subscriptions and parked responder immediately,
    /// e.g. on `/meta/disconnect`, without evicting it from the registry —
    /// the entry itself is reclaimed later by the idle reaper, since a
    /// disconnected session never calls `touch` again. Returns `true` iff
    /// `client_id` was a known session.
    pub fn disconnect(&self, client_id: &str) -> bool {
        let session = self.sessions.lock().unwrap().get(client_id).map(|entry| entry.session.clone());
        match session {
            Some(session) => {
                session.close(&self.root);
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn active_count(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }

    fn spawn_reaper(&self, client_id: String) {
        let registry = self.arc();
        tokio::spawn(async move {
            loop {
                let remaining = {
                    let sessions = registry.sessions.lock().unwrap();
                    let Some(entry) = sessions.get(&client_id) else {
                        return;
                    };
                    let elapsed = registry.clock.now().duration_since(entry.last_seen);
                    elapsed.checked_sub(registry.config.session_timeout).map_or_else(
                        || Some(registry.config.session_timeout - elapsed),
                        |_| None,
                    )
                };

                match remaining {
                    Some(remaining) => registry.clock.sleep(remaining).await,
                    None => {
                        let removed = registry.sessions.lock().unwrap().remove(&client_id);
                        if let Some(entry) = removed {
                            entry.session.close(&registry.root);
                            info!(%client_id, "session reaped after idle timeout");
                        }
                        return;
                    }
                }
            }
        });
    }
}
