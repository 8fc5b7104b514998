use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::adapter::Adapter;
use crate::clock::Clock;
use crate::config::PubsubConfig;
use crate::node::Node;
use crate::node_name::NodeName;
use crate::subscriber::Subscriber;

struct NodeEntry {
    node: Node,
    subscribers: HashMap<String, Weak<dyn Subscriber>>,
    last_update_at: Option<Instant>,
}

impl NodeEntry {
    fn fresh(node: Node, last_update_at: Option<Instant>) -> Self {
        Self {
            node,
            subscribers: HashMap::new(),
            last_update_at,
        }
    }
}

/// The process-wide publish/subscribe registry: the single owner of every
/// node's data and subscriber set.
///
/// Lock order is always root before session: code holding a session's
/// internal lock must never call back into `Root`, and `Root` never calls a
/// subscriber while holding its own node table lock.
pub struct Root {
    config: PubsubConfig,
    adapter: Arc<dyn Adapter>,
    clock: Arc<dyn Clock>,
    nodes: Mutex<HashMap<NodeName, NodeEntry>>,
    self_weak: Weak<Root>,
}

impl Root {
    #[must_use]
    pub fn new(config: PubsubConfig, adapter: Arc<dyn Adapter>, clock: Arc<dyn Clock>) -> Arc<Self> {
        Arc::new_cyclic(|self_weak| Self {
            config,
            adapter,
            clock,
            nodes: Mutex::new(HashMap::new()),
            self_weak: self_weak.clone(),
        })
    }

    fn arc(&self) -> Arc<Self> {
        self.self_weak.upgrade().expect("root outlives its own callbacks")
    }

    /// Subscribes `subscriber` to `name`, creating the node on first access.
    ///
    /// Exactly one of the subscriber's `on_update`, `on_invalid_node_subscription`,
    /// `on_unauthorized_node_subscription` or `on_failed_node_subscription`
    /// callbacks is invoked before this returns.
    pub async fn subscribe(&self, subscriber: Arc<dyn Subscriber>, name: NodeName) {
        let subscriber_id = subscriber.subscriber_id().to_owned();

        if self.config.authorization_required
            && !self.adapter.authorize(&subscriber_id, &name).await
        {
            debug!(subscriber = %subscriber_id, %name, "authorization denied");
            subscriber.on_unauthorized_node_subscription(&name);
            return;
        }

        let exists = self.nodes.lock().unwrap().contains_key(&name);

        if !exists {
            if !self.adapter.validate_node(&name).await {
                debug!(%name, "node validation failed");
                subscriber.on_invalid_node_subscription(&name);
                return;
            }

            // Another subscriber may have created the node while we were
            // awaiting validate_node; re-check before paying for node_init.
            let already_created = self.nodes.lock().unwrap().contains_key(&name);
            if !already_created {
                match self.adapter.node_init(&name).await {
                    Ok(initial) => {
                        let mut nodes = self.nodes.lock().unwrap();
                        nodes
                            .entry(name.clone())
                            .or_insert_with(|| NodeEntry::fresh(Node::new(initial), None));
                        info!(%name, "node created");
                    }
                    Err(()) => {
                        debug!(%name, "node initialization failed");
                        subscriber.on_failed_node_subscription(&name);
                        return;
                    }
                }
            }
        }

        let snapshot = {
            let mut nodes = self.nodes.lock().unwrap();
            let Some(entry) = nodes.get_mut(&name) else {
                subscriber.on_failed_node_subscription(&name);
                return;
            };
            entry.subscribers.insert(subscriber_id, Arc::downgrade(&subscriber));
            entry.node.snapshot()
        };

        subscriber.on_update(&name, &snapshot);
    }

    /// Removes `subscriber` from `name`'s subscriber set. Returns `false` if
    /// it was not subscribed. If this empties the node's subscriber set, the
    /// node is scheduled for removal after `node_timeout`.
    pub fn unsubscribe(&self, subscriber: &Arc<dyn Subscriber>, name: &NodeName) -> bool {
        let subscriber_id = subscriber.subscriber_id();
        let became_empty = {
            let mut nodes = self.nodes.lock().unwrap();
            let Some(entry) = nodes.get_mut(name) else {
                return false;
            };
            if entry.subscribers.remove(subscriber_id).is_none() {
                return false;
            }
            entry.subscribers.is_empty()
        };

        if became_empty {
            self.schedule_node_removal(name.clone());
        }
        true
    }

    /// Removes `subscriber` from every node it is subscribed to, e.g. when
    /// its session closes.
    pub fn unsubscribe_all(&self, subscriber: &Arc<dyn Subscriber>) {
        let subscriber_id = subscriber.subscriber_id();
        let newly_empty = {
            let mut nodes = self.nodes.lock().unwrap();
            let mut newly_empty = Vec::new();
            for (name, entry) in nodes.iter_mut() {
                if entry.subscribers.remove(subscriber_id).is_some() && entry.subscribers.is_empty() {
                    newly_empty.push(name.clone());
                }
            }
            newly_empty
        };

        for name in newly_empty {
            self.schedule_node_removal(name);
        }
    }

    /// Applies a new value to `name`, creating the node if it does not yet
    /// exist. Subscribers are notified only if the value actually changed
    /// and `min_update_period` has elapsed since the last accepted update.
    pub fn update_node(&self, name: NodeName, new_data: Value) {
        let now = self.clock.now();
        let mut nodes = self.nodes.lock().unwrap();

        let changed = match nodes.get_mut(&name) {
            Some(entry) => {
                let debounced = entry
                    .last_update_at
                    .is_some_and(|last| now.duration_since(last) < self.config.min_update_period);

                if debounced {
                    debug!(%name, "update suppressed by min_update_period");
                    false
                } else {
                    let changed = entry.node.update(new_data, self.config.max_update_history_ratio);
                    if changed {
                        entry.last_update_at = Some(now);
                    }
                    changed
                }
            }
            None => {
                nodes.insert(name.clone(), NodeEntry::fresh(Node::new(new_data), Some(now)));
                true
            }
        };

        if !changed {
            return;
        }

        let entry = nodes.get(&name).expect("entry was just inserted or updated above");
        let snapshot = entry.node.snapshot();
        let subscribers: Vec<Arc<dyn Subscriber>> =
            entry.subscribers.values().filter_map(Weak::upgrade).collect();
        drop(nodes);

        for subscriber in subscribers {
            subscriber.on_update(&name, &snapshot);
        }
    }

    /// Returns the current snapshot of a node, if it exists, without
    /// subscribing to it.
    #[must_use]
    pub fn peek(&self, name: &NodeName) -> Option<crate::node::NodeSnapshot> {
        self.nodes.lock().unwrap().get(name).map(|entry| entry.node.snapshot())
    }

    fn schedule_node_removal(&self, name: NodeName) {
        let root = self.arc();
        let timeout = self.config.node_timeout;
        tokio::spawn(async move {
            root.clock.sleep(timeout).await;
            let mut nodes = root.nodes.lock().unwrap();
            if let Some(entry) = nodes.get(&name) {
                if entry.subscribers.is_empty() {
                    nodes.remove(&name);
                    info!(%name, "node removed after idle timeout");
                }
            }
        });
    }
}
