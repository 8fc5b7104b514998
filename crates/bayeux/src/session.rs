use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use pubsub_core::{Clock, NodeName, NodeSnapshot, Root, Subscriber};
use tokio::sync::oneshot;
use tracing::trace;

use crate::config::BayeuxConfig;
use crate::message::{self, Message};

/// Messages and the single parked long-poll responder, mirroring the C++
/// implementation's `mutex_`-guarded region. Never held across an `.await`.
struct Mailbox {
    pending: VecDeque<Message>,
    pending_bytes: usize,
    parked: Option<oneshot::Sender<Vec<Message>>>,
}

impl Mailbox {
    fn new() -> Self {
        Self {
            pending: VecDeque::new(),
            pending_bytes: 0,
            parked: None,
        }
    }
}

/// A single Bayeux client's server-side state: its pending message queue and
/// its subscription bookkeeping, kept as two independently-locked regions so
/// that enqueuing a message for one node never blocks a subscribe to
/// another.
pub struct Session {
    client_id: String,
    config: BayeuxConfig,
    mailbox: Mutex<Mailbox>,
    subscriptions: Mutex<SubscriptionState>,
    self_weak: std::sync::Weak<Session>,
}

struct SubscriptionState {
    subscribed: HashSet<NodeName>,
    /// Node names with a subscribe request in flight, each carrying the
    /// client-supplied message id to echo back in the ack.
    pending_subscribes: HashMap<NodeName, Option<String>>,
}

impl Session {
    #[must_use]
    pub fn new(client_id: String, config: BayeuxConfig) -> Arc<Self> {
        Arc::new_cyclic(|self_weak| Self {
            client_id,
            config,
            mailbox: Mutex::new(Mailbox::new()),
            subscriptions: Mutex::new(SubscriptionState {
                subscribed: HashSet::new(),
                pending_subscribes: HashMap::new(),
            }),
            self_weak: self_weak.clone(),
        })
    }

    fn arc(&self) -> Arc<Self> {
        self.self_weak.upgrade().expect("session outlives its own callbacks")
    }

    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Subscribes to `name` via `root`, tagging the request with `message_id`
    /// so the resulting ack echoes it. The ack (and, on success, the node's
    /// current data) are enqueued as a side effect of the `Subscriber`
    /// callback `root.subscribe` invokes before returning.
    pub async fn subscribe(&self, root: &Root, name: NodeName, message_id: Option<String>) {
        {
            let mut subscriptions = self.subscriptions.lock().unwrap();
            subscriptions.pending_subscribes.insert(name.clone(), message_id);
        }

        let subscriber: Arc<dyn Subscriber> = self.arc();
        root.subscribe(subscriber, name).await;
    }

    /// Unsubscribes from `name`, enqueuing the corresponding ack
    /// immediately since `Root::unsubscribe` is synchronous.
    pub fn unsubscribe(&self, root: &Root, name: NodeName, message_id: Option<String>) {
        let subscriber: Arc<dyn Subscriber> = self.arc();
        let was_subscribed = root.unsubscribe(&subscriber, &name);
        self.subscriptions.lock().unwrap().subscribed.remove(&name);

        let channel = crate::channel::channel_from_node_name(&name);
        let reply = if was_subscribed {
            message::unsubscribe_reply(&self.client_id, &channel, true, None)
        } else {
            message::unsubscribe_reply(&self.client_id, &channel, false, Some("not subscribed".to_string()))
        }
        .with_id(message_id);

        self.enqueue(reply);
    }

    /// Detaches from every node it is subscribed to and releases any parked
    /// long-poll responder, used when a session is closed or times out.
    pub fn close(&self, root: &Root) {
        let subscriber: Arc<dyn Subscriber> = self.arc();
        root.unsubscribe_all(&subscriber);
        self.subscriptions.lock().unwrap().subscribed.clear();

        if let Some(parked) = self.mailbox.lock().unwrap().parked.take() {
            let _ = parked.send(Vec::new());
        }
    }

    /// Returns every pending message immediately if any are queued;
    /// otherwise parks until one arrives or `timeout` elapses, in which case
    /// an empty batch is returned. Parking a new responder displaces and
    /// immediately releases any responder already parked for this session.
    pub async fn wait_for_events(&self, clock: &dyn Clock, timeout: std::time::Duration) -> Vec<Message> {
        let receiver = {
            let mut mailbox = self.mailbox.lock().unwrap();
            if !mailbox.pending.is_empty() {
                return drain(&mut mailbox);
            }

            let (tx, rx) = oneshot::channel();
            if let Some(displaced) = mailbox.parked.replace(tx) {
                let _ = displaced.send(Vec::new());
            }
            rx
        };

        tokio::select! {
            result = receiver => result.unwrap_or_default(),
            () = clock.sleep(timeout) => Vec::new(),
        }
    }

    /// Drains whatever is currently pending without parking, for use right
    /// after a subscribe/unsubscribe/non-final-connect whose result must
    /// appear in the same HTTP response that triggered it.
    pub fn drain_now(&self) -> Vec<Message> {
        let mut mailbox = self.mailbox.lock().unwrap();
        if mailbox.pending.is_empty() {
            Vec::new()
        } else {
            drain(&mut mailbox)
        }
    }

    fn enqueue(&self, message: Message) {
        let mut mailbox = self.mailbox.lock().unwrap();
        let size = estimated_size(&message);

        mailbox.pending.push_back(message);
        mailbox.pending_bytes += size;
        enforce_caps(&mut mailbox, &self.config);

        if let Some(parked) = mailbox.parked.take() {
            let batch = drain(&mut mailbox);
            let _ = parked.send(batch);
        }
    }
}

fn drain(mailbox: &mut Mailbox) -> Vec<Message> {
    mailbox.pending_bytes = 0;
    mailbox.pending.drain(..).collect()
}

fn enforce_caps(mailbox: &mut Mailbox, config: &BayeuxConfig) {
    while mailbox.pending.len() > config.max_messages_per_client
        || mailbox.pending_bytes > config.max_messages_size_per_client
    {
        let Some(dropped) = mailbox.pending.pop_front() else {
            break;
        };
        mailbox.pending_bytes = mailbox.pending_bytes.saturating_sub(estimated_size(&dropped));
        trace!(channel = %dropped.channel, "dropped oldest pending message at capacity");
    }
}

fn estimated_size(message: &Message) -> usize {
    serde_json::to_vec(message).map_or(0, |bytes| bytes.len())
}

impl Subscriber for Session {
    fn subscriber_id(&self) -> &str {
        &self.client_id
    }

    fn on_update(&self, name: &NodeName, node: &NodeSnapshot) {
        let channel = crate::channel::channel_from_node_name(name);
        let message_id = {
            let mut subscriptions = self.subscriptions.lock().unwrap();
            subscriptions.subscribed.insert(name.clone());
            subscriptions.pending_subscribes.remove(name)
        };

        if let Some(message_id) = message_id {
            self.enqueue(message::subscribe_reply(&self.client_id, &channel, true, None).with_id(message_id));
        }

        self.enqueue(message::data_message(&channel, node.data.clone()));
    }

    fn on_invalid_node_subscription(&self, name: &NodeName) {
        let message_id = self.subscriptions.lock().unwrap().pending_subscribes.remove(name).flatten();
        let channel = crate::channel::channel_from_node_name(name);
        self.enqueue(
            message::subscribe_reply(&self.client_id, &channel, false, Some("invalid subscription".to_string()))
                .with_id(message_id),
        );
    }

    fn on_unauthorized_node_subscription(&self, name: &NodeName) {
        let message_id = self.subscriptions.lock().unwrap().pending_subscribes.remove(name).flatten();
        let channel = crate::channel::channel_from_node_name(name);
        self.enqueue(
            message::subscribe_reply(&self.client_id, &channel, false, Some("authorization failed".to_string()))
                .with_id(message_id),
        );
    }

    fn on_failed_node_subscription(&self, name: &NodeName) {
        let message_id = self.subscriptions.lock().unwrap().pending_subscribes.remove(name).flatten();
        let channel = crate::channel::channel_from_node_name(name);
        self.enqueue(
            message::subscribe_reply(&self.client_id, &channel, false, Some("initialization failed".to_string()))
                .with_id(message_id),
        );
    }
}
