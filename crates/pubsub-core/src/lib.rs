//! Process-wide publish/subscribe engine.
//!
//! [`Root`] owns every node's data and subscriber set. Nodes are named by
//! [`NodeName`], a domain-sorted list of [`Key`]s; their data is versioned
//! via [`NodeVersion`] with a bounded history. A host application supplies an
//! [`Adapter`] to validate and initialize nodes, and attaches [`Subscriber`]
//! implementations to receive updates.

mod adapter;
mod clock;
mod config;
mod key;
mod node;
mod node_name;
mod root;
mod subscriber;
mod version;

pub use adapter::Adapter;
pub use clock::{Clock, SystemClock, VirtualClock};
pub use config::PubsubConfig;
pub use key::{Key, KeyDomain};
pub use node::{Node, NodeSnapshot};
pub use node_name::NodeName;
pub use root::Root;
pub use subscriber::Subscriber;
pub use version::NodeVersion;
