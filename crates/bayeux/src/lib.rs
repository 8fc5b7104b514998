//! Bayeux-compatible long-polling connector and a bespoke JSON polling
//! connector, both built over [`pubsub_core::Root`] through a shared
//! session layer.

mod channel;
mod config;
mod error;
mod message;
mod poll;
mod response;
mod session;
mod session_registry;

pub use channel::{channel_from_node_name, is_subscribable_channel, node_name_from_channel};
pub use config::{BayeuxConfig, ReconnectAdvice};
pub use error::CoreError;
pub use message::{Advice, Message};
pub use poll::{PollEngine, PollRequest, PollResponse};
pub use response::{BayeuxEngine, IncomingMessage};
pub use session::Session;
pub use session_registry::{IdGenerator, SessionRegistry, UuidIdGenerator};
