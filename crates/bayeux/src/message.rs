use serde::Serialize;
use serde_json::Value;

use crate::config::{BayeuxConfig, ReconnectAdvice};

/// Reconnect advice attached to handshake, connect and failure replies.
#[derive(Debug, Clone, Serialize)]
pub struct Advice {
    pub reconnect: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

/// A single Bayeux protocol message, as sent over the wire inside a JSON
/// array. Every reply carries `channel`; the rest are populated as the
/// particular message kind requires.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub channel: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub successful: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advice: Option<Advice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supported_connection_types: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl Message {
    fn bare(channel: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            id: None,
            client_id: None,
            successful: None,
            subscription: None,
            data: None,
            error: None,
            advice: None,
            supported_connection_types: None,
            version: None,
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: Option<String>) -> Self {
        self.id = id;
        self
    }

    #[must_use]
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

fn advice_for(config: &BayeuxConfig) -> Advice {
    Advice {
        reconnect: config.reconnect_advice.as_str(),
        interval: Some(0),
        timeout: Some(config.long_polling_timeout.as_millis() as u64),
    }
}

#[must_use]
pub fn handshake_reply(client_id: &str, config: &BayeuxConfig, successful: bool, error: Option<String>) -> Message {
    let mut message = Message::bare("/meta/handshake");
    message.successful = Some(successful);
    message.version = Some("1.0".to_string());
    message.supported_connection_types = Some(vec!["long-polling".to_string()]);
    message.error = error;
    if successful {
        message.client_id = Some(client_id.to_string());
    }
    message.advice = Some(Advice {
        reconnect: if successful {
            ReconnectAdvice::Retry.as_str()
        } else {
            ReconnectAdvice::Handshake.as_str()
        },
        interval: Some(0),
        timeout: Some(config.long_polling_timeout.as_millis() as u64),
    });
    message
}

#[must_use]
pub fn connect_reply(client_id: &str, config: &BayeuxConfig, successful: bool) -> Message {
    let mut message = Message::bare("/meta/connect");
    message.successful = Some(successful);
    message.client_id = Some(client_id.to_string());
    message.advice = Some(advice_for(config));
    if !successful {
        message.error = Some("invalid clientId".to_string());
    }
    message
}

#[must_use]
pub fn disconnect_reply(client_id: &str, successful: bool) -> Message {
    let mut message = Message::bare("/meta/disconnect");
    message.successful = Some(successful);
    message.client_id = Some(client_id.to_string());
    if !successful {
        message.error = Some("invalid clientId".to_string());
    }
    message
}

#[must_use]
pub fn subscribe_reply(client_id: &str, subscription: &str, successful: bool, error: Option<String>) -> Message {
    let mut message = Message::bare("/meta/subscribe");
    message.successful = Some(successful);
    message.client_id = Some(client_id.to_string());
    message.subscription = Some(subscription.to_string());
    message.error = error;
    message
}

#[must_use]
pub fn unsubscribe_reply(client_id: &str, subscription: &str, successful: bool, error: Option<String>) -> Message {
    let mut message = Message::bare("/meta/unsubscribe");
    message.successful = Some(successful);
    message.client_id = Some(client_id.to_string());
    message.subscription = Some(subscription.to_string());
    message.error = error;
    message
}

#[must_use]
pub fn data_message(channel: &str, data: Value) -> Message {
    let mut message = Message::bare(channel);
    message.data = Some(data);
    message
}
