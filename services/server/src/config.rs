use std::env;
use std::time::Duration;

use bayeux::{BayeuxConfig, ReconnectAdvice};
use pubsub_core::PubsubConfig;

/// Process-wide configuration, loaded from environment variables with
/// defaults matching the pub/sub and Bayeux configuration defaults.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub pubsub: PubsubConfig,
    pub bayeux: BayeuxConfig,
}

impl ServerConfig {
    #[must_use]
    pub fn from_env() -> Self {
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_owned());

        let mut pubsub = PubsubConfig::default();
        if let Some(secs) = env_u64("NODE_TIMEOUT_SECS") {
            pubsub.node_timeout = Duration::from_secs(secs);
        }
        if let Some(ratio) = env_u32("MAX_UPDATE_HISTORY_RATIO") {
            pubsub.max_update_history_ratio = ratio;
        }
        if let Some(flag) = env_bool("AUTHORIZATION_REQUIRED") {
            pubsub.authorization_required = flag;
        }

        let mut bayeux = BayeuxConfig::default();
        if let Some(secs) = env_u64("SESSION_TIMEOUT_SECS") {
            bayeux.session_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = env_u64("LONG_POLL_TIMEOUT_SECS") {
            bayeux.long_polling_timeout = Duration::from_secs(secs);
        }
        if let Some(count) = env_u64("MAX_MESSAGES_PER_CLIENT") {
            bayeux.max_messages_per_client = count as usize;
        }
        if let Some(bytes) = env_u64("MAX_MESSAGE_BYTES_PER_CLIENT") {
            bayeux.max_messages_size_per_client = bytes as usize;
        }
        if let Some(advice) = env::var("RECONNECT_ADVICE").ok().and_then(|raw| parse_reconnect_advice(&raw)) {
            bayeux.reconnect_advice = advice;
        }

        Self { bind_addr, pubsub, bayeux }
    }
}

fn env_u64(key: &str) -> Option<u64> {
    env::var(key).ok().and_then(|raw| raw.parse().ok())
}

fn env_u32(key: &str) -> Option<u32> {
    env::var(key).ok().and_then(|raw| raw.parse().ok())
}

fn env_bool(key: &str) -> Option<bool> {
    env::var(key).ok().and_then(|raw| match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    })
}

fn parse_reconnect_advice(raw: &str) -> Option<ReconnectAdvice> {
    match raw.to_ascii_lowercase().as_str() {
        "retry" => Some(ReconnectAdvice::Retry),
        "handshake" => Some(ReconnectAdvice::Handshake),
        "none" => Some(ReconnectAdvice::None),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values_when_unset() {
        // SAFETY-free in tests: no shared mutable process env is read
        // concurrently with this assertion; rely on defaults already
        // matching PubsubConfig/BayeuxConfig::default().
        let config = ServerConfig { bind_addr: "0.0.0.0:8080".to_owned(), pubsub: PubsubConfig::default(), bayeux: BayeuxConfig::default() };
        assert_eq!(config.bayeux.session_timeout, Duration::from_secs(60));
        assert_eq!(config.pubsub.node_timeout, Duration::from_secs(60));
    }

    #[test]
    fn parses_reconnect_advice_case_insensitively() {
        assert!(matches!(parse_reconnect_advice("Handshake"), Some(ReconnectAdvice::Handshake)));
        assert!(matches!(parse_reconnect_advice("RETRY"), Some(ReconnectAdvice::Retry)));
        assert!(parse_reconnect_advice("bogus").is_none());
    }

    #[test]
    fn parses_bool_env_values() {
        assert_eq!(env_bool_from("true"), Some(true));
        assert_eq!(env_bool_from("0"), Some(false));
        assert_eq!(env_bool_from("nah"), None);
    }

    fn env_bool_from(raw: &str) -> Option<bool> {
        match raw.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => Some(true),
            "0" | "false" | "no" => Some(false),
            _ => None,
        }
    }
}
