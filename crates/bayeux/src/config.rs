use std::time::Duration;

/// Advice sent back to a Bayeux client instructing how it should behave on
/// its next reconnect attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectAdvice {
    Retry,
    Handshake,
    None,
}

impl ReconnectAdvice {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Retry => "retry",
            Self::Handshake => "handshake",
            Self::None => "none",
        }
    }
}

/// Tunables for the Bayeux long-polling connector.
#[derive(Debug, Clone)]
pub struct BayeuxConfig {
    /// How long an idle session (no connect/poll activity) is kept before
    /// being dropped from the registry.
    pub session_timeout: Duration,
    /// The longest a `/meta/connect` request is parked waiting for a message
    /// before it is answered with an empty batch.
    pub long_polling_timeout: Duration,
    /// Maximum number of pending messages retained per session; older
    /// messages are dropped first once exceeded.
    pub max_messages_per_client: usize,
    /// Maximum total serialized byte size of pending messages retained per
    /// session; older messages are dropped first once exceeded.
    pub max_messages_size_per_client: usize,
    /// Advice attached to responses telling clients how to reconnect.
    pub reconnect_advice: ReconnectAdvice,
}

impl Default for BayeuxConfig {
    fn default() -> Self {
        Self {
            session_timeout: Duration::from_secs(60),
            long_polling_timeout: Duration::from_secs(20),
            max_messages_per_client: 10,
            max_messages_size_per_client: 10 * 1024,
            reconnect_advice: ReconnectAdvice::Handshake,
        }
    }
}

impl BayeuxConfig {
    #[must_use]
    pub fn with_session_timeout(mut self, timeout: Duration) -> Self {
        self.session_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_long_polling_timeout(mut self, timeout: Duration) -> Self {
        self.long_polling_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_max_messages_per_client(mut self, max: usize) -> Self {
        self.max_messages_per_client = max;
        self
    }

    #[must_use]
    pub fn with_max_messages_size_per_client(mut self, max: usize) -> Self {
        self.max_messages_size_per_client = max;
        self
    }

    #[must_use]
    pub fn with_reconnect_advice(mut self, advice: ReconnectAdvice) -> Self {
        self.reconnect_advice = advice;
        self
    }
}
