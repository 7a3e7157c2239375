//! Session configuration

use serde::{Deserialize, Serialize};

use crate::engine::Transport;

/// Configuration for a [`crate::Session`]
///
/// # Examples
///
/// ```rust
/// use sip_bridge_core::SessionConfig;
///
/// let config = SessionConfig::new().with_event_capacity(128);
/// assert_eq!(config.event_capacity, 128);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Transport the account's server address is bound to during login.
    /// Defaults to TLS; registration always expects a secure transport.
    pub transport: Transport,
    /// Capacity of the broadcast channel behind `Session::events`
    pub event_capacity: usize,
}

impl SessionConfig {
    /// Create a configuration with default settings
    pub fn new() -> Self {
        Self {
            transport: Transport::Tls,
            event_capacity: 64,
        }
    }

    /// Set the transport for the account's server address
    pub fn with_transport(mut self, transport: Transport) -> Self {
        self.transport = transport;
        self
    }

    /// Set the broadcast channel capacity
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new()
    }
}
