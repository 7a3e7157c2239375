//! Error types for the session bridge

use thiserror::Error;

use crate::audio::RouteProfile;
use crate::engine::EngineError;

/// Result type for session bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Errors surfaced by the session bridge
///
/// Every failure reaches the immediate caller through the pending operation's
/// rejection; nothing is retried internally. Unavailable audio profiles are
/// the one exception: they are reported as a `false` result by the route
/// switching operations, with [`BridgeError::DeviceUnavailable`] only used
/// internally by [`crate::audio::AudioRouter::switch_route`].
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The supplied string does not parse as a SIP address
    #[error("Invalid SIP URI: {uri}")]
    InvalidAddress {
        /// The rejected input
        uri: String,
    },

    /// A call operation was requested while no call exists
    #[error("No call to operate on")]
    NoActiveCall,

    /// The registrar rejected the registration
    #[error("Authentication error: {message}")]
    AuthenticationError {
        /// Failure detail reported by the engine
        message: String,
    },

    /// The engine could not be started; fatal, no retry policy is defined
    #[error("Engine start failure: {message}")]
    EngineStartFailure {
        /// Failure detail reported by the engine
        message: String,
    },

    /// The requested audio profile is not currently available
    #[error("Audio profile not available: {profile}")]
    DeviceUnavailable {
        /// The profile that was requested
        profile: RouteProfile,
    },

    /// A login operation is already pending for this session
    #[error("A registration is already pending")]
    RegistrationPending,

    /// Engine-level failure
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// Internal error
    #[error("Internal error: {message}")]
    Internal {
        /// Description of what went wrong
        message: String,
    },
}

impl BridgeError {
    /// Create an invalid-address error
    pub fn invalid_address(uri: impl Into<String>) -> Self {
        Self::InvalidAddress { uri: uri.into() }
    }

    /// Create an authentication error
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::AuthenticationError {
            message: message.into(),
        }
    }

    /// Create an engine-start failure
    pub fn engine_start(message: impl Into<String>) -> Self {
        Self::EngineStartFailure {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}
