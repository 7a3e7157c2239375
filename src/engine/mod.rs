//! Engine capability interface
//!
//! The native SIP engine (signaling, media, device enumeration) is an
//! external collaborator. This module defines the platform-neutral surface
//! the session bridge is written against: a small capability trait
//! ([`SipEngine`]), the typed raw event stream it emits ([`RawEvent`]), and
//! the addressing/parameter types shared with it. Platform adapters
//! implement only this trait against the native engine; the in-repo
//! [`mock::MockEngine`] backend implements it in memory for tests.

use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::audio::AudioDeviceInfo;
use crate::call::{CallId, RawCallState};
use crate::registration::{AccountConfig, RawRegistrationState};

pub mod mock;

pub use mock::MockEngine;

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors reported by an engine adapter
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// The engine could not be started
    #[error("engine failed to start: {message}")]
    StartFailed {
        /// Adapter-supplied detail
        message: String,
    },

    /// The engine is not started yet
    #[error("engine is not started")]
    NotStarted,

    /// Account creation or re-registration failed
    #[error("account setup failed: {message}")]
    AccountSetup {
        /// Adapter-supplied detail
        message: String,
    },

    /// An outgoing call could not be set up
    #[error("call setup failed: {message}")]
    CallSetup {
        /// Adapter-supplied detail
        message: String,
    },

    /// The referenced call is not known to the engine
    #[error("call not found: {call}")]
    CallNotFound {
        /// The unknown call id
        call: CallId,
    },

    /// The referenced audio device is not in the engine inventory
    #[error("audio device not found: {device}")]
    DeviceNotFound {
        /// The unknown device id
        device: String,
    },

    /// The supplied string is not a SIP URI
    #[error("invalid SIP URI: {uri}")]
    InvalidUri {
        /// The rejected input
        uri: String,
    },
}

/// A parsed SIP address
///
/// Thin wrapper over [`rsip::Uri`] that only accepts `sip:`/`sips:` schemes.
/// Both the user-supplied remote address of an outgoing call and the
/// identity/server addresses constructed during login go through this type.
///
/// # Examples
///
/// ```rust
/// use sip_bridge_core::engine::SipUri;
///
/// let uri: SipUri = "sip:alice@example.com".parse().unwrap();
/// assert_eq!(uri.user(), Some("alice"));
/// assert!("not a uri".parse::<SipUri>().is_err());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SipUri(rsip::Uri);

impl SipUri {
    /// The user part of the address, if any
    pub fn user(&self) -> Option<&str> {
        self.0.auth.as_ref().map(|auth| auth.user.as_str())
    }

    /// The host (and port, when present) part of the address
    pub fn host(&self) -> String {
        self.0.host_with_port.to_string()
    }

    /// Access the underlying rsip URI
    pub fn as_rsip(&self) -> &rsip::Uri {
        &self.0
    }
}

impl FromStr for SipUri {
    type Err = EngineError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let invalid = || EngineError::InvalidUri {
            uri: raw.to_string(),
        };
        if raw.is_empty() || raw.contains(char::is_whitespace) {
            return Err(invalid());
        }
        let uri = rsip::Uri::try_from(raw).map_err(|_| invalid())?;
        match uri.scheme {
            Some(rsip::Scheme::Sip) | Some(rsip::Scheme::Sips) => Ok(Self(uri)),
            _ => Err(invalid()),
        }
    }
}

impl std::fmt::Display for SipUri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Transport the account's server address is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transport {
    /// Unencrypted UDP
    Udp,
    /// Unencrypted TCP
    Tcp,
    /// TLS (the default; registration always uses a secure transport)
    Tls,
}

impl std::fmt::Display for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Transport::Udp => write!(f, "UDP"),
            Transport::Tcp => write!(f, "TCP"),
            Transport::Tls => write!(f, "TLS"),
        }
    }
}

/// Media encryption requested for a call
///
/// The bridge always asks for [`MediaEncryption::None`]; the other modes
/// exist on the engine surface but are deliberately not exercised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaEncryption {
    /// No media encryption
    None,
    /// SRTP key exchange in SDP
    Srtp,
    /// ZRTP in-band key agreement
    Zrtp,
    /// DTLS-SRTP
    Dtls,
}

/// Parameters for an outgoing call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallParams {
    /// Requested media encryption mode
    pub media_encryption: MediaEncryption,
}

impl Default for CallParams {
    fn default() -> Self {
        Self {
            media_encryption: MediaEncryption::None,
        }
    }
}

/// Raw event emitted by the engine
///
/// This typed channel replaces the callback-based delivery of native engine
/// bindings. The bridge drains these strictly in arrival order.
#[derive(Debug, Clone)]
pub enum RawEvent {
    /// A call changed raw state
    CallState {
        /// The call the transition belongs to
        call: CallId,
        /// The engine-native state reached
        state: RawCallState,
        /// Engine-supplied detail message
        message: String,
    },
    /// The default account changed raw registration state
    RegistrationState {
        /// The engine-native registration state reached
        state: RawRegistrationState,
        /// Engine-supplied detail message
        message: String,
    },
    /// The audio device inventory changed
    AudioDevicesChanged,
}

/// Capability surface of a native SIP engine
///
/// Everything the session bridge needs from a platform binding. Signaling
/// operations are asynchronous and complete through the [`RawEvent`] stream;
/// device and microphone accessors are synchronous local reads/writes.
#[async_trait]
pub trait SipEngine: Send + Sync {
    /// Start the engine and hand over the raw event stream
    ///
    /// Called exactly once, by `Session::initialise`.
    async fn start(&self) -> EngineResult<mpsc::UnboundedReceiver<RawEvent>>;

    /// Install `config` as the default account and begin registration
    ///
    /// A previously installed default account is removed first; the engine
    /// holds at most one default account.
    async fn create_account(&self, config: AccountConfig) -> EngineResult<()>;

    /// Re-apply the default account's parameters with the registration flag
    /// set to `enabled`
    ///
    /// Engine account parameters are immutable snapshots; the adapter clones
    /// them, flips the flag, and applies the clone.
    async fn apply_registration(&self, enabled: bool) -> EngineResult<()>;

    /// Remove the default account and clear stored credentials
    async fn remove_account(&self) -> EngineResult<()>;

    /// Start an outgoing call to `remote`
    async fn invite(&self, remote: SipUri, params: CallParams) -> EngineResult<CallId>;

    /// Terminate `call`
    async fn terminate_call(&self, call: CallId) -> EngineResult<()>;

    /// Send one DTMF digit on `call`
    async fn send_dtmf(&self, call: CallId, digit: char) -> EngineResult<()>;

    /// The call the engine considers current, if any
    fn current_call(&self) -> Option<CallId>;

    /// Every call the engine knows about, in engine order
    fn calls(&self) -> Vec<CallId>;

    /// Enable or disable the microphone
    fn set_mic_enabled(&self, enabled: bool);

    /// Whether the microphone is enabled
    fn mic_enabled(&self) -> bool;

    /// The full audio device inventory, in engine order
    fn audio_devices(&self) -> Vec<AudioDeviceInfo>;

    /// The active input device, if any
    fn input_device(&self) -> Option<AudioDeviceInfo>;

    /// The active output device, if any
    fn output_device(&self) -> Option<AudioDeviceInfo>;

    /// Route capture to the device with id `device_id`
    fn set_input_device(&self, device_id: &str) -> EngineResult<()>;

    /// Route playback to the device with id `device_id`
    fn set_output_device(&self, device_id: &str) -> EngineResult<()>;
}
