//! # sip-bridge-core - Session Bridge over a native SIP engine
//!
//! This crate exposes a simplified, platform-neutral control surface over a
//! native SIP/VoIP engine: account registration, outbound call control,
//! DTMF, mute, and audio-route selection. The engine itself (SIP signaling,
//! RTP media, codecs, NAT traversal, transport security) is an external
//! collaborator behind the [`engine::SipEngine`] capability trait; this
//! crate owns everything between it and application code:
//!
//! - **Call state normalization** - the engine's wide raw call-state
//!   taxonomy is reduced to a small, deterministic set of named events
//!   ([`events::SessionEvent`]), with inbound calls terminated on sight and
//!   terminal calls silenced.
//! - **Audio device routing** - the device inventory is classified into six
//!   slots with a fixed precedence policy and exposed as three user-facing
//!   route profiles (`phone`, `bluetooth`, `loudspeaker`).
//! - **Event fan-out** - one bridge task drains the engine's raw event
//!   stream in arrival order and republishes normalized events to callback
//!   subscriptions and a broadcast channel.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use sip_bridge_core::{MockEngine, Session, SessionConfig, SessionEvent};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = MockEngine::new();
//!     let session = Session::initialise(engine, SessionConfig::default()).await?;
//!
//!     let _subscription = session.subscribe(
//!         [SessionEvent::CallConnected, SessionEvent::CallReleased],
//!         |event| println!("call event: {event}"),
//!     );
//!
//!     session.login("alice", "secret", "example.com").await?;
//!     session.outgoing_call("sip:bob@example.com").await?;
//!     // ... later
//!     session.hang_up().await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

pub mod audio;
pub mod call;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod registration;
pub mod session;

// Re-export main types
pub use audio::{
    AudioCapabilities, AudioDeviceInfo, AudioDeviceType, AudioRouteSnapshot, AudioRouter,
    DeviceSlots, RouteAvailability, RouteProfile,
};
pub use call::{CallId, CallStateNormalizer, RawCallState};
pub use config::SessionConfig;
pub use engine::{
    CallParams, EngineError, MediaEncryption, MockEngine, RawEvent, SipEngine, SipUri, Transport,
};
pub use error::{BridgeError, BridgeResult};
pub use events::{EventStream, SessionEvent, Subscription};
pub use registration::{
    AccountConfig, Credentials, RawRegistrationState, RegistrationManager, RegistrationOutcome,
};
pub use session::Session;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
