//! Call identifiers, raw call states, and the call-state normalizer
//!
//! The engine reports calls through a wide, platform-native state taxonomy
//! ([`RawCallState`]). Application code only ever sees the reduced event set
//! of [`crate::events::SessionEvent`]. The mapping between the two is a
//! strict table: each raw transition produces at most one normalized event,
//! unmapped states produce none, and nothing is emitted for a call after it
//! reached a terminal state.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::engine::SipEngine;
use crate::events::SessionEvent;

/// Unique identifier for a call
pub type CallId = uuid::Uuid;

/// Engine-native call state
///
/// Mirrors the taxonomy a native SIP engine reports. Only a subset is
/// meaningful to the bridge; the rest is deliberately ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RawCallState {
    /// No activity on the call yet
    Idle,
    /// An inbound call invitation arrived
    IncomingReceived,
    /// An inbound call invitation arrived through a push notification
    PushIncomingReceived,
    /// Inbound call with early media
    IncomingEarlyMedia,
    /// First state of an outbound call
    OutgoingInit,
    /// The invitation is in progress
    OutgoingProgress,
    /// The remote party started ringing (180-equivalent)
    OutgoingRinging,
    /// Outbound call with early media
    OutgoingEarlyMedia,
    /// Signaling completed
    Connected,
    /// Media is flowing; reachable multiple times across pause/resume and
    /// renegotiation
    StreamsRunning,
    /// A local pause is being negotiated
    Pausing,
    /// The call is paused locally
    Paused,
    /// A resume is being negotiated
    Resuming,
    /// The call was paused by the remote party
    PausedByRemote,
    /// A local renegotiation is in flight
    Updating,
    /// A remote renegotiation is in flight
    UpdatedByRemote,
    /// A local early-dialog renegotiation is in flight
    EarlyUpdating,
    /// A remote early-dialog renegotiation is in flight
    EarlyUpdatedByRemote,
    /// The call is being transferred
    Referred,
    /// The call is ending
    End,
    /// The call object was released; terminal
    Released,
    /// The call failed; terminal, distinct from `Released`
    Error,
}

impl RawCallState {
    /// The normalized event this raw state maps to, if any
    ///
    /// States outside the mapping table return `None` and are explicitly
    /// ignored. `IncomingReceived` also returns `None`: inbound calls never
    /// reach the public state machine (the normalizer terminates them).
    pub fn normalized(&self) -> Option<SessionEvent> {
        match self {
            RawCallState::OutgoingInit => Some(SessionEvent::ConnectionRequested),
            RawCallState::OutgoingProgress => Some(SessionEvent::CallRequested),
            RawCallState::OutgoingRinging => Some(SessionEvent::CallRinging),
            RawCallState::Connected => Some(SessionEvent::CallConnected),
            RawCallState::StreamsRunning => Some(SessionEvent::CallStreamsRunning),
            RawCallState::Paused => Some(SessionEvent::CallPaused),
            RawCallState::PausedByRemote => Some(SessionEvent::CallPausedByRemote),
            RawCallState::Updating => Some(SessionEvent::CallUpdating),
            RawCallState::UpdatedByRemote => Some(SessionEvent::CallUpdatedByRemote),
            RawCallState::Released => Some(SessionEvent::CallReleased),
            RawCallState::Error => Some(SessionEvent::CallError),
            _ => None,
        }
    }

    /// Whether this raw state is terminal
    ///
    /// No transition is defined out of a terminal state; the call object is
    /// no longer addressable afterwards.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RawCallState::Released | RawCallState::Error)
    }
}

/// Per-call bookkeeping kept by the normalizer
#[derive(Debug, Clone)]
struct CallTrack {
    first_seen: DateTime<Utc>,
    terminal: bool,
}

/// Maps raw call-state transitions to normalized events
///
/// One instance lives inside the event bridge and is only ever invoked from
/// the serialized callback-processing task, so per-call event order follows
/// engine arrival order. The normalizer owns the auto-terminate side effect
/// for inbound calls and the terminal-state suppression for released/failed
/// calls.
pub struct CallStateNormalizer {
    engine: Arc<dyn SipEngine>,
    tracks: DashMap<CallId, CallTrack>,
}

impl CallStateNormalizer {
    /// Create a normalizer operating against `engine`
    pub fn new(engine: Arc<dyn SipEngine>) -> Self {
        Self {
            engine,
            tracks: DashMap::new(),
        }
    }

    /// Process one raw transition for `call`, returning the event to publish
    ///
    /// Inbound invitations are terminated immediately and produce nothing.
    /// Transitions after `Released`/`Error` are dropped.
    pub(crate) async fn apply(
        &self,
        call: CallId,
        state: RawCallState,
        message: &str,
    ) -> Option<SessionEvent> {
        {
            let track = self.tracks.entry(call).or_insert_with(|| CallTrack {
                first_seen: Utc::now(),
                terminal: false,
            });
            if track.terminal {
                tracing::debug!(%call, ?state, "dropping transition for terminated call");
                return None;
            }
        }

        if state == RawCallState::IncomingReceived {
            // Inbound calls are not supported; hang up before anything else
            // can happen on the call.
            tracing::info!(%call, "terminating unsolicited inbound call");
            if let Err(error) = self.engine.terminate_call(call).await {
                tracing::warn!(%call, %error, "failed to terminate inbound call");
            }
            return None;
        }

        let event = state.normalized();

        if state.is_terminal() {
            if let Some(mut track) = self.tracks.get_mut(&call) {
                track.terminal = true;
                let lifetime = Utc::now().signed_duration_since(track.first_seen);
                tracing::info!(
                    %call,
                    ?state,
                    message,
                    lifetime_ms = lifetime.num_milliseconds(),
                    "call reached terminal state"
                );
            }
        } else if let Some(event) = event {
            tracing::debug!(%call, ?state, %event, "call state changed");
        }

        event
    }

    /// Whether `call` has reached a terminal state
    pub fn is_terminated(&self, call: &CallId) -> bool {
        self.tracks
            .get(call)
            .map(|track| track.terminal)
            .unwrap_or(false)
    }
}
