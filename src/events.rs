//! Normalized events and the event bridge
//!
//! The bridge is the single fan-out point between the engine's raw event
//! stream and application code. It drains raw events strictly one at a time
//! in arrival order (this is the serialization point for all bridge state),
//! dispatches them to the call-state normalizer, the registration manager,
//! and the audio router, then publishes any resulting [`SessionEvent`] to
//! every active subscription and to a broadcast channel for stream-style
//! consumers.

use std::collections::HashSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};
use uuid::Uuid;

use crate::audio::AudioRouter;
use crate::call::CallStateNormalizer;
use crate::engine::RawEvent;
use crate::registration::RegistrationManager;

/// Normalized event delivered to application code
///
/// Events carry no payload beyond their name. Per-call ordering follows the
/// order the engine reported the underlying transitions; there is no
/// cross-call ordering guarantee.
///
/// # Examples
///
/// ```rust
/// use sip_bridge_core::events::SessionEvent;
///
/// assert_eq!(SessionEvent::CallRinging.name(), "CallRinging");
/// assert_eq!(SessionEvent::ALL.len(), 12);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionEvent {
    /// First transition of an outbound call
    ConnectionRequested,
    /// The invitation is in progress
    CallRequested,
    /// The remote party started ringing (180-equivalent)
    CallRinging,
    /// Signaling completed
    CallConnected,
    /// Media is active; may recur after pause/resume or renegotiation
    CallStreamsRunning,
    /// The call was paused locally
    CallPaused,
    /// The call was paused by the remote party
    CallPausedByRemote,
    /// A local renegotiation is in flight
    CallUpdating,
    /// A remote renegotiation is in flight
    CallUpdatedByRemote,
    /// The call ended and its object was released; terminal
    CallReleased,
    /// The call failed; terminal
    CallError,
    /// The audio device inventory changed
    AudioDevicesChanged,
}

impl SessionEvent {
    /// Every normalized event, in declaration order
    pub const ALL: [SessionEvent; 12] = [
        SessionEvent::ConnectionRequested,
        SessionEvent::CallRequested,
        SessionEvent::CallRinging,
        SessionEvent::CallConnected,
        SessionEvent::CallStreamsRunning,
        SessionEvent::CallPaused,
        SessionEvent::CallPausedByRemote,
        SessionEvent::CallUpdating,
        SessionEvent::CallUpdatedByRemote,
        SessionEvent::CallReleased,
        SessionEvent::CallError,
        SessionEvent::AudioDevicesChanged,
    ];

    /// The event's wire name
    pub fn name(&self) -> &'static str {
        match self {
            SessionEvent::ConnectionRequested => "ConnectionRequested",
            SessionEvent::CallRequested => "CallRequested",
            SessionEvent::CallRinging => "CallRinging",
            SessionEvent::CallConnected => "CallConnected",
            SessionEvent::CallStreamsRunning => "CallStreamsRunning",
            SessionEvent::CallPaused => "CallPaused",
            SessionEvent::CallPausedByRemote => "CallPausedByRemote",
            SessionEvent::CallUpdating => "CallUpdating",
            SessionEvent::CallUpdatedByRemote => "CallUpdatedByRemote",
            SessionEvent::CallReleased => "CallReleased",
            SessionEvent::CallError => "CallError",
            SessionEvent::AudioDevicesChanged => "AudioDevicesChanged",
        }
    }
}

impl std::fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Stream of normalized events, for `StreamExt`-style consumers
pub type EventStream = tokio_stream::wrappers::BroadcastStream<SessionEvent>;

/// Callback invoked for each delivered event
pub type EventCallback = Arc<dyn Fn(SessionEvent) + Send + Sync>;

/// One registered consumer: the event names it wants and its callback
pub(crate) struct Subscriber {
    pub(crate) events: HashSet<SessionEvent>,
    pub(crate) callback: EventCallback,
}

/// Registry shared between the bridge task and subscription handles
pub(crate) type SubscriberRegistry = Arc<DashMap<Uuid, Subscriber>>;

/// Handle to an active event subscription
///
/// Created by `Session::subscribe`. Delivery stops as soon as
/// [`Subscription::dispose`] runs (or the handle is dropped); disposing twice
/// is tolerated and does nothing the second time.
pub struct Subscription {
    id: Uuid,
    registry: SubscriberRegistry,
    disposed: AtomicBool,
}

impl Subscription {
    pub(crate) fn new(id: Uuid, registry: SubscriberRegistry) -> Self {
        Self {
            id,
            registry,
            disposed: AtomicBool::new(false),
        }
    }

    /// Unique identifier of this subscription
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Stop delivery to this subscription
    ///
    /// Idempotent; the second and later calls are no-ops.
    pub fn dispose(&self) {
        if !self.disposed.swap(true, Ordering::SeqCst) {
            self.registry.remove(&self.id);
            tracing::debug!(subscription = %self.id, "subscription disposed");
        }
    }

    /// Whether this subscription has been disposed
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Single consumer of the engine's raw event stream
///
/// Exactly one bridge is attached to an engine, for the engine's lifetime.
/// Processing is strictly sequential: the normalizer, registration manager,
/// and audio router are never invoked concurrently for the same session.
pub(crate) struct EventBridge {
    normalizer: CallStateNormalizer,
    registration: Arc<RegistrationManager>,
    router: AudioRouter,
    broadcast: broadcast::Sender<SessionEvent>,
    subscribers: SubscriberRegistry,
}

impl EventBridge {
    pub(crate) fn new(
        normalizer: CallStateNormalizer,
        registration: Arc<RegistrationManager>,
        router: AudioRouter,
        broadcast: broadcast::Sender<SessionEvent>,
        subscribers: SubscriberRegistry,
    ) -> Self {
        Self {
            normalizer,
            registration,
            router,
            broadcast,
            subscribers,
        }
    }

    /// Drain the raw event stream until the engine drops its sender
    pub(crate) async fn run(self, mut raw_events: mpsc::UnboundedReceiver<RawEvent>) {
        while let Some(event) = raw_events.recv().await {
            self.process(event).await;
        }
        tracing::debug!("raw event stream closed, bridge task exiting");
    }

    async fn process(&self, event: RawEvent) {
        match event {
            RawEvent::CallState {
                call,
                state,
                message,
            } => {
                if let Some(event) = self.normalizer.apply(call, state, &message).await {
                    self.publish(event);
                }
            }
            RawEvent::RegistrationState { state, message } => {
                self.registration.resolve(state, &message);
            }
            RawEvent::AudioDevicesChanged => {
                // Full recompute on every inventory change; the snapshot is
                // never incrementally patched.
                let snapshot = self.router.scan();
                tracing::debug!(current = %snapshot.current, "audio devices changed");
                self.publish(SessionEvent::AudioDevicesChanged);
            }
        }
    }

    /// Deliver `event` to the broadcast channel and every matching callback
    ///
    /// Delivery is fire-and-forget: a panicking callback is logged and must
    /// not prevent delivery to the remaining subscribers.
    fn publish(&self, event: SessionEvent) {
        let _ = self.broadcast.send(event);

        // Snapshot the matching subscribers before invoking anything, so a
        // callback disposing subscriptions never runs under a registry lock.
        let matching: Vec<Uuid> = self
            .subscribers
            .iter()
            .filter(|entry| entry.value().events.contains(&event))
            .map(|entry| *entry.key())
            .collect();

        for id in matching {
            // A concurrent dispose wins: deliver nothing to a dead entry.
            let Some(callback) = self
                .subscribers
                .get(&id)
                .map(|entry| entry.value().callback.clone())
            else {
                continue;
            };
            if catch_unwind(AssertUnwindSafe(|| callback(event))).is_err() {
                tracing::warn!(subscription = %id, %event, "subscriber callback panicked");
            }
        }
    }
}
