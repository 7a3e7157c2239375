//! The session facade
//!
//! [`Session`] is the public request/response surface consumed by
//! application code: login, outbound call control, DTMF, mute, audio route
//! selection, and event subscriptions. It is stateless beyond holding the
//! engine handle and the shared bridge components; asynchronous operations
//! return immediately-pending results completed by the engine's raw event
//! stream.

mod calls;
mod media;

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::audio::AudioRouter;
use crate::call::CallStateNormalizer;
use crate::config::SessionConfig;
use crate::engine::SipEngine;
use crate::error::{BridgeError, BridgeResult};
use crate::events::{
    EventBridge, EventCallback, EventStream, SessionEvent, Subscriber, SubscriberRegistry,
    Subscription,
};
use crate::registration::{RegistrationManager, RegistrationOutcome};

/// Control surface over one engine
///
/// Created once per engine at application start via
/// [`Session::initialise`]; applications hold exactly one `Session` per
/// process. There is no explicit teardown: the session lives for the
/// process.
pub struct Session {
    engine: Arc<dyn SipEngine>,
    registration: Arc<RegistrationManager>,
    router: AudioRouter,
    subscribers: SubscriberRegistry,
    broadcast: broadcast::Sender<SessionEvent>,
    bridge_task: JoinHandle<()>,
}

impl Session {
    /// Start the engine and attach the event bridge
    ///
    /// Installs the single listener the bridge keeps for the engine's
    /// lifetime. Must be called exactly once, before any other operation;
    /// a failure to start the engine is fatal (no retry policy is defined).
    pub async fn initialise(
        engine: Arc<dyn SipEngine>,
        config: SessionConfig,
    ) -> BridgeResult<Self> {
        let raw_events = engine
            .start()
            .await
            .map_err(|error| BridgeError::engine_start(error.to_string()))?;

        let (broadcast_tx, _) = broadcast::channel(config.event_capacity);
        let subscribers: SubscriberRegistry = Arc::new(DashMap::new());
        let registration = Arc::new(RegistrationManager::new(engine.clone(), config.transport));
        let router = AudioRouter::new(engine.clone());

        let bridge = EventBridge::new(
            CallStateNormalizer::new(engine.clone()),
            registration.clone(),
            router.clone(),
            broadcast_tx.clone(),
            subscribers.clone(),
        );
        let bridge_task = tokio::spawn(bridge.run(raw_events));

        tracing::info!("session initialised");
        Ok(Self {
            engine,
            registration,
            router,
            subscribers,
            broadcast: broadcast_tx,
            bridge_task,
        })
    }

    /// Register the account for `username@domain` and await the outcome
    ///
    /// Resolves when the engine reports a terminal registration state:
    /// [`RegistrationOutcome::Registered`] on success,
    /// [`RegistrationOutcome::LoggedOut`] when the registration was cleared,
    /// or [`BridgeError::AuthenticationError`] when it failed. A second
    /// login while one is pending fails with
    /// [`BridgeError::RegistrationPending`]. There is no timeout.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
        domain: &str,
    ) -> BridgeResult<RegistrationOutcome> {
        let pending = self
            .registration
            .begin_login(username, password, domain)
            .await?;
        pending
            .await
            .map_err(|_| BridgeError::internal("login resolver dropped"))?
    }

    /// Disable registration and remove the account
    ///
    /// Returns `false` when no account is installed. This is an irreversible
    /// teardown: credentials are cleared along with the account.
    pub async fn unregister(&self) -> BridgeResult<bool> {
        self.registration.unregister().await
    }

    /// Subscribe `callback` to a set of normalized events
    ///
    /// The callback runs on the bridge task for every published event whose
    /// name is in `events`. The returned [`Subscription`] stops delivery on
    /// [`Subscription::dispose`] (or drop); double-dispose is tolerated.
    pub fn subscribe<I, F>(&self, events: I, callback: F) -> Subscription
    where
        I: IntoIterator<Item = SessionEvent>,
        F: Fn(SessionEvent) + Send + Sync + 'static,
    {
        let id = Uuid::new_v4();
        let events: HashSet<SessionEvent> = events.into_iter().collect();
        tracing::debug!(subscription = %id, count = events.len(), "subscription added");
        self.subscribers.insert(
            id,
            Subscriber {
                events,
                callback: Arc::new(callback) as EventCallback,
            },
        );
        Subscription::new(id, self.subscribers.clone())
    }

    /// A broadcast receiver of every normalized event
    pub fn events(&self) -> broadcast::Receiver<SessionEvent> {
        self.broadcast.subscribe()
    }

    /// A stream of every normalized event, for `StreamExt`-style consumers
    pub fn event_stream(&self) -> EventStream {
        EventStream::new(self.broadcast.subscribe())
    }

    /// The engine this session drives
    pub fn engine(&self) -> &Arc<dyn SipEngine> {
        &self.engine
    }

    /// The registration manager (account introspection)
    pub fn registration(&self) -> &RegistrationManager {
        &self.registration
    }

    /// Whether the bridge task is still draining engine events
    pub fn is_running(&self) -> bool {
        !self.bridge_task.is_finished()
    }

    pub(crate) fn router(&self) -> &AudioRouter {
        &self.router
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("subscriptions", &self.subscribers.len())
            .field("running", &self.is_running())
            .finish()
    }
}
