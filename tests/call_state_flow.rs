//! End-to-end call-state normalization through the event bridge
//!
//! Drives a session over a MockEngine by injecting raw call-state
//! transitions and asserts the normalized events that reach subscribers.

use std::time::Duration;

use tokio::sync::broadcast::Receiver;
use tokio::time::{sleep, timeout};

use sip_bridge_core::{
    BridgeError, CallId, MockEngine, RawCallState, Session, SessionConfig, SessionEvent, SipEngine,
};

const SETTLE: Duration = Duration::from_millis(50);

async fn started_session() -> (std::sync::Arc<MockEngine>, Session) {
    let engine = MockEngine::new();
    let session = Session::initialise(engine.clone(), SessionConfig::default())
        .await
        .expect("session should initialise");
    (engine, session)
}

async fn next_event(rx: &mut Receiver<SessionEvent>) -> SessionEvent {
    timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("expected an event")
        .expect("event channel closed")
}

async fn assert_no_event(rx: &mut Receiver<SessionEvent>) {
    let result = timeout(Duration::from_millis(100), rx.recv()).await;
    assert!(result.is_err(), "unexpected event: {:?}", result);
}

#[tokio::test]
async fn outgoing_call_lifecycle_emits_the_mapped_sequence() {
    let (engine, session) = started_session().await;
    let mut events = session.events();

    session
        .outgoing_call("sip:bob@example.com")
        .await
        .expect("call should start");
    let call = engine.current_call().expect("engine should have a call");

    let sequence = [
        (RawCallState::OutgoingInit, SessionEvent::ConnectionRequested),
        (RawCallState::OutgoingProgress, SessionEvent::CallRequested),
        (RawCallState::OutgoingRinging, SessionEvent::CallRinging),
        (RawCallState::Connected, SessionEvent::CallConnected),
        (RawCallState::StreamsRunning, SessionEvent::CallStreamsRunning),
        (RawCallState::Paused, SessionEvent::CallPaused),
        (RawCallState::StreamsRunning, SessionEvent::CallStreamsRunning),
        (RawCallState::Released, SessionEvent::CallReleased),
    ];

    for (raw, _) in sequence {
        engine.push_call_state(call, raw, "");
    }

    for (_, expected) in sequence {
        assert_eq!(next_event(&mut events).await, expected);
    }
}

#[tokio::test]
async fn unmapped_raw_states_emit_nothing() {
    let (engine, session) = started_session().await;
    let mut events = session.events();
    let call = CallId::new_v4();

    for raw in [
        RawCallState::Idle,
        RawCallState::IncomingEarlyMedia,
        RawCallState::OutgoingEarlyMedia,
        RawCallState::Pausing,
        RawCallState::Resuming,
        RawCallState::EarlyUpdating,
        RawCallState::EarlyUpdatedByRemote,
        RawCallState::Referred,
        RawCallState::End,
    ] {
        engine.push_call_state(call, raw, "");
    }

    assert_no_event(&mut events).await;
}

#[tokio::test]
async fn incoming_call_is_terminated_before_anything_else() {
    let (engine, session) = started_session().await;
    let mut events = session.events();

    let call = CallId::new_v4();
    engine.add_call(call, false);
    engine.push_call_state(call, RawCallState::IncomingReceived, "invite");
    // What the engine reports after the bridge's terminate.
    engine.push_call_state(call, RawCallState::End, "");
    engine.push_call_state(call, RawCallState::Released, "");

    assert_eq!(next_event(&mut events).await, SessionEvent::CallReleased);
    assert_no_event(&mut events).await;

    assert_eq!(engine.terminated(), vec![call]);
}

#[tokio::test]
async fn no_events_after_a_terminal_state() {
    let (engine, session) = started_session().await;
    let mut events = session.events();

    session
        .outgoing_call("sip:bob@example.com")
        .await
        .expect("call should start");
    let call = engine.current_call().expect("engine should have a call");

    engine.push_call_state(call, RawCallState::Connected, "");
    engine.push_call_state(call, RawCallState::Error, "io error");
    assert_eq!(next_event(&mut events).await, SessionEvent::CallConnected);
    assert_eq!(next_event(&mut events).await, SessionEvent::CallError);

    // Anything after Released/Error for the same call is dropped.
    engine.push_call_state(call, RawCallState::Connected, "");
    engine.push_call_state(call, RawCallState::StreamsRunning, "");
    engine.push_call_state(call, RawCallState::Released, "");
    assert_no_event(&mut events).await;

    // A different call is unaffected.
    let other = CallId::new_v4();
    engine.push_call_state(other, RawCallState::OutgoingInit, "");
    assert_eq!(
        next_event(&mut events).await,
        SessionEvent::ConnectionRequested
    );
}

#[tokio::test]
async fn outgoing_call_rejects_malformed_uris() {
    let (engine, session) = started_session().await;

    let result = session.outgoing_call("not a sip uri").await;
    assert!(matches!(result, Err(BridgeError::InvalidAddress { .. })));

    let result = session.outgoing_call("bob@example.com").await;
    assert!(
        matches!(result, Err(BridgeError::InvalidAddress { .. })),
        "scheme-less addresses are invalid"
    );

    assert!(engine.invites().is_empty(), "engine must not be invited");
}

#[tokio::test]
async fn hang_up_without_a_call_rejects() {
    let (_engine, session) = started_session().await;
    let result = session.hang_up().await;
    assert!(matches!(result, Err(BridgeError::NoActiveCall)));
}

#[tokio::test]
async fn hang_up_prefers_the_current_call() {
    let (engine, session) = started_session().await;

    let paused = CallId::new_v4();
    let current = CallId::new_v4();
    engine.add_call(paused, false);
    engine.add_call(current, true);

    session.hang_up().await.expect("hang up should succeed");
    assert_eq!(engine.terminated(), vec![current]);
}

#[tokio::test]
async fn hang_up_falls_back_to_the_first_listed_call() {
    let (engine, session) = started_session().await;

    // A paused call is not "current" but must still be hangable.
    let paused = CallId::new_v4();
    engine.add_call(paused, false);

    session.hang_up().await.expect("hang up should succeed");
    assert_eq!(engine.terminated(), vec![paused]);
}

#[tokio::test]
async fn send_dtmf_requires_a_current_call() {
    let (engine, session) = started_session().await;

    let result = session.send_dtmf('5').await;
    assert!(matches!(result, Err(BridgeError::NoActiveCall)));

    session
        .outgoing_call("sip:bob@example.com")
        .await
        .expect("call should start");
    let call = engine.current_call().expect("engine should have a call");

    assert!(session.send_dtmf('5').await.expect("dtmf should send"));
    assert!(session.send_dtmf('#').await.expect("dtmf should send"));
    assert_eq!(engine.dtmf_sent(), vec![(call, '5'), (call, '#')]);
}

#[tokio::test]
async fn toggle_mute_flips_and_reports_the_mic_state() {
    let (_engine, session) = started_session().await;

    assert!(session.mic_enabled());
    assert!(!session.toggle_mute());
    assert!(!session.mic_enabled());
    assert!(session.toggle_mute());
    assert!(session.mic_enabled());
}

#[tokio::test]
async fn initialise_twice_on_one_engine_fails() {
    let engine = MockEngine::new();
    let _session = Session::initialise(engine.clone(), SessionConfig::default())
        .await
        .expect("first initialise should succeed");

    let second = Session::initialise(engine.clone(), SessionConfig::default()).await;
    assert!(matches!(
        second,
        Err(BridgeError::EngineStartFailure { .. })
    ));
}

#[tokio::test]
async fn bridge_task_reports_running() {
    let (_engine, session) = started_session().await;
    sleep(SETTLE).await;
    assert!(session.is_running());
}
