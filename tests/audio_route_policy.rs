//! Device classification, route precedence, and switching policy

use std::time::Duration;

use tokio::time::timeout;

use sip_bridge_core::{
    AudioCapabilities, AudioDeviceInfo, AudioDeviceType, AudioRouter, MockEngine, RouteProfile,
    Session, SessionConfig, SessionEvent, SipEngine,
};

fn mic(id: &str) -> AudioDeviceInfo {
    AudioDeviceInfo::new(id, id, AudioDeviceType::Microphone, AudioCapabilities::record())
}

fn earpiece(id: &str) -> AudioDeviceInfo {
    AudioDeviceInfo::new(id, id, AudioDeviceType::Earpiece, AudioCapabilities::play())
}

fn speaker(id: &str, play: bool) -> AudioDeviceInfo {
    let caps = if play {
        AudioCapabilities::play()
    } else {
        AudioCapabilities::record()
    };
    AudioDeviceInfo::new(id, id, AudioDeviceType::Speaker, caps)
}

fn bluetooth(id: &str, play: bool) -> AudioDeviceInfo {
    let caps = if play {
        AudioCapabilities::play()
    } else {
        AudioCapabilities::record()
    };
    AudioDeviceInfo::new(id, id, AudioDeviceType::Bluetooth, caps)
}

#[test]
fn classification_grid_and_derived_availability() {
    let engine = MockEngine::new();
    engine.set_devices_silently(vec![
        speaker("loud", true),
        speaker("loud-mic", false),
        bluetooth("bt-spk", true),
        mic("mic"),
    ]);

    let snapshot = AudioRouter::new(engine).scan();

    let id = |d: &Option<AudioDeviceInfo>| d.as_ref().map(|d| d.id.clone());
    assert_eq!(id(&snapshot.slots.loud_speaker).as_deref(), Some("loud"));
    assert_eq!(id(&snapshot.slots.loud_mic).as_deref(), Some("loud-mic"));
    assert_eq!(id(&snapshot.slots.bluetooth_speaker).as_deref(), Some("bt-spk"));
    assert_eq!(id(&snapshot.slots.microphone).as_deref(), Some("mic"));
    assert_eq!(snapshot.slots.earpiece, None);
    assert_eq!(snapshot.slots.bluetooth_mic, None);

    // No earpiece: the phone profile is unavailable.
    assert!(!snapshot.options.phone);
    assert!(snapshot.options.loudspeaker);
    assert!(snapshot.options.bluetooth);
}

#[test]
fn repeated_scans_of_an_unchanged_inventory_are_identical() {
    let engine = MockEngine::new();
    engine.set_devices_silently(vec![
        mic("mic"),
        earpiece("ear"),
        speaker("loud", true),
        bluetooth("bt", true),
    ]);
    engine.set_active_devices(Some("mic"), Some("ear"));

    let router = AudioRouter::new(engine);
    let first = router.scan();
    let second = router.scan();
    assert_eq!(first, second);

    // Including their serialized forms.
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn bluetooth_wins_over_loudspeaker_and_phone() {
    let engine = MockEngine::new();
    engine.set_devices_silently(vec![
        mic("mic"),
        earpiece("ear"),
        speaker("loud", true),
        bluetooth("bt", true),
    ]);

    // Bluetooth output, phone-type input: bluetooth still wins.
    engine.set_active_devices(Some("mic"), Some("bt"));
    let router = AudioRouter::new(engine.clone());
    assert_eq!(router.scan().current, RouteProfile::Bluetooth);

    // Bluetooth on the input side alone is also enough.
    engine.set_devices_silently(vec![
        mic("mic"),
        earpiece("ear"),
        speaker("loud", true),
        bluetooth("bt-mic", false),
    ]);
    engine.set_active_devices(Some("bt-mic"), Some("ear"));
    assert_eq!(router.scan().current, RouteProfile::Bluetooth);

    // No bluetooth active, speaker output: loudspeaker.
    engine.set_active_devices(Some("mic"), Some("loud"));
    assert_eq!(router.scan().current, RouteProfile::Loudspeaker);

    // Otherwise: phone.
    engine.set_active_devices(Some("mic"), Some("ear"));
    assert_eq!(router.scan().current, RouteProfile::Phone);

    // Default when nothing is assigned yet: phone.
    engine.set_active_devices(None, None);
    assert_eq!(router.scan().current, RouteProfile::Phone);
}

#[test]
fn switching_an_unavailable_profile_mutates_nothing() {
    let engine = MockEngine::new();
    engine.set_devices_silently(vec![mic("mic"), earpiece("ear")]);
    engine.set_active_devices(Some("mic"), Some("ear"));

    let router = AudioRouter::new(engine.clone());
    assert!(router.switch_route(RouteProfile::Loudspeaker).is_err());

    assert_eq!(engine.input_device().map(|d| d.id), Some("mic".to_string()));
    assert_eq!(engine.output_device().map(|d| d.id), Some("ear".to_string()));
}

#[test]
fn bluetooth_switch_applies_partially() {
    // Only a bluetooth speaker: input is left alone, output moves.
    let engine = MockEngine::new();
    engine.set_devices_silently(vec![mic("mic"), earpiece("ear"), bluetooth("bt-spk", true)]);
    engine.set_active_devices(Some("mic"), Some("ear"));

    let router = AudioRouter::new(engine.clone());
    let snapshot = router
        .switch_route(RouteProfile::Bluetooth)
        .expect("bluetooth is available");

    assert_eq!(engine.input_device().map(|d| d.id), Some("mic".to_string()));
    assert_eq!(
        engine.output_device().map(|d| d.id),
        Some("bt-spk".to_string())
    );
    assert_eq!(snapshot.current, RouteProfile::Bluetooth);
}

#[test]
fn loudspeaker_switch_falls_back_to_the_plain_microphone() {
    let engine = MockEngine::new();
    engine.set_devices_silently(vec![mic("mic"), earpiece("ear"), speaker("loud", true)]);
    engine.set_active_devices(Some("mic"), Some("ear"));

    let router = AudioRouter::new(engine.clone());
    let snapshot = router
        .switch_route(RouteProfile::Loudspeaker)
        .expect("loudspeaker is available");

    // No speaker-phone mic in the inventory: the generic microphone stays.
    assert_eq!(engine.input_device().map(|d| d.id), Some("mic".to_string()));
    assert_eq!(engine.output_device().map(|d| d.id), Some("loud".to_string()));
    assert_eq!(snapshot.current, RouteProfile::Loudspeaker);
}

#[test]
fn phone_switch_restores_earpiece_and_microphone() {
    let engine = MockEngine::new();
    engine.set_devices_silently(vec![mic("mic"), earpiece("ear"), speaker("loud", true)]);
    engine.set_active_devices(Some("mic"), Some("loud"));

    let router = AudioRouter::new(engine.clone());
    let snapshot = router
        .switch_route(RouteProfile::Phone)
        .expect("phone is available");

    assert_eq!(engine.input_device().map(|d| d.id), Some("mic".to_string()));
    assert_eq!(engine.output_device().map(|d| d.id), Some("ear".to_string()));
    assert_eq!(snapshot.current, RouteProfile::Phone);
}

#[tokio::test]
async fn facade_route_methods_report_availability_as_bool() {
    let engine = MockEngine::new();
    let session = Session::initialise(engine.clone(), SessionConfig::default())
        .await
        .expect("session should initialise");

    engine.set_devices_silently(vec![mic("mic"), earpiece("ear")]);
    engine.set_active_devices(Some("mic"), Some("ear"));

    assert!(!session.bluetooth_audio());
    assert!(!session.loud_audio());
    assert!(session.phone_audio());

    let snapshot = session.scan_audio_devices();
    assert_eq!(snapshot.current, RouteProfile::Phone);
    assert!(snapshot.options.phone);
    assert!(!snapshot.options.bluetooth);
}

#[tokio::test]
async fn device_list_changes_publish_audio_devices_changed() {
    let engine = MockEngine::new();
    let session = Session::initialise(engine.clone(), SessionConfig::default())
        .await
        .expect("session should initialise");
    let mut events = session.events();

    engine.set_devices(vec![mic("mic"), bluetooth("bt", true)]);

    let event = timeout(Duration::from_secs(1), events.recv())
        .await
        .expect("expected an event")
        .expect("event channel closed");
    assert_eq!(event, SessionEvent::AudioDevicesChanged);
}
