//! In-memory engine backend
//!
//! Implements [`SipEngine`] without any native engine, for tests and
//! simulation. State lives in a single mutex; tests drive the bridge by
//! injecting [`RawEvent`]s through [`MockEngine::push`] and inspect the
//! commands the bridge issued through the accessor methods.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::audio::AudioDeviceInfo;
use crate::call::{CallId, RawCallState};
use crate::engine::{CallParams, EngineError, EngineResult, RawEvent, SipEngine, SipUri};
use crate::registration::{AccountConfig, RawRegistrationState};

#[derive(Default)]
struct MockState {
    started: bool,
    events: Option<mpsc::UnboundedSender<RawEvent>>,
    account: Option<AccountConfig>,
    register_enabled: bool,
    calls: Vec<CallId>,
    current_call: Option<CallId>,
    terminated: Vec<CallId>,
    invites: Vec<(SipUri, CallParams)>,
    dtmf: Vec<(CallId, char)>,
    mic_enabled: bool,
    devices: Vec<AudioDeviceInfo>,
    input_device: Option<AudioDeviceInfo>,
    output_device: Option<AudioDeviceInfo>,
}

/// In-memory [`SipEngine`] implementation
pub struct MockEngine {
    state: Mutex<MockState>,
}

impl MockEngine {
    /// Create a stopped mock engine with an empty inventory
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(MockState {
                mic_enabled: true,
                ..MockState::default()
            }),
        })
    }

    /// Inject a raw event into the bridge, as the native engine would
    ///
    /// Panics when the engine was not started; tests must initialise the
    /// session first.
    pub fn push(&self, event: RawEvent) {
        let state = self.state.lock();
        let sender = state
            .events
            .as_ref()
            .expect("MockEngine::push before start()");
        sender.send(event).expect("bridge task dropped the receiver");
    }

    /// Inject a raw call-state transition
    pub fn push_call_state(&self, call: CallId, raw: RawCallState, message: &str) {
        self.push(RawEvent::CallState {
            call,
            state: raw,
            message: message.to_string(),
        });
    }

    /// Inject a raw registration transition
    pub fn push_registration_state(&self, raw: RawRegistrationState, message: &str) {
        self.push(RawEvent::RegistrationState {
            state: raw,
            message: message.to_string(),
        });
    }

    /// Replace the device inventory and notify the bridge
    pub fn set_devices(&self, devices: Vec<AudioDeviceInfo>) {
        {
            let mut state = self.state.lock();
            state.devices = devices;
        }
        let notify = self.state.lock().events.clone();
        if let Some(sender) = notify {
            let _ = sender.send(RawEvent::AudioDevicesChanged);
        }
    }

    /// Replace the device inventory without notifying the bridge
    pub fn set_devices_silently(&self, devices: Vec<AudioDeviceInfo>) {
        self.state.lock().devices = devices;
    }

    /// Pre-seed the active input/output devices by id
    pub fn set_active_devices(&self, input: Option<&str>, output: Option<&str>) {
        let mut state = self.state.lock();
        let find = |id: Option<&str>, devices: &[AudioDeviceInfo]| {
            id.and_then(|id| devices.iter().find(|d| d.id == id).cloned())
        };
        state.input_device = find(input, &state.devices);
        state.output_device = find(output, &state.devices);
    }

    /// Add a call to the engine's call list
    pub fn add_call(&self, call: CallId, current: bool) {
        let mut state = self.state.lock();
        state.calls.push(call);
        if current {
            state.current_call = Some(call);
        }
    }

    /// Calls the bridge asked the engine to terminate, in order
    pub fn terminated(&self) -> Vec<CallId> {
        self.state.lock().terminated.clone()
    }

    /// Remote addresses the bridge asked the engine to invite
    pub fn invites(&self) -> Vec<(SipUri, CallParams)> {
        self.state.lock().invites.clone()
    }

    /// DTMF digits sent, in order
    pub fn dtmf_sent(&self) -> Vec<(CallId, char)> {
        self.state.lock().dtmf.clone()
    }

    /// The installed default account, if any
    pub fn account(&self) -> Option<AccountConfig> {
        self.state.lock().account.clone()
    }

    /// Whether the default account has registration enabled
    pub fn register_enabled(&self) -> bool {
        self.state.lock().register_enabled
    }
}

#[async_trait]
impl SipEngine for MockEngine {
    async fn start(&self) -> EngineResult<mpsc::UnboundedReceiver<RawEvent>> {
        let mut state = self.state.lock();
        if state.started {
            return Err(EngineError::StartFailed {
                message: "engine already started".to_string(),
            });
        }
        let (tx, rx) = mpsc::unbounded_channel();
        state.started = true;
        state.events = Some(tx);
        Ok(rx)
    }

    async fn create_account(&self, config: AccountConfig) -> EngineResult<()> {
        let mut state = self.state.lock();
        if !state.started {
            return Err(EngineError::NotStarted);
        }
        // At most one default account; installing a new one replaces it.
        state.register_enabled = config.register;
        state.account = Some(config);
        Ok(())
    }

    async fn apply_registration(&self, enabled: bool) -> EngineResult<()> {
        let mut state = self.state.lock();
        if state.account.is_none() {
            return Err(EngineError::AccountSetup {
                message: "no default account".to_string(),
            });
        }
        state.register_enabled = enabled;
        Ok(())
    }

    async fn remove_account(&self) -> EngineResult<()> {
        let mut state = self.state.lock();
        state.account = None;
        state.register_enabled = false;
        Ok(())
    }

    async fn invite(&self, remote: SipUri, params: CallParams) -> EngineResult<CallId> {
        let mut state = self.state.lock();
        if !state.started {
            return Err(EngineError::NotStarted);
        }
        let call = CallId::new_v4();
        state.invites.push((remote, params));
        state.calls.push(call);
        state.current_call = Some(call);
        Ok(call)
    }

    async fn terminate_call(&self, call: CallId) -> EngineResult<()> {
        let mut state = self.state.lock();
        let Some(index) = state.calls.iter().position(|c| *c == call) else {
            return Err(EngineError::CallNotFound { call });
        };
        state.calls.remove(index);
        if state.current_call == Some(call) {
            state.current_call = None;
        }
        state.terminated.push(call);
        Ok(())
    }

    async fn send_dtmf(&self, call: CallId, digit: char) -> EngineResult<()> {
        let mut state = self.state.lock();
        if !state.calls.contains(&call) {
            return Err(EngineError::CallNotFound { call });
        }
        state.dtmf.push((call, digit));
        Ok(())
    }

    fn current_call(&self) -> Option<CallId> {
        self.state.lock().current_call
    }

    fn calls(&self) -> Vec<CallId> {
        self.state.lock().calls.clone()
    }

    fn set_mic_enabled(&self, enabled: bool) {
        self.state.lock().mic_enabled = enabled;
    }

    fn mic_enabled(&self) -> bool {
        self.state.lock().mic_enabled
    }

    fn audio_devices(&self) -> Vec<AudioDeviceInfo> {
        self.state.lock().devices.clone()
    }

    fn input_device(&self) -> Option<AudioDeviceInfo> {
        self.state.lock().input_device.clone()
    }

    fn output_device(&self) -> Option<AudioDeviceInfo> {
        self.state.lock().output_device.clone()
    }

    fn set_input_device(&self, device_id: &str) -> EngineResult<()> {
        let mut state = self.state.lock();
        let Some(device) = state.devices.iter().find(|d| d.id == device_id).cloned() else {
            return Err(EngineError::DeviceNotFound {
                device: device_id.to_string(),
            });
        };
        state.input_device = Some(device);
        Ok(())
    }

    fn set_output_device(&self, device_id: &str) -> EngineResult<()> {
        let mut state = self.state.lock();
        let Some(device) = state.devices.iter().find(|d| d.id == device_id).cloned() else {
            return Err(EngineError::DeviceNotFound {
                device: device_id.to_string(),
            });
        };
        state.output_device = Some(device);
        Ok(())
    }
}
