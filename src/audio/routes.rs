//! Device classification and route switching
//!
//! Classification policy, evaluated per device in the order the engine
//! returns them (last writer wins within a slot, no deduplication):
//!
//! 1. `Microphone` -> microphone slot
//! 2. `Earpiece` -> earpiece slot
//! 3. `Speaker` -> loud speaker if it can play, else loud mic
//! 4. `Bluetooth` -> bluetooth speaker if it can play, else bluetooth mic
//! 5. anything else -> no slot
//!
//! Current-route precedence is fixed: Bluetooth beats Loudspeaker beats
//! Phone.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::audio::device::{AudioDeviceInfo, AudioDeviceType};
use crate::engine::SipEngine;
use crate::error::{BridgeError, BridgeResult};

/// A user-facing audio route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteProfile {
    /// Earpiece + microphone
    Phone,
    /// Bluetooth input and/or output
    Bluetooth,
    /// Loudspeaker output
    Loudspeaker,
}

impl std::fmt::Display for RouteProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RouteProfile::Phone => write!(f, "phone"),
            RouteProfile::Bluetooth => write!(f, "bluetooth"),
            RouteProfile::Loudspeaker => write!(f, "loudspeaker"),
        }
    }
}

/// The six classified device slots
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSlots {
    /// Bluetooth capture device
    pub bluetooth_mic: Option<AudioDeviceInfo>,
    /// Bluetooth playback device
    pub bluetooth_speaker: Option<AudioDeviceInfo>,
    /// Handset earpiece
    pub earpiece: Option<AudioDeviceInfo>,
    /// Speaker-phone capture device
    pub loud_mic: Option<AudioDeviceInfo>,
    /// Loudspeaker playback device
    pub loud_speaker: Option<AudioDeviceInfo>,
    /// Default microphone
    pub microphone: Option<AudioDeviceInfo>,
}

/// Which route profiles are currently selectable
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteAvailability {
    /// Earpiece and microphone both present
    pub phone: bool,
    /// At least one bluetooth device present
    pub bluetooth: bool,
    /// Loudspeaker present
    pub loudspeaker: bool,
}

impl RouteAvailability {
    /// Whether `profile` can be selected
    pub fn allows(&self, profile: RouteProfile) -> bool {
        match profile {
            RouteProfile::Phone => self.phone,
            RouteProfile::Bluetooth => self.bluetooth,
            RouteProfile::Loudspeaker => self.loudspeaker,
        }
    }
}

/// Full result of a device scan
///
/// Contains no timestamps or other scan-local data: scanning an unchanged
/// inventory twice yields equal snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioRouteSnapshot {
    /// The classified device slots
    pub slots: DeviceSlots,
    /// Derived availability flags
    pub options: RouteAvailability,
    /// The route currently active on the engine
    pub current: RouteProfile,
}

/// Classifies the engine's device inventory and applies route switches
#[derive(Clone)]
pub struct AudioRouter {
    engine: Arc<dyn SipEngine>,
}

impl AudioRouter {
    /// Create a router operating against `engine`
    pub fn new(engine: Arc<dyn SipEngine>) -> Self {
        Self { engine }
    }

    /// Classify the full device inventory and detect the active route
    pub fn scan(&self) -> AudioRouteSnapshot {
        let slots = classify(&self.engine.audio_devices());
        let options = RouteAvailability {
            phone: slots.earpiece.is_some() && slots.microphone.is_some(),
            bluetooth: slots.bluetooth_mic.is_some() || slots.bluetooth_speaker.is_some(),
            loudspeaker: slots.loud_speaker.is_some(),
        };
        AudioRouteSnapshot {
            slots,
            options,
            current: self.current_route(),
        }
    }

    /// Switch the active route to `profile`
    ///
    /// Fails without touching the engine when the profile is unavailable.
    /// Device assignment is applied per slot and is not atomic: a profile
    /// with only one of its devices present is applied partially. Returns
    /// the post-switch snapshot so callers observe the updated current tag.
    pub fn switch_route(&self, profile: RouteProfile) -> BridgeResult<AudioRouteSnapshot> {
        let snapshot = self.scan();
        if !snapshot.options.allows(profile) {
            return Err(BridgeError::DeviceUnavailable { profile });
        }

        let slots = &snapshot.slots;
        match profile {
            RouteProfile::Bluetooth => {
                if let Some(mic) = &slots.bluetooth_mic {
                    self.engine.set_input_device(&mic.id)?;
                }
                if let Some(speaker) = &slots.bluetooth_speaker {
                    self.engine.set_output_device(&speaker.id)?;
                }
            }
            RouteProfile::Loudspeaker => {
                // Speaker-phone mic when the hardware has one, otherwise the
                // plain microphone.
                if let Some(mic) = slots.loud_mic.as_ref().or(slots.microphone.as_ref()) {
                    self.engine.set_input_device(&mic.id)?;
                }
                if let Some(speaker) = &slots.loud_speaker {
                    self.engine.set_output_device(&speaker.id)?;
                }
            }
            RouteProfile::Phone => {
                if let Some(mic) = &slots.microphone {
                    self.engine.set_input_device(&mic.id)?;
                }
                if let Some(earpiece) = &slots.earpiece {
                    self.engine.set_output_device(&earpiece.id)?;
                }
            }
        }

        let after = self.scan();
        tracing::info!(%profile, current = %after.current, "audio route switched");
        Ok(after)
    }

    /// Detect the active route from the engine's current device assignment
    ///
    /// First match wins: bluetooth if either active device is Bluetooth,
    /// else loudspeaker if the active output is a Speaker, else phone.
    fn current_route(&self) -> RouteProfile {
        let input = self.engine.input_device();
        let output = self.engine.output_device();

        let is_bluetooth = |device: &Option<AudioDeviceInfo>| {
            device
                .as_ref()
                .map(|d| d.device_type == AudioDeviceType::Bluetooth)
                .unwrap_or(false)
        };

        if is_bluetooth(&output) || is_bluetooth(&input) {
            RouteProfile::Bluetooth
        } else if output
            .as_ref()
            .map(|d| d.device_type == AudioDeviceType::Speaker)
            .unwrap_or(false)
        {
            RouteProfile::Loudspeaker
        } else {
            RouteProfile::Phone
        }
    }
}

/// Bucket every device into its slot, in inventory order
fn classify(devices: &[AudioDeviceInfo]) -> DeviceSlots {
    let mut slots = DeviceSlots::default();
    for device in devices {
        match device.device_type {
            AudioDeviceType::Microphone => slots.microphone = Some(device.clone()),
            AudioDeviceType::Earpiece => slots.earpiece = Some(device.clone()),
            AudioDeviceType::Speaker => {
                if device.capabilities.play {
                    slots.loud_speaker = Some(device.clone());
                } else {
                    slots.loud_mic = Some(device.clone());
                }
            }
            AudioDeviceType::Bluetooth => {
                if device.capabilities.play {
                    slots.bluetooth_speaker = Some(device.clone());
                } else {
                    slots.bluetooth_mic = Some(device.clone());
                }
            }
            AudioDeviceType::Other => {
                tracing::debug!(device = %device.id, "audio device not recognised");
            }
        }
    }
    slots
}
