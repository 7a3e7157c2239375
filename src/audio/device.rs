//! Audio device snapshot types

use serde::{Deserialize, Serialize};

/// Hardware type of an audio device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AudioDeviceType {
    /// Built-in or external microphone
    Microphone,
    /// Handset earpiece
    Earpiece,
    /// Loudspeaker (some engines also report speaker-phone microphones under
    /// this type, without the play capability)
    Speaker,
    /// Bluetooth device, either direction
    Bluetooth,
    /// Anything the classifier does not route (headset jacks, HDMI, unknown)
    Other,
}

/// Direction capabilities of an audio device
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AudioCapabilities {
    /// The device can capture audio
    pub record: bool,
    /// The device can play audio
    pub play: bool,
}

impl AudioCapabilities {
    /// Capture-only capability set
    pub fn record() -> Self {
        Self {
            record: true,
            play: false,
        }
    }

    /// Playback-only capability set
    pub fn play() -> Self {
        Self {
            record: false,
            play: true,
        }
    }

    /// Capture and playback
    pub fn all() -> Self {
        Self {
            record: true,
            play: true,
        }
    }
}

/// Read-only snapshot of one engine audio device
///
/// Devices are owned by the engine; the bridge only references them by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioDeviceInfo {
    /// Engine-assigned device identifier
    pub id: String,
    /// Human-readable device name
    pub name: String,
    /// Hardware type
    pub device_type: AudioDeviceType,
    /// Direction capabilities
    pub capabilities: AudioCapabilities,
}

impl AudioDeviceInfo {
    /// Create a device snapshot
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        device_type: AudioDeviceType,
        capabilities: AudioCapabilities,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            device_type,
            capabilities,
        }
    }
}
