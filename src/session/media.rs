//! Mute and audio-route operations for the session facade

use crate::audio::{AudioRouteSnapshot, RouteProfile};

impl super::Session {
    /// Toggle the microphone, returning the new enabled state
    pub fn toggle_mute(&self) -> bool {
        let enabled = !self.engine().mic_enabled();
        self.engine().set_mic_enabled(enabled);
        tracing::debug!(enabled, "microphone toggled");
        enabled
    }

    /// Whether the microphone is enabled
    pub fn mic_enabled(&self) -> bool {
        self.engine().mic_enabled()
    }

    /// Classify the device inventory and detect the active route
    ///
    /// Recomputed in full on every invocation; two scans over an unchanged
    /// inventory yield equal snapshots.
    pub fn scan_audio_devices(&self) -> AudioRouteSnapshot {
        self.router().scan()
    }

    /// Route audio through the bluetooth devices
    ///
    /// Returns `false` when no bluetooth device is available.
    pub fn bluetooth_audio(&self) -> bool {
        self.switch_route(RouteProfile::Bluetooth)
    }

    /// Route audio through the loudspeaker
    ///
    /// Returns `false` when no loudspeaker is available.
    pub fn loud_audio(&self) -> bool {
        self.switch_route(RouteProfile::Loudspeaker)
    }

    /// Route audio through the earpiece and microphone
    ///
    /// Returns `false` when earpiece or microphone is missing.
    pub fn phone_audio(&self) -> bool {
        self.switch_route(RouteProfile::Phone)
    }

    /// Apply `profile`, reporting unavailability as a `false` result
    fn switch_route(&self, profile: RouteProfile) -> bool {
        match self.router().switch_route(profile) {
            Ok(_) => true,
            Err(error) => {
                tracing::warn!(%profile, %error, "audio route not switched");
                false
            }
        }
    }
}
