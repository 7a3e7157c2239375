//! Audio device classification and routing
//!
//! The engine owns the device inventory; this module reads it, buckets every
//! device into one of six slots with a deterministic policy, derives the
//! user-facing route profiles (`phone`, `bluetooth`, `loudspeaker`), and
//! applies profile switches back onto the engine's active input/output
//! devices. Snapshots are recomputed in full on every scan, never patched.

pub mod device;
pub mod routes;

pub use device::{AudioCapabilities, AudioDeviceInfo, AudioDeviceType};
pub use routes::{AudioRouteSnapshot, AudioRouter, DeviceSlots, RouteAvailability, RouteProfile};
