//! `audioswitch` - Audio Switcher
//!
//! Lists audio devices and switches the default input, output and system
//! sound devices through the platform audio hardware layer.
//!
//! # Features
//! - List devices as human-readable text, comma-separated fields or JSON
//! - Select a device by id, name or uid fragment, or cycle to the next one
//! - Mute, unmute or toggle the current input and output devices
//! - Set per-device stereo volume
//! - Aggregate devices are shown with their sub-devices
//!
//! The platform is reached through the [`hal::AudioHardware`] trait. macOS
//! uses the CoreAudio backend in `coreaudio`; [`memory::MemoryHardware`]
//! is an in-process implementation used by the tests.

pub mod audio;
pub mod cli;
pub mod commands;
#[cfg(target_os = "macos")]
pub mod coreaudio;
pub mod device;
pub mod error;
pub mod hal;
pub mod memory;
pub mod output;
pub mod style;
pub mod volume;

// Re-export commonly used types for convenience
pub use audio::AudioSystem;
pub use cli::Args;
pub use device::{Device, MuteAction, Role};
pub use error::AudioError;
pub use hal::AudioHardware;
