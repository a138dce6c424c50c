//! Volume and mute
//!
//! Volume is read and written on the device's two preferred stereo channels;
//! mute on the main element of the role's scope. Toggling mute reads the
//! flag and writes back its inverse, which is not atomic with respect to
//! other processes changing it in between.

use std::str::FromStr;
use tracing::{debug, info};

use crate::audio::AudioSystem;
use crate::device::{MuteAction, Role, Volume};
use crate::error::{AudioError, Result};
use crate::hal::{self, AudioHardware, ObjectId, PropertyAddress};

impl<H: AudioHardware> AudioSystem<H> {
    /// Element numbers of the left and right channels, in the given scope
    fn stereo_channels(&self, device: ObjectId, scope: u32) -> Option<[u32; 2]> {
        let address = PropertyAddress::scoped(hal::SELECTOR_PREFERRED_STEREO_CHANNELS, scope);
        match hal::read_u32_list(self.hardware(), device, &address) {
            Ok(channels) => match channels.as_slice() {
                &[left, right] => Some([left, right]),
                other => {
                    debug!("Device {} reports {} stereo channels", device, other.len());
                    None
                }
            },
            Err(status) => {
                debug!("No stereo channel mapping on device {}: {}", device, status);
                None
            }
        }
    }

    /// Scalar volume of the device's stereo pair
    ///
    /// Devices without a channel mapping or scalar volume report
    /// [`Volume::Unsupported`] instead of failing.
    pub fn get_volume(&self, device: ObjectId) -> Volume {
        let Some(scope) = self.classify(device).scope() else {
            return Volume::Unsupported;
        };
        let Some([left_channel, right_channel]) = self.stereo_channels(device, scope) else {
            return Volume::Unsupported;
        };

        let read = |channel| {
            let address = PropertyAddress::new(hal::SELECTOR_VOLUME_SCALAR, scope, channel);
            hal::read_f32(self.hardware(), device, &address)
        };
        match (read(left_channel), read(right_channel)) {
            (Ok(left), Ok(right)) => Volume::Stereo { left, right },
            _ => Volume::Unsupported,
        }
    }

    /// Write scalar volume to both stereo channels
    ///
    /// Both channels are attempted even if the first write fails.
    ///
    /// # Errors
    /// Returns `Unsupported` if the device has no stereo channel mapping and
    /// a platform error if either channel write is rejected.
    pub fn set_volume(&self, device: ObjectId, left: f32, right: f32) -> Result<()> {
        let role = self.classify(device);
        let unsupported = AudioError::Unsupported {
            operation: "Setting volume",
            role,
        };
        let Some(scope) = role.scope() else {
            return Err(unsupported);
        };
        let Some([left_channel, right_channel]) = self.stereo_channels(device, scope) else {
            return Err(unsupported);
        };

        let write = |channel, value| {
            let address = PropertyAddress::new(hal::SELECTOR_VOLUME_SCALAR, scope, channel);
            hal::write_f32(self.hardware(), device, &address, value)
                .map_err(|status| AudioError::write(address, device, status))
        };
        let left_result = write(left_channel, left);
        let right_result = write(right_channel, right);
        left_result?;
        right_result?;

        info!("Set volume of device {} to {:.2},{:.2}", device, left, right);
        Ok(())
    }

    fn mute_address(role: Role) -> Result<PropertyAddress> {
        match role.scope() {
            Some(scope) if role.supports_mute() => {
                Ok(PropertyAddress::scoped(hal::SELECTOR_MUTE, scope))
            }
            _ => Err(AudioError::Unsupported {
                operation: "Muting",
                role,
            }),
        }
    }

    /// Current default device for `role` and the address of its mute flag
    fn mute_target(&self, role: Role) -> Result<(ObjectId, PropertyAddress)> {
        let address = Self::mute_address(role)?;
        let device = self.find_current(role)?;
        if !self.hardware().has_property(device, &address) {
            debug!("Device {} has no mute control", device);
            return Err(AudioError::Unsupported {
                operation: "Muting",
                role,
            });
        }
        Ok((device, address))
    }

    /// Mute flag of the current default device for `role`
    ///
    /// # Errors
    /// Returns `Unsupported` for system output, wildcard roles and devices
    /// without a mute control, `NotFound` if no device is selected, and a
    /// platform error if the read fails.
    pub fn mute_state(&self, role: Role) -> Result<bool> {
        let (device, address) = self.mute_target(role)?;
        hal::read_u32(self.hardware(), device, &address)
            .map(|flag| flag != 0)
            .map_err(|status| AudioError::read(address, device, status))
    }

    /// Apply `action` to the current default device for `role`
    ///
    /// Returns the device that was changed and the mute flag written to it.
    ///
    /// # Errors
    /// Returns `Unsupported` for system output, wildcard roles and devices
    /// without a mute control, `NotFound` if no device is selected, and a
    /// platform error if the read or write fails.
    pub fn set_mute(&self, role: Role, action: MuteAction) -> Result<(ObjectId, bool)> {
        let (device, address) = self.mute_target(role)?;

        let muted = match action {
            MuteAction::Toggle => {
                let current = hal::read_u32(self.hardware(), device, &address)
                    .map_err(|status| AudioError::read(address, device, status))?;
                current == 0
            }
            other => other.apply(false),
        };

        hal::write_u32(self.hardware(), device, &address, u32::from(muted))
            .map_err(|status| AudioError::write(address, device, status))?;
        info!(
            "{} {} device {}",
            if muted { "Muted" } else { "Unmuted" },
            role,
            device
        );
        Ok((device, muted))
    }
}

// ============================================================================
// Volume spec parsing (`id=left,right[:id=left,right...]`)
// ============================================================================

/// One `id=left,right` entry
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeSetting {
    pub id: ObjectId,
    pub left: f32,
    pub right: f32,
}

fn parse_level(text: &str, entry: &str) -> Result<f32> {
    let level: f32 = text.trim().parse().map_err(|_| {
        AudioError::InvalidArgument(format!("Invalid volume level \"{text}\" in \"{entry}\""))
    })?;
    if !(0.0..=1.0).contains(&level) {
        return Err(AudioError::InvalidArgument(format!(
            "Volume level {level} in \"{entry}\" is outside 0.0-1.0"
        )));
    }
    Ok(level)
}

impl FromStr for VolumeSetting {
    type Err = AudioError;

    fn from_str(entry: &str) -> Result<Self> {
        let malformed = || {
            AudioError::InvalidArgument(format!(
                "Invalid volume setting \"{entry}\", expected id=left,right"
            ))
        };

        let (id, levels) = entry.split_once('=').ok_or_else(malformed)?;
        let (left, right) = levels.split_once(',').ok_or_else(malformed)?;
        let id = id.trim().parse().map_err(|_| malformed())?;

        Ok(Self {
            id,
            left: parse_level(left, entry)?,
            right: parse_level(right, entry)?,
        })
    }
}

/// Every entry of a `-e` argument, in the order given
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeSpec(pub Vec<VolumeSetting>);

impl FromStr for VolumeSpec {
    type Err = AudioError;

    fn from_str(spec: &str) -> Result<Self> {
        if spec.trim().is_empty() {
            return Err(AudioError::InvalidArgument(
                "Empty volume specification".to_string(),
            ));
        }
        spec.split(':')
            .map(str::parse::<VolumeSetting>)
            .collect::<Result<Vec<_>>>()
            .map(VolumeSpec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::{SCOPE_INPUT, SCOPE_OUTPUT};
    use crate::memory::{FakeDevice, MemoryHardware};
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};
    use test_case::test_case;

    #[fixture]
    fn system() -> AudioSystem<MemoryHardware> {
        let hw = MemoryHardware::new();
        hw.add_device(FakeDevice::output(10, "Speakers", "spk"));
        hw.add_device(FakeDevice::input(20, "Microphone", "mic"));
        hw.add_device(FakeDevice::output(30, "HDMI", "hdmi"));
        hw.add_stereo_volume(10, SCOPE_OUTPUT, 0.5, 0.5);
        hw.add_stereo_volume(20, SCOPE_INPUT, 0.8, 0.8);
        hw.add_mute(10, SCOPE_OUTPUT, false);
        hw.add_mute(20, SCOPE_INPUT, true);
        hw.set_default(Role::Output, 10);
        hw.set_default(Role::SystemOutput, 10);
        hw.set_default(Role::Input, 20);
        AudioSystem::new(hw)
    }

    fn assert_stereo(volume: Volume, left: f32, right: f32) {
        match volume {
            Volume::Stereo { left: l, right: r } => {
                assert!((l - left).abs() < 1e-6, "left {l} != {left}");
                assert!((r - right).abs() < 1e-6, "right {r} != {right}");
            }
            Volume::Unsupported => panic!("expected stereo volume"),
        }
    }

    #[rstest]
    fn test_get_volume_reads_both_channels(system: AudioSystem<MemoryHardware>) {
        assert_stereo(system.get_volume(10), 0.5, 0.5);
        assert_stereo(system.get_volume(20), 0.8, 0.8);
    }

    #[rstest]
    fn test_volume_round_trip(system: AudioSystem<MemoryHardware>) {
        system.set_volume(10, 0.25, 0.75).unwrap();
        assert_stereo(system.get_volume(10), 0.25, 0.75);
    }

    #[rstest]
    fn test_volume_without_channel_mapping_is_unsupported(system: AudioSystem<MemoryHardware>) {
        assert_eq!(system.get_volume(30), Volume::Unsupported);
        assert!(matches!(
            system.set_volume(30, 0.5, 0.5),
            Err(AudioError::Unsupported { .. })
        ));
    }

    #[rstest]
    fn test_set_volume_failure_is_reported(system: AudioSystem<MemoryHardware>) {
        system
            .hardware()
            .fail_writes(10, hal::SELECTOR_VOLUME_SCALAR);
        assert!(matches!(
            system.set_volume(10, 0.1, 0.1),
            Err(AudioError::Platform { .. })
        ));
        assert_stereo(system.get_volume(10), 0.5, 0.5);
    }

    #[rstest]
    fn test_toggle_twice_restores_state(system: AudioSystem<MemoryHardware>) {
        let before = system.mute_state(Role::Output).unwrap();
        assert_eq!(
            system.set_mute(Role::Output, MuteAction::Toggle).unwrap(),
            (10, true)
        );
        assert_eq!(system.mute_state(Role::Output).unwrap(), !before);
        system.set_mute(Role::Output, MuteAction::Toggle).unwrap();
        assert_eq!(system.mute_state(Role::Output).unwrap(), before);
    }

    #[rstest]
    fn test_mute_and_unmute(system: AudioSystem<MemoryHardware>) {
        assert_eq!(
            system.set_mute(Role::Input, MuteAction::Unmute).unwrap(),
            (20, false)
        );
        assert_eq!(system.hardware().mute_state(20, SCOPE_INPUT), Some(false));
        assert_eq!(
            system.set_mute(Role::Input, MuteAction::Mute).unwrap(),
            (20, true)
        );
        assert_eq!(system.hardware().mute_state(20, SCOPE_INPUT), Some(true));
    }

    #[rstest]
    #[case(Role::SystemOutput)]
    #[case(Role::All)]
    fn test_mute_unsupported_roles(system: AudioSystem<MemoryHardware>, #[case] role: Role) {
        assert!(matches!(
            system.set_mute(role, MuteAction::Mute),
            Err(AudioError::Unsupported { .. })
        ));
    }

    #[rstest]
    fn test_mute_on_device_without_mute_control(system: AudioSystem<MemoryHardware>) {
        system.hardware().set_default(Role::Output, 30);
        assert!(matches!(
            system.set_mute(Role::Output, MuteAction::Toggle),
            Err(AudioError::Unsupported { .. })
        ));
    }

    #[rstest]
    fn test_mute_without_current_device(system: AudioSystem<MemoryHardware>) {
        system.hardware().set_default(Role::Output, hal::UNKNOWN_OBJECT);
        assert!(matches!(
            system.set_mute(Role::Output, MuteAction::Toggle),
            Err(AudioError::NotFound { .. })
        ));
    }

    #[test]
    fn test_parse_volume_spec_multiple_entries() {
        let spec: VolumeSpec = "73=0.5,0.25:81=1,0".parse().unwrap();
        assert_eq!(
            spec.0,
            vec![
                VolumeSetting {
                    id: 73,
                    left: 0.5,
                    right: 0.25
                },
                VolumeSetting {
                    id: 81,
                    left: 1.0,
                    right: 0.0
                },
            ]
        );
    }

    #[test_case("" ; "empty")]
    #[test_case("73" ; "missing levels")]
    #[test_case("73=0.5" ; "missing right channel")]
    #[test_case("x=0.5,0.5" ; "non numeric id")]
    #[test_case("73=loud,0.5" ; "non numeric level")]
    #[test_case("73=1.5,0.5" ; "level above range")]
    #[test_case("73=0.5,-0.1" ; "level below range")]
    #[test_case("73=0.5,0.5:" ; "trailing separator")]
    fn test_parse_volume_spec_rejects(spec: &str) {
        assert!(matches!(
            spec.parse::<VolumeSpec>(),
            Err(AudioError::InvalidArgument(_))
        ));
    }
}
