//! Device enumeration, classification, lookup and selection
//!
//! [`AudioSystem`] wraps an [`AudioHardware`] handle and answers every
//! device question by querying it afresh. Nothing is cached: the device list
//! read at the start of an operation is the one its lookups and cycling use.

use tracing::{debug, info, warn};

use crate::device::{Device, Role, TransportKind};
use crate::error::{AudioError, Result};
use crate::hal::{
    self, AudioHardware, ObjectId, PropertyAddress, SCOPE_INPUT, SCOPE_OUTPUT, SYSTEM_OBJECT,
    UNKNOWN_OBJECT,
};

/// Entry point for all device queries and changes
pub struct AudioSystem<H> {
    hw: H,
}

impl<H: AudioHardware> AudioSystem<H> {
    pub fn new(hw: H) -> Self {
        Self { hw }
    }

    /// The underlying property store
    pub fn hardware(&self) -> &H {
        &self.hw
    }

    // ========================================================================
    // Enumerator
    // ========================================================================

    /// All device identifiers currently attached, in platform order
    ///
    /// # Errors
    /// Returns a platform error if the size or data query fails.
    pub fn try_list_devices(&self) -> Result<Vec<ObjectId>> {
        let address = PropertyAddress::global(hal::SELECTOR_DEVICES);
        let devices = hal::read_u32_list(&self.hw, SYSTEM_OBJECT, &address)
            .map_err(|status| AudioError::read(address, SYSTEM_OBJECT, status))?;
        debug!("Enumerated {} audio devices", devices.len());
        Ok(devices)
    }

    /// Like [`Self::try_list_devices`], but a failed enumeration means no devices
    pub fn list_devices(&self) -> Vec<ObjectId> {
        self.try_list_devices().unwrap_or_else(|e| {
            warn!("Device enumeration failed: {}", e);
            Vec::new()
        })
    }

    // ========================================================================
    // Classifier
    // ========================================================================

    fn has_streams(&self, device: ObjectId, scope: u32) -> bool {
        let address = PropertyAddress::scoped(hal::SELECTOR_STREAMS, scope);
        self.hw
            .property_size(device, &address)
            .is_ok_and(|size| size > 0)
    }

    /// Whether the device has any input streams
    pub fn is_input(&self, device: ObjectId) -> bool {
        self.has_streams(device, SCOPE_INPUT)
    }

    /// Whether the device has any output streams
    pub fn is_output(&self, device: ObjectId) -> bool {
        self.has_streams(device, SCOPE_OUTPUT)
    }

    /// Intrinsic role of a device: output wins over input for duplex devices
    ///
    /// Never returns `SystemOutput`; that distinction depends on which
    /// default-device property the caller is addressing.
    pub fn classify(&self, device: ObjectId) -> Role {
        if self.is_output(device) {
            Role::Output
        } else if self.is_input(device) {
            Role::Input
        } else {
            Role::Unknown
        }
    }

    /// Whether `device` belongs in the list for `role`
    pub fn matches_role(&self, device: ObjectId, role: Role) -> bool {
        match role {
            Role::Input => self.is_input(device),
            Role::Output => self.is_output(device),
            // System sound devices are the output devices; only the
            // default-device property differs
            Role::SystemOutput => self.classify(device) == Role::Output,
            Role::All => true,
            Role::Unknown => self.classify(device) == Role::Unknown,
        }
    }

    /// Enumerated devices filtered to `role`, keeping enumeration order
    pub fn devices_for(&self, role: Role) -> Vec<ObjectId> {
        self.list_devices()
            .into_iter()
            .filter(|&device| self.matches_role(device, role))
            .collect()
    }

    // ========================================================================
    // Property accessors
    // ========================================================================

    /// Display name, or an empty string if it cannot be read
    pub fn device_name(&self, device: ObjectId) -> String {
        self.read_string_or_empty(device, hal::SELECTOR_NAME)
    }

    /// Persistent unique identifier, or an empty string if it cannot be read
    pub fn device_uid(&self, device: ObjectId) -> String {
        self.read_string_or_empty(device, hal::SELECTOR_DEVICE_UID)
    }

    fn read_string_or_empty(&self, device: ObjectId, selector: u32) -> String {
        let address = PropertyAddress::global(selector);
        self.hw.read_string(device, &address).unwrap_or_else(|status| {
            debug!("Reading {} on device {} failed: {}", address, device, status);
            String::new()
        })
    }

    pub fn transport(&self, device: ObjectId) -> TransportKind {
        let address = PropertyAddress::global(hal::SELECTOR_TRANSPORT_TYPE);
        hal::read_u32(&self.hw, device, &address)
            .map_or(TransportKind::Ordinary, TransportKind::from_raw)
    }

    /// Constituent devices of an aggregate; empty for anything else
    pub fn sub_devices(&self, device: ObjectId) -> Vec<ObjectId> {
        if self.transport(device) != TransportKind::Aggregate {
            return Vec::new();
        }
        let address = PropertyAddress::global(hal::SELECTOR_ACTIVE_SUB_DEVICES);
        hal::read_u32_list(&self.hw, device, &address).unwrap_or_else(|status| {
            warn!(
                "Reading sub-devices of aggregate {} failed: {}",
                device, status
            );
            Vec::new()
        })
    }

    /// Snapshot of a device's displayable properties
    pub fn describe(&self, device: ObjectId, role: Role) -> Device {
        let transport = self.transport(device);
        Device {
            id: device,
            name: self.device_name(device),
            uid: self.device_uid(device),
            role,
            transport,
            sub_devices: self.sub_devices(device),
        }
    }

    // ========================================================================
    // Locator
    // ========================================================================

    /// First device of `role` whose name is exactly `name`
    ///
    /// # Errors
    /// Returns `NotFound` if no device of the role has that name.
    pub fn find_by_name(&self, name: &str, role: Role) -> Result<ObjectId> {
        self.devices_for(role)
            .into_iter()
            .find(|&device| self.device_name(device) == name)
            .ok_or_else(|| AudioError::not_found(format!("named \"{name}\""), role))
    }

    /// First device of `role` whose uid contains `fragment`
    ///
    /// # Errors
    /// Returns `NotFound` if no device of the role has a matching uid.
    pub fn find_by_uid(&self, fragment: &str, role: Role) -> Result<ObjectId> {
        self.devices_for(role)
            .into_iter()
            .find(|&device| self.device_uid(device).contains(fragment))
            .ok_or_else(|| AudioError::not_found(format!("with uid \"{fragment}\""), role))
    }

    /// `id` itself, provided it is a device of `role`
    ///
    /// # Errors
    /// Returns `NotFound` if `id` is not in the role's device list.
    pub fn find_by_id(&self, id: ObjectId, role: Role) -> Result<ObjectId> {
        if self.devices_for(role).contains(&id) {
            Ok(id)
        } else {
            Err(AudioError::not_found(format!("with id {id}"), role))
        }
    }

    /// Device currently selected as the default for `role`
    ///
    /// # Errors
    /// Returns `Unsupported` for wildcard roles, a platform error if the
    /// default-device property cannot be read, and `NotFound` if no device is
    /// selected.
    pub fn find_current(&self, role: Role) -> Result<ObjectId> {
        let address = role
            .default_device_address()
            .ok_or(AudioError::Unsupported {
                operation: "Reading the current device",
                role,
            })?;
        let device = hal::read_u32(&self.hw, SYSTEM_OBJECT, &address)
            .map_err(|status| AudioError::read(address, SYSTEM_OBJECT, status))?;
        if device == UNKNOWN_OBJECT {
            return Err(AudioError::not_found("currently selected", role));
        }
        debug!("Current {} device: {}", role, device);
        Ok(device)
    }

    /// Device after `current` in the role's list, wrapping to the first
    ///
    /// A `current` that is not in the list also yields the first device.
    ///
    /// # Errors
    /// Returns `NotFound` if the role has no devices.
    pub fn find_next(&self, current: ObjectId, role: Role) -> Result<ObjectId> {
        let devices = self.devices_for(role);
        let first = *devices
            .first()
            .ok_or_else(|| AudioError::not_found("to cycle to", role))?;

        let next = devices
            .iter()
            .position(|&device| device == current)
            .and_then(|index| devices.get(index + 1))
            .copied()
            .unwrap_or(first);
        Ok(next)
    }

    // ========================================================================
    // Selector
    // ========================================================================

    /// Make `device` the default for a single concrete role
    ///
    /// # Errors
    /// Returns `Unsupported` for wildcard roles and a platform error if the
    /// write is rejected.
    pub fn set_default(&self, device: ObjectId, role: Role) -> Result<()> {
        let address = role
            .default_device_address()
            .ok_or(AudioError::Unsupported {
                operation: "Selecting a default device",
                role,
            })?;
        hal::write_u32(&self.hw, SYSTEM_OBJECT, &address, device)
            .map_err(|status| AudioError::write(address, SYSTEM_OBJECT, status))?;
        info!("Set default {} device to {}", role, device);
        Ok(())
    }

    /// Make `device` the default for every role `role` expands to
    ///
    /// Each write is attempted regardless of the others; the outcome of each
    /// is returned alongside its role.
    pub fn set_default_each(&self, device: ObjectId, role: Role) -> Vec<(Role, Result<()>)> {
        role.expand()
            .iter()
            .map(|&concrete| (concrete, self.set_default(device, concrete)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{FakeDevice, MemoryHardware};
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    /// A(output) B(input) C(output) D(duplex)
    #[fixture]
    fn system() -> AudioSystem<MemoryHardware> {
        let hw = MemoryHardware::new();
        hw.add_device(FakeDevice::output(10, "Speakers", "BuiltInSpeakerDevice"));
        hw.add_device(FakeDevice::input(20, "Microphone", "BuiltInMicrophoneDevice"));
        hw.add_device(FakeDevice::output(30, "HDMI", "AppleHDMI:0001"));
        hw.add_device(FakeDevice::duplex(40, "USB Headset", "AppleUSBAudioEngine:Headset"));
        hw.set_default(Role::Input, 20);
        hw.set_default(Role::Output, 10);
        hw.set_default(Role::SystemOutput, 10);
        AudioSystem::new(hw)
    }

    #[rstest]
    fn test_list_devices_keeps_platform_order(system: AudioSystem<MemoryHardware>) {
        assert_eq!(system.list_devices(), vec![10, 20, 30, 40]);
    }

    #[test]
    fn test_failed_enumeration_is_empty() {
        let hw = MemoryHardware::new();
        hw.remove(SYSTEM_OBJECT, &PropertyAddress::global(hal::SELECTOR_DEVICES));
        let system = AudioSystem::new(hw);

        assert!(system.try_list_devices().is_err());
        assert!(system.list_devices().is_empty());
    }

    #[rstest]
    #[case(10, Role::Output)]
    #[case(20, Role::Input)]
    #[case(40, Role::Output)]
    #[case(99, Role::Unknown)]
    fn test_classify(system: AudioSystem<MemoryHardware>, #[case] id: ObjectId, #[case] role: Role) {
        assert_eq!(system.classify(id), role);
    }

    #[rstest]
    fn test_duplex_device_is_both_input_and_output(system: AudioSystem<MemoryHardware>) {
        assert!(system.is_input(40));
        assert!(system.is_output(40));
    }

    #[rstest]
    fn test_role_filters(system: AudioSystem<MemoryHardware>) {
        assert_eq!(system.devices_for(Role::Input), vec![20, 40]);
        assert_eq!(system.devices_for(Role::Output), vec![10, 30, 40]);
        assert_eq!(system.devices_for(Role::SystemOutput), vec![10, 30, 40]);
        assert_eq!(system.devices_for(Role::All), vec![10, 20, 30, 40]);
    }

    #[rstest]
    fn test_find_by_name_respects_role(system: AudioSystem<MemoryHardware>) {
        assert_eq!(system.find_by_name("HDMI", Role::Output).unwrap(), 30);
        assert_eq!(system.find_by_name("HDMI", Role::SystemOutput).unwrap(), 30);
        assert!(matches!(
            system.find_by_name("HDMI", Role::Input),
            Err(AudioError::NotFound { .. })
        ));
    }

    #[rstest]
    fn test_find_by_name_is_exact(system: AudioSystem<MemoryHardware>) {
        assert!(system.find_by_name("Speaker", Role::Output).is_err());
        assert!(system.find_by_name("speakers", Role::Output).is_err());
    }

    #[test]
    fn test_find_by_name_returns_first_match() {
        let hw = MemoryHardware::new();
        hw.add_device(FakeDevice::output(5, "Display", "display-a"));
        hw.add_device(FakeDevice::output(6, "Display", "display-b"));
        let system = AudioSystem::new(hw);
        assert_eq!(system.find_by_name("Display", Role::Output).unwrap(), 5);
    }

    #[rstest]
    fn test_find_by_uid_substring(system: AudioSystem<MemoryHardware>) {
        assert_eq!(system.find_by_uid("HDMI", Role::Output).unwrap(), 30);
        assert_eq!(system.find_by_uid("BuiltIn", Role::Output).unwrap(), 10);
        assert_eq!(system.find_by_uid("BuiltIn", Role::Input).unwrap(), 20);
        assert!(system.find_by_uid("Bluetooth", Role::Output).is_err());
    }

    #[rstest]
    fn test_find_by_id_checks_role(system: AudioSystem<MemoryHardware>) {
        assert_eq!(system.find_by_id(20, Role::Input).unwrap(), 20);
        assert!(system.find_by_id(20, Role::Output).is_err());
        assert!(system.find_by_id(77, Role::Output).is_err());
    }

    #[test]
    fn test_lookups_on_empty_system_are_not_found() {
        let system = AudioSystem::new(MemoryHardware::new());
        for role in Role::CONCRETE {
            assert!(system.find_by_name("x", role).is_err());
            assert!(system.find_by_uid("", role).is_err());
            assert!(system.find_next(1, role).is_err());
        }
    }

    #[rstest]
    fn test_find_current_reads_role_property(system: AudioSystem<MemoryHardware>) {
        assert_eq!(system.find_current(Role::Input).unwrap(), 20);
        assert_eq!(system.find_current(Role::Output).unwrap(), 10);
        assert_eq!(system.find_current(Role::SystemOutput).unwrap(), 10);
    }

    #[rstest]
    fn test_find_current_without_selection_is_not_found(system: AudioSystem<MemoryHardware>) {
        system.hardware().set_default(Role::Output, UNKNOWN_OBJECT);
        assert!(matches!(
            system.find_current(Role::Output),
            Err(AudioError::NotFound { .. })
        ));
    }

    #[rstest]
    fn test_find_current_rejects_wildcard(system: AudioSystem<MemoryHardware>) {
        assert!(matches!(
            system.find_current(Role::All),
            Err(AudioError::Unsupported { .. })
        ));
    }

    #[rstest]
    fn test_find_next_skips_other_roles_and_wraps(system: AudioSystem<MemoryHardware>) {
        assert_eq!(system.find_next(10, Role::Output).unwrap(), 30);
        assert_eq!(system.find_next(30, Role::Output).unwrap(), 40);
        assert_eq!(system.find_next(40, Role::Output).unwrap(), 10);
        assert_eq!(system.find_next(20, Role::Input).unwrap(), 40);
        assert_eq!(system.find_next(40, Role::Input).unwrap(), 20);
    }

    #[rstest]
    fn test_find_next_from_unlisted_device_starts_over(system: AudioSystem<MemoryHardware>) {
        assert_eq!(system.find_next(20, Role::Output).unwrap(), 10);
        assert_eq!(system.find_next(999, Role::Output).unwrap(), 10);
    }

    #[rstest]
    fn test_find_next_is_a_full_cycle(system: AudioSystem<MemoryHardware>) {
        for role in Role::CONCRETE {
            let devices = system.devices_for(role);
            for &start in &devices {
                let mut visited = vec![start];
                let mut current = start;
                for _ in 1..devices.len() {
                    current = system.find_next(current, role).unwrap();
                    visited.push(current);
                }
                assert_eq!(system.find_next(current, role).unwrap(), start);
                visited.sort_unstable();
                let mut expected = devices.clone();
                expected.sort_unstable();
                assert_eq!(visited, expected);
            }
        }
    }

    #[rstest]
    fn test_set_default_is_idempotent(system: AudioSystem<MemoryHardware>) {
        system.set_default(30, Role::Output).unwrap();
        system.set_default(30, Role::Output).unwrap();
        assert_eq!(system.find_current(Role::Output).unwrap(), 30);
        // Other roles untouched
        assert_eq!(system.find_current(Role::SystemOutput).unwrap(), 10);
    }

    #[rstest]
    fn test_set_default_each_reports_every_role(system: AudioSystem<MemoryHardware>) {
        system
            .hardware()
            .fail_writes(SYSTEM_OBJECT, hal::SELECTOR_DEFAULT_INPUT_DEVICE);

        let outcomes = system.set_default_each(40, Role::All);
        let roles: Vec<Role> = outcomes.iter().map(|(role, _)| *role).collect();
        assert_eq!(roles, Role::CONCRETE.to_vec());
        assert!(outcomes[0].1.is_err());
        assert!(outcomes[1].1.is_ok());
        assert!(outcomes[2].1.is_ok());

        assert_eq!(system.find_current(Role::Input).unwrap(), 20);
        assert_eq!(system.find_current(Role::Output).unwrap(), 40);
        assert_eq!(system.find_current(Role::SystemOutput).unwrap(), 40);
    }

    #[rstest]
    fn test_describe_reads_names_and_uid(system: AudioSystem<MemoryHardware>) {
        let device = system.describe(30, Role::Output);
        assert_eq!(device.name, "HDMI");
        assert_eq!(device.uid, "AppleHDMI:0001");
        assert_eq!(device.transport, TransportKind::Ordinary);
        assert!(device.sub_devices.is_empty());
    }

    #[rstest]
    fn test_unreadable_name_is_empty(system: AudioSystem<MemoryHardware>) {
        assert_eq!(system.device_name(UNKNOWN_OBJECT), "");
        assert_eq!(system.device_uid(12345), "");
    }

    #[rstest]
    fn test_aggregate_sub_devices(system: AudioSystem<MemoryHardware>) {
        system.hardware().make_aggregate(40, &[10, 20]);
        let device = system.describe(40, Role::Output);
        assert_eq!(device.transport, TransportKind::Aggregate);
        assert_eq!(device.sub_devices, vec![10, 20]);
    }
}
