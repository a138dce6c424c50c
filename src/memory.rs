//! In-memory audio hardware
//!
//! A property store with the same addressing and size rules as the platform
//! service, for tests and for running the command layer without audio
//! hardware. Writes can be made to fail per (object, selector) to exercise
//! partial-failure paths.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

use crate::device::Role;
use crate::hal::{
    self, AudioHardware, ObjectId, OsStatus, PropertyAddress, SCOPE_INPUT, SCOPE_OUTPUT,
    SYSTEM_OBJECT,
};

/// Shape of a device registered with [`MemoryHardware::add_device`]
#[derive(Debug, Clone, Copy)]
pub struct FakeDevice<'a> {
    pub id: ObjectId,
    pub name: &'a str,
    pub uid: &'a str,
    pub input_streams: u32,
    pub output_streams: u32,
}

impl<'a> FakeDevice<'a> {
    #[must_use]
    pub fn output(id: ObjectId, name: &'a str, uid: &'a str) -> Self {
        Self {
            id,
            name,
            uid,
            input_streams: 0,
            output_streams: 1,
        }
    }

    #[must_use]
    pub fn input(id: ObjectId, name: &'a str, uid: &'a str) -> Self {
        Self {
            id,
            name,
            uid,
            input_streams: 1,
            output_streams: 0,
        }
    }

    /// Both input and output streams
    #[must_use]
    pub fn duplex(id: ObjectId, name: &'a str, uid: &'a str) -> Self {
        Self {
            id,
            name,
            uid,
            input_streams: 1,
            output_streams: 1,
        }
    }
}

/// Property store backed by hash maps
#[derive(Debug, Default)]
pub struct MemoryHardware {
    data: RefCell<HashMap<(ObjectId, PropertyAddress), Vec<u8>>>,
    strings: RefCell<HashMap<(ObjectId, PropertyAddress), String>>,
    failing_writes: RefCell<HashSet<(ObjectId, u32)>>,
}

fn encode_ids(ids: &[ObjectId]) -> Vec<u8> {
    ids.iter().flat_map(|id| id.to_ne_bytes()).collect()
}

impl MemoryHardware {
    /// Empty system: no devices, no defaults
    #[must_use]
    pub fn new() -> Self {
        let hw = Self::default();
        hw.set_raw(
            SYSTEM_OBJECT,
            PropertyAddress::global(hal::SELECTOR_DEVICES),
            Vec::new(),
        );
        hw
    }

    /// Set raw bytes for a property, creating it if needed
    pub fn set_raw(&self, object: ObjectId, address: PropertyAddress, bytes: Vec<u8>) {
        self.data.borrow_mut().insert((object, address), bytes);
    }

    /// Raw bytes of a property, if present
    #[must_use]
    pub fn raw(&self, object: ObjectId, address: &PropertyAddress) -> Option<Vec<u8>> {
        self.data.borrow().get(&(object, *address)).cloned()
    }

    /// Remove a property so reads of it fail
    pub fn remove(&self, object: ObjectId, address: &PropertyAddress) {
        self.data.borrow_mut().remove(&(object, *address));
        self.strings.borrow_mut().remove(&(object, *address));
    }

    pub fn set_string(&self, object: ObjectId, address: PropertyAddress, value: &str) {
        self.strings
            .borrow_mut()
            .insert((object, address), value.to_string());
    }

    /// Append a device to the hardware device list
    pub fn add_device(&self, device: FakeDevice<'_>) {
        let devices_address = PropertyAddress::global(hal::SELECTOR_DEVICES);
        let mut ids = self.raw(SYSTEM_OBJECT, &devices_address).unwrap_or_default();
        ids.extend_from_slice(&device.id.to_ne_bytes());
        self.set_raw(SYSTEM_OBJECT, devices_address, ids);

        self.set_string(
            device.id,
            PropertyAddress::global(hal::SELECTOR_NAME),
            device.name,
        );
        self.set_string(
            device.id,
            PropertyAddress::global(hal::SELECTOR_DEVICE_UID),
            device.uid,
        );
        self.set_raw(
            device.id,
            PropertyAddress::global(hal::SELECTOR_TRANSPORT_TYPE),
            hal::fourcc(b"bltn").to_ne_bytes().to_vec(),
        );

        for (scope, count) in [
            (SCOPE_INPUT, device.input_streams),
            (SCOPE_OUTPUT, device.output_streams),
        ] {
            let streams: Vec<ObjectId> = (0..count).map(|n| device.id * 100 + n).collect();
            self.set_raw(
                device.id,
                PropertyAddress::scoped(hal::SELECTOR_STREAMS, scope),
                encode_ids(&streams),
            );
        }
    }

    /// Set the default device for a concrete role
    pub fn set_default(&self, role: Role, id: ObjectId) {
        if let Some(address) = role.default_device_address() {
            self.set_raw(SYSTEM_OBJECT, address, id.to_ne_bytes().to_vec());
        }
    }

    /// Mark a device as an aggregate of `sub_devices`
    pub fn make_aggregate(&self, id: ObjectId, sub_devices: &[ObjectId]) {
        self.set_raw(
            id,
            PropertyAddress::global(hal::SELECTOR_TRANSPORT_TYPE),
            hal::TRANSPORT_TYPE_AGGREGATE.to_ne_bytes().to_vec(),
        );
        self.set_raw(
            id,
            PropertyAddress::global(hal::SELECTOR_ACTIVE_SUB_DEVICES),
            encode_ids(sub_devices),
        );
    }

    /// Give a device scalar volume on stereo channels 1 and 2
    pub fn add_stereo_volume(&self, id: ObjectId, scope: u32, left: f32, right: f32) {
        self.set_raw(
            id,
            PropertyAddress::scoped(hal::SELECTOR_PREFERRED_STEREO_CHANNELS, scope),
            encode_ids(&[1, 2]),
        );
        for (channel, value) in [(1, left), (2, right)] {
            self.set_raw(
                id,
                PropertyAddress::new(hal::SELECTOR_VOLUME_SCALAR, scope, channel),
                value.to_ne_bytes().to_vec(),
            );
        }
    }

    /// Give a device a mute flag in `scope`
    pub fn add_mute(&self, id: ObjectId, scope: u32, muted: bool) {
        self.set_raw(
            id,
            PropertyAddress::scoped(hal::SELECTOR_MUTE, scope),
            u32::from(muted).to_ne_bytes().to_vec(),
        );
    }

    /// Current mute flag, if the device has one in `scope`
    #[must_use]
    pub fn mute_state(&self, id: ObjectId, scope: u32) -> Option<bool> {
        self.raw(id, &PropertyAddress::scoped(hal::SELECTOR_MUTE, scope))
            .and_then(|bytes| <[u8; 4]>::try_from(bytes.as_slice()).ok())
            .map(|word| u32::from_ne_bytes(word) != 0)
    }

    /// Current default device for a concrete role
    #[must_use]
    pub fn default_device(&self, role: Role) -> Option<ObjectId> {
        let address = role.default_device_address()?;
        self.raw(SYSTEM_OBJECT, &address)
            .and_then(|bytes| <[u8; 4]>::try_from(bytes.as_slice()).ok())
            .map(u32::from_ne_bytes)
    }

    /// Make every write of `selector` on `object` fail
    pub fn fail_writes(&self, object: ObjectId, selector: u32) {
        self.failing_writes.borrow_mut().insert((object, selector));
    }
}

impl AudioHardware for MemoryHardware {
    fn has_property(&self, object: ObjectId, address: &PropertyAddress) -> bool {
        let key = (object, *address);
        self.data.borrow().contains_key(&key) || self.strings.borrow().contains_key(&key)
    }

    fn property_size(&self, object: ObjectId, address: &PropertyAddress) -> Result<u32, OsStatus> {
        self.data
            .borrow()
            .get(&(object, *address))
            .map(|bytes| bytes.len() as u32)
            .ok_or(OsStatus::UNKNOWN_PROPERTY)
    }

    fn read_property(
        &self,
        object: ObjectId,
        address: &PropertyAddress,
        buf: &mut [u8],
    ) -> Result<usize, OsStatus> {
        let data = self.data.borrow();
        let bytes = data
            .get(&(object, *address))
            .ok_or(OsStatus::UNKNOWN_PROPERTY)?;
        let len = bytes.len().min(buf.len());
        buf[..len].copy_from_slice(&bytes[..len]);
        Ok(len)
    }

    fn write_property(
        &self,
        object: ObjectId,
        address: &PropertyAddress,
        data: &[u8],
    ) -> Result<(), OsStatus> {
        if self
            .failing_writes
            .borrow()
            .contains(&(object, address.selector))
        {
            return Err(OsStatus::ILLEGAL_OPERATION);
        }

        let mut store = self.data.borrow_mut();
        let slot = store
            .get_mut(&(object, *address))
            .ok_or(OsStatus::UNKNOWN_PROPERTY)?;
        if slot.len() != data.len() {
            return Err(OsStatus::BAD_PROPERTY_SIZE);
        }
        slot.copy_from_slice(data);
        Ok(())
    }

    fn read_string(&self, object: ObjectId, address: &PropertyAddress) -> Result<String, OsStatus> {
        self.strings
            .borrow()
            .get(&(object, *address))
            .cloned()
            .ok_or(OsStatus::UNKNOWN_PROPERTY)
    }
}
