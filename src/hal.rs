//! Audio hardware property service
//!
//! The platform exposes every piece of audio state as a property of an audio
//! object, addressed by a (selector, scope, element) triple. This module
//! defines that address, the selector constants the rest of the crate uses,
//! and the [`AudioHardware`] trait the platform backend and the in-memory
//! fake both implement.

use std::fmt;
use tracing::trace;

/// Opaque platform handle naming one audio object
pub type ObjectId = u32;

/// The hardware-wide object devices and defaults hang off
pub const SYSTEM_OBJECT: ObjectId = 1;

/// Returned by the platform where no device is set
pub const UNKNOWN_OBJECT: ObjectId = 0;

/// Build a four-character code from its ASCII spelling
#[must_use]
pub const fn fourcc(code: &[u8; 4]) -> u32 {
    u32::from_be_bytes(*code)
}

// ============================================================================
// Selectors, scopes and elements
// ============================================================================

pub const SELECTOR_DEVICES: u32 = fourcc(b"dev#");
pub const SELECTOR_DEFAULT_INPUT_DEVICE: u32 = fourcc(b"dIn ");
pub const SELECTOR_DEFAULT_OUTPUT_DEVICE: u32 = fourcc(b"dOut");
pub const SELECTOR_DEFAULT_SYSTEM_OUTPUT_DEVICE: u32 = fourcc(b"sOut");
pub const SELECTOR_STREAMS: u32 = fourcc(b"stm#");
pub const SELECTOR_NAME: u32 = fourcc(b"lnam");
pub const SELECTOR_DEVICE_UID: u32 = fourcc(b"uid ");
pub const SELECTOR_TRANSPORT_TYPE: u32 = fourcc(b"tran");
pub const SELECTOR_ACTIVE_SUB_DEVICES: u32 = fourcc(b"agrp");
pub const SELECTOR_PREFERRED_STEREO_CHANNELS: u32 = fourcc(b"dch2");
pub const SELECTOR_VOLUME_SCALAR: u32 = fourcc(b"volm");
pub const SELECTOR_MUTE: u32 = fourcc(b"mute");

pub const SCOPE_GLOBAL: u32 = fourcc(b"glob");
pub const SCOPE_INPUT: u32 = fourcc(b"inpt");
pub const SCOPE_OUTPUT: u32 = fourcc(b"outp");

pub const ELEMENT_MAIN: u32 = 0;

/// Transport type value reported by aggregate devices
pub const TRANSPORT_TYPE_AGGREGATE: u32 = fourcc(b"grup");

/// Size in bytes of one [`ObjectId`] inside a property buffer
pub const OBJECT_ID_SIZE: usize = std::mem::size_of::<ObjectId>();

/// Key of one property on an audio object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PropertyAddress {
    pub selector: u32,
    pub scope: u32,
    pub element: u32,
}

impl PropertyAddress {
    #[must_use]
    pub const fn new(selector: u32, scope: u32, element: u32) -> Self {
        Self {
            selector,
            scope,
            element,
        }
    }

    /// Global scope, main element
    #[must_use]
    pub const fn global(selector: u32) -> Self {
        Self::new(selector, SCOPE_GLOBAL, ELEMENT_MAIN)
    }

    /// Given scope, main element
    #[must_use]
    pub const fn scoped(selector: u32, scope: u32) -> Self {
        Self::new(selector, scope, ELEMENT_MAIN)
    }
}

/// Render a four-character code, falling back to hex for non-printable codes
fn write_fourcc(f: &mut fmt::Formatter<'_>, code: u32) -> fmt::Result {
    let bytes = code.to_be_bytes();
    if bytes.iter().all(|b| b.is_ascii_graphic() || *b == b' ') {
        write!(f, "'")?;
        for b in bytes {
            write!(f, "{}", char::from(b))?;
        }
        write!(f, "'")
    } else {
        write!(f, "{code:#010x}")
    }
}

impl fmt::Display for PropertyAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_fourcc(f, self.selector)?;
        write!(f, "/")?;
        write_fourcc(f, self.scope)?;
        write!(f, "/{}", self.element)
    }
}

/// Raw status code returned by a failed platform call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OsStatus(pub i32);

impl OsStatus {
    /// Property does not exist on the object
    pub const UNKNOWN_PROPERTY: OsStatus = OsStatus(fourcc(b"who?") as i32);
    /// Object id does not name a live object
    pub const BAD_OBJECT: OsStatus = OsStatus(fourcc(b"!obj") as i32);
    /// Buffer size does not match the property's data size
    pub const BAD_PROPERTY_SIZE: OsStatus = OsStatus(fourcc(b"!siz") as i32);
    /// Property exists but cannot be written
    pub const ILLEGAL_OPERATION: OsStatus = OsStatus(fourcc(b"nope") as i32);
}

impl fmt::Display for OsStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Query/set interface to the platform's audio property store
///
/// Implementations are stateless handles; all state lives in the platform.
/// Buffers are untyped; use the `read_*`/`write_*` helpers in this module
/// to decode them.
pub trait AudioHardware {
    /// Whether `object` exposes the property at all
    fn has_property(&self, object: ObjectId, address: &PropertyAddress) -> bool;

    /// Current size in bytes of the property's data
    ///
    /// # Errors
    /// Returns the platform status if the size query fails.
    fn property_size(&self, object: ObjectId, address: &PropertyAddress) -> Result<u32, OsStatus>;

    /// Copy the property's data into `buf`, returning the number of bytes written
    ///
    /// # Errors
    /// Returns the platform status if the read fails.
    fn read_property(
        &self,
        object: ObjectId,
        address: &PropertyAddress,
        buf: &mut [u8],
    ) -> Result<usize, OsStatus>;

    /// Replace the property's data
    ///
    /// # Errors
    /// Returns the platform status if the write is rejected.
    fn write_property(
        &self,
        object: ObjectId,
        address: &PropertyAddress,
        data: &[u8],
    ) -> Result<(), OsStatus>;

    /// Read a string-valued property
    ///
    /// # Errors
    /// Returns the platform status if the read fails.
    fn read_string(&self, object: ObjectId, address: &PropertyAddress) -> Result<String, OsStatus>;
}

impl<H: AudioHardware + ?Sized> AudioHardware for &H {
    fn has_property(&self, object: ObjectId, address: &PropertyAddress) -> bool {
        (**self).has_property(object, address)
    }

    fn property_size(&self, object: ObjectId, address: &PropertyAddress) -> Result<u32, OsStatus> {
        (**self).property_size(object, address)
    }

    fn read_property(
        &self,
        object: ObjectId,
        address: &PropertyAddress,
        buf: &mut [u8],
    ) -> Result<usize, OsStatus> {
        (**self).read_property(object, address, buf)
    }

    fn write_property(
        &self,
        object: ObjectId,
        address: &PropertyAddress,
        data: &[u8],
    ) -> Result<(), OsStatus> {
        (**self).write_property(object, address, data)
    }

    fn read_string(&self, object: ObjectId, address: &PropertyAddress) -> Result<String, OsStatus> {
        (**self).read_string(object, address)
    }
}

impl<H: AudioHardware + ?Sized> AudioHardware for Box<H> {
    fn has_property(&self, object: ObjectId, address: &PropertyAddress) -> bool {
        (**self).has_property(object, address)
    }

    fn property_size(&self, object: ObjectId, address: &PropertyAddress) -> Result<u32, OsStatus> {
        (**self).property_size(object, address)
    }

    fn read_property(
        &self,
        object: ObjectId,
        address: &PropertyAddress,
        buf: &mut [u8],
    ) -> Result<usize, OsStatus> {
        (**self).read_property(object, address, buf)
    }

    fn write_property(
        &self,
        object: ObjectId,
        address: &PropertyAddress,
        data: &[u8],
    ) -> Result<(), OsStatus> {
        (**self).write_property(object, address, data)
    }

    fn read_string(&self, object: ObjectId, address: &PropertyAddress) -> Result<String, OsStatus> {
        (**self).read_string(object, address)
    }
}

// ============================================================================
// Typed helpers
// ============================================================================

/// Read a fixed four-byte property into a `[u8; 4]`
fn read_word<H: AudioHardware + ?Sized>(
    hw: &H,
    object: ObjectId,
    address: &PropertyAddress,
) -> Result<[u8; 4], OsStatus> {
    let mut buf = [0u8; 4];
    let written = hw.read_property(object, address, &mut buf)?;
    if written != buf.len() {
        return Err(OsStatus::BAD_PROPERTY_SIZE);
    }
    trace!("read {} on {}: {:02x?}", address, object, buf);
    Ok(buf)
}

/// Read a `u32` property (ids, flags, codes)
///
/// # Errors
/// Returns the platform status if the read fails or returns a short buffer.
pub fn read_u32<H: AudioHardware + ?Sized>(
    hw: &H,
    object: ObjectId,
    address: &PropertyAddress,
) -> Result<u32, OsStatus> {
    read_word(hw, object, address).map(u32::from_ne_bytes)
}

/// Read a `f32` property (volume scalars)
///
/// # Errors
/// Returns the platform status if the read fails or returns a short buffer.
pub fn read_f32<H: AudioHardware + ?Sized>(
    hw: &H,
    object: ObjectId,
    address: &PropertyAddress,
) -> Result<f32, OsStatus> {
    read_word(hw, object, address).map(f32::from_ne_bytes)
}

/// Read a variable-length list of `u32` values
///
/// Sizes the buffer from a size query first. A size that is not a whole
/// number of `u32`s is rejected rather than silently truncated.
///
/// # Errors
/// Returns the platform status if either query fails or the size is ragged.
pub fn read_u32_list<H: AudioHardware + ?Sized>(
    hw: &H,
    object: ObjectId,
    address: &PropertyAddress,
) -> Result<Vec<u32>, OsStatus> {
    let size = hw.property_size(object, address)? as usize;
    if size % OBJECT_ID_SIZE != 0 {
        return Err(OsStatus::BAD_PROPERTY_SIZE);
    }

    let mut buf = vec![0u8; size];
    let written = hw.read_property(object, address, &mut buf)?;
    // The list may shrink between the two calls; never grow past the buffer
    if written % OBJECT_ID_SIZE != 0 || written > size {
        return Err(OsStatus::BAD_PROPERTY_SIZE);
    }

    let values: Vec<u32> = buf[..written]
        .chunks_exact(OBJECT_ID_SIZE)
        .map(|chunk| u32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect();
    trace!("read {} on {}: {} values", address, object, values.len());
    Ok(values)
}

/// Write a `u32` property
///
/// # Errors
/// Returns the platform status if the write is rejected.
pub fn write_u32<H: AudioHardware + ?Sized>(
    hw: &H,
    object: ObjectId,
    address: &PropertyAddress,
    value: u32,
) -> Result<(), OsStatus> {
    trace!("write {} on {}: {}", address, object, value);
    hw.write_property(object, address, &value.to_ne_bytes())
}

/// Write a `f32` property
///
/// # Errors
/// Returns the platform status if the write is rejected.
pub fn write_f32<H: AudioHardware + ?Sized>(
    hw: &H,
    object: ObjectId,
    address: &PropertyAddress,
    value: f32,
) -> Result<(), OsStatus> {
    trace!("write {} on {}: {}", address, object, value);
    hw.write_property(object, address, &value.to_ne_bytes())
}
