//! CoreAudio backend
//!
//! Implements [`AudioHardware`] over the CoreAudio HAL object-property API.
//! String properties come back as retained `CFStringRef`s and are copied
//! into Rust strings and released here.

use std::ffi::{CStr, c_char, c_void};
use std::ptr;
use tracing::trace;

use crate::hal::{AudioHardware, ObjectId, OsStatus, PropertyAddress};

#[repr(C)]
struct AudioObjectPropertyAddress {
    selector: u32,
    scope: u32,
    element: u32,
}

impl From<&PropertyAddress> for AudioObjectPropertyAddress {
    fn from(address: &PropertyAddress) -> Self {
        Self {
            selector: address.selector,
            scope: address.scope,
            element: address.element,
        }
    }
}

type CFStringRef = *const c_void;
type CFIndex = isize;

const K_CF_STRING_ENCODING_UTF8: u32 = 0x0800_0100;

// FFI declarations for the CoreAudio HAL property API (macOS 10.4+)
#[link(name = "CoreAudio", kind = "framework")]
unsafe extern "C" {
    fn AudioObjectHasProperty(object: u32, address: *const AudioObjectPropertyAddress) -> u8;

    fn AudioObjectGetPropertyDataSize(
        object: u32,
        address: *const AudioObjectPropertyAddress,
        qualifier_size: u32,
        qualifier: *const c_void,
        out_size: *mut u32,
    ) -> i32;

    fn AudioObjectGetPropertyData(
        object: u32,
        address: *const AudioObjectPropertyAddress,
        qualifier_size: u32,
        qualifier: *const c_void,
        io_size: *mut u32,
        out_data: *mut c_void,
    ) -> i32;

    fn AudioObjectSetPropertyData(
        object: u32,
        address: *const AudioObjectPropertyAddress,
        qualifier_size: u32,
        qualifier: *const c_void,
        size: u32,
        data: *const c_void,
    ) -> i32;
}

#[link(name = "CoreFoundation", kind = "framework")]
unsafe extern "C" {
    fn CFStringGetLength(string: CFStringRef) -> CFIndex;
    fn CFStringGetMaximumSizeForEncoding(length: CFIndex, encoding: u32) -> CFIndex;
    fn CFStringGetCString(
        string: CFStringRef,
        buffer: *mut c_char,
        buffer_size: CFIndex,
        encoding: u32,
    ) -> u8;
    fn CFRelease(object: *const c_void);
}

fn check(status: i32) -> Result<(), OsStatus> {
    if status == 0 {
        Ok(())
    } else {
        Err(OsStatus(status))
    }
}

/// Copy a `CFString` into an owned `String`
///
/// # Safety
/// `string` must be a valid, non-null `CFStringRef`.
unsafe fn cfstring_to_string(string: CFStringRef) -> Option<String> {
    // SAFETY: caller guarantees `string` is a valid CFString
    let length = unsafe { CFStringGetLength(string) };
    // SAFETY: pure size computation
    let capacity =
        unsafe { CFStringGetMaximumSizeForEncoding(length, K_CF_STRING_ENCODING_UTF8) } + 1;
    let mut buf = vec![0u8; usize::try_from(capacity).ok()?];

    // SAFETY: `buf` is `capacity` bytes long and CoreFoundation NUL-terminates within it
    let ok = unsafe {
        CFStringGetCString(
            string,
            buf.as_mut_ptr().cast::<c_char>(),
            capacity,
            K_CF_STRING_ENCODING_UTF8,
        )
    };
    if ok == 0 {
        return None;
    }
    let text = CStr::from_bytes_until_nul(&buf).ok()?;
    Some(text.to_string_lossy().into_owned())
}

/// The system's CoreAudio HAL
#[derive(Debug, Default, Clone, Copy)]
pub struct CoreAudio;

impl AudioHardware for CoreAudio {
    fn has_property(&self, object: ObjectId, address: &PropertyAddress) -> bool {
        let raw = AudioObjectPropertyAddress::from(address);
        // SAFETY: `raw` lives for the duration of the call
        unsafe { AudioObjectHasProperty(object, &raw) != 0 }
    }

    fn property_size(&self, object: ObjectId, address: &PropertyAddress) -> Result<u32, OsStatus> {
        let raw = AudioObjectPropertyAddress::from(address);
        let mut size = 0u32;
        // SAFETY: all pointers reference locals that outlive the call
        let status =
            unsafe { AudioObjectGetPropertyDataSize(object, &raw, 0, ptr::null(), &mut size) };
        check(status)?;
        trace!("size of {} on {}: {}", address, object, size);
        Ok(size)
    }

    fn read_property(
        &self,
        object: ObjectId,
        address: &PropertyAddress,
        buf: &mut [u8],
    ) -> Result<usize, OsStatus> {
        let raw = AudioObjectPropertyAddress::from(address);
        let mut size = u32::try_from(buf.len()).map_err(|_| OsStatus::BAD_PROPERTY_SIZE)?;
        // SAFETY: `size` bounds the write into `buf`; the HAL updates it to the bytes written
        let status = unsafe {
            AudioObjectGetPropertyData(
                object,
                &raw,
                0,
                ptr::null(),
                &mut size,
                buf.as_mut_ptr().cast::<c_void>(),
            )
        };
        check(status)?;
        Ok(size as usize)
    }

    fn write_property(
        &self,
        object: ObjectId,
        address: &PropertyAddress,
        data: &[u8],
    ) -> Result<(), OsStatus> {
        let raw = AudioObjectPropertyAddress::from(address);
        let size = u32::try_from(data.len()).map_err(|_| OsStatus::BAD_PROPERTY_SIZE)?;
        // SAFETY: `data` is `size` bytes and is only read by the HAL
        let status = unsafe {
            AudioObjectSetPropertyData(
                object,
                &raw,
                0,
                ptr::null(),
                size,
                data.as_ptr().cast::<c_void>(),
            )
        };
        check(status)
    }

    fn read_string(&self, object: ObjectId, address: &PropertyAddress) -> Result<String, OsStatus> {
        let raw = AudioObjectPropertyAddress::from(address);
        let mut string: CFStringRef = ptr::null();
        let mut size = std::mem::size_of::<CFStringRef>() as u32;
        // SAFETY: the HAL writes one retained CFStringRef into `string`
        let status = unsafe {
            AudioObjectGetPropertyData(
                object,
                &raw,
                0,
                ptr::null(),
                &mut size,
                (&raw mut string).cast::<c_void>(),
            )
        };
        check(status)?;
        if string.is_null() {
            return Err(OsStatus::UNKNOWN_PROPERTY);
        }

        // SAFETY: non-null CFStringRef returned by the HAL, released exactly once below
        let text = unsafe { cfstring_to_string(string) };
        // SAFETY: we own the retained reference returned by the getter
        unsafe { CFRelease(string) };
        text.ok_or(OsStatus::BAD_PROPERTY_SIZE)
    }
}
