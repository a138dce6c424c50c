//! Error types
//!
//! Every failure the tool reports falls in one of these categories; all of
//! them end the process with exit status 1.

use thiserror::Error;

use crate::device::Role;
use crate::hal::{ObjectId, OsStatus, PropertyAddress};

#[derive(Debug, Error)]
pub enum AudioError {
    /// Unusable flag value; nothing was changed
    #[error("{0}")]
    InvalidArgument(String),

    /// No device of the role matched the selector; nothing was changed
    #[error("Could not find an audio device {selector} of type {role}.  Nothing was changed.")]
    NotFound { selector: String, role: Role },

    /// A property get or set was rejected by the platform
    #[error("Failed {operation} {address} on device {object} (status {status})")]
    Platform {
        operation: &'static str,
        address: PropertyAddress,
        object: ObjectId,
        status: OsStatus,
    },

    /// The operation has no meaning for the role or device
    #[error("{operation} is not supported for {role} devices")]
    Unsupported { operation: &'static str, role: Role },

    /// Some sub-operations of a batch failed; the successful ones stand
    #[error("{failed} of {attempted} operations failed")]
    PartialFailure { failed: usize, attempted: usize },

    /// No audio property service exists on this operating system
    #[error("Audio device control is not available on this platform")]
    PlatformUnavailable,
}

impl AudioError {
    pub(crate) fn read(address: PropertyAddress, object: ObjectId, status: OsStatus) -> Self {
        AudioError::Platform {
            operation: "reading",
            address,
            object,
            status,
        }
    }

    pub(crate) fn write(address: PropertyAddress, object: ObjectId, status: OsStatus) -> Self {
        AudioError::Platform {
            operation: "writing",
            address,
            object,
            status,
        }
    }

    pub(crate) fn not_found(selector: impl Into<String>, role: Role) -> Self {
        AudioError::NotFound {
            selector: selector.into(),
            role,
        }
    }
}

pub type Result<T, E = AudioError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::{SCOPE_GLOBAL, SELECTOR_DEFAULT_OUTPUT_DEVICE};

    #[test]
    fn test_not_found_message_names_selector_and_role() {
        let err = AudioError::not_found("named \"Speakers\"", Role::Input);
        assert_eq!(
            err.to_string(),
            "Could not find an audio device named \"Speakers\" of type input.  Nothing was changed."
        );
    }

    #[test]
    fn test_platform_message_includes_status() {
        let address = PropertyAddress::new(SELECTOR_DEFAULT_OUTPUT_DEVICE, SCOPE_GLOBAL, 0);
        let err = AudioError::write(address, 1, OsStatus(-50));
        assert_eq!(
            err.to_string(),
            "Failed writing 'dOut'/'glob'/0 on device 1 (status -50)"
        );
    }
}
