//! Device model
//!
//! Roles, transport kinds, volume readings and the per-role table of
//! platform property keys. Every role-dependent property lookup goes through
//! [`Role`] so the role switch lives in one place.

use clap::ValueEnum;
use serde::Serialize;
use std::fmt;

use crate::hal::{self, ObjectId, PropertyAddress};

/// Functional category a device is queried or targeted for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum Role {
    /// Capture devices
    Input,
    /// Playback devices
    Output,
    /// Alert and system sound playback
    #[value(name = "system")]
    SystemOutput,
    /// Request-side wildcard: Input, Output and `SystemOutput` independently
    All,
    /// Device with neither input nor output streams
    #[value(skip)]
    Unknown,
}

impl Role {
    /// Concrete roles `All` expands to, in the order they are processed
    pub const CONCRETE: [Role; 3] = [Role::Input, Role::Output, Role::SystemOutput];

    /// Roles a request for `self` applies to
    #[must_use]
    pub fn expand(self) -> &'static [Role] {
        match self {
            Role::Input => &[Role::Input],
            Role::Output => &[Role::Output],
            Role::SystemOutput => &[Role::SystemOutput],
            Role::All => &Self::CONCRETE,
            Role::Unknown => &[],
        }
    }

    /// Short name used in all output formats
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Role::Input => "input",
            Role::Output => "output",
            Role::SystemOutput => "system",
            Role::All => "all",
            Role::Unknown => "unknown",
        }
    }

    /// Hardware property holding the default device for this role
    ///
    /// `None` for `All` and `Unknown`, which have no default of their own.
    #[must_use]
    pub fn default_device_address(self) -> Option<PropertyAddress> {
        let selector = match self {
            Role::Input => hal::SELECTOR_DEFAULT_INPUT_DEVICE,
            Role::Output => hal::SELECTOR_DEFAULT_OUTPUT_DEVICE,
            Role::SystemOutput => hal::SELECTOR_DEFAULT_SYSTEM_OUTPUT_DEVICE,
            Role::All | Role::Unknown => return None,
        };
        Some(PropertyAddress::global(selector))
    }

    /// Property scope for per-device stream, volume and mute queries
    ///
    /// System output shares the output scope; it only differs in which
    /// default-device property addresses it.
    #[must_use]
    pub fn scope(self) -> Option<u32> {
        match self {
            Role::Input => Some(hal::SCOPE_INPUT),
            Role::Output | Role::SystemOutput => Some(hal::SCOPE_OUTPUT),
            Role::All | Role::Unknown => None,
        }
    }

    /// Whether mute can be read and written for the default device of this role
    #[must_use]
    pub fn supports_mute(self) -> bool {
        matches!(self, Role::Input | Role::Output)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How a device is attached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Ordinary,
    /// Virtual device built from several sub-devices
    Aggregate,
}

impl TransportKind {
    /// Map a raw transport-type code
    #[must_use]
    pub fn from_raw(raw: u32) -> Self {
        if raw == hal::TRANSPORT_TYPE_AGGREGATE {
            TransportKind::Aggregate
        } else {
            TransportKind::Ordinary
        }
    }
}

/// Scalar volume of the two preferred stereo channels
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Volume {
    Stereo { left: f32, right: f32 },
    /// Device has no scalar volume control
    Unsupported,
}

impl fmt::Display for Volume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Volume::Stereo { left, right } => write!(f, "{left:.2},{right:.2}"),
            Volume::Unsupported => f.write_str("n/a"),
        }
    }
}

/// Requested mute change
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MuteAction {
    Mute,
    Unmute,
    Toggle,
}

impl MuteAction {
    /// Resulting mute flag given the current one
    #[must_use]
    pub fn apply(self, currently_muted: bool) -> bool {
        match self {
            MuteAction::Mute => true,
            MuteAction::Unmute => false,
            MuteAction::Toggle => !currently_muted,
        }
    }
}

/// Snapshot of one audio endpoint, built fresh for every query
#[derive(Debug, Clone, PartialEq)]
pub struct Device {
    pub id: ObjectId,
    pub name: String,
    /// Stable across reboots, unlike `id`
    pub uid: String,
    pub role: Role,
    pub transport: TransportKind,
    /// Populated for aggregate devices only
    pub sub_devices: Vec<ObjectId>,
}

/// One line of `--format json` output
#[derive(Debug, Serialize)]
pub struct DeviceJson {
    pub name: String,
    #[serde(rename = "type")]
    pub device_type: String,
    pub id: String,
    pub uid: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub subdevices: Vec<DeviceJson>,
}
