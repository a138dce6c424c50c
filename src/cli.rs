//! Command-line interface definitions
//!
//! Uses clap for argument parsing with derive macros. Flags are single
//! letters so existing scripts built around the classic switcher keep
//! working.

use clap::Parser;

use crate::device::{MuteAction, Role};
use crate::hal::ObjectId;
use crate::output::OutputFormat;
use crate::volume::VolumeSpec;

/// Audio Switcher
///
/// List and switch audio input, output and system sound devices.
#[derive(Debug, Parser)]
#[command(name = "audioswitch")]
#[command(version)]
#[command(about = "Audio Switcher - List and switch audio input, output and system sound devices")]
#[command(after_help = "\
EXAMPLES:
  audioswitch -a                     List input and output devices
  audioswitch -c -t input            Show the current input device
  audioswitch -s \"USB Headset\"       Make \"USB Headset\" the output device
  audioswitch -t all -u AppleHDMI    Select the device whose uid contains AppleHDMI for every type
  audioswitch -n -t system           Cycle the system sound device
  audioswitch -m toggle -t input     Toggle mute on the current input device
  audioswitch -e 73=0.5,0.5:81=1,1   Set stereo volume on devices 73 and 81

DEVICE TYPES:
  system devices are the output devices; selecting one only changes where
  alert and system sounds are played.

OUTPUT FORMATS:
  human  one descriptive line per device
  cli    name,type,id,uid; fields containing commas or quotes are
         double-quoted with inner quotes doubled
  json   one object per line with name, type, id and uid

EXIT STATUS:
  0 on success, 1 on invalid arguments, unknown devices or failed changes.
  With -t all every type is attempted; any failure gives status 1.

LOGGING:
  Diagnostics go to stderr; set RUST_LOG=debug for details.")]
pub struct Args {
    /// List devices of the requested type (input and output if -t is not given)
    #[arg(short = 'a')]
    pub list: bool,

    /// Show the currently selected device of the requested type
    #[arg(short = 'c')]
    pub current: bool,

    /// Device type [default: output]
    #[arg(short = 't', value_name = "TYPE", value_enum)]
    pub device_type: Option<Role>,

    /// Output format
    #[arg(short = 'f', value_name = "FORMAT", value_enum, default_value_t = OutputFormat::Human)]
    pub format: OutputFormat,

    /// Cycle to the next device of the requested type
    #[arg(short = 'n')]
    pub next: bool,

    /// Mute, unmute or toggle the current device (input and output only)
    #[arg(short = 'm', value_name = "MODE", value_enum)]
    pub mute: Option<MuteAction>,

    /// Select the device with this numeric id
    #[arg(short = 'i', value_name = "ID", group = "selector")]
    pub id: Option<ObjectId>,

    /// Select the first device whose uid contains this text
    #[arg(short = 'u', value_name = "UID", group = "selector")]
    pub uid: Option<String>,

    /// Select the device with exactly this name
    #[arg(short = 's', value_name = "NAME", group = "selector")]
    pub name: Option<String>,

    /// Set stereo volume: id=left,right[:id=left,right...] with levels 0.0-1.0
    #[arg(short = 'e', value_name = "SPEC")]
    pub volume: Option<VolumeSpec>,
}

/// How a device to select is identified
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Id(ObjectId),
    /// Substring of the uid
    Uid(String),
    /// Exact name
    Name(String),
}

/// The single action an invocation performs
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    List,
    ShowCurrent,
    SetVolume(VolumeSpec),
    Mute(MuteAction),
    CycleNext,
    Select(Selection),
}

impl Args {
    /// Requested device selector, if any
    #[must_use]
    pub fn selection(&self) -> Option<Selection> {
        if let Some(id) = self.id {
            Some(Selection::Id(id))
        } else if let Some(uid) = &self.uid {
            Some(Selection::Uid(uid.clone()))
        } else {
            self.name.clone().map(Selection::Name)
        }
    }

    /// Action to run when several are given: list, current, volume, mute,
    /// cycle, then select
    #[must_use]
    pub fn action(&self) -> Option<Action> {
        if self.list {
            Some(Action::List)
        } else if self.current {
            Some(Action::ShowCurrent)
        } else if let Some(spec) = &self.volume {
            Some(Action::SetVolume(spec.clone()))
        } else if let Some(mode) = self.mute {
            Some(Action::Mute(mode))
        } else if self.next {
            Some(Action::CycleNext)
        } else {
            self.selection().map(Action::Select)
        }
    }

    /// Role for actions that default to output
    #[must_use]
    pub fn role(&self) -> Role {
        self.device_type.unwrap_or(Role::Output)
    }
}
