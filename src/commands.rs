//! CLI commands
//!
//! One function per action. Single-role commands stop at the first error;
//! `-t all` commands attempt every role, report each failure as it happens
//! and return [`AudioError::PartialFailure`] at the end if any failed.

use color_eyre::eyre::{Result, WrapErr};
use std::io::Write;
use tracing::{debug, warn};

use crate::audio::AudioSystem;
use crate::cli::{Action, Args, Selection};
use crate::device::{MuteAction, Role};
use crate::error::AudioError;
use crate::hal::{AudioHardware, ObjectId, UNKNOWN_OBJECT};
use crate::output::{Detail, OutputFormat, Presenter};
use crate::style::SwitchStyle;
use crate::volume::VolumeSpec;

/// Failures accumulated over the sub-operations of one command
#[derive(Debug, Default)]
struct Batch {
    attempted: usize,
    failed: usize,
}

impl Batch {
    /// Record one outcome, printing the error if there is one
    fn record(&mut self, outcome: Result<()>, out: &mut dyn Write) -> Result<()> {
        self.attempted += 1;
        if let Err(e) = outcome {
            // Output errors mean the terminal is gone; don't count them as device failures
            if e.downcast_ref::<std::io::Error>().is_some() {
                return Err(e);
            }
            warn!("{:#}", e);
            self.failed += 1;
            writeln!(out, "{}", format!("{e:#}").error())?;
        }
        Ok(())
    }

    fn finish(self) -> Result<()> {
        if self.failed == 0 {
            Ok(())
        } else {
            Err(AudioError::PartialFailure {
                failed: self.failed,
                attempted: self.attempted,
            }
            .into())
        }
    }
}

/// Run the action selected by `args`
///
/// # Errors
/// Returns `InvalidArgument` if no action was requested, otherwise whatever
/// the action returns.
pub fn run<H: AudioHardware>(
    system: &AudioSystem<H>,
    args: &Args,
    out: &mut dyn Write,
) -> Result<()> {
    let action = args.action().ok_or_else(|| {
        AudioError::InvalidArgument("Please specify audio device.".to_string())
    })?;
    debug!("Running {:?} for type {:?}", action, args.device_type);

    match action {
        Action::List => list_devices(system, args.device_type, args.format, out),
        Action::ShowCurrent => show_current(system, args.role(), args.format, out),
        Action::SetVolume(spec) => set_volumes(system, &spec, out),
        Action::Mute(mode) => set_mute(system, args.role(), mode, out),
        Action::CycleNext => cycle_next(system, args.role(), out),
        Action::Select(selection) => select_device(system, &selection, args.role(), out),
    }
}

/// List devices of `role`; input then output when no type was given
///
/// # Errors
/// Returns an error if writing the output fails.
pub fn list_devices<H: AudioHardware>(
    system: &AudioSystem<H>,
    role: Option<Role>,
    format: OutputFormat,
    out: &mut dyn Write,
) -> Result<()> {
    // Listings group by classification, so a duplex device appears once
    let classes: &[Role] = match role {
        Some(Role::Input) => &[Role::Input],
        Some(Role::Output | Role::SystemOutput) => &[Role::Output],
        _ => &[Role::Input, Role::Output],
    };
    let devices = system.list_devices();
    let presenter = Presenter::new(system, format);

    for &class in classes {
        for &id in devices.iter().filter(|&&id| system.classify(id) == class) {
            let device = system.describe(id, class);
            presenter.write_device(&device, Detail::WithType, out)?;
        }
    }
    Ok(())
}

/// Show the currently selected device of `role`
///
/// # Errors
/// Returns `NotFound` if nothing is selected for a single role,
/// `PartialFailure` if any role of `all` has no selection.
pub fn show_current<H: AudioHardware>(
    system: &AudioSystem<H>,
    role: Role,
    format: OutputFormat,
    out: &mut dyn Write,
) -> Result<()> {
    let presenter = Presenter::new(system, format);
    let show = |role: Role, out: &mut dyn Write| -> Result<()> {
        let id = system.find_current(role)?;
        let device = system.describe(id, role);
        presenter.write_device(&device, Detail::NameOnly, out)?;
        Ok(())
    };

    if role != Role::All {
        return show(role, &mut *out);
    }
    let mut batch = Batch::default();
    for &role in role.expand() {
        let outcome = show(role, &mut *out);
        batch.record(outcome, &mut *out)?;
    }
    batch.finish()
}

fn locate<H: AudioHardware>(
    system: &AudioSystem<H>,
    selection: &Selection,
    role: Role,
) -> Result<ObjectId, AudioError> {
    match selection {
        Selection::Id(id) => system.find_by_id(*id, role),
        Selection::Uid(fragment) => system.find_by_uid(fragment, role),
        Selection::Name(name) => system.find_by_name(name, role),
    }
}

fn announce_selection<H: AudioHardware>(
    system: &AudioSystem<H>,
    id: ObjectId,
    role: Role,
    out: &mut dyn Write,
) -> Result<()> {
    let message = format!(
        "{} audio device set to \"{}\"",
        role,
        system.device_name(id)
    );
    writeln!(out, "{}", message.success())?;
    Ok(())
}

/// Make the device matching `selection` the default for `role`
///
/// Nothing is written for a role whose lookup fails.
///
/// # Errors
/// Returns `NotFound` or a platform error for a single role,
/// `PartialFailure` if any role of `all` failed.
pub fn select_device<H: AudioHardware>(
    system: &AudioSystem<H>,
    selection: &Selection,
    role: Role,
    out: &mut dyn Write,
) -> Result<()> {
    let select = |role: Role, out: &mut dyn Write| -> Result<()> {
        let id = locate(system, selection, role)?;
        system.set_default(id, role)?;
        announce_selection(system, id, role, out)
    };

    if role != Role::All {
        return select(role, &mut *out);
    }
    let mut batch = Batch::default();
    for &role in role.expand() {
        let outcome = select(role, &mut *out);
        batch.record(outcome, &mut *out)?;
    }
    batch.finish()
}

/// Switch `role` to the device after the current one, wrapping around
///
/// With no current selection the first device of the role is chosen.
///
/// # Errors
/// Returns `NotFound` if the role has no devices, a platform error if the
/// switch fails, `PartialFailure` if any role of `all` failed.
pub fn cycle_next<H: AudioHardware>(
    system: &AudioSystem<H>,
    role: Role,
    out: &mut dyn Write,
) -> Result<()> {
    let cycle = |role: Role, out: &mut dyn Write| -> Result<()> {
        let current = match system.find_current(role) {
            Ok(id) => id,
            Err(AudioError::NotFound { .. }) => UNKNOWN_OBJECT,
            Err(e) => return Err(e.into()),
        };
        let next = system.find_next(current, role)?;
        system.set_default(next, role)?;
        announce_selection(system, next, role, out)
    };

    if role != Role::All {
        return cycle(role, &mut *out);
    }
    let mut batch = Batch::default();
    for &role in role.expand() {
        let outcome = cycle(role, &mut *out);
        batch.record(outcome, &mut *out)?;
    }
    batch.finish()
}

/// Mute, unmute or toggle the current device of `role`
///
/// `all` covers input and output; system sound has no mute of its own.
///
/// # Errors
/// Returns `Unsupported` for system output, `NotFound` or a platform error
/// for a single role, `PartialFailure` if input or output failed under `all`.
pub fn set_mute<H: AudioHardware>(
    system: &AudioSystem<H>,
    role: Role,
    action: MuteAction,
    out: &mut dyn Write,
) -> Result<()> {
    let apply = |role: Role, out: &mut dyn Write| -> Result<()> {
        let (id, muted) = system.set_mute(role, action)?;
        let message = format!(
            "{} audio device \"{}\" {}",
            role,
            system.device_name(id),
            if muted { "muted" } else { "unmuted" }
        );
        writeln!(out, "{}", message.success())?;
        Ok(())
    };

    if role != Role::All {
        return apply(role, &mut *out);
    }
    let mut batch = Batch::default();
    for &role in role.expand().iter().filter(|role| role.supports_mute()) {
        let outcome = apply(role, &mut *out);
        batch.record(outcome, &mut *out)?;
    }
    batch.finish()
}

/// Apply every entry of a volume spec, reading each device back afterwards
///
/// # Errors
/// Returns `NotFound`, `Unsupported` or a platform error for a single
/// entry, `PartialFailure` if any of several entries failed.
pub fn set_volumes<H: AudioHardware>(
    system: &AudioSystem<H>,
    spec: &VolumeSpec,
    out: &mut dyn Write,
) -> Result<()> {
    let devices = system.list_devices();
    let apply = |id: ObjectId, left: f32, right: f32, out: &mut dyn Write| -> Result<()> {
        if !devices.contains(&id) {
            return Err(AudioError::not_found(format!("with id {id}"), Role::All).into());
        }
        system
            .set_volume(id, left, right)
            .wrap_err_with(|| format!("Could not set volume of device {id}"))?;
        let message = format!(
            "\"{}\" ({}) volume set to {}",
            system.device_name(id),
            id,
            system.get_volume(id)
        );
        writeln!(out, "{}", message.success())?;
        Ok(())
    };

    if let [setting] = spec.0.as_slice() {
        return apply(setting.id, setting.left, setting.right, &mut *out);
    }
    let mut batch = Batch::default();
    for setting in &spec.0 {
        let outcome = apply(setting.id, setting.left, setting.right, &mut *out);
        batch.record(outcome, &mut *out)?;
    }
    batch.finish()
}
