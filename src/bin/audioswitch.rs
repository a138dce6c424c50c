//! audioswitch binary entry point
//!
//! Parses arguments, sets up logging and hands the selected action to the
//! platform backend.

use audioswitch::cli::Args;
use audioswitch::style::{self, SwitchStyle};
use clap::{CommandFactory, Parser};
use color_eyre::eyre::Result;
use std::io::{self, IsTerminal, Write};
use std::process::ExitCode;

/// Initialize logging
///
/// Diagnostics go to stderr so stdout stays parseable. `RUST_LOG` overrides
/// the default `warn` level.
fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();
}

#[cfg(target_os = "macos")]
fn execute(args: &Args, out: &mut dyn Write) -> Result<()> {
    let system = audioswitch::AudioSystem::new(audioswitch::coreaudio::CoreAudio);
    audioswitch::commands::run(&system, args, out)
}

#[cfg(not(target_os = "macos"))]
fn execute(_args: &Args, _out: &mut dyn Write) -> Result<()> {
    Err(audioswitch::AudioError::PlatformUnavailable.into())
}

fn main() -> Result<ExitCode> {
    color_eyre::install()?;

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) if e.use_stderr() => {
            // Usage errors are failures like any other: stdout, status 1
            write!(io::stdout(), "{}", e.render())?;
            return Ok(ExitCode::FAILURE);
        }
        Err(e) => {
            // --help and --version
            e.print()?;
            return Ok(ExitCode::SUCCESS);
        }
    };

    init_logging();
    style::set_color_enabled(io::stdout().is_terminal());

    let stdout = io::stdout();
    let mut out = stdout.lock();

    if args.action().is_none() {
        writeln!(out, "Please specify audio device.")?;
        writeln!(out, "{}", Args::command().render_help())?;
        return Ok(ExitCode::FAILURE);
    }

    match execute(&args, &mut out) {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            writeln!(out, "{}", format!("{e:#}").error())?;
            Ok(ExitCode::FAILURE)
        }
    }
}
