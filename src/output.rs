//! Output formatting
//!
//! Renders devices as human-readable lines, comma-separated fields
//! (`name,type,id,uid`) or one JSON object per line. Aggregate devices are
//! followed by their sub-devices, indented in the text formats and nested
//! under `subdevices` in JSON.

use clap::ValueEnum;
use std::borrow::Cow;
use std::io::{self, Write};

use crate::audio::AudioSystem;
use crate::device::{Device, DeviceJson};
use crate::hal::{AudioHardware, ObjectId};

/// Output format selected with `-f`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Human,
    Cli,
    Json,
}

/// Which human-readable line shape to use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detail {
    /// `Name (type)`, for listings
    WithType,
    /// `Name`, for the current device
    NameOnly,
}

/// Writes devices in one output format
pub struct Presenter<'a, H> {
    system: &'a AudioSystem<H>,
    format: OutputFormat,
}

impl<'a, H: AudioHardware> Presenter<'a, H> {
    pub fn new(system: &'a AudioSystem<H>, format: OutputFormat) -> Self {
        Self { system, format }
    }

    /// Write `device` and, for aggregates, its sub-devices
    ///
    /// # Errors
    /// Returns an error if writing to `out` fails.
    pub fn write_device(
        &self,
        device: &Device,
        detail: Detail,
        out: &mut dyn Write,
    ) -> io::Result<()> {
        let mut path = vec![device.id];
        match self.format {
            OutputFormat::Json => {
                let json = self.to_json(device, &mut path);
                writeln!(out, "{}", serde_json::to_string(&json)?)
            }
            OutputFormat::Human | OutputFormat::Cli => {
                self.write_text(device, detail, 0, &mut path, out)
            }
        }
    }

    fn write_text(
        &self,
        device: &Device,
        detail: Detail,
        depth: usize,
        path: &mut Vec<ObjectId>,
        out: &mut dyn Write,
    ) -> io::Result<()> {
        let indent = "  ".repeat(depth);
        writeln!(out, "{indent}{}", text_line(device, self.format, detail))?;

        for sub in self.expandable(device, path) {
            path.push(sub.id);
            self.write_text(&sub, detail, depth + 1, path, out)?;
            path.pop();
        }
        Ok(())
    }

    fn to_json(&self, device: &Device, path: &mut Vec<ObjectId>) -> DeviceJson {
        let mut subdevices = Vec::new();
        for sub in self.expandable(device, path) {
            path.push(sub.id);
            subdevices.push(self.to_json(&sub, path));
            path.pop();
        }
        DeviceJson {
            name: device.name.clone(),
            device_type: device.role.name().to_string(),
            id: device.id.to_string(),
            uid: device.uid.clone(),
            subdevices,
        }
    }

    /// Sub-devices to render beneath `device`, skipping any already on `path`
    fn expandable(&self, device: &Device, path: &[ObjectId]) -> Vec<Device> {
        device
            .sub_devices
            .iter()
            .filter(|id| !path.contains(id))
            .map(|&id| self.system.describe(id, self.system.classify(id)))
            .collect()
    }
}

/// Single line for the text formats, without indentation
#[must_use]
pub fn text_line(device: &Device, format: OutputFormat, detail: Detail) -> String {
    match (format, detail) {
        (OutputFormat::Human, Detail::WithType) => format!("{} ({})", device.name, device.role),
        (OutputFormat::Human, Detail::NameOnly) => device.name.clone(),
        (OutputFormat::Cli | OutputFormat::Json, _) => format!(
            "{},{},{},{}",
            csv_field(&device.name),
            device.role,
            device.id,
            csv_field(&device.uid)
        ),
    }
}

/// Quote a field containing a comma, quote or line break, doubling inner quotes
fn csv_field(value: &str) -> Cow<'_, str> {
    if value.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{Role, TransportKind};
    use crate::memory::{FakeDevice, MemoryHardware};
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn speakers() -> Device {
        Device {
            id: 73,
            name: "MacBook Pro Speakers".to_string(),
            uid: "BuiltInSpeakerDevice".to_string(),
            role: Role::Output,
            transport: TransportKind::Ordinary,
            sub_devices: Vec::new(),
        }
    }

    fn render(
        system: &AudioSystem<MemoryHardware>,
        device: &Device,
        format: OutputFormat,
        detail: Detail,
    ) -> String {
        let mut out = Vec::new();
        Presenter::new(system, format)
            .write_device(device, detail, &mut out)
            .unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test_case(OutputFormat::Human, Detail::WithType, "MacBook Pro Speakers (output)" ; "human listing")]
    #[test_case(OutputFormat::Human, Detail::NameOnly, "MacBook Pro Speakers" ; "human current")]
    #[test_case(OutputFormat::Cli, Detail::WithType, "MacBook Pro Speakers,output,73,BuiltInSpeakerDevice" ; "cli")]
    fn test_text_line(format: OutputFormat, detail: Detail, expected: &str) {
        assert_eq!(text_line(&speakers(), format, detail), expected);
    }

    #[test]
    fn test_cli_line_quotes_fields_with_commas() {
        let mut device = speakers();
        device.name = "Speakers, \"Left\"".to_string();
        device.uid = "usb:1,2".to_string();
        assert_eq!(
            text_line(&device, OutputFormat::Cli, Detail::WithType),
            r#""Speakers, ""Left""",output,73,"usb:1,2""#
        );
    }

    #[test]
    fn test_json_line_keys() {
        let system = AudioSystem::new(MemoryHardware::new());
        let line = render(&system, &speakers(), OutputFormat::Json, Detail::NameOnly);
        let value: serde_json::Value = serde_json::from_str(line.trim_end()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "name": "MacBook Pro Speakers",
                "type": "output",
                "id": "73",
                "uid": "BuiltInSpeakerDevice",
            })
        );
        assert!(line.ends_with('\n'));
    }

    fn aggregate_system() -> AudioSystem<MemoryHardware> {
        let hw = MemoryHardware::new();
        hw.add_device(FakeDevice::output(10, "Speakers", "spk"));
        hw.add_device(FakeDevice::input(20, "Mic", "mic"));
        hw.add_device(FakeDevice::duplex(50, "Studio", "agg-studio"));
        hw.make_aggregate(50, &[10, 20]);
        AudioSystem::new(hw)
    }

    #[test]
    fn test_aggregate_expands_indented() {
        let system = aggregate_system();
        let device = system.describe(50, Role::Output);
        assert_eq!(
            render(&system, &device, OutputFormat::Human, Detail::WithType),
            "Studio (output)\n  Speakers (output)\n  Mic (input)\n"
        );
        assert_eq!(
            render(&system, &device, OutputFormat::Cli, Detail::WithType),
            "Studio,output,50,agg-studio\n  Speakers,output,10,spk\n  Mic,input,20,mic\n"
        );
    }

    #[test]
    fn test_aggregate_expands_nested_json() {
        let system = aggregate_system();
        let device = system.describe(50, Role::Output);
        let line = render(&system, &device, OutputFormat::Json, Detail::WithType);
        let value: serde_json::Value = serde_json::from_str(line.trim_end()).unwrap();
        assert_eq!(value["subdevices"][0]["name"], "Speakers");
        assert_eq!(value["subdevices"][1]["type"], "input");
        assert!(value["subdevices"][0].get("subdevices").is_none());
    }

    #[test]
    fn test_aggregate_cycle_is_not_reexpanded() {
        let system = aggregate_system();
        system.hardware().make_aggregate(10, &[50]);
        let device = system.describe(50, Role::Output);
        assert_eq!(
            render(&system, &device, OutputFormat::Human, Detail::NameOnly),
            "Studio\n  Speakers\n  Mic\n"
        );
    }
}
