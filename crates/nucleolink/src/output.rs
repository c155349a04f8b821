use std::io::IsTerminal;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use nucleolink_frame::{Entry, HexBytes};
use nucleolink_session::DeviceInfo;
use nucleolink_transport::PortInfo;
use serde::Serialize;

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// One entry fetched during a monitor iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reading {
    pub iteration: u64,
    pub label: String,
    pub key: u8,
    pub entry: Entry,
}

#[derive(Serialize)]
struct ReadingOutput<'a> {
    iteration: u64,
    label: &'a str,
    key: u8,
    status: &'static str,
    status_code: u8,
    payload: Option<String>,
    timestamp: String,
}

impl<'a> From<&'a Reading> for ReadingOutput<'a> {
    fn from(reading: &'a Reading) -> Self {
        Self {
            iteration: reading.iteration,
            label: &reading.label,
            key: reading.key,
            status: reading.entry.status.name(),
            status_code: reading.entry.status.code(),
            payload: reading
                .entry
                .payload
                .as_deref()
                .map(|bytes| HexBytes(bytes).to_string()),
            timestamp: now_unix_seconds(),
        }
    }
}

pub fn print_readings(readings: &[Reading], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            for reading in readings {
                print_json(&ReadingOutput::from(reading));
            }
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["#", "SOURCE", "KEY", "STATUS", "PAYLOAD"]);
            for reading in readings {
                table.add_row(vec![
                    reading.iteration.to_string(),
                    reading.label.clone(),
                    format!("{:#04x}", reading.key),
                    reading.entry.status.name().to_string(),
                    payload_preview(&reading.entry),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for reading in readings {
                println!(
                    "[{}] {} key={:#04x} status={} payload={}",
                    reading.iteration,
                    reading.label,
                    reading.key,
                    reading.entry.status,
                    payload_preview(&reading.entry)
                );
            }
        }
    }
}

#[derive(Serialize)]
struct DeviceOutput<'a> {
    port: Option<&'a str>,
    version: u8,
    sub_version: u8,
    status: u8,
}

pub fn print_device(device: &DeviceInfo, port: Option<&str>, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&DeviceOutput {
            port,
            version: device.version,
            sub_version: device.sub_version,
            status: device.status,
        }),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["PORT", "VERSION", "STATUS"])
                .add_row(vec![
                    port.unwrap_or("-").to_string(),
                    format!("{}.{}", device.version, device.sub_version),
                    device.status.to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "device port={} version={}.{} status={}",
                port.unwrap_or("-"),
                device.version,
                device.sub_version,
                device.status
            );
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SentOutput {
    pub command: u8,
    pub values: Vec<u16>,
    pub bytes_written: usize,
}

pub fn print_sent(sent: &SentOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(sent),
        OutputFormat::Table => {
            let values: Vec<String> = sent.values.iter().map(|v| format!("{v:#06x}")).collect();
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["COMMAND", "VALUES", "BYTES"])
                .add_row(vec![
                    sent.command.to_string(),
                    values.join(","),
                    sent.bytes_written.to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "sent command={} values={:?} bytes={}",
                sent.command, sent.values, sent.bytes_written
            );
        }
    }
}

#[derive(Serialize)]
struct PortOutput<'a> {
    name: &'a str,
    vid: Option<String>,
    pid: Option<String>,
    manufacturer: Option<&'a str>,
    product: Option<&'a str>,
}

pub fn print_ports(ports: &[PortInfo], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out: Vec<PortOutput<'_>> = ports
                .iter()
                .map(|port| PortOutput {
                    name: &port.name,
                    vid: port.vid.map(|v| format!("{v:04x}")),
                    pid: port.pid.map(|p| format!("{p:04x}")),
                    manufacturer: port.manufacturer.as_deref(),
                    product: port.product.as_deref(),
                })
                .collect();
            print_json(&out);
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["PORT", "VID:PID", "MANUFACTURER", "PRODUCT"]);
            for port in ports {
                table.add_row(vec![
                    port.name.clone(),
                    usb_id(port),
                    port.manufacturer.clone().unwrap_or_default(),
                    port.product.clone().unwrap_or_default(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for port in ports {
                println!("{} {}", port.name, usb_id(port));
            }
        }
    }
}

fn usb_id(port: &PortInfo) -> String {
    match (port.vid, port.pid) {
        (Some(vid), Some(pid)) => format!("{vid:04x}:{pid:04x}"),
        _ => "-".to_string(),
    }
}

fn payload_preview(entry: &Entry) -> String {
    match entry.payload.as_deref() {
        Some(bytes) => HexBytes(bytes).to_string(),
        None => "-".to_string(),
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nucleolink_frame::Status;

    #[test]
    fn reading_json_shape() {
        let reading = Reading {
            iteration: 3,
            label: "sensor 1".to_string(),
            key: 1,
            entry: Entry::ok(vec![0x7E, 0x05]),
        };
        let value = serde_json::to_value(ReadingOutput::from(&reading)).unwrap();
        assert_eq!(value["status"], "OK");
        assert_eq!(value["payload"], "7e 05");
        assert_eq!(value["key"], 1);
    }

    #[test]
    fn failed_reading_has_no_payload() {
        let reading = Reading {
            iteration: 0,
            label: "heartbeat".to_string(),
            key: 0xBB,
            entry: Entry::failed(Status::ChecksumFailed),
        };
        let value = serde_json::to_value(ReadingOutput::from(&reading)).unwrap();
        assert_eq!(value["status_code"], 8);
        assert!(value["payload"].is_null());
        assert_eq!(payload_preview(&reading.entry), "-");
    }
}
