use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand};
use nucleolink_session::{InitConfig, SensorConfig, SessionConfig};
use nucleolink_transport::SerialConfig;

use crate::exit::{session_error, CliResult};
use crate::output::OutputFormat;

pub mod monitor;
pub mod ports;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List serial ports.
    Ports(PortsArgs),
    /// Initialize the device and print heartbeat and sensor entries.
    Monitor(MonitorArgs),
    /// Send a single command frame.
    Send(SendArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Ports(args) => ports::run(args, format),
        Command::Monitor(args) => monitor::run(args, format),
        Command::Send(args) => send::run(args, format),
        Command::Version(args) => version::run(args, format),
    }
}

/// How to reach and initialize the device.
#[derive(Args, Debug)]
pub struct LinkArgs {
    /// Serial port path. Default: probe /dev/ttyS*, /dev/ttyACM*, /dev/ttyUSB*.
    pub port: Option<String>,
    /// Session configuration file (JSON).
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
    /// Device address.
    #[arg(long, value_parser = parse_byte)]
    pub address: Option<u8>,
    /// Serial line speed.
    #[arg(long)]
    pub baud: Option<u32>,
    /// Log frame traffic at debug level.
    #[arg(long, short = 'v')]
    pub verbose: bool,
    /// Device polling interval key sent with the init request.
    #[arg(long, value_parser = parse_byte, default_value = "0")]
    pub interval: u8,
    /// Polls per init attempt before the device counts as timed out.
    #[arg(long, default_value = "10")]
    pub retries: u32,
    /// Delay between init polls (e.g. 100ms, 1s).
    #[arg(long, value_parser = parse_duration, default_value = "100ms")]
    pub retry_delay: Duration,
}

impl LinkArgs {
    /// File configuration (if any) with flag overrides applied.
    pub fn session_config(&self) -> CliResult<SessionConfig> {
        let mut config = match &self.config {
            Some(path) => SessionConfig::from_json_file(path).map_err(|err| {
                session_error(&format!("failed loading {}", path.display()), err)
            })?,
            None => SessionConfig::default(),
        };
        if let Some(address) = self.address {
            config.address = address;
        }
        if let Some(baud) = self.baud {
            config.baud_rate = baud;
        }
        config.verbose |= self.verbose;
        Ok(config)
    }

    pub fn serial_config(&self) -> SerialConfig {
        SerialConfig {
            port: self.port.clone(),
            ..SerialConfig::default()
        }
    }

    pub fn init_config(&self) -> InitConfig {
        InitConfig {
            interval: self.interval,
            max_retries: self.retries,
            retry_delay: self.retry_delay,
        }
    }
}

#[derive(Args, Debug, Default)]
pub struct PortsArgs {}

#[derive(Args, Debug)]
pub struct MonitorArgs {
    #[command(flatten)]
    pub link: LinkArgs,
    /// Register a sensor slot as id:address:interval:type (repeatable).
    #[arg(long = "sensor", value_name = "SPEC")]
    pub sensors: Vec<SensorConfig>,
    /// Exit after N polling iterations.
    #[arg(long)]
    pub count: Option<u64>,
    /// Delay between polling iterations (e.g. 100ms, 1s).
    #[arg(long, value_parser = parse_duration, default_value = "100ms")]
    pub period: Duration,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    #[command(flatten)]
    pub link: LinkArgs,
    /// Command id (0 motor, 1 arm, 2 sensor).
    #[arg(long, short = 'c', value_parser = parse_byte)]
    pub command: u8,
    /// 16-bit values (comma-separated, decimal or 0x hex).
    #[arg(long, value_delimiter = ',', value_parser = parse_u16)]
    pub values: Vec<u16>,
    /// Poll for the device's echo of the command and print it.
    #[arg(long)]
    pub wait: bool,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

fn parse_number(input: &str) -> Result<u64, String> {
    let input = input.trim();
    let parsed = match input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => input.parse(),
    };
    parsed.map_err(|_| format!("invalid number: {input}"))
}

pub fn parse_byte(input: &str) -> Result<u8, String> {
    let value = parse_number(input)?;
    u8::try_from(value).map_err(|_| format!("{input} does not fit in a byte"))
}

pub fn parse_u16(input: &str) -> Result<u16, String> {
    let value = parse_number(input)?;
    u16::try_from(value).map_err(|_| format!("{input} does not fit in 16 bits"))
}

pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let input = input.trim();
    if input.is_empty() {
        return Err("duration must not be empty".to_string());
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| format!("invalid duration value: {input}"))?;

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}
