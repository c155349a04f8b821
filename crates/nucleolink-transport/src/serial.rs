//! Serial port transport.
//!
//! Opens the device link 8N1 without flow control and keeps DTR/RTS asserted
//! so boards that reset on DTR edges stay up while the host is attached.

use std::collections::HashMap;
use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, SerialPortType, StopBits};
use tracing::{debug, info, warn};

use crate::error::{Result, TransportError};
use crate::splitter::{FrameSplitter, SplitterConfig};
use crate::traits::Transport;

/// Default baud rate of the device UART.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Default read timeout for a single blocking read.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Device node prefixes probed when no port is configured.
pub const DEFAULT_PROBE_PREFIXES: &[&str] = &["/dev/ttyS", "/dev/ttyACM", "/dev/ttyUSB"];

/// Number of numbered nodes probed per prefix.
const PROBE_RANGE: u8 = 10;

/// Information about an available serial port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    /// Port name (e.g. "/dev/ttyACM0" or "COM3").
    pub name: String,
    /// USB vendor ID (if USB device).
    pub vid: Option<u16>,
    /// USB product ID (if USB device).
    pub pid: Option<u16>,
    /// Manufacturer name (if available).
    pub manufacturer: Option<String>,
    /// Product name (if available).
    pub product: Option<String>,
}

impl From<serialport::SerialPortInfo> for PortInfo {
    fn from(info: serialport::SerialPortInfo) -> Self {
        let (vid, pid, manufacturer, product) = match info.port_type {
            SerialPortType::UsbPort(usb) => {
                (Some(usb.vid), Some(usb.pid), usb.manufacturer, usb.product)
            }
            _ => (None, None, None, None),
        };
        Self {
            name: info.port_name,
            vid,
            pid,
            manufacturer,
            product,
        }
    }
}

/// Sort key: ttyACM* first, then ttyUSB* (both numerically), then the rest by name.
fn port_sort_key(name: &str) -> (u8, usize, String) {
    let basename = name.rsplit('/').next().unwrap_or(name);
    if let Some(rest) = basename.strip_prefix("ttyACM") {
        return (0, rest.parse().unwrap_or(usize::MAX), basename.to_string());
    }
    if let Some(rest) = basename.strip_prefix("ttyUSB") {
        return (1, rest.parse().unwrap_or(usize::MAX), basename.to_string());
    }
    (2, 0, basename.to_string())
}

/// List available serial ports in a deterministic order.
pub fn list_ports() -> Vec<PortInfo> {
    let mut map: HashMap<String, PortInfo> = HashMap::new();
    for info in serialport::available_ports().unwrap_or_default() {
        let port = PortInfo::from(info);
        map.entry(port.name.clone()).or_insert(port);
    }

    let mut ports: Vec<PortInfo> = map.into_values().collect();
    ports.sort_by_key(|p| port_sort_key(&p.name));
    ports
}

/// Configuration for [`SerialTransport`].
#[derive(Debug, Clone)]
pub struct SerialConfig {
    /// Explicit device path. `None` probes [`SerialConfig::probe_prefixes`].
    pub port: Option<String>,
    /// Line speed.
    pub baud_rate: u32,
    /// Timeout for a single blocking read.
    pub read_timeout: Duration,
    /// Prefixes probed as `<prefix>0` .. `<prefix>9` during discovery.
    pub probe_prefixes: Vec<String>,
    /// Capacity hints for candidate splitting.
    pub splitter: SplitterConfig,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: None,
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout: DEFAULT_READ_TIMEOUT,
            probe_prefixes: DEFAULT_PROBE_PREFIXES
                .iter()
                .map(|p| p.to_string())
                .collect(),
            splitter: SplitterConfig::default(),
        }
    }
}

impl SerialConfig {
    /// Configuration for an explicit port path.
    pub fn for_port(port: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            port: Some(port.into()),
            baud_rate,
            ..Self::default()
        }
    }

    fn candidates(&self) -> Vec<String> {
        match &self.port {
            Some(port) => vec![port.clone()],
            None => self
                .probe_prefixes
                .iter()
                .flat_map(|prefix| (0..PROBE_RANGE).map(move |i| format!("{prefix}{i}")))
                .collect(),
        }
    }
}

/// A [`Transport`] over a serial port.
pub struct SerialTransport {
    config: SerialConfig,
    port: Option<Box<dyn SerialPort>>,
    device: Option<String>,
    splitter: FrameSplitter,
}

impl SerialTransport {
    /// Create a transport; the port is not opened until [`Transport::connect`].
    pub fn new(config: SerialConfig) -> Self {
        let splitter = FrameSplitter::with_config(config.splitter.clone());
        Self {
            config,
            port: None,
            device: None,
            splitter,
        }
    }

    /// Path of the currently (or last) opened device.
    pub fn device(&self) -> Option<&str> {
        self.device.as_deref()
    }

    /// Current configuration.
    pub fn config(&self) -> &SerialConfig {
        &self.config
    }

    fn open(&self, path: &str) -> Result<Box<dyn SerialPort>> {
        let mut port = serialport::new(path, self.config.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(self.config.read_timeout)
            .open()
            .map_err(|source| TransportError::Open {
                port: path.to_string(),
                source,
            })?;

        if let Err(err) = port.write_data_terminal_ready(true) {
            warn!(port = path, error = %err, "failed to assert DTR (continuing)");
        }
        if let Err(err) = port.write_request_to_send(true) {
            warn!(port = path, error = %err, "failed to assert RTS (continuing)");
        }
        port.clear(ClearBuffer::All)?;

        Ok(port)
    }

    fn port_mut(&mut self) -> Result<&mut Box<dyn SerialPort>> {
        self.port.as_mut().ok_or(TransportError::NotConnected)
    }
}

impl Transport for SerialTransport {
    fn connect(&mut self) -> Result<()> {
        self.disconnect();

        let candidates = self.config.candidates();
        let tried = candidates.len();
        for path in candidates {
            match self.open(&path) {
                Ok(port) => {
                    info!(port = %path, baud = self.config.baud_rate, "serial link open");
                    self.port = Some(port);
                    self.device = Some(path);
                    self.splitter.reset();
                    return Ok(());
                }
                Err(err) if self.config.port.is_some() => return Err(err),
                Err(err) => debug!(port = %path, error = %err, "probe failed"),
            }
        }

        Err(TransportError::NoDevice { tried })
    }

    fn is_connected(&self) -> bool {
        match (&self.port, &self.device) {
            (Some(_), Some(device)) => device_present(device),
            _ => false,
        }
    }

    fn disconnect(&mut self) {
        if self.port.take().is_some() {
            info!(port = self.device.as_deref().unwrap_or("?"), "serial link closed");
        }
    }

    fn write(&mut self, bytes: &[u8]) -> Result<usize> {
        let port = self.port_mut()?;
        port.write_all(bytes)?;
        port.flush()?;
        Ok(bytes.len())
    }

    fn read_frames(&mut self, terminator: u8, escape: u8) -> Result<Vec<Vec<u8>>> {
        let port = self.port_mut()?;
        let available = port.bytes_to_read()? as usize;
        if available == 0 {
            return Ok(Vec::new());
        }

        let mut buf = vec![0u8; available];
        let mut filled = 0usize;
        while filled < available {
            match port.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::TimedOut => break,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }

        Ok(self.splitter.split(&buf[..filled], terminator, escape))
    }
}

impl std::fmt::Debug for SerialTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialTransport")
            .field("device", &self.device)
            .field("open", &self.port.is_some())
            .field("baud_rate", &self.config.baud_rate)
            .finish()
    }
}

/// The device node disappears when a USB adapter is unplugged.
#[cfg(unix)]
fn device_present(device: &str) -> bool {
    std::path::Path::new(device).exists()
}

#[cfg(not(unix))]
fn device_present(_device: &str) -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_sorting() {
        let mut names = vec![
            "/dev/ttyUSB1",
            "/dev/ttyACM1",
            "/dev/ttyUSB0",
            "/dev/ttyACM0",
            "/dev/someport",
            "/dev/ttyACM10",
        ];
        names.sort_by_key(|n| port_sort_key(n));
        assert_eq!(
            names,
            vec![
                "/dev/ttyACM0",
                "/dev/ttyACM1",
                "/dev/ttyACM10",
                "/dev/ttyUSB0",
                "/dev/ttyUSB1",
                "/dev/someport",
            ]
        );
    }

    #[test]
    fn discovery_candidates_cover_each_prefix() {
        let config = SerialConfig::default();
        let candidates = config.candidates();
        assert_eq!(
            candidates.len(),
            DEFAULT_PROBE_PREFIXES.len() * PROBE_RANGE as usize
        );
        assert_eq!(candidates[0], "/dev/ttyS0");
        assert!(candidates.contains(&"/dev/ttyACM9".to_string()));
    }

    #[test]
    fn explicit_port_is_the_only_candidate() {
        let config = SerialConfig::for_port("/dev/ttyACM3", 9600);
        assert_eq!(config.candidates(), vec!["/dev/ttyACM3".to_string()]);
        assert_eq!(config.baud_rate, 9600);
    }

    #[test]
    fn unopened_transport_is_disconnected() {
        let mut transport = SerialTransport::new(SerialConfig::default());
        assert!(!transport.is_connected());
        assert!(matches!(
            transport.write(&[0x01]),
            Err(TransportError::NotConnected)
        ));
        assert!(matches!(
            transport.read_frames(0xEE, 0x7E),
            Err(TransportError::NotConnected)
        ));
    }

    #[test]
    fn explicit_missing_port_fails_to_open() {
        let mut transport =
            SerialTransport::new(SerialConfig::for_port("/dev/nucleolink-missing-0", 9600));
        assert!(matches!(
            transport.connect(),
            Err(TransportError::Open { .. })
        ));
    }

    #[test]
    fn list_ports_does_not_panic() {
        let _ = list_ports();
    }
}
