use std::time::Duration;

use bytes::BytesMut;
use nucleolink_frame::{
    encode_frame, CycleReport, Demux, Entry, HexBytes, Identity, Status, ESCAPE, HEARTBEAT, INIT,
    TERMINATOR,
};
use nucleolink_transport::Transport;
use tracing::{debug, info, warn};

use crate::command::CommandType;
use crate::config::{InitConfig, SessionConfig};
use crate::error::{Result, SessionError};
use crate::handshake::{DeviceInfo, InitRequest};
use crate::sensor::SensorConfig;

/// Per-frame traffic: `debug` when the session is verbose, `trace` otherwise.
macro_rules! traffic {
    ($verbose:expr, $($arg:tt)+) => {
        if $verbose {
            tracing::debug!($($arg)+)
        } else {
            tracing::trace!($($arg)+)
        }
    };
}

/// A protocol session with one device over an exclusively owned transport.
///
/// Driven from a single thread: call [`Session::poll`] to drain the link,
/// then [`Session::fetch`] each key of interest. Fetching removes the entry,
/// so every read sees data from a poll that happened after the previous read.
pub struct Session<T: Transport> {
    transport: T,
    config: SessionConfig,
    demux: Demux,
    device: Option<DeviceInfo>,
    last_cycle: CycleReport,
}

impl<T: Transport> Session<T> {
    /// Create a session. The transport is not connected until
    /// [`Session::connect`].
    pub fn new(transport: T, config: SessionConfig) -> Self {
        let demux = Demux::with_config(config.reassembly());
        Self {
            transport,
            config,
            demux,
            device: None,
            last_cycle: CycleReport::default(),
        }
    }

    /// Connect the transport. A no-op when already connected.
    ///
    /// A fresh connection starts with an empty buffer and no pending
    /// fragment.
    pub fn connect(&mut self) -> Result<()> {
        if self.transport.is_connected() {
            return Ok(());
        }
        self.transport.connect()?;
        self.demux.clear();
        self.device = None;
        info!(address = self.config.address, "session connected");
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// Run the init handshake and return what the device reported.
    ///
    /// Writes one INIT request, then polls up to `max_retries` times (sleeping
    /// `retry_delay` between attempts) until an INIT response is buffered.
    /// A `max_retries` of zero still polls once.
    pub fn handshake(&mut self, init: &InitConfig) -> Result<DeviceInfo> {
        self.ensure_connected()?;
        self.device = None;
        // a stale response from an earlier request must not satisfy this one
        self.demux.pop(INIT);

        let mut frame = BytesMut::new();
        InitRequest::new(&self.config, init.interval).encode(&mut frame);
        self.write_frame(&frame)?;

        let attempts = init.max_retries.max(1);
        for attempt in 1..=attempts {
            self.poll()?;
            if self.demux.contains(INIT) {
                let entry = self.demux.pop(INIT);
                let host = (self.config.version, self.config.sub_version);
                return match DeviceInfo::from_entry(&entry, host) {
                    Ok(device) => {
                        info!(
                            version = device.version,
                            sub_version = device.sub_version,
                            attempt,
                            "handshake complete"
                        );
                        self.device = Some(device);
                        Ok(device)
                    }
                    Err(err) => {
                        warn!(error = %err, attempt, "handshake rejected");
                        Err(err)
                    }
                };
            }
            if attempt < attempts {
                std::thread::sleep(init.retry_delay);
            }
        }

        warn!(attempts, "no init response from device");
        Err(SessionError::Handshake(Status::DeviceTimeout))
    }

    /// Run the init handshake, reporting the outcome as a [`Status`].
    pub fn init(&mut self, interval: u8, max_retries: u32, retry_delay: Duration) -> Status {
        let init = InitConfig {
            interval,
            max_retries,
            retry_delay,
        };
        match self.handshake(&init) {
            Ok(_) => Status::Ok,
            Err(err) => err.status(),
        }
    }

    /// Send a `COMM` frame: `[COMM, address, command, (hi, lo) per value]`.
    ///
    /// Returns the number of bytes written, escapes included.
    pub fn send(&mut self, command: impl Into<u8>, values: &[u16]) -> Result<usize> {
        self.ensure_connected()?;
        let mut body = Vec::with_capacity(2 + values.len() * 2);
        body.push(self.config.address);
        body.push(command.into());
        for value in values {
            body.extend_from_slice(&value.to_be_bytes());
        }

        let mut frame = BytesMut::new();
        encode_frame(Identity::Comm, &body, &mut frame);
        self.write_frame(&frame)
    }

    /// Register a sensor polling slot on the device.
    pub fn register_sensor(&mut self, sensor: &SensorConfig) -> Result<usize> {
        if sensor.is_reserved() {
            return Err(SessionError::ReservedKey(sensor.id));
        }
        let written = self.send(CommandType::Sensor, &sensor.encode())?;
        debug!(
            id = sensor.id,
            address = sensor.peripheral_address,
            kind = %sensor.sensor_type,
            "sensor registered"
        );
        Ok(written)
    }

    /// Drain everything the transport has and file it. Returns the readable
    /// keys afterwards.
    pub fn poll(&mut self) -> Result<Vec<u8>> {
        self.ensure_connected()?;
        let candidates = self.transport.read_frames(TERMINATOR, ESCAPE)?;
        for candidate in &candidates {
            traffic!(self.config.verbose, bytes = %HexBytes(candidate.as_slice()), "recv");
        }

        let report = self.demux.drain_cycle(candidates);
        if report.rebuilt > 0 {
            traffic!(self.config.verbose, rebuilt = report.rebuilt, "frames rebuilt");
        }
        if report.discarded_bytes > 0 {
            warn!(
                bytes = report.discarded_bytes,
                "fragments dropped after passing the loss bound"
            );
        }
        if report.checksum_failures > 0 {
            warn!(count = report.checksum_failures, "checksum failures");
        }
        if report.dropped > 0 {
            warn!(count = report.dropped, "malformed frames dropped");
        }
        self.last_cycle = report;

        Ok(self.demux.keys())
    }

    /// Remove and return the entry for `key`. A second fetch without an
    /// intervening poll returns [`Status::NotInBuffer`].
    pub fn fetch(&mut self, key: u8) -> Entry {
        self.demux.pop(key)
    }

    /// Latest reading of sensor `id`.
    pub fn fetch_sensor(&mut self, id: u8) -> Entry {
        self.fetch(id)
    }

    /// Latest heartbeat.
    pub fn fetch_heartbeat(&mut self) -> Entry {
        self.fetch(HEARTBEAT)
    }

    /// Readable keys as of the last poll, minus anything fetched since.
    pub fn keys(&self) -> Vec<u8> {
        self.demux.keys()
    }

    /// Read access to the demultiplexing buffer.
    pub fn buffer(&self) -> &Demux {
        &self.demux
    }

    /// Counters from the most recent poll.
    pub fn last_cycle(&self) -> &CycleReport {
        &self.last_cycle
    }

    /// Device information from the last successful handshake.
    pub fn device(&self) -> Option<DeviceInfo> {
        self.device
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Release the transport. Idempotent.
    pub fn disconnect(&mut self) {
        if self.transport.is_connected() {
            info!("session disconnected");
        }
        self.transport.disconnect();
        self.device = None;
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.transport.is_connected() {
            Ok(())
        } else {
            Err(SessionError::NotConnected)
        }
    }

    fn write_frame(&mut self, frame: &[u8]) -> Result<usize> {
        let written = self.transport.write(frame)?;
        traffic!(self.config.verbose, bytes = %HexBytes(frame), "sent");
        Ok(written)
    }
}

impl<T: Transport> Drop for Session<T> {
    fn drop(&mut self) {
        self.disconnect();
    }
}

impl<T: Transport> std::fmt::Debug for Session<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("connected", &self.transport.is_connected())
            .field("device", &self.device)
            .field("keys", &self.demux.keys())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use nucleolink_transport::{MemoryHandle, MemoryTransport};

    use super::*;
    use crate::sensor::SensorType;

    const INIT_OK: [u8; 7] = [0xFF, 0x01, 0x01, 0x00, 0x00, 0x44, 0xEE];

    fn connected() -> (Session<MemoryTransport>, MemoryHandle) {
        let (transport, handle) = MemoryTransport::pair();
        let mut session = Session::new(transport, SessionConfig::default());
        session.connect().expect("memory link should connect");
        (session, handle)
    }

    fn quick_init() -> InitConfig {
        InitConfig {
            interval: 0,
            max_retries: 3,
            retry_delay: Duration::ZERO,
        }
    }

    #[test]
    fn connect_is_idempotent() {
        let (mut session, handle) = connected();
        session.connect().unwrap();
        session.connect().unwrap();
        assert_eq!(handle.connect_count(), 1);
        assert!(session.is_connected());
    }

    #[test]
    fn send_encodes_comm_frame() {
        let (mut session, handle) = connected();
        let written = session.send(CommandType::Arm, &[0x0001, 0x0030]).unwrap();
        assert_eq!(written, 9);
        assert_eq!(
            handle.written(),
            vec![vec![0xAA, 0x00, 0x01, 0x00, 0x01, 0x00, 0x30, 0xE1, 0xEE]]
        );
    }

    #[test]
    fn send_requires_connection() {
        let (transport, handle) = MemoryTransport::pair();
        let mut session = Session::new(transport, SessionConfig::default());
        let err = session.send(1u8, &[0x0001]).unwrap_err();
        assert!(matches!(err, SessionError::NotConnected));
        assert!(handle.written().is_empty());
    }

    #[test]
    fn handshake_succeeds() {
        let (mut session, handle) = connected();
        handle.push_read(INIT_OK.to_vec());

        let device = session.handshake(&quick_init()).unwrap();
        assert_eq!((device.version, device.sub_version), (1, 1));
        assert_eq!(session.device(), Some(device));
        assert_eq!(
            handle.written(),
            vec![vec![0xFF, 0x00, 0x01, 0x01, 0x00, 0x47, 0xEE]]
        );
        assert!(!session.buffer().contains(INIT));
    }

    #[test]
    fn init_times_out() {
        let (mut session, _handle) = connected();
        let status = session.init(0, 3, Duration::ZERO);
        assert_eq!(status, Status::DeviceTimeout);
        assert!(session.device().is_none());
    }

    #[test]
    fn zero_retries_still_polls_once() {
        let (mut session, handle) = connected();
        handle.push_read(INIT_OK.to_vec());
        assert_eq!(session.init(0, 0, Duration::ZERO), Status::Ok);

        assert_eq!(session.init(0, 0, Duration::ZERO), Status::DeviceTimeout);
    }

    #[test]
    fn stale_init_response_is_discarded() {
        let (mut session, handle) = connected();
        handle.push_read(INIT_OK.to_vec());
        session.poll().unwrap();
        assert!(session.buffer().contains(INIT));

        assert_eq!(session.init(0, 2, Duration::ZERO), Status::DeviceTimeout);
        assert!(!session.buffer().contains(INIT));
    }

    #[test]
    fn init_reports_write_failure() {
        let (mut session, handle) = connected();
        handle.set_fail_writes(true);
        assert_eq!(session.init(0, 1, Duration::ZERO), Status::TransportDown);
    }

    #[test]
    fn init_reports_checksum_failure() {
        let (mut session, handle) = connected();
        handle.push_read(vec![0xFF, 0x01, 0x01, 0x00, 0x00, 0x45, 0xEE]);
        assert_eq!(session.init(0, 2, Duration::ZERO), Status::ChecksumFailed);
    }

    #[test]
    fn register_sensor_sends_sensor_command() {
        let (mut session, handle) = connected();
        let sensor = SensorConfig {
            id: 0x00,
            peripheral_address: 0x22,
            interval_key: 0x00,
            sensor_type: SensorType::Temperature,
        };
        session.register_sensor(&sensor).unwrap();
        assert_eq!(
            handle.written(),
            vec![vec![0xAA, 0x00, 0x02, 0x00, 0x22, 0x00, 0x01, 0x2E, 0xEE]]
        );
    }

    #[test]
    fn register_sensor_rejects_reserved_id() {
        let (mut session, handle) = connected();
        let sensor = SensorConfig {
            id: 0xDE,
            peripheral_address: 0x22,
            interval_key: 0x00,
            sensor_type: SensorType::Ph,
        };
        let err = session.register_sensor(&sensor).unwrap_err();
        assert!(matches!(err, SessionError::ReservedKey(0xDE)));
        assert!(handle.written().is_empty());
    }

    #[test]
    fn poll_then_fetch_once() {
        let (mut session, handle) = connected();
        handle.push_read(vec![0xBB, 0x01, 0x00, 0x13, 0xEE]);
        handle.push_read(vec![0xCC, 0x00, 0x00, 0x01, 0x02, 0xD2, 0xEE]);

        assert_eq!(session.poll().unwrap(), vec![0x00, HEARTBEAT]);
        assert_eq!(session.fetch_heartbeat(), Entry::ok(vec![0x00]));
        assert_eq!(session.fetch_sensor(0x00), Entry::ok(vec![0x01, 0x02]));
        assert_eq!(session.fetch_heartbeat(), Entry::missing());
        assert!(session.keys().is_empty());
    }

    #[test]
    fn poll_after_link_loss() {
        let (mut session, handle) = connected();
        handle.set_link_up(false);
        let err = session.poll().unwrap_err();
        assert_eq!(err.status(), Status::TransportDown);
        assert!(session.connect().is_err());

        handle.set_link_up(true);
        session.connect().unwrap();
        assert!(session.poll().unwrap().is_empty());
    }

    #[test]
    fn reconnect_clears_pending_fragment() {
        let (mut session, handle) = connected();
        handle.push_read(vec![0xFF, 0x01, 0x01]);
        session.poll().unwrap();
        assert!(!session.buffer().reassembly().is_empty());

        session.disconnect();
        session.connect().unwrap();
        assert!(session.buffer().reassembly().is_empty());
    }

    #[test]
    fn drop_disconnects() {
        let (session, handle) = connected();
        assert!(handle.is_connected());
        drop(session);
        assert!(!handle.is_connected());
    }
}
