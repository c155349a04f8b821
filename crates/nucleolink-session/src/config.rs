use std::path::Path;
use std::time::Duration;

use nucleolink_frame::{ReassemblyConfig, DEFAULT_LOSS_BOUND};
use nucleolink_transport::DEFAULT_BAUD_RATE;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Session configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Device address written into every outbound frame.
    pub address: u8,
    /// Host protocol version.
    pub version: u8,
    /// Host protocol sub-version.
    pub sub_version: u8,
    /// Serial line speed.
    pub baud_rate: u32,
    /// Log per-frame traffic at `debug` instead of `trace`.
    pub verbose: bool,
    /// Pending fragment bytes beyond which reassembly gives up.
    pub loss_bound: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            address: 0x00,
            version: 0x01,
            sub_version: 0x01,
            baud_rate: DEFAULT_BAUD_RATE,
            verbose: false,
            loss_bound: DEFAULT_LOSS_BOUND,
        }
    }
}

impl SessionConfig {
    /// Load from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub(crate) fn reassembly(&self) -> ReassemblyConfig {
        ReassemblyConfig {
            loss_bound: self.loss_bound,
        }
    }
}

/// Parameters of the init handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitConfig {
    /// Device-side polling interval key sent with the request.
    pub interval: u8,
    /// Polling attempts before giving up.
    pub max_retries: u32,
    /// Sleep between attempts.
    pub retry_delay: Duration,
}

impl Default for InitConfig {
    fn default() -> Self {
        Self {
            interval: 0,
            max_retries: 10,
            retry_delay: Duration::from_millis(100),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.address, 0);
        assert_eq!((config.version, config.sub_version), (1, 1));
        assert_eq!(config.baud_rate, 115_200);
        assert!(!config.verbose);
        assert_eq!(config.reassembly().loss_bound, 20);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: SessionConfig =
            serde_json::from_str(r#"{"address": 3, "verbose": true}"#).unwrap();
        assert_eq!(config.address, 3);
        assert!(config.verbose);
        assert_eq!(config.version, 1);
        assert_eq!(config.baud_rate, 115_200);
    }

    #[test]
    fn loads_from_file() {
        let path = std::env::temp_dir().join(format!(
            "nucleolink-config-{}-{}.json",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("time should be after epoch")
                .as_nanos()
        ));
        std::fs::write(&path, r#"{"version": 2, "sub_version": 0, "baud_rate": 9600}"#)
            .expect("config file should be writable");

        let config = SessionConfig::from_json_file(&path).expect("config should load");
        assert_eq!((config.version, config.sub_version), (2, 0));
        assert_eq!(config.baud_rate, 9600);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = SessionConfig::from_json_file("/nonexistent/nucleolink.json").unwrap_err();
        assert!(matches!(err, crate::SessionError::Io(_)));
    }

    #[test]
    fn init_defaults() {
        let init = InitConfig::default();
        assert_eq!(init.interval, 0);
        assert_eq!(init.max_retries, 10);
        assert_eq!(init.retry_delay, Duration::from_millis(100));
    }
}
