use std::cmp::Ordering;

use bytes::BytesMut;
use nucleolink_frame::{encode_frame, Entry, Identity, Status};
use serde::Serialize;

use crate::config::SessionConfig;
use crate::error::{Result, SessionError};

/// Minimum INIT response payload: identity, version, sub-version, status.
const MIN_RESPONSE_LEN: usize = 4;

/// Host side of the init handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitRequest {
    pub address: u8,
    pub version: u8,
    pub sub_version: u8,
    /// Device-side polling interval key.
    pub interval: u8,
}

impl InitRequest {
    pub fn new(config: &SessionConfig, interval: u8) -> Self {
        Self {
            address: config.address,
            version: config.version,
            sub_version: config.sub_version,
            interval,
        }
    }

    /// Append the encoded INIT frame to `dst`.
    pub fn encode(&self, dst: &mut BytesMut) {
        encode_frame(
            Identity::Init,
            &[self.address, self.version, self.sub_version, self.interval],
            dst,
        );
    }
}

/// What the device reported in its INIT response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub version: u8,
    pub sub_version: u8,
    /// Device readiness, in the [`Status`] code space.
    pub status: u8,
}

impl DeviceInfo {
    /// Parse the INIT entry and check it against the host version.
    ///
    /// The entry payload is the unescaped frame minus checksum and terminator:
    /// `[INIT, version, sub_version, status, ...]`.
    pub fn from_entry(entry: &Entry, host: (u8, u8)) -> Result<Self> {
        if !entry.is_ok() {
            return Err(SessionError::Handshake(entry.status));
        }
        let payload = entry.payload_bytes();
        if payload.len() < MIN_RESPONSE_LEN {
            return Err(SessionError::Handshake(Status::InvalidResponse));
        }
        let info = Self {
            version: payload[1],
            sub_version: payload[2],
            status: payload[3],
        };
        info.check(host)?;
        Ok(info)
    }

    /// Version gate, then the device's own readiness status.
    fn check(&self, host: (u8, u8)) -> Result<()> {
        let status = match (self.version, self.sub_version).cmp(&host) {
            Ordering::Less => Status::DeviceOldVersion,
            Ordering::Greater => Status::HostOldVersion,
            Ordering::Equal => {
                Status::from_code(self.status).unwrap_or(Status::InvalidResponse)
            }
        };
        if status.is_ok() {
            Ok(())
        } else {
            Err(SessionError::Handshake(status))
        }
    }
}
