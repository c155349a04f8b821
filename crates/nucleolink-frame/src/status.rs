//! Protocol status taxonomy and buffered entries.

use bytes::Bytes;

/// Outcome of a protocol operation or of decoding one frame.
///
/// Numeric codes are stable and shared with the device, which reports its own
/// readiness in the same code space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Ok,
    /// Key never seen, or already fetched since the last poll.
    NotInBuffer,
    /// Frame still assembling.
    IncompleteCommunication,
    /// The link is down or a write failed.
    TransportDown,
    /// The device runs a newer protocol than the host.
    HostOldVersion,
    /// The host runs a newer protocol than the device.
    DeviceOldVersion,
    /// No answer within the retry budget.
    DeviceTimeout,
    /// A frame that cannot be classified or is malformed.
    InvalidResponse,
    ChecksumFailed,
}

impl Status {
    /// Stable numeric code.
    pub fn code(self) -> u8 {
        match self {
            Status::Ok => 0,
            Status::NotInBuffer => 1,
            Status::IncompleteCommunication => 2,
            Status::TransportDown => 3,
            Status::HostOldVersion => 4,
            Status::DeviceOldVersion => 5,
            Status::DeviceTimeout => 6,
            Status::InvalidResponse => 7,
            Status::ChecksumFailed => 8,
        }
    }

    /// Status for a numeric code, if the code is known.
    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0 => Status::Ok,
            1 => Status::NotInBuffer,
            2 => Status::IncompleteCommunication,
            3 => Status::TransportDown,
            4 => Status::HostOldVersion,
            5 => Status::DeviceOldVersion,
            6 => Status::DeviceTimeout,
            7 => Status::InvalidResponse,
            8 => Status::ChecksumFailed,
            _ => return None,
        })
    }

    pub fn is_ok(self) -> bool {
        self == Status::Ok
    }

    /// Upper-snake-case name.
    pub fn name(self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::NotInBuffer => "NOT_IN_BUFFER",
            Status::IncompleteCommunication => "INCOMPLETE_COMMUNICATION",
            Status::TransportDown => "TRANSPORT_DOWN",
            Status::HostOldVersion => "HOST_OLD_VERSION",
            Status::DeviceOldVersion => "DEVICE_OLD_VERSION",
            Status::DeviceTimeout => "DEVICE_TIMEOUT",
            Status::InvalidResponse => "INVALID_RESPONSE",
            Status::ChecksumFailed => "CHECKSUM_FAILED",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({:#04x})", self.name(), self.code())
    }
}

/// One buffered result for a key: the decode status and, when the frame
/// checked out, its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub status: Status,
    pub payload: Option<Bytes>,
}

impl Entry {
    /// A verified payload.
    pub fn ok(payload: impl Into<Bytes>) -> Self {
        Self {
            status: Status::Ok,
            payload: Some(payload.into()),
        }
    }

    /// A failure with no payload.
    pub fn failed(status: Status) -> Self {
        Self {
            status,
            payload: None,
        }
    }

    /// The entry returned for a key that is not buffered.
    pub fn missing() -> Self {
        Self::failed(Status::NotInBuffer)
    }

    pub fn is_ok(&self) -> bool {
        self.status.is_ok()
    }

    /// Payload bytes, empty when absent.
    pub fn payload_bytes(&self) -> &[u8] {
        self.payload.as_deref().unwrap_or_default()
    }
}
