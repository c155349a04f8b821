//! Wire constants and frame identities.
//!
//! The identity byte opens every frame and selects how the rest of it is
//! interpreted. The set is closed: anything else is not a frame start.

use crate::error::FrameError;

/// Handshake frame.
pub const INIT: u8 = 0xFF;

/// Motor, arm and sensor-configuration commands (and their echoes).
pub const COMM: u8 = 0xAA;

/// Device health/status.
pub const HEARTBEAT: u8 = 0xBB;

/// Sensor readback.
pub const SENSOR: u8 = 0xCC;

/// Frame end.
pub const TERMINATOR: u8 = 0xEE;

/// Byte-stuffing marker.
pub const ESCAPE: u8 = 0x7E;

/// Buffer key that never names device data.
pub const RESERVED_KEY: u8 = 0xDE;

/// Bytes that must be escaped inside payload and checksum.
pub const RESERVED_BYTES: [u8; 6] = [INIT, COMM, HEARTBEAT, SENSOR, TERMINATOR, ESCAPE];

/// The closed set of frame identities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Identity {
    Init,
    Comm,
    Heartbeat,
    Sensor,
}

impl Identity {
    /// All identities, in wire-constant order.
    pub const ALL: [Identity; 4] = [
        Identity::Init,
        Identity::Comm,
        Identity::Heartbeat,
        Identity::Sensor,
    ];

    /// The identity byte on the wire.
    pub fn as_byte(self) -> u8 {
        match self {
            Identity::Init => INIT,
            Identity::Comm => COMM,
            Identity::Heartbeat => HEARTBEAT,
            Identity::Sensor => SENSOR,
        }
    }

    /// Human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            Identity::Init => "INIT",
            Identity::Comm => "COMM",
            Identity::Heartbeat => "HEARTBEAT",
            Identity::Sensor => "SENSOR",
        }
    }
}

impl TryFrom<u8> for Identity {
    type Error = FrameError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            INIT => Ok(Identity::Init),
            COMM => Ok(Identity::Comm),
            HEARTBEAT => Ok(Identity::Heartbeat),
            SENSOR => Ok(Identity::Sensor),
            other => Err(FrameError::UnknownIdentity(other)),
        }
    }
}

impl From<Identity> for u8 {
    fn from(identity: Identity) -> Self {
        identity.as_byte()
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Returns true if `byte` opens a frame.
pub fn is_identity_byte(byte: u8) -> bool {
    Identity::try_from(byte).is_ok()
}

/// Returns true if `byte` must be escaped inside payload and checksum.
pub fn is_reserved_byte(byte: u8) -> bool {
    RESERVED_BYTES.contains(&byte)
}
