//! Framing for the nucleolink host/device serial protocol.
//!
//! Every frame on the wire is:
//! - a 1-byte identity (`INIT`, `COMM`, `HEARTBEAT` or `SENSOR`)
//! - the payload
//! - a CRC-8 checksum over identity and payload
//! - the terminator byte `0xEE`
//!
//! Reserved bytes inside payload and checksum are escaped with `0x7E`.
//! Inbound frames are filed into a [`Demux`] keyed by identity or by the
//! sub-identifier the device echoes, with fragments reassembled across reads.

pub mod checksum;
pub mod codec;
pub mod demux;
pub mod error;
pub mod hex;
pub mod identity;
pub mod reassembly;
pub mod status;

pub use checksum::{checksum, verify};
pub use codec::{
    decode_frame, encode_frame, ends_mid_escape, is_complete, stuff, unstuff, Decoded,
    MIN_FRAME_LEN,
};
pub use demux::{CycleReport, Demux};
pub use error::{FrameError, Result};
pub use hex::HexBytes;
pub use identity::{
    Identity, COMM, ESCAPE, HEARTBEAT, INIT, RESERVED_BYTES, RESERVED_KEY, SENSOR, TERMINATOR,
};
pub use reassembly::{Absorb, Reassembly, ReassemblyConfig, DEFAULT_LOSS_BOUND};
pub use status::{Entry, Status};
