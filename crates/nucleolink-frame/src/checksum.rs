//! CRC-8 (polynomial 0x07, initial 0x00, MSB-first, no reflection, no final XOR).

use crate::codec::unstuff;
use crate::status::Status;

const POLYNOMIAL: u8 = 0x07;

/// Fold one byte into a running checksum.
pub(crate) fn update(mut crc: u8, byte: u8) -> u8 {
    crc ^= byte;
    for _ in 0..8 {
        crc = if crc & 0x80 != 0 {
            (crc << 1) ^ POLYNOMIAL
        } else {
            crc << 1
        };
    }
    crc
}

/// Checksum of `bytes`. The empty sequence checks to `0x00`.
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0, |crc, &byte| update(crc, byte))
}

/// Verify a complete, still-escaped frame.
///
/// The checksum byte sits at `len - 2`, just before the terminator. It is
/// compared against the checksum of everything before it with escape bytes
/// removed.
pub fn verify(frame: &[u8]) -> Status {
    let Some(crc_index) = frame.len().checked_sub(2) else {
        return Status::InvalidResponse;
    };
    let expected = checksum(&unstuff(&frame[..crc_index]));
    if frame[crc_index] == expected {
        Status::Ok
    } else {
        Status::ChecksumFailed
    }
}
