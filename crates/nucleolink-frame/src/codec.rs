use bytes::{BufMut, Bytes, BytesMut};

use crate::checksum::{update, verify};
use crate::error::{FrameError, Result};
use crate::identity::{is_identity_byte, is_reserved_byte, Identity, ESCAPE, TERMINATOR};
use crate::status::Entry;

/// Shortest well-formed frame on the wire: identity, key, one payload byte,
/// checksum, terminator.
pub const MIN_FRAME_LEN: usize = 5;

/// Escape every reserved byte in `bytes`.
pub fn stuff(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len() + bytes.len() / 4);
    for &byte in bytes {
        if is_reserved_byte(byte) {
            out.push(ESCAPE);
        }
        out.push(byte);
    }
    out
}

/// Remove escaping: an escape byte is dropped and the byte after it is kept
/// verbatim, whatever its value. A trailing lone escape is dropped.
pub fn unstuff(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len());
    let mut escaped = false;
    for &byte in bytes {
        if !escaped && byte == ESCAPE {
            escaped = true;
            continue;
        }
        escaped = false;
        out.push(byte);
    }
    out
}

/// Returns true if a raw, still-escaped candidate is a syntactically complete
/// frame: longer than four bytes, opening with an identity byte, ending with
/// an unescaped terminator.
///
/// A read can stop right after an escaped terminator (`.. 7E EE`); that chunk
/// is a fragment, not a frame.
pub fn is_complete(candidate: &[u8]) -> bool {
    match candidate.split_last() {
        Some((&TERMINATOR, head)) => {
            candidate.len() >= MIN_FRAME_LEN
                && is_identity_byte(candidate[0])
                && !ends_mid_escape(head)
        }
        _ => false,
    }
}

/// Returns true if `bytes` ends on an escape byte still waiting for the byte
/// it escapes: an odd run of trailing escapes.
pub fn ends_mid_escape(bytes: &[u8]) -> bool {
    bytes.iter().rev().take_while(|&&byte| byte == ESCAPE).count() % 2 == 1
}

/// Encode a frame into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────────┬──────────────────┬──────────┬────────────┐
/// │ Identity │ Body (stuffed)   │ CRC-8    │ Terminator │
/// │ (1B)     │                  │ (stuffed)│ 0xEE       │
/// └──────────┴──────────────────┴──────────┴────────────┘
/// ```
///
/// The checksum covers identity and unescaped body. Only body and checksum
/// are stuffed; the identity byte and terminator are written as-is.
pub fn encode_frame(identity: Identity, body: &[u8], dst: &mut BytesMut) {
    let id = identity.as_byte();
    let crc = body.iter().fold(update(0, id), |crc, &byte| update(crc, byte));

    dst.reserve(body.len() * 2 + 4);
    dst.put_u8(id);
    for &byte in body.iter().chain(std::iter::once(&crc)) {
        if is_reserved_byte(byte) {
            dst.put_u8(ESCAPE);
        }
        dst.put_u8(byte);
    }
    dst.put_u8(TERMINATOR);
}

/// A complete frame resolved to its buffer key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub identity: Identity,
    pub key: u8,
    pub entry: Entry,
}

/// Decode a complete, still-escaped frame.
///
/// Offsets below are taken after unescaping; `n` is the unescaped length and
/// the last two bytes are checksum and terminator.
///
/// | Identity | Key | Payload |
/// |---|---|---|
/// | `INIT` | `INIT` | `[0, n-2)` (identity included) |
/// | `HEARTBEAT` | `HEARTBEAT` | `[2, n-2)` |
/// | `COMM` / `SENSOR` | byte 2 (echoed command or sensor id) | `[3, n-2)` |
///
/// A checksum mismatch still resolves a key; the entry then carries the
/// failing status and no payload.
pub fn decode_frame(frame: &[u8]) -> Result<Decoded> {
    let first = frame.first().copied().unwrap_or(TERMINATOR);
    let identity = Identity::try_from(first)?;
    let plain = unstuff(frame);
    let n = plain.len();

    let min = match identity {
        Identity::Init => 2,
        Identity::Heartbeat => 4,
        Identity::Comm | Identity::Sensor => MIN_FRAME_LEN,
    };
    if n < min {
        return Err(FrameError::TooShort {
            identity: first,
            len: n,
            min,
        });
    }

    let (key, start) = match identity {
        Identity::Init => (first, 0),
        Identity::Heartbeat => (first, 2),
        Identity::Comm | Identity::Sensor => (plain[2], 3),
    };

    let status = verify(frame);
    let entry = if status.is_ok() {
        Entry::ok(Bytes::copy_from_slice(&plain[start..n - 2]))
    } else {
        Entry::failed(status)
    };

    Ok(Decoded {
        identity,
        key,
        entry,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{COMM, HEARTBEAT, INIT, SENSOR};
    use crate::status::Status;

    fn encode(identity: Identity, body: &[u8]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        encode_frame(identity, body, &mut buf);
        buf.to_vec()
    }

    #[test]
    fn stuff_unstuff_roundtrip() {
        let payload = [0x00, 0xFF, 0x10, 0xEE, 0xAA, 0x7E, 0xBB, 0xCC, 0xDE];
        let stuffed = stuff(&payload);
        assert_eq!(stuffed.len(), payload.len() + 6);
        assert_eq!(unstuff(&stuffed), payload);
    }

    #[test]
    fn stuff_leaves_plain_bytes_alone() {
        let payload = [0x00, 0x01, 0x30, 0xDE];
        assert_eq!(stuff(&payload), payload);
        assert_eq!(unstuff(&payload), payload);
    }

    #[test]
    fn unstuff_keeps_escaped_escape() {
        assert_eq!(unstuff(&[0x7E, 0x7E, 0x01]), vec![0x7E, 0x01]);
        assert_eq!(unstuff(&[0x01, 0x7E]), vec![0x01]);
    }

    #[test]
    fn classifier_rejects_short_candidates() {
        assert!(!is_complete(&[]));
        assert!(!is_complete(&[INIT, 0x01, 0x02, TERMINATOR]));
        assert!(!is_complete(&[INIT, INIT, INIT, TERMINATOR]));
    }

    #[test]
    fn classifier_accepts_minimal_frame() {
        assert!(is_complete(&[INIT, 0x01, 0x02, 0x03, 0x44, TERMINATOR]));
        assert!(is_complete(&[HEARTBEAT, 0x01, 0x00, 0x13, TERMINATOR]));
    }

    #[test]
    fn classifier_requires_identity_and_terminator() {
        assert!(!is_complete(&[0x00, 0x05, 0x5F, 0x01, TERMINATOR]));
        assert!(!is_complete(&[COMM, 0x00, 0x01, 0x00, 0x30]));
    }

    #[test]
    fn classifier_rejects_escaped_final_terminator() {
        assert!(!is_complete(&[COMM, 0x00, 0x02, ESCAPE, TERMINATOR]));
        assert!(!is_complete(&[SENSOR, 0x00, 0x02, ESCAPE, ESCAPE, ESCAPE, TERMINATOR]));
        // an escaped escape leaves the terminator unescaped
        assert!(is_complete(&[SENSOR, 0x00, 0x02, ESCAPE, ESCAPE, TERMINATOR]));
    }

    #[test]
    fn trailing_escape_parity() {
        assert!(!ends_mid_escape(&[]));
        assert!(ends_mid_escape(&[0x01, ESCAPE]));
        assert!(!ends_mid_escape(&[0x01, ESCAPE, ESCAPE]));
        assert!(ends_mid_escape(&[0x01, ESCAPE, ESCAPE, ESCAPE]));
        assert!(!ends_mid_escape(&[ESCAPE, 0x01]));
    }

    #[test]
    fn encode_comm_frame() {
        let frame = encode(Identity::Comm, &[0x00, 0x01, 0x00, 0x01, 0x00, 0x30]);
        assert_eq!(
            frame,
            vec![0xAA, 0x00, 0x01, 0x00, 0x01, 0x00, 0x30, 0xE1, 0xEE]
        );
    }

    #[test]
    fn encode_stuffs_body_but_not_identity() {
        let frame = encode(Identity::Comm, &[0x00, 0x02, 0xEE, 0x7E]);
        assert_eq!(
            frame,
            vec![0xAA, 0x00, 0x02, 0x7E, 0xEE, 0x7E, 0x7E, 0x10, 0xEE]
        );
        assert!(is_complete(&frame));
    }

    #[test]
    fn decode_init_keeps_identity_in_payload() {
        let decoded = decode_frame(&[0xFF, 0x01, 0x01, 0x00, 0x05, 0x5F, 0xEE]).unwrap();
        assert_eq!(decoded.identity, Identity::Init);
        assert_eq!(decoded.key, INIT);
        assert_eq!(decoded.entry, Entry::ok(vec![0xFF, 0x01, 0x01, 0x00, 0x05]));
    }

    #[test]
    fn decode_heartbeat_skips_two_bytes() {
        let decoded = decode_frame(&[0xBB, 0x01, 0x00, 0x13, 0xEE]).unwrap();
        assert_eq!(decoded.key, HEARTBEAT);
        assert_eq!(decoded.entry, Entry::ok(vec![0x00]));
    }

    #[test]
    fn decode_comm_keys_by_echoed_command() {
        let decoded = decode_frame(&[0xAA, 0x00, 0x01, 0x00, 0x30, 0xD5, 0xEE]).unwrap();
        assert_eq!(decoded.key, 0x01);
        assert_eq!(decoded.entry, Entry::ok(vec![0x00, 0x30]));
    }

    #[test]
    fn decode_sensor_with_escaped_payload() {
        let decoded =
            decode_frame(&[0xCC, 0x00, 0x01, 0x7E, 0x7E, 0x05, 0xCD, 0xEE]).unwrap();
        assert_eq!(decoded.identity, Identity::Sensor);
        assert_eq!(decoded.key, 0x01);
        assert_eq!(decoded.entry, Entry::ok(vec![0x7E, 0x05]));
    }

    #[test]
    fn decode_checksum_failure_still_keys() {
        let decoded = decode_frame(&[0xAA, 0x00, 0x01, 0x00, 0x30, 0xD6, 0xEE]).unwrap();
        assert_eq!(decoded.key, 0x01);
        assert_eq!(decoded.entry, Entry::failed(Status::ChecksumFailed));
    }

    #[test]
    fn decode_short_comm_dropped() {
        // five raw bytes, four after unescaping
        let err = decode_frame(&[COMM, 0x00, 0x7E, 0x01, 0xEE]).unwrap_err();
        assert!(matches!(err, FrameError::TooShort { min: 5, len: 4, .. }));
    }

    #[test]
    fn decode_unknown_identity() {
        let err = decode_frame(&[0x00, 0x01, 0x02, 0x03, 0xEE]).unwrap_err();
        assert_eq!(err, FrameError::UnknownIdentity(0x00));
        assert_eq!(err.status(), Status::InvalidResponse);
    }

    #[test]
    fn decode_roundtrips_encoded_sensor_frame() {
        let frame = encode(Identity::Sensor, &[0x00, 0x04, 0xCC, 0x10, 0xFF]);
        let decoded = decode_frame(&frame).unwrap();
        assert_eq!(decoded.key, 0x04);
        assert_eq!(decoded.entry, Entry::ok(vec![0xCC, 0x10, 0xFF]));
        assert_eq!(frame[0], SENSOR);
    }
}
