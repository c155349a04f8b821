use crate::status::Status;

/// Errors that can occur while decoding a complete frame.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    /// The leading byte is not one of the four identities.
    #[error("unknown frame identity {0:#04x}")]
    UnknownIdentity(u8),

    /// The frame is too short for its identity once escapes are removed.
    #[error("{identity:#04x} frame too short ({len} bytes, min {min})")]
    TooShort { identity: u8, len: usize, min: usize },
}

impl FrameError {
    /// The protocol status this error is reported as.
    pub fn status(&self) -> Status {
        Status::InvalidResponse
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
