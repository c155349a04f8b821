use nucleolink_frame::Status;

/// Errors that can occur in session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] nucleolink_transport::TransportError),

    /// The operation needs a connected transport.
    #[error("session not connected")]
    NotConnected,

    /// The key is reserved for internal use and cannot name a sensor.
    #[error("key {0:#04x} is reserved")]
    ReservedKey(u8),

    /// The init handshake did not succeed.
    #[error("handshake failed: {0}")]
    Handshake(Status),

    /// I/O error while loading configuration.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SessionError {
    /// The protocol status this error reports as.
    pub fn status(&self) -> Status {
        match self {
            SessionError::Transport(_) | SessionError::NotConnected => Status::TransportDown,
            SessionError::Handshake(status) => *status,
            SessionError::ReservedKey(_) | SessionError::Io(_) | SessionError::Json(_) => {
                Status::InvalidResponse
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;
