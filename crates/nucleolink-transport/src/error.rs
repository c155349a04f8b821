/// Errors that can occur in transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to open the specified serial port.
    #[error("failed to open {port}: {source}")]
    Open {
        port: String,
        source: serialport::Error,
    },

    /// Discovery found no port that could be opened.
    #[error("no serial device found (tried {tried} candidates)")]
    NoDevice { tried: usize },

    /// The operation needs an open link.
    #[error("transport not connected")]
    NotConnected,

    /// The serial driver reported an error.
    #[error("serial error: {0}")]
    Serial(#[from] serialport::Error),

    /// An I/O error occurred on the link.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TransportError>;
