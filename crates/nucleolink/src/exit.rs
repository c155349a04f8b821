use std::fmt;
use std::io;

use nucleolink_frame::Status;
use nucleolink_session::SessionError;
use nucleolink_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::NotFound | io::ErrorKind::BrokenPipe => TRANSPORT_ERROR,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Io(source) => io_error(context, source),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

/// Exit code for a protocol status.
pub fn status_code(status: Status) -> i32 {
    match status {
        Status::Ok => SUCCESS,
        Status::TransportDown => TRANSPORT_ERROR,
        Status::DeviceTimeout => TIMEOUT,
        Status::HostOldVersion
        | Status::DeviceOldVersion
        | Status::InvalidResponse
        | Status::ChecksumFailed => DATA_INVALID,
        Status::NotInBuffer | Status::IncompleteCommunication => FAILURE,
    }
}

pub fn session_error(context: &str, err: SessionError) -> CliError {
    match err {
        SessionError::Transport(err) => transport_error(context, err),
        SessionError::NotConnected => CliError::new(TRANSPORT_ERROR, format!("{context}: {err}")),
        SessionError::ReservedKey(_) => CliError::new(USAGE, format!("{context}: {err}")),
        SessionError::Handshake(status) => {
            CliError::new(status_code(status), format!("{context}: {err}"))
        }
        SessionError::Io(source) => io_error(context, source),
        SessionError::Json(_) => CliError::new(DATA_INVALID, format!("{context}: {err}")),
    }
}
