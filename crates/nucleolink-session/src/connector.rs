use nucleolink_transport::{SerialConfig, SerialTransport};

use crate::config::SessionConfig;
use crate::error::Result;
use crate::session::Session;

/// Open a session on `port`, or on the first serial device discovery finds
/// when `port` is `None`, with default configuration.
pub fn connect(port: Option<&str>) -> Result<Session<SerialTransport>> {
    let serial = SerialConfig {
        port: port.map(str::to_string),
        ..SerialConfig::default()
    };
    connect_with_config(SessionConfig::default(), serial)
}

/// Open a session with explicit configuration.
///
/// The line speed comes from `config.baud_rate`; the rest of `serial` is used
/// as given.
pub fn connect_with_config(
    config: SessionConfig,
    serial: SerialConfig,
) -> Result<Session<SerialTransport>> {
    let serial = SerialConfig {
        baud_rate: config.baud_rate,
        ..serial
    };
    let mut session = Session::new(SerialTransport::new(serial), config);
    session.connect()?;
    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SessionError;
    use nucleolink_frame::Status;
    use nucleolink_transport::TransportError;

    #[test]
    fn missing_port_fails_to_open() {
        let serial = SerialConfig::for_port("/dev/nucleolink-does-not-exist", 9600);
        let err = connect_with_config(SessionConfig::default(), serial).unwrap_err();
        assert!(matches!(
            err,
            SessionError::Transport(TransportError::Open { .. })
        ));
        assert_eq!(err.status(), Status::TransportDown);
    }

    #[test]
    fn discovery_without_candidates_finds_nothing() {
        let serial = SerialConfig {
            probe_prefixes: Vec::new(),
            ..SerialConfig::default()
        };
        let err = connect_with_config(SessionConfig::default(), serial).unwrap_err();
        assert!(matches!(
            err,
            SessionError::Transport(TransportError::NoDevice { tried: 0 })
        ));
    }
}
