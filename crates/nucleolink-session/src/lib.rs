//! Host-side protocol session for nucleolink devices.
//!
//! This is the layer applications use. Connect to a device, run the init
//! handshake, send commands, register sensors, then poll and fetch the
//! latest entry per key.

pub mod command;
pub mod config;
pub mod connector;
pub mod error;
pub mod handshake;
pub mod sensor;
pub mod session;

pub use command::CommandType;
pub use config::{InitConfig, SessionConfig};
pub use connector::{connect, connect_with_config};
pub use error::{Result, SessionError};
pub use handshake::{DeviceInfo, InitRequest};
pub use sensor::{SensorConfig, SensorType};
pub use session::Session;
