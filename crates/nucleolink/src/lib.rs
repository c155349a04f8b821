//! Host-side serial link to nucleolink motor and sensor controllers.
//!
//! nucleolink frames commands for an embedded controller, demultiplexes its
//! telemetry by key, verifies checksums and reassembles frames split across
//! reads.
//!
//! # Crate Structure
//!
//! - [`transport`]: Byte links to the device (serial, in-memory)
//! - [`frame`]: Wire format, checksum, reassembly and demultiplexing
//! - [`session`]: Init handshake, commands, polling (behind `session` feature)

/// Re-export transport types.
pub mod transport {
    pub use nucleolink_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use nucleolink_frame::*;
}

/// Re-export session types (requires `session` feature).
#[cfg(feature = "session")]
pub mod session {
    pub use nucleolink_session::*;
}
