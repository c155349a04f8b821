//! Byte transport abstraction for the nucleolink device protocol.
//!
//! Provides a unified interface over the links a host can reach the device on:
//! - Serial ports (UART / USB CDC) via the `serialport` crate
//! - An in-memory link for tests and dry runs
//!
//! This is the lowest layer of nucleolink. It knows nothing about identities or
//! checksums; it only moves bytes and splits the inbound stream into candidate
//! frames at unescaped terminator bytes (see [`FrameSplitter`]).

pub mod error;
pub mod memory;
pub mod serial;
pub mod splitter;
pub mod traits;

pub use error::{Result, TransportError};
pub use memory::{MemoryHandle, MemoryTransport};
pub use serial::{list_ports, PortInfo, SerialConfig, SerialTransport, DEFAULT_BAUD_RATE};
pub use splitter::{FrameSplitter, SplitterConfig};
pub use traits::Transport;
