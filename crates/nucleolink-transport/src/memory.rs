//! In-memory transport.
//!
//! The inbound side is fed as discrete chunks through a [`MemoryHandle`], which
//! makes it possible to reproduce any split or coalescing of device writes.

use std::collections::VecDeque;
use std::io::ErrorKind;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use crate::error::{Result, TransportError};
use crate::splitter::FrameSplitter;
use crate::traits::Transport;

#[derive(Debug)]
struct LinkState {
    connected: bool,
    reachable: bool,
    fail_writes: bool,
    inbound: VecDeque<Vec<u8>>,
    written: Vec<Vec<u8>>,
    connects: usize,
}

fn lock(state: &Mutex<LinkState>) -> MutexGuard<'_, LinkState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// An in-memory [`Transport`].
#[derive(Debug)]
pub struct MemoryTransport {
    state: Arc<Mutex<LinkState>>,
    splitter: FrameSplitter,
}

/// Test-side handle to a [`MemoryTransport`]: feeds device bytes and
/// inspects what the host wrote.
#[derive(Debug, Clone)]
pub struct MemoryHandle {
    state: Arc<Mutex<LinkState>>,
}

impl MemoryTransport {
    /// Create a disconnected transport whose link can be connected.
    pub fn pair() -> (Self, MemoryHandle) {
        let state = Arc::new(Mutex::new(LinkState {
            connected: false,
            reachable: true,
            fail_writes: false,
            inbound: VecDeque::new(),
            written: Vec::new(),
            connects: 0,
        }));
        let handle = MemoryHandle {
            state: Arc::clone(&state),
        };
        (
            Self {
                state,
                splitter: FrameSplitter::new(),
            },
            handle,
        )
    }
}

impl Transport for MemoryTransport {
    fn connect(&mut self) -> Result<()> {
        let mut state = lock(&self.state);
        if !state.reachable {
            return Err(TransportError::NoDevice { tried: 1 });
        }
        state.connected = true;
        state.connects += 1;
        self.splitter.reset();
        debug!(connects = state.connects, "memory link connected");
        Ok(())
    }

    fn is_connected(&self) -> bool {
        lock(&self.state).connected
    }

    fn disconnect(&mut self) {
        lock(&self.state).connected = false;
    }

    fn write(&mut self, bytes: &[u8]) -> Result<usize> {
        let mut state = lock(&self.state);
        if !state.connected {
            return Err(TransportError::NotConnected);
        }
        if state.fail_writes {
            return Err(TransportError::Io(std::io::Error::from(
                ErrorKind::BrokenPipe,
            )));
        }
        state.written.push(bytes.to_vec());
        Ok(bytes.len())
    }

    fn read_frames(&mut self, terminator: u8, escape: u8) -> Result<Vec<Vec<u8>>> {
        let pending: Vec<u8> = {
            let mut state = lock(&self.state);
            if !state.connected {
                return Err(TransportError::NotConnected);
            }
            state.inbound.drain(..).flatten().collect()
        };
        Ok(self.splitter.split(&pending, terminator, escape))
    }
}

impl MemoryHandle {
    /// Queue bytes as if the device had written them.
    pub fn push_read(&self, bytes: impl Into<Vec<u8>>) {
        lock(&self.state).inbound.push_back(bytes.into());
    }

    /// Frames written by the host so far.
    pub fn written(&self) -> Vec<Vec<u8>> {
        lock(&self.state).written.clone()
    }

    /// Drain and return the frames written by the host so far.
    pub fn take_written(&self) -> Vec<Vec<u8>> {
        std::mem::take(&mut lock(&self.state).written)
    }

    /// Bring the link up or down. A downed link drops the connection and
    /// refuses new ones until brought back up.
    pub fn set_link_up(&self, up: bool) {
        let mut state = lock(&self.state);
        state.reachable = up;
        if !up {
            state.connected = false;
        }
    }

    /// Make every subsequent write fail with an I/O error.
    pub fn set_fail_writes(&self, fail: bool) {
        lock(&self.state).fail_writes = fail;
    }

    /// Whether the transport side currently holds the link open.
    pub fn is_connected(&self) -> bool {
        lock(&self.state).connected
    }

    /// Number of successful `connect` calls.
    pub fn connect_count(&self) -> usize {
        lock(&self.state).connects
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_disconnected() {
        let (mut transport, _handle) = MemoryTransport::pair();
        assert!(!transport.is_connected());
        assert!(matches!(
            transport.write(&[1, 2]),
            Err(TransportError::NotConnected)
        ));
        assert!(matches!(
            transport.read_frames(0xEE, 0x7E),
            Err(TransportError::NotConnected)
        ));
    }

    #[test]
    fn chunks_are_coalesced_then_split() {
        let (mut transport, handle) = MemoryTransport::pair();
        transport.connect().unwrap();

        handle.push_read(vec![0xFF, 0x01]);
        handle.push_read(vec![0x02, 0xEE, 0xBB]);

        let frames = transport.read_frames(0xEE, 0x7E).unwrap();
        assert_eq!(frames, vec![vec![0xFF, 0x01, 0x02, 0xEE], vec![0xBB]]);
        assert!(transport.read_frames(0xEE, 0x7E).unwrap().is_empty());
    }

    #[test]
    fn records_writes() {
        let (mut transport, handle) = MemoryTransport::pair();
        transport.connect().unwrap();
        assert_eq!(transport.write(&[0xAA, 0xEE]).unwrap(), 2);
        assert_eq!(handle.written(), vec![vec![0xAA, 0xEE]]);
        assert_eq!(handle.take_written().len(), 1);
        assert!(handle.written().is_empty());
    }

    #[test]
    fn link_down_refuses_connect() {
        let (mut transport, handle) = MemoryTransport::pair();
        transport.connect().unwrap();
        handle.set_link_up(false);
        assert!(!transport.is_connected());
        assert!(matches!(
            transport.connect(),
            Err(TransportError::NoDevice { .. })
        ));

        handle.set_link_up(true);
        transport.connect().unwrap();
        assert_eq!(handle.connect_count(), 2);
    }

    #[test]
    fn failing_writes_surface_io_errors() {
        let (mut transport, handle) = MemoryTransport::pair();
        transport.connect().unwrap();
        handle.set_fail_writes(true);
        assert!(matches!(
            transport.write(&[0x01]),
            Err(TransportError::Io(e)) if e.kind() == ErrorKind::BrokenPipe
        ));
    }
}
