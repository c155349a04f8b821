use crate::error::Result;

/// A byte link to the device.
///
/// The session layer owns exactly one transport for its whole lifetime and
/// drives it from a single thread; implementations need no internal locking.
pub trait Transport {
    /// Establish the link. Calling this on an open link re-opens it.
    fn connect(&mut self) -> Result<()>;

    /// Liveness check. Must be cheap; it is called before every operation.
    fn is_connected(&self) -> bool;

    /// Release the link. Idempotent.
    fn disconnect(&mut self);

    /// Write a complete encoded frame, returning the number of bytes written.
    fn write(&mut self, bytes: &[u8]) -> Result<usize>;

    /// Return everything currently available, split into candidate frames.
    ///
    /// Candidates are split at unescaped occurrences of `terminator` and keep
    /// their escape bytes and their terminator. A trailing chunk with no
    /// terminator yet is returned last. Returns an empty vector when nothing
    /// is pending.
    fn read_frames(&mut self, terminator: u8, escape: u8) -> Result<Vec<Vec<u8>>>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn connect(&mut self) -> Result<()> {
        (**self).connect()
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }

    fn disconnect(&mut self) {
        (**self).disconnect()
    }

    fn write(&mut self, bytes: &[u8]) -> Result<usize> {
        (**self).write(bytes)
    }

    fn read_frames(&mut self, terminator: u8, escape: u8) -> Result<Vec<Vec<u8>>> {
        (**self).read_frames(terminator, escape)
    }
}
