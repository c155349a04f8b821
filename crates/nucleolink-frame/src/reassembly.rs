//! Reassembly of frames split across reads.
//!
//! A single pending slot accumulates incomplete candidates until they form a
//! complete frame or grow past the loss bound. Exceeding the bound means the
//! stream is desynchronized (device reset, line noise) and the pending bytes
//! are dropped.

use crate::codec::{ends_mid_escape, is_complete};

/// Default loss bound in bytes.
pub const DEFAULT_LOSS_BOUND: usize = 20;

/// Configuration for [`Reassembly`].
#[derive(Debug, Clone)]
pub struct ReassemblyConfig {
    /// Pending bytes beyond which an incomplete accumulation is discarded.
    pub loss_bound: usize,
}

impl Default for ReassemblyConfig {
    fn default() -> Self {
        Self {
            loss_bound: DEFAULT_LOSS_BOUND,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
enum Slot {
    #[default]
    Empty,
    Pending(Vec<u8>),
}

/// What happened to an absorbed fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Absorb {
    /// Stored; no complete frame yet.
    Pending,
    /// The fragment completed the pending bytes into this frame.
    Rebuilt(Vec<u8>),
    /// The accumulation passed the loss bound; this many bytes were dropped.
    Discarded(usize),
}

/// The pending-fragment state machine.
#[derive(Debug, Clone, Default)]
pub struct Reassembly {
    slot: Slot,
    config: ReassemblyConfig,
}

impl Reassembly {
    pub fn new() -> Self {
        Self::with_config(ReassemblyConfig::default())
    }

    pub fn with_config(config: ReassemblyConfig) -> Self {
        Self {
            slot: Slot::Empty,
            config,
        }
    }

    /// Feed one incomplete candidate.
    ///
    /// From `Empty` the fragment is stored as-is. From `Pending(p)` it is
    /// appended; a complete result is returned and the slot emptied, otherwise
    /// a result longer than the loss bound is dropped.
    pub fn absorb(&mut self, fragment: &[u8]) -> Absorb {
        match std::mem::take(&mut self.slot) {
            Slot::Empty => {
                self.slot = Slot::Pending(fragment.to_vec());
                Absorb::Pending
            }
            Slot::Pending(mut pending) => {
                pending.extend_from_slice(fragment);
                if is_complete(&pending) {
                    Absorb::Rebuilt(pending)
                } else if pending.len() > self.config.loss_bound {
                    Absorb::Discarded(pending.len())
                } else {
                    self.slot = Slot::Pending(pending);
                    Absorb::Pending
                }
            }
        }
    }

    /// Bytes currently pending, if any.
    pub fn pending(&self) -> Option<&[u8]> {
        match &self.slot {
            Slot::Empty => None,
            Slot::Pending(bytes) => Some(bytes),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.slot == Slot::Empty
    }

    /// Returns true if the pending bytes end on an unpaired escape, so the
    /// next candidate continues them whatever it looks like.
    pub fn awaits_escaped_byte(&self) -> bool {
        self.pending().is_some_and(ends_mid_escape)
    }

    /// Drop any pending bytes.
    pub fn clear(&mut self) {
        self.slot = Slot::Empty;
    }

    pub fn config(&self) -> &ReassemblyConfig {
        &self.config
    }
}
