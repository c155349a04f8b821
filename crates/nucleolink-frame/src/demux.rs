//! Keyed demultiplexing buffer.
//!
//! Each polling cycle hands over every candidate the transport produced. The
//! newest frame per key wins: frames are filed tail-to-head and a key decided
//! once in a cycle is not overwritten by an older frame of the same cycle.

use std::collections::{HashMap, HashSet};

use tracing::{debug, trace};

use crate::codec::{decode_frame, is_complete, Decoded};
use crate::hex::HexBytes;
use crate::identity::RESERVED_KEY;
use crate::reassembly::{Absorb, Reassembly, ReassemblyConfig};
use crate::status::Entry;

/// Counters for one [`Demux::drain_cycle`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Candidates handed in.
    pub candidates: usize,
    /// Entries written to the buffer.
    pub filed: usize,
    /// Of the filed entries, those carrying a checksum failure.
    pub checksum_failures: usize,
    /// Older frames skipped because a newer one for the same key was filed.
    pub superseded: usize,
    /// Frames rebuilt from fragments.
    pub rebuilt: usize,
    /// Fragment bytes dropped at the loss bound.
    pub discarded_bytes: usize,
    /// Complete frames that could not be decoded or named the reserved key.
    pub dropped: usize,
}

/// Buffer of the latest [`Entry`] per key, plus the reassembly slot.
#[derive(Debug, Clone, Default)]
pub struct Demux {
    entries: HashMap<u8, Entry>,
    reassembly: Reassembly,
}

impl Demux {
    pub fn new() -> Self {
        Self::with_config(ReassemblyConfig::default())
    }

    pub fn with_config(config: ReassemblyConfig) -> Self {
        Self {
            entries: HashMap::new(),
            reassembly: Reassembly::with_config(config),
        }
    }

    /// File one polling cycle's candidates.
    ///
    /// Fragments feed the reassembly slot in arrival order and a rebuilt frame
    /// takes the arrival position of the fragment that completed it. A
    /// candidate following a pending escape byte is a fragment even when it
    /// looks complete. The resulting complete frames are then filed
    /// newest-first.
    pub fn drain_cycle(&mut self, candidates: Vec<Vec<u8>>) -> CycleReport {
        let mut report = CycleReport {
            candidates: candidates.len(),
            ..CycleReport::default()
        };

        let mut complete = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            if is_complete(&candidate) && !self.reassembly.awaits_escaped_byte() {
                complete.push(candidate);
                continue;
            }
            match self.reassembly.absorb(&candidate) {
                Absorb::Pending => trace!(len = candidate.len(), "fragment pending"),
                Absorb::Rebuilt(frame) => {
                    debug!(len = frame.len(), "frame rebuilt from fragments");
                    report.rebuilt += 1;
                    complete.push(frame);
                }
                Absorb::Discarded(len) => {
                    debug!(len, "fragments discarded at loss bound");
                    report.discarded_bytes += len;
                }
            }
        }

        let mut decided = HashSet::with_capacity(complete.len());
        for frame in complete.iter().rev() {
            let Decoded { identity, key, entry } = match decode_frame(frame) {
                Ok(decoded) => decoded,
                Err(err) => {
                    debug!(error = %err, bytes = %HexBytes(frame.as_slice()), "frame dropped");
                    report.dropped += 1;
                    continue;
                }
            };

            if key == RESERVED_KEY {
                debug!(%identity, "frame names the reserved key; dropped");
                report.dropped += 1;
                continue;
            }
            if !decided.insert(key) {
                report.superseded += 1;
                continue;
            }

            if !entry.is_ok() {
                report.checksum_failures += 1;
            }
            trace!(%identity, key, status = %entry.status, "filed frame");
            self.entries.insert(key, entry);
            report.filed += 1;
        }

        report
    }

    /// Readable keys, ascending. The reserved key is never included.
    pub fn keys(&self) -> Vec<u8> {
        let mut keys: Vec<u8> = self
            .entries
            .keys()
            .copied()
            .filter(|&key| key != RESERVED_KEY)
            .collect();
        keys.sort_unstable();
        keys
    }

    /// Remove and return the entry for `key`, or [`Entry::missing`].
    pub fn pop(&mut self, key: u8) -> Entry {
        self.entries.remove(&key).unwrap_or_else(Entry::missing)
    }

    /// Look at the entry for `key` without removing it.
    pub fn get(&self, key: u8) -> Option<&Entry> {
        self.entries.get(&key)
    }

    pub fn contains(&self, key: u8) -> bool {
        self.entries.contains_key(&key)
    }

    /// File an entry directly, overwriting any previous one.
    pub fn insert(&mut self, key: u8, entry: Entry) {
        self.entries.insert(key, entry);
    }

    /// Number of buffered entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The reassembly slot.
    pub fn reassembly(&self) -> &Reassembly {
        &self.reassembly
    }

    /// Drop all entries and any pending fragment.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.reassembly.clear();
    }
}
