//! Splitting an inbound byte stream into candidate frames.

use tracing::warn;

/// Default number of candidates expected per read.
pub const DEFAULT_MAX_CANDIDATES: usize = 100;

/// Default expected upper length of one candidate, escapes included.
pub const DEFAULT_MAX_CANDIDATE_LEN: usize = 256;

/// Capacity hints for [`FrameSplitter`].
///
/// These size allocations and trigger a warning when exceeded; they never
/// truncate or drop data.
#[derive(Debug, Clone)]
pub struct SplitterConfig {
    /// Candidates expected per read before the host is considered to be
    /// polling too slowly.
    pub max_candidates: usize,
    /// Expected upper bound on one candidate's length.
    pub max_candidate_len: usize,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            max_candidates: DEFAULT_MAX_CANDIDATES,
            max_candidate_len: DEFAULT_MAX_CANDIDATE_LEN,
        }
    }
}

/// Splits raw bytes at unescaped terminators.
///
/// Escape bytes are kept in the output. A byte following an escape is never
/// treated as a terminator, and that rule holds across calls: if one read ends
/// on a lone escape byte, the first byte of the next read is taken verbatim.
#[derive(Debug, Clone, Default)]
pub struct FrameSplitter {
    config: SplitterConfig,
    escaped: bool,
}

impl FrameSplitter {
    /// Create a splitter with default capacity hints.
    pub fn new() -> Self {
        Self::with_config(SplitterConfig::default())
    }

    /// Create a splitter with explicit capacity hints.
    pub fn with_config(config: SplitterConfig) -> Self {
        Self {
            config,
            escaped: false,
        }
    }

    /// Split `bytes` into candidate frames.
    ///
    /// Every candidate but possibly the last ends with `terminator`; the last
    /// one is the trailing incomplete chunk when the input does not end on a
    /// frame boundary.
    pub fn split(&mut self, bytes: &[u8], terminator: u8, escape: u8) -> Vec<Vec<u8>> {
        let mut candidates = Vec::with_capacity(self.config.max_candidates.min(bytes.len()));
        let mut current = Vec::with_capacity(self.config.max_candidate_len.min(bytes.len()));

        for &byte in bytes {
            current.push(byte);

            if self.escaped {
                self.escaped = false;
                continue;
            }

            if byte == escape {
                self.escaped = true;
            } else if byte == terminator {
                candidates.push(std::mem::take(&mut current));
            }
        }

        if !current.is_empty() {
            candidates.push(current);
        }

        if candidates.len() > self.config.max_candidates {
            warn!(
                candidates = candidates.len(),
                hint = self.config.max_candidates,
                "read returned more candidates than expected; poll more often"
            );
        }
        if let Some(longest) = candidates.iter().map(Vec::len).max() {
            if longest > self.config.max_candidate_len {
                warn!(
                    len = longest,
                    hint = self.config.max_candidate_len,
                    "candidate frame longer than expected"
                );
            }
        }

        candidates
    }

    /// Forget any escape state carried over from the previous read.
    pub fn reset(&mut self) {
        self.escaped = false;
    }

    /// Current capacity hints.
    pub fn config(&self) -> &SplitterConfig {
        &self.config
    }
}
