//! Candidate-forwarder enumeration for failover probing.

use rand::seq::SliceRandom;

/// A stateful enumerator of candidate forwarders.
///
/// The candidate list is shuffled once at construction; every call to
/// [`next`](Self::next) pops one candidate until the list is exhausted.
#[derive(Debug, Clone)]
pub struct HostStrategy {
    candidates: Vec<(String, u16)>,
}

impl HostStrategy {
    /// Builds a strategy over `candidates`, shuffled once.
    pub fn new(mut candidates: Vec<(String, u16)>) -> Self {
        candidates.shuffle(&mut rand::thread_rng());
        Self { candidates }
    }

    /// Builds a strategy that probes `candidates` in the given order.
    pub fn in_order(candidates: Vec<(String, u16)>) -> Self {
        Self { candidates }
    }

    /// Pops the next candidate, or `None` when exhausted.
    pub fn next(&mut self) -> Option<(String, u16)> {
        if self.candidates.is_empty() {
            None
        } else {
            Some(self.candidates.remove(0))
        }
    }

    /// Number of candidates not yet probed.
    pub fn remaining(&self) -> usize {
        self.candidates.len()
    }
}
