//! Pending Interest Table.
//!
//! Entries are keyed by identity, not by name: several outstanding
//! Interests may share a prefix. Each entry carries its own expiry
//! deadline; the engine sleeps until the earliest one. Removal is
//! idempotent, so a deadline that fires for an already-removed entry is a
//! no-op.

use bytes::Bytes;
use ndn_face_common::ndn::{Data, Interest};
use tokio::time::Instant;

/// One outstanding Interest.
#[derive(Debug)]
pub(crate) struct PitEntry<S> {
    pub id: u64,
    pub interest: Interest,
    /// The encoded Interest, kept for re-expression.
    pub wire: Bytes,
    pub sink: S,
    pub deadline: Instant,
}

/// The pending-Interest table of one Face.
#[derive(Debug)]
pub(crate) struct Pit<S> {
    entries: Vec<PitEntry<S>>,
    next_id: u64,
}

impl<S> Pit<S> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 0,
        }
    }

    /// Appends an entry whose lifetime ends at `deadline`; returns its id.
    pub fn insert(&mut self, interest: Interest, wire: Bytes, sink: S, deadline: Instant) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.push(PitEntry {
            id,
            interest,
            wire,
            sink,
            deadline,
        });
        id
    }

    /// Finds the entry consuming `data`: among entries whose Interest
    /// matches, the one with the greatest name component count; ties go to
    /// the earliest-inserted entry.
    pub fn match_for_data(&self, data: &Data) -> Option<u64> {
        let mut best: Option<(usize, u64)> = None;
        for entry in &self.entries {
            if !entry.interest.matches_data(data) {
                continue;
            }
            let count = entry.interest.name.len();
            match best {
                Some((best_count, _)) if count <= best_count => {}
                _ => best = Some((count, entry.id)),
            }
        }
        best.map(|(_, id)| id)
    }

    /// Removes and returns the entry with `id`. Idempotent: a second
    /// removal returns `None`.
    pub fn remove(&mut self, id: u64) -> Option<PitEntry<S>> {
        let index = self.entries.iter().position(|e| e.id == id)?;
        Some(self.entries.remove(index))
    }

    /// Removes and returns every entry whose deadline has passed.
    pub fn take_expired(&mut self, now: Instant) -> Vec<PitEntry<S>> {
        let mut expired = Vec::new();
        let mut i = 0;
        while i < self.entries.len() {
            if self.entries[i].deadline <= now {
                expired.push(self.entries.remove(i));
            } else {
                i += 1;
            }
        }
        expired
    }

    /// The earliest deadline over all entries.
    pub fn earliest_deadline(&self) -> Option<Instant> {
        self.entries.iter().map(|e| e.deadline).min()
    }

    /// Drops every entry, cancelling all deadlines.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
