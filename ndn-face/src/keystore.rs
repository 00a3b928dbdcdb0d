//! Cache of verified public keys.
//!
//! Keys land here after a successful fetch-and-verify; later Data signed
//! under the same key name verifies without another round trip. The cache
//! is a bounded FIFO; correctness never depends on retention.

use ed25519_dalek::VerifyingKey;
use log::trace;
use ndn_face_common::ndn::Name;
use std::collections::VecDeque;
use tokio::time::Instant;

#[derive(Debug, Clone)]
pub(crate) struct KeyStoreEntry {
    pub key_name: Name,
    pub key: VerifyingKey,
    pub created_at: Instant,
}

#[derive(Debug)]
pub(crate) struct KeyStore {
    entries: VecDeque<KeyStoreEntry>,
    capacity: usize,
}

impl KeyStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// Records a verified key under `key_name`, replacing any entry with
    /// the same name and evicting the oldest entry when full.
    pub fn insert(&mut self, key_name: Name, key: VerifyingKey) {
        self.entries.retain(|entry| entry.key_name != key_name);
        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(KeyStoreEntry {
            key_name,
            key,
            created_at: Instant::now(),
        });
    }

    /// The cached entry whose key name is the longest prefix of `name`;
    /// ties go to the oldest entry.
    pub fn lookup(&self, name: &Name) -> Option<&KeyStoreEntry> {
        let mut best: Option<&KeyStoreEntry> = None;
        for entry in &self.entries {
            if !entry.key_name.is_prefix_of(name) {
                continue;
            }
            match best {
                Some(b) if entry.key_name.len() <= b.key_name.len() => {}
                _ => best = Some(entry),
            }
        }
        if let Some(entry) = best {
            trace!(
                "key cache hit {} (age {:?})",
                entry.key_name.to_uri(),
                entry.created_at.elapsed()
            );
        }
        best
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
