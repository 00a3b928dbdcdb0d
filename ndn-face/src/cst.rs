//! Registered-prefix table.
//!
//! Append-only for the lifetime of a Face. Lookup is first-match in
//! registration order, not longest-match; changing that would change
//! observable dispatch for applications registering nested prefixes.

use crate::face::InterestSink;
use ndn_face_common::ndn::Name;

pub(crate) struct CstEntry {
    pub prefix: Name,
    /// URI form of the prefix, the entry's identity for logging.
    pub uri: String,
    pub flags: u32,
    pub sink: Box<dyn InterestSink>,
}

#[derive(Default)]
pub(crate) struct Cst {
    entries: Vec<CstEntry>,
}

impl Cst {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, prefix: Name, sink: Box<dyn InterestSink>, flags: u32) {
        let uri = prefix.to_uri();
        self.entries.push(CstEntry {
            prefix,
            uri,
            flags,
            sink,
        });
    }

    /// First registered entry whose prefix matches `name`.
    pub fn lookup_mut(&mut self, name: &Name) -> Option<&mut CstEntry> {
        self.entries
            .iter_mut()
            .find(|entry| entry.prefix.matches(name))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
