//! The headword index: normalized headword -> block offset.
//!
//! The index is derived data. It is always rebuilt from a full scan and never
//! patched incrementally; the fingerprint ties it to the container it came from.
//!
//! When one headword is declared by several blocks (homonyms), the block
//! scanned last becomes the primary mapping and each earlier offset is kept,
//! in scan order, under [`HeadwordIndex::homonyms`].

use std::collections::btree_map::Entry as MapEntry;
use std::collections::BTreeMap;
use std::io::{Read, Seek};
use std::ops::Bound;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::appledict::scanner::EntryScanner;
use crate::appledict::types::error::Result;
use crate::appledict::types::models::{Fingerprint, IndexEntry, BLOCK_HEADER_LEN};

/// Version of the serialized index layout.
pub const INDEX_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadwordIndex {
    pub format_version: u32,
    pub fingerprint: Fingerprint,
    /// First block offset the scan started from.
    pub first_block_offset: u64,
    /// End of the last well-framed block seen by the scan.
    pub extent: u64,
    entries: BTreeMap<String, u64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    homonyms: BTreeMap<String, Vec<u64>>,
}

impl HeadwordIndex {
    /// Creates an empty index for the container identified by `fingerprint`.
    pub fn new(fingerprint: Fingerprint, first_block_offset: u64) -> Self {
        Self {
            format_version: INDEX_FORMAT_VERSION,
            fingerprint,
            first_block_offset,
            extent: first_block_offset,
            entries: BTreeMap::new(),
            homonyms: BTreeMap::new(),
        }
    }

    /// Runs `scanner` to completion and collects everything it yields.
    ///
    /// The scanner is restarted first, so a partially consumed scanner is fine.
    /// An I/O error aborts the build; nothing partial is returned.
    pub fn build<R: Read + Seek>(
        scanner: &mut EntryScanner<R>,
        fingerprint: Fingerprint,
        first_block_offset: u64,
    ) -> Result<Self> {
        scanner.restart();
        let mut index = Self::new(fingerprint, first_block_offset);
        for entry in scanner.by_ref() {
            index.insert(entry?);
        }
        index.extent = scanner.stats().extent;
        info!(
            "Index built: {} headwords, {} with homonyms",
            index.len(),
            index.homonyms.len()
        );
        Ok(index)
    }

    /// Records one scanned entry. Later offsets win; earlier ones become homonyms.
    pub fn insert(&mut self, entry: IndexEntry) {
        match self.entries.entry(entry.headword) {
            MapEntry::Vacant(slot) => {
                slot.insert(entry.offset);
            }
            MapEntry::Occupied(mut slot) => {
                let previous = *slot.get();
                if previous == entry.offset {
                    return;
                }
                debug!(
                    "Headword {:?} redefined at {:#x}, shadowing {:#x}",
                    slot.key(),
                    entry.offset,
                    previous
                );
                self.homonyms
                    .entry(slot.key().clone())
                    .or_default()
                    .push(previous);
                slot.insert(entry.offset);
            }
        }
    }

    /// Primary offset for an already normalized headword.
    pub fn offset_of(&self, headword: &str) -> Option<u64> {
        self.entries.get(headword).copied()
    }

    /// Every offset for a normalized headword, in scan order (primary last).
    pub fn offsets_of(&self, headword: &str) -> Vec<u64> {
        let Some(primary) = self.offset_of(headword) else {
            return Vec::new();
        };
        let mut offsets = self.homonyms.get(headword).cloned().unwrap_or_default();
        offsets.push(primary);
        offsets
    }

    /// Number of distinct headwords.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All headwords in sorted order.
    pub fn headwords(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.keys().map(String::as_str)
    }

    /// `(headword, primary offset)` pairs in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> + '_ {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Headwords that share a normalized key with at least one other block.
    pub fn homonyms(&self) -> impl Iterator<Item = (&str, &[u64])> + '_ {
        self.homonyms.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Headwords starting with the normalized `prefix`, in sorted order.
    pub fn with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.entries
            .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
            .map(|(k, _)| k.as_str())
            .take_while(move |k| k.starts_with(prefix))
    }

    /// True if every stored offset could hold a block header inside a container
    /// of `container_len` bytes.
    pub fn offsets_within(&self, container_len: u64) -> bool {
        let lo = self.first_block_offset;
        let Some(hi) = container_len.checked_sub(BLOCK_HEADER_LEN) else {
            return self.is_empty();
        };
        self.entries
            .values()
            .chain(self.homonyms.values().flatten())
            .all(|&offset| offset >= lo && offset <= hi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(headword: &str, offset: u64) -> IndexEntry {
        IndexEntry {
            headword: headword.to_string(),
            offset,
        }
    }

    fn index() -> HeadwordIndex {
        HeadwordIndex::new(Fingerprint::from_len(1000), 0x60)
    }

    #[test]
    fn last_seen_offset_wins_and_earlier_ones_are_kept() {
        let mut index = index();
        index.insert(entry("bank", 0x60));
        index.insert(entry("bank", 0x100));
        index.insert(entry("bank", 0x200));

        assert_eq!(index.offset_of("bank"), Some(0x200));
        assert_eq!(index.offsets_of("bank"), vec![0x60, 0x100, 0x200]);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn same_block_repeat_is_not_a_homonym() {
        let mut index = index();
        index.insert(entry("run", 0x60));
        index.insert(entry("run", 0x60));
        assert_eq!(index.offsets_of("run"), vec![0x60]);
        assert_eq!(index.homonyms().count(), 0);
    }

    #[test]
    fn prefix_search_is_sorted_and_bounded() {
        let mut index = index();
        for (word, offset) in [("run", 0x60), ("run down", 0x60), ("rung", 0x80), ("rust", 0x90), ("ru", 0xA0)] {
            index.insert(entry(word, offset));
        }
        let matches: Vec<&str> = index.with_prefix("run").collect();
        assert_eq!(matches, vec!["run", "run down", "rung"]);
        assert_eq!(index.with_prefix("zz").count(), 0);
    }

    #[test]
    fn offsets_are_checked_against_container_length() {
        let mut index = index();
        index.insert(entry("a", 0x60));
        index.insert(entry("b", 0x200));
        assert!(index.offsets_within(0x200 + 12));
        assert!(!index.offsets_within(0x200 + 11));
        assert!(!index.offsets_within(4));
    }

    #[test]
    fn missing_headword_has_no_offsets() {
        assert!(index().offsets_of("nothing").is_empty());
        assert_eq!(index().offset_of("nothing"), None);
    }
}
