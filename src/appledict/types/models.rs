//! Data structures representing container components

use std::borrow::Cow;
use std::fs::Metadata;
use std::time::UNIX_EPOCH;

use byteorder::{ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};

/// Size of the fixed framing header at the start of every block.
pub const BLOCK_HEADER_LEN: u64 = 12;

/// Bytes of internal framing counted by `payload_size` that are not compressed data.
pub const PAYLOAD_FRAMING_LEN: u32 = 4;

/// The 12-byte header that frames every block.
///
/// Layout (all little-endian):
/// - Bytes 0-3: Outer size (sanity-checked only)
/// - Bytes 4-7: Payload size (compressed bytes + 4)
/// - Bytes 8-11: Decompressed size of the entry markup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    pub outer_size: u32,
    pub payload_size: u32,
    pub decompressed_size: u32,
}

impl BlockHeader {
    /// Decode the raw header bytes. No validation happens here.
    pub fn from_bytes(raw: &[u8; BLOCK_HEADER_LEN as usize]) -> Self {
        Self {
            outer_size: LittleEndian::read_u32(&raw[0..4]),
            payload_size: LittleEndian::read_u32(&raw[4..8]),
            decompressed_size: LittleEndian::read_u32(&raw[8..12]),
        }
    }

    /// Number of compressed bytes stored after the header.
    pub fn compressed_len(&self) -> u64 {
        self.payload_size.saturating_sub(PAYLOAD_FRAMING_LEN) as u64
    }

    /// Total on-disk length of the block, header included.
    pub fn block_len(&self) -> u64 {
        BLOCK_HEADER_LEN + self.compressed_len()
    }

    /// Offset of the block that follows one starting at `offset`.
    pub fn next_offset(&self, offset: u64) -> u64 {
        offset + self.block_len()
    }
}

/// A normalized headword and the offset of the block that defines it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub headword: String,
    pub offset: u64,
}

/// Cheap identity of a container file, used to detect a stale index cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint {
    pub size: u64,
    pub modified_secs: u64,
    pub modified_nanos: u32,
}

impl Fingerprint {
    /// Fingerprint from file metadata. Platforms without modification times
    /// fall back to size alone.
    pub fn from_metadata(metadata: &Metadata) -> Self {
        let modified = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .unwrap_or_default();
        Self {
            size: metadata.len(),
            modified_secs: modified.as_secs(),
            modified_nanos: modified.subsec_nanos(),
        }
    }

    /// Fingerprint of an in-memory container, which only has a size.
    pub fn from_len(size: u64) -> Self {
        Self {
            size,
            modified_secs: 0,
            modified_nanos: 0,
        }
    }
}

/// The inflated content of one block, as returned by a lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// The normalized key the entry was found under.
    pub headword: String,
    /// Offset of the block in the container.
    pub offset: u64,
    pub header: BlockHeader,
    markup: Vec<u8>,
}

impl Entry {
    pub(crate) fn new(headword: String, offset: u64, header: BlockHeader, markup: Vec<u8>) -> Self {
        Self {
            headword,
            offset,
            header,
            markup,
        }
    }

    /// Raw inflated markup.
    pub fn as_bytes(&self) -> &[u8] {
        &self.markup
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.markup
    }

    /// Markup decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.markup)
    }

    pub fn len(&self) -> usize {
        self.markup.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markup.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_decodes_little_endian_fields() {
        let mut raw = [0u8; 12];
        raw[0..4].copy_from_slice(&100u32.to_le_bytes());
        raw[4..8].copy_from_slice(&54u32.to_le_bytes());
        raw[8..12].copy_from_slice(&120u32.to_le_bytes());

        let header = BlockHeader::from_bytes(&raw);
        assert_eq!(header.outer_size, 100);
        assert_eq!(header.payload_size, 54);
        assert_eq!(header.decompressed_size, 120);
        assert_eq!(header.compressed_len(), 50);
        assert_eq!(header.block_len(), 62);
        assert_eq!(header.next_offset(0x60), 0x60 + 62);
    }

    #[test]
    fn undersized_payload_field_saturates() {
        let header = BlockHeader {
            outer_size: 1,
            payload_size: 2,
            decompressed_size: 0,
        };
        assert_eq!(header.compressed_len(), 0);
        assert_eq!(header.block_len(), BLOCK_HEADER_LEN);
    }
}
