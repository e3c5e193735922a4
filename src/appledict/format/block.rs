//! # Block Framing
//!
//! Reads one block's 12-byte header and its compressed payload from a
//! container. Every header field is treated as untrusted: sizes are checked
//! against the bytes actually remaining in the container before anything is
//! allocated or read, so a corrupt or truncated container surfaces as
//! [`DictError::Format`] rather than an oversized allocation or a short read.

use std::io::{Read, Seek, SeekFrom};

use log::trace;

use crate::appledict::config::FramingLimits;
use crate::appledict::types::error::{DictError, Result};
use crate::appledict::types::models::{BlockHeader, BLOCK_HEADER_LEN, PAYLOAD_FRAMING_LEN};

/// Random access to the blocks of a container.
#[derive(Debug)]
pub struct BlockReader<R> {
    inner: R,
    len: u64,
    limits: FramingLimits,
}

impl<R: Read + Seek> BlockReader<R> {
    /// Wraps a seekable container. The container length is taken once, here.
    pub fn new(mut inner: R, limits: FramingLimits) -> Result<Self> {
        let len = inner.seek(SeekFrom::End(0))?;
        Ok(Self { inner, len, limits })
    }

    /// Total length of the container in bytes.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn limits(&self) -> FramingLimits {
        self.limits
    }

    /// Reads and validates the header of the block starting at `offset`.
    ///
    /// # Errors
    /// [`DictError::Format`] if fewer than 12 bytes remain, if `outer_size` is
    /// zero or above the configured maximum, if `payload_size` cannot hold its
    /// own framing, if the payload would run past the end of the container, or
    /// if the declared decompressed size exceeds the configured maximum.
    pub fn read_header(&mut self, offset: u64) -> Result<BlockHeader> {
        let remaining = self.len.saturating_sub(offset);
        if remaining < BLOCK_HEADER_LEN {
            return Err(DictError::format(
                offset,
                format!("only {} bytes remain, a block header needs {}", remaining, BLOCK_HEADER_LEN),
            ));
        }

        let mut raw = [0u8; BLOCK_HEADER_LEN as usize];
        self.inner.seek(SeekFrom::Start(offset))?;
        self.inner.read_exact(&mut raw)?;
        let header = BlockHeader::from_bytes(&raw);
        trace!(
            "Block header at {:#x}: outer={}, payload={}, decompressed={}",
            offset,
            header.outer_size,
            header.payload_size,
            header.decompressed_size
        );

        self.validate(offset, &header)?;
        Ok(header)
    }

    /// Reads the compressed payload of the block at `offset` described by `header`.
    ///
    /// Never reads more than `payload_size - 4` bytes, and re-checks the bounds
    /// so a header that did not come from [`read_header`](Self::read_header) is
    /// still safe.
    pub fn read_payload(&mut self, offset: u64, header: &BlockHeader) -> Result<Vec<u8>> {
        self.validate(offset, header)?;
        let mut payload = vec![0u8; header.compressed_len() as usize];
        self.inner.seek(SeekFrom::Start(offset + BLOCK_HEADER_LEN))?;
        self.inner.read_exact(&mut payload)?;
        Ok(payload)
    }

    /// Convenience wrapper reading header and payload together.
    pub fn read_block(&mut self, offset: u64) -> Result<(BlockHeader, Vec<u8>)> {
        let header = self.read_header(offset)?;
        let payload = self.read_payload(offset, &header)?;
        Ok((header, payload))
    }

    fn validate(&self, offset: u64, header: &BlockHeader) -> Result<()> {
        if header.outer_size == 0 || header.outer_size > self.limits.max_outer_size {
            return Err(DictError::format(
                offset,
                format!(
                    "outer size {} outside 1..={}",
                    header.outer_size, self.limits.max_outer_size
                ),
            ));
        }
        if header.payload_size < PAYLOAD_FRAMING_LEN {
            return Err(DictError::format(
                offset,
                format!(
                    "payload size {} is smaller than its {}-byte framing",
                    header.payload_size, PAYLOAD_FRAMING_LEN
                ),
            ));
        }
        if header.decompressed_size > self.limits.max_entry_size {
            return Err(DictError::format(
                offset,
                format!(
                    "declared entry size {} exceeds limit of {}",
                    header.decompressed_size, self.limits.max_entry_size
                ),
            ));
        }
        let end = offset
            .checked_add(header.block_len())
            .ok_or_else(|| DictError::format(offset, "block length overflows"))?;
        if end > self.len {
            return Err(DictError::format(
                offset,
                format!(
                    "payload of {} bytes runs {} bytes past end of container",
                    header.compressed_len(),
                    end - self.len
                ),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::appledict::config::DEFAULT_MAX_OUTER_SIZE;
    use std::io::Cursor;

    fn header_bytes(outer: u32, payload: u32, decompressed: u32) -> Vec<u8> {
        let mut raw = Vec::with_capacity(12);
        raw.extend_from_slice(&outer.to_le_bytes());
        raw.extend_from_slice(&payload.to_le_bytes());
        raw.extend_from_slice(&decompressed.to_le_bytes());
        raw
    }

    fn reader(data: Vec<u8>) -> BlockReader<Cursor<Vec<u8>>> {
        let limits = FramingLimits {
            first_block_offset: 0,
            ..FramingLimits::default()
        };
        BlockReader::new(Cursor::new(data), limits).unwrap()
    }

    #[test]
    fn reads_header_and_payload() {
        let mut data = header_bytes(20, 9, 30);
        data.extend_from_slice(b"abcde");
        data.extend_from_slice(b"next");

        let mut blocks = reader(data);
        let (header, payload) = blocks.read_block(0).unwrap();
        assert_eq!(header.payload_size, 9);
        assert_eq!(payload, b"abcde");
        assert_eq!(header.next_offset(0), 17);
    }

    #[test]
    fn short_tail_is_a_format_error() {
        let mut blocks = reader(vec![1, 2, 3, 4, 5]);
        let err = blocks.read_header(0).unwrap_err();
        assert!(matches!(err, DictError::Format { offset: 0, .. }));
    }

    #[test]
    fn offset_past_end_is_a_format_error() {
        let mut blocks = reader(header_bytes(1, 4, 0));
        assert!(matches!(blocks.read_header(100), Err(DictError::Format { .. })));
    }

    #[test]
    fn payload_past_end_is_a_format_error() {
        let mut data = header_bytes(20, 1_000_004, 30);
        data.extend_from_slice(b"tiny");
        let mut blocks = reader(data);
        assert!(matches!(blocks.read_header(0), Err(DictError::Format { .. })));
    }

    #[test]
    fn zero_outer_size_is_a_format_error() {
        let mut data = header_bytes(0, 4, 0);
        data.extend_from_slice(&[0; 16]);
        let mut blocks = reader(data);
        assert!(matches!(blocks.read_header(0), Err(DictError::Format { .. })));
    }

    #[test]
    fn oversized_outer_size_is_a_format_error() {
        let mut data = header_bytes(DEFAULT_MAX_OUTER_SIZE + 1, 4, 0);
        data.extend_from_slice(&[0; 16]);
        let mut blocks = reader(data);
        assert!(matches!(blocks.read_header(0), Err(DictError::Format { .. })));
    }

    #[test]
    fn payload_size_below_framing_is_a_format_error() {
        let mut data = header_bytes(10, 3, 0);
        data.extend_from_slice(&[0; 16]);
        let mut blocks = reader(data);
        assert!(matches!(blocks.read_header(0), Err(DictError::Format { .. })));
    }

    #[test]
    fn oversized_entry_is_rejected_before_allocation() {
        let mut data = header_bytes(10, 4, u32::MAX);
        data.extend_from_slice(&[0; 16]);
        let mut blocks = reader(data);
        assert!(matches!(blocks.read_header(0), Err(DictError::Format { .. })));
    }

    #[test]
    fn forged_header_cannot_overread_payload() {
        let mut blocks = reader(header_bytes(10, 4, 0));
        let forged = BlockHeader {
            outer_size: 10,
            payload_size: 64,
            decompressed_size: 0,
        };
        assert!(matches!(blocks.read_payload(0, &forged), Err(DictError::Format { .. })));
    }
}
