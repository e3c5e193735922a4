//! Sequential scan of a container, producing headword locations.
//!
//! [`EntryScanner`] walks the container from the first block to the end,
//! inflating each block only to find its titles, and yields one
//! [`IndexEntry`] per distinct title. Every title of a block points at the
//! offset of that block.
//!
//! Framing problems end the scan instead of failing it: whatever was found
//! before the bad header is still yielded, and [`ScanStats::stop`] records
//! why the scan ended. I/O errors are yielded as `Err` and end the iterator.
//!
//! # Example
//! ```no_run
//! # use appledict_reader::{EntryScanner, FramingLimits};
//! # let file = std::fs::File::open("Body.data").unwrap();
//! let mut scanner = EntryScanner::new(file, FramingLimits::default()).unwrap();
//! for entry in &mut scanner {
//!     let entry = entry.unwrap();
//!     println!("{} @ {:#x}", entry.headword, entry.offset);
//! }
//! println!("{:?}", scanner.stats());
//! ```

use std::collections::VecDeque;
use std::fs::File;
use std::io::{Cursor, Read, Seek};
use std::path::Path;

use log::{debug, info, trace, warn};

use crate::appledict::codec::compression;
use crate::appledict::config::FramingLimits;
use crate::appledict::format::block::BlockReader;
use crate::appledict::format::titles;
use crate::appledict::types::error::{DictError, Result};
use crate::appledict::types::models::IndexEntry;

/// Why a scan ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanStop {
    /// The last block ended exactly at the end of the container.
    EndOfFile,
    /// Framing became invalid; the container is taken to end at [`ScanStats::extent`].
    Format(String),
}

/// Counters collected while scanning.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanStats {
    /// Blocks whose framing was read successfully.
    pub blocks: u64,
    /// Index entries yielded.
    pub headwords: u64,
    /// Blocks that inflated but declared no title.
    pub untitled_blocks: u64,
    /// Blocks whose payload failed to inflate.
    pub skipped_blocks: u64,
    /// End offset of the last well-framed block.
    pub extent: u64,
    /// Set once the scan has run to completion.
    pub stop: Option<ScanStop>,
}

/// Iterator over every headword in a container, in container order.
///
/// Finite and restartable via [`restart`](Self::restart); it cannot resume
/// from the middle of a previous pass.
#[derive(Debug)]
pub struct EntryScanner<R> {
    blocks: BlockReader<R>,
    cursor: u64,
    pending: VecDeque<IndexEntry>,
    buffer: Vec<u8>,
    stats: ScanStats,
    failed: bool,
}

/// Scans an in-memory container.
pub fn scan(container: &[u8], limits: FramingLimits) -> Result<EntryScanner<Cursor<&[u8]>>> {
    EntryScanner::new(Cursor::new(container), limits)
}

/// Scans the container at `path`. The file is closed when the scanner is dropped.
pub fn scan_file(path: impl AsRef<Path>, limits: FramingLimits) -> Result<EntryScanner<File>> {
    EntryScanner::new(File::open(path)?, limits)
}

impl<R: Read + Seek> EntryScanner<R> {
    pub fn new(inner: R, limits: FramingLimits) -> Result<Self> {
        Ok(Self::from_block_reader(BlockReader::new(inner, limits)?))
    }

    pub fn from_block_reader(blocks: BlockReader<R>) -> Self {
        let first = blocks.limits().first_block_offset;
        Self {
            blocks,
            cursor: first,
            pending: VecDeque::new(),
            buffer: Vec::new(),
            stats: ScanStats {
                extent: first,
                ..ScanStats::default()
            },
            failed: false,
        }
    }

    /// Rewinds to the first block and clears all counters.
    pub fn restart(&mut self) {
        let first = self.blocks.limits().first_block_offset;
        self.cursor = first;
        self.pending.clear();
        self.stats = ScanStats {
            extent: first,
            ..ScanStats::default()
        };
        self.failed = false;
    }

    pub fn stats(&self) -> &ScanStats {
        &self.stats
    }

    /// True once the scan reached the end of the container or a framing error.
    /// A scan cut short by an I/O error is never complete.
    pub fn is_complete(&self) -> bool {
        !self.failed && self.stats.stop.is_some()
    }

    /// Length of the container being scanned.
    pub fn container_len(&self) -> u64 {
        self.blocks.len()
    }

    fn finish(&mut self, stop: ScanStop) {
        self.stats.extent = self.cursor;
        info!(
            "Scan finished at {:#x}: {} blocks, {} headwords, {} untitled, {} skipped ({:?})",
            self.cursor,
            self.stats.blocks,
            self.stats.headwords,
            self.stats.untitled_blocks,
            self.stats.skipped_blocks,
            stop
        );
        self.stats.stop = Some(stop);
    }

    /// Processes the block under the cursor, queueing its headwords.
    fn step(&mut self) -> Result<()> {
        let offset = self.cursor;
        if offset >= self.blocks.len() {
            self.finish(ScanStop::EndOfFile);
            return Ok(());
        }

        let header = match self.blocks.read_header(offset) {
            Ok(header) => header,
            Err(DictError::Format { reason, .. }) => {
                warn!("Container ends at {:#x}: {}", offset, reason);
                self.finish(ScanStop::Format(reason));
                return Ok(());
            }
            Err(e) => return Err(e),
        };
        let payload = self.blocks.read_payload(offset, &header)?;
        self.stats.blocks += 1;
        self.cursor = header.next_offset(offset);
        self.stats.extent = self.cursor;

        if let Err(e) = compression::inflate_into(
            &mut self.buffer,
            &payload,
            header.decompressed_size as u64,
            offset,
        ) {
            warn!("Skipping block: {}", e);
            self.stats.skipped_blocks += 1;
            return Ok(());
        }

        let headwords = titles::extract_headwords(&self.buffer);
        if headwords.is_empty() {
            debug!("Block at {:#x} declares no title", offset);
            self.stats.untitled_blocks += 1;
            return Ok(());
        }
        trace!("Block at {:#x}: {:?}", offset, headwords);
        self.stats.headwords += headwords.len() as u64;
        self.pending
            .extend(headwords.into_iter().map(|headword| IndexEntry { headword, offset }));
        Ok(())
    }
}

impl<R: Read + Seek> Iterator for EntryScanner<R> {
    type Item = Result<IndexEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(entry) = self.pending.pop_front() {
                return Some(Ok(entry));
            }
            if self.failed || self.stats.stop.is_some() {
                return None;
            }
            if let Err(e) = self.step() {
                self.failed = true;
                return Some(Err(e));
            }
        }
    }
}
