//! Configuration options for opening a container.

use std::path::PathBuf;

/// Offset of the first block header; everything before it is a preamble
/// the reader does not interpret.
pub const DEFAULT_FIRST_BLOCK_OFFSET: u64 = 0x60;

/// Largest `outer_size` accepted before the scan treats the container as ended.
pub const DEFAULT_MAX_OUTER_SIZE: u32 = 500_000;

/// Largest declared `decompressed_size` the reader will allocate for.
pub const DEFAULT_MAX_ENTRY_SIZE: u32 = 16 * 1024 * 1024;

/// Options controlling framing limits and the index cache.
#[derive(Debug, Clone)]
pub struct ReaderOptions {
    /// Offset of the first block in the container.
    /// Default: 0x60
    pub first_block_offset: u64,

    /// Upper bound for a block's `outer_size`; zero or anything larger is a format error.
    /// Default: 500 000
    pub max_outer_size: u32,

    /// Upper bound for a block's `decompressed_size`.
    /// Default: 16 MiB
    pub max_entry_size: u32,

    /// Where to keep the index cache.
    /// Default: `None`, which places `<container>.index.json` next to the container.
    pub cache_path: Option<PathBuf>,

    /// Load and save the index cache at all.
    /// Default: true
    pub use_cache: bool,

    /// Ignore an existing cache and rescan. The new index is still saved.
    /// Default: false
    pub force_rebuild: bool,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            first_block_offset: DEFAULT_FIRST_BLOCK_OFFSET,
            max_outer_size: DEFAULT_MAX_OUTER_SIZE,
            max_entry_size: DEFAULT_MAX_ENTRY_SIZE,
            cache_path: None,
            use_cache: true,
            force_rebuild: false,
        }
    }
}

/// The subset of options that governs block framing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramingLimits {
    pub first_block_offset: u64,
    pub max_outer_size: u32,
    pub max_entry_size: u32,
}

impl Default for FramingLimits {
    fn default() -> Self {
        ReaderOptions::default().framing()
    }
}

impl ReaderOptions {
    pub fn framing(&self) -> FramingLimits {
        FramingLimits {
            first_block_offset: self.first_block_offset,
            max_outer_size: self.max_outer_size,
            max_entry_size: self.max_entry_size,
        }
    }
}
