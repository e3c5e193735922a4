//! # appledict-reader
//!
//! Random-access lookup for Apple Dictionary `Body.data` containers: a run of
//! independently zlib-compressed entry blocks behind a fixed preamble.
//!
//! The first [`DictionaryReader::open`] on a container scans every block once
//! to map headwords to block offsets and caches that index beside the
//! container. Later opens reuse the cache until the container changes.
//!
//! ```no_run
//! use appledict_reader::{DictionaryReader, ReaderOptions};
//!
//! let reader = DictionaryReader::open("Body.data", ReaderOptions::default())?;
//! let entry = reader.lookup("Run")?;
//! println!("{}", entry.text());
//! # Ok::<(), appledict_reader::DictError>(())
//! ```
pub mod appledict;

// Re-export the main types for convenience
pub use appledict::{
    cache::{CacheLookup, MissReason},
    config::{FramingLimits, ReaderOptions},
    format::block::BlockReader,
    index::HeadwordIndex,
    scanner::{scan, scan_file, EntryScanner, ScanStats, ScanStop},
    types::models::{BlockHeader, Entry, Fingerprint, IndexEntry},
    DictError, DictionaryReader, IndexSource, Result,
};
