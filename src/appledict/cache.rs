//! Persisted index cache.
//!
//! The cache is a JSON file holding a [`HeadwordIndex`] together with the
//! fingerprint of the container it was built from. It is only trusted when
//! that fingerprint (and the framing it was built with) still matches; any
//! other state is a [`CacheLookup::Miss`] and leads to a full rebuild.
//!
//! Saving goes through a temporary file in the same directory that is synced
//! and then renamed over the cache path, so a concurrent reader sees either
//! the previous cache or the complete new one, never a partial write.

use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::Path;

use log::{debug, info};
use tempfile::Builder;

use crate::appledict::index::{HeadwordIndex, INDEX_FORMAT_VERSION};
use crate::appledict::types::error::Result;
use crate::appledict::types::models::Fingerprint;

/// Why a cache could not be used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MissReason {
    /// No cache file exists.
    Absent,
    /// The file exists but could not be read or parsed.
    Unreadable(String),
    /// Written by an incompatible version of this crate.
    VersionMismatch { found: u32 },
    /// Built with a different first block offset.
    LayoutMismatch { found: u64, expected: u64 },
    /// The container changed since the cache was written.
    Stale,
    /// Offsets point outside the container.
    Corrupt,
}

/// Outcome of [`load`].
#[derive(Debug)]
pub enum CacheLookup {
    Hit(HeadwordIndex),
    Miss(MissReason),
}

/// Loads the cache at `cache_path` if it is valid for a container with
/// `fingerprint` scanned from `first_block_offset`.
///
/// Never fails: every problem is reported as a [`CacheLookup::Miss`].
pub fn load(cache_path: &Path, fingerprint: &Fingerprint, first_block_offset: u64) -> CacheLookup {
    let lookup = match read_index(cache_path) {
        Err(reason) => CacheLookup::Miss(reason),
        Ok(index) => validate(index, fingerprint, first_block_offset),
    };
    match &lookup {
        CacheLookup::Hit(index) => info!(
            "Loaded index cache {} ({} headwords)",
            cache_path.display(),
            index.len()
        ),
        CacheLookup::Miss(reason) => debug!("Index cache {} unusable: {:?}", cache_path.display(), reason),
    }
    lookup
}

fn read_index(cache_path: &Path) -> std::result::Result<HeadwordIndex, MissReason> {
    let file = match File::open(cache_path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Err(MissReason::Absent),
        Err(e) => return Err(MissReason::Unreadable(e.to_string())),
    };
    serde_json::from_reader(BufReader::new(file)).map_err(|e| MissReason::Unreadable(e.to_string()))
}

fn validate(index: HeadwordIndex, fingerprint: &Fingerprint, first_block_offset: u64) -> CacheLookup {
    if index.format_version != INDEX_FORMAT_VERSION {
        return CacheLookup::Miss(MissReason::VersionMismatch {
            found: index.format_version,
        });
    }
    if index.first_block_offset != first_block_offset {
        return CacheLookup::Miss(MissReason::LayoutMismatch {
            found: index.first_block_offset,
            expected: first_block_offset,
        });
    }
    if index.fingerprint != *fingerprint {
        return CacheLookup::Miss(MissReason::Stale);
    }
    if !index.offsets_within(fingerprint.size) {
        return CacheLookup::Miss(MissReason::Corrupt);
    }
    CacheLookup::Hit(index)
}

/// Atomically writes `index` to `cache_path`.
pub fn save(cache_path: &Path, index: &HeadwordIndex) -> Result<()> {
    let dir = match cache_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = Builder::new()
        .prefix(".appledict-index-")
        .suffix(".tmp")
        .tempfile_in(dir)?;
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        serde_json::to_writer(&mut writer, index)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(cache_path).map_err(|e| e.error)?;
    info!(
        "Saved index cache {} ({} headwords)",
        cache_path.display(),
        index.len()
    );
    Ok(())
}
