use std::fs::File;
use std::io::{Read, Seek};
use std::path::{Path, PathBuf};

use log::{info, warn};

use super::cache::{self, CacheLookup};
use super::codec::compression;
use super::config::ReaderOptions;
use super::format::block::BlockReader;
use super::index::HeadwordIndex;
use super::scanner::EntryScanner;
use super::types::error::{DictError, Result};
use super::types::models::{Entry, Fingerprint};
use super::utils::{default_cache_path, normalize_headword};

/// Where the reader's index came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexSource {
    /// Loaded from a valid cache file.
    Cache,
    /// Built by scanning the container during [`DictionaryReader::open`].
    Scan,
}

/// Random-access reader for a dictionary container.
///
/// Owns the headword index for one container. Construct it once with
/// [`open`](Self::open) and reuse it for every lookup: the index is loaded from
/// the cache or built by a single scan at that point, after which each lookup
/// is one seek plus the inflation of one block.
#[derive(Debug)]
pub struct DictionaryReader {
    container_path: PathBuf,
    options: ReaderOptions,
    cache_path: Option<PathBuf>,
    index: HeadwordIndex,
    source: IndexSource,
}

impl DictionaryReader {
    /// Opens the container at `path`, loading its index from the cache or
    /// building (and caching) it with a full scan.
    ///
    /// A cache that cannot be saved is logged and otherwise ignored.
    ///
    /// # Errors
    /// Returns an error if the container cannot be opened or an I/O error
    /// interrupts the scan. Malformed framing only shortens the index.
    pub fn open(path: impl AsRef<Path>, options: ReaderOptions) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening container: {}", path.display());
        let file = File::open(path)?;
        let fingerprint = Fingerprint::from_metadata(&file.metadata()?);
        Self::open_source(path, file, fingerprint, options)
    }

    /// Loads or builds the index for `path`, scanning `source` on a cache miss.
    ///
    /// The cache is written only after the scan has completed.
    fn open_source<R: Read + Seek>(
        path: &Path,
        source: R,
        fingerprint: Fingerprint,
        options: ReaderOptions,
    ) -> Result<Self> {
        let cache_path = options.use_cache.then(|| {
            options
                .cache_path
                .clone()
                .unwrap_or_else(|| default_cache_path(path))
        });

        if let Some(cache_path) = cache_path.as_deref() {
            if !options.force_rebuild {
                if let CacheLookup::Hit(index) =
                    cache::load(cache_path, &fingerprint, options.first_block_offset)
                {
                    return Ok(Self {
                        container_path: path.to_path_buf(),
                        cache_path: Some(cache_path.to_path_buf()),
                        options,
                        index,
                        source: IndexSource::Cache,
                    });
                }
            }
        }

        info!("Building headword index for {}", path.display());
        let mut scanner = EntryScanner::new(source, options.framing())?;
        let index = HeadwordIndex::build(&mut scanner, fingerprint, options.first_block_offset)?;
        drop(scanner);

        if let Some(cache_path) = cache_path.as_deref() {
            if let Err(e) = cache::save(cache_path, &index) {
                warn!("Could not save index cache {}: {}", cache_path.display(), e);
            }
        }

        Ok(Self {
            container_path: path.to_path_buf(),
            cache_path,
            options,
            index,
            source: IndexSource::Scan,
        })
    }

    /// Looks up `query` and returns the inflated entry that defines it.
    ///
    /// The query is lowercased before lookup. When the headword has homonyms
    /// the entry scanned last is returned; see [`lookup_all`](Self::lookup_all).
    ///
    /// # Errors
    /// - [`DictError::NotFound`] naming `query` as given
    /// - [`DictError::Format`] if the indexed block no longer frames correctly
    /// - [`DictError::Decompression`] if the block does not inflate to its declared size
    /// - [`DictError::Io`] if the container cannot be read
    pub fn lookup(&self, query: &str) -> Result<Entry> {
        let key = normalize_headword(query);
        let offset = self
            .index
            .offset_of(&key)
            .ok_or_else(|| DictError::NotFound {
                query: query.to_string(),
            })?;
        self.read_entry(key, offset)
    }

    /// Returns every entry indexed under `query`, in container order.
    pub fn lookup_all(&self, query: &str) -> Result<Vec<Entry>> {
        let key = normalize_headword(query);
        let offsets = self.index.offsets_of(&key);
        if offsets.is_empty() {
            return Err(DictError::NotFound {
                query: query.to_string(),
            });
        }
        offsets
            .into_iter()
            .map(|offset| self.read_entry(key.clone(), offset))
            .collect()
    }

    /// Reads and inflates the block at `offset`.
    ///
    /// The container is opened for this call only and closed on every return path.
    pub fn read_entry(&self, headword: String, offset: u64) -> Result<Entry> {
        let file = File::open(&self.container_path)?;
        let mut blocks = BlockReader::new(file, self.options.framing())?;
        let header = blocks.read_header(offset)?;
        let payload = blocks.read_payload(offset, &header)?;
        let markup = compression::inflate(&payload, header.decompressed_size as u64, offset)?;
        Ok(Entry::new(headword, offset, header, markup))
    }

    /// Up to `limit` headwords starting with `prefix` (case-insensitive), sorted.
    pub fn suggest(&self, prefix: &str, limit: usize) -> Vec<String> {
        let prefix = normalize_headword(prefix);
        self.index
            .with_prefix(&prefix)
            .take(limit)
            .map(str::to_owned)
            .collect()
    }

    /// Every indexed headword in sorted order. Does not touch the container.
    pub fn headwords(&self) -> impl Iterator<Item = &str> + '_ {
        self.index.headwords()
    }

    pub fn index(&self) -> &HeadwordIndex {
        &self.index
    }

    pub fn index_source(&self) -> IndexSource {
        self.source
    }

    /// Path of the index cache, or `None` when caching is disabled.
    pub fn cache_path(&self) -> Option<&Path> {
        self.cache_path.as_deref()
    }

    pub fn container_path(&self) -> &Path {
        &self.container_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    use std::fs;
    use std::io::{self, Cursor, SeekFrom, Write};

    /// Fails every read that starts at or beyond `fail_at`.
    struct FailingDisk {
        inner: Cursor<Vec<u8>>,
        fail_at: u64,
    }

    impl Read for FailingDisk {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.inner.position() >= self.fail_at {
                return Err(io::Error::new(io::ErrorKind::Other, "disk went away"));
            }
            self.inner.read(buf)
        }
    }

    impl Seek for FailingDisk {
        fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
            self.inner.seek(pos)
        }
    }

    fn block(markup: &[u8]) -> Vec<u8> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(markup).unwrap();
        let payload = encoder.finish().unwrap();

        let mut out = Vec::new();
        out.extend_from_slice(&(payload.len() as u32 + 8).to_le_bytes());
        out.extend_from_slice(&(payload.len() as u32 + 4).to_le_bytes());
        out.extend_from_slice(&(markup.len() as u32).to_le_bytes());
        out.extend_from_slice(&payload);
        out
    }

    #[test]
    fn interrupted_scan_writes_no_cache() {
        let dir = tempfile::tempdir().unwrap();
        let body = dir.path().join("Body.data");

        let mut data = vec![0u8; 0x60];
        data.extend(block(br#"<d:entry d:title="cat"/>"#));
        let second = data.len() as u64;
        data.extend(block(br#"<d:entry d:title="run"/>"#));
        fs::write(&body, &data).unwrap();

        let source = FailingDisk {
            inner: Cursor::new(data.clone()),
            fail_at: second + 12,
        };
        let fingerprint = Fingerprint::from_len(data.len() as u64);
        let err = DictionaryReader::open_source(&body, source, fingerprint, ReaderOptions::default())
            .unwrap_err();
        assert!(matches!(err, DictError::Io(_)));

        let left: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(left, vec!["Body.data".to_string()]);
        assert!(!default_cache_path(&body).exists());

        let reader = DictionaryReader::open(&body, ReaderOptions::default()).unwrap();
        assert_eq!(reader.index_source(), IndexSource::Scan);
        assert_eq!(reader.index().len(), 2);
    }
}
