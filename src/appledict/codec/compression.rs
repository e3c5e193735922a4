//! Decompression of block payloads.
//!
//! Every payload in a container is an independent zlib stream whose inflated
//! length is declared in the block header. The output must match that length
//! exactly: a short stream, a long stream and a corrupt stream are all errors.

use std::io::Read;

use flate2::read::ZlibDecoder;
use log::trace;

use crate::appledict::types::error::{DictError, Result};

/// Upper bound on how far deflate can expand its input.
const MAX_DEFLATE_RATIO: u64 = 1032;

/// Inflates `payload` into `output`, replacing its contents.
///
/// `output` is resized to `expected_size` up front. `block_offset` is only used
/// to give errors context.
///
/// # Errors
/// Returns [`DictError::Decompression`] if the stream is corrupt, ends before
/// `expected_size` bytes, or carries data beyond it. A size the payload could
/// never inflate to, or that cannot be allocated, is rejected before any
/// buffer is grown.
pub fn inflate_into(
    output: &mut Vec<u8>,
    payload: &[u8],
    expected_size: u64,
    block_offset: u64,
) -> Result<()> {
    trace!(
        "Inflating block at {:#x}: {} bytes -> {} bytes (expected)",
        block_offset,
        payload.len(),
        expected_size
    );
    output.clear();
    let ceiling = (payload.len() as u64).saturating_mul(MAX_DEFLATE_RATIO);
    if expected_size > ceiling {
        return Err(DictError::decompression(
            block_offset,
            format!(
                "declared size {} is beyond what {} compressed bytes can hold",
                expected_size,
                payload.len()
            ),
        ));
    }
    let size = usize::try_from(expected_size)
        .ok()
        .filter(|&size| output.try_reserve_exact(size).is_ok())
        .ok_or_else(|| {
            DictError::decompression(
                block_offset,
                format!("cannot allocate {} bytes for the inflated block", expected_size),
            )
        })?;
    output.resize(size, 0);

    let mut decoder = ZlibDecoder::new(payload);
    decoder.read_exact(output).map_err(|e| {
        output.clear();
        DictError::decompression(
            block_offset,
            format!("zlib stream yielded fewer than {} bytes: {}", expected_size, e),
        )
    })?;

    // The stream has to end exactly here; reading on also verifies the trailer.
    let mut probe = [0u8; 1];
    match decoder.read(&mut probe) {
        Ok(0) => Ok(()),
        Ok(_) => {
            output.clear();
            Err(DictError::decompression(
                block_offset,
                format!("zlib stream inflates past the declared {} bytes", expected_size),
            ))
        }
        Err(e) => {
            output.clear();
            Err(DictError::decompression(
                block_offset,
                format!("zlib stream is corrupt after {} bytes: {}", expected_size, e),
            ))
        }
    }
}

/// Inflates `payload` into a freshly allocated buffer of exactly `expected_size` bytes.
pub fn inflate(payload: &[u8], expected_size: u64, block_offset: u64) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    inflate_into(&mut output, payload, expected_size, block_offset)?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn deflate(data: &[u8]) -> Vec<u8> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn inflates_to_declared_size() {
        let markup = b"<d:entry d:title=\"cat\">a small animal</d:entry>";
        let payload = deflate(markup);

        let first = inflate(&payload, markup.len() as u64, 0x60).unwrap();
        let second = inflate(&payload, markup.len() as u64, 0x60).unwrap();
        assert_eq!(first, markup);
        assert_eq!(first, second);
    }

    #[test]
    fn empty_stream_inflates_to_nothing() {
        let payload = deflate(b"");
        assert!(inflate(&payload, 0, 0).unwrap().is_empty());
    }

    #[test]
    fn declared_size_too_large_is_an_error() {
        let payload = deflate(b"twelve bytes");
        let err = inflate(&payload, 13, 0x60).unwrap_err();
        assert!(matches!(err, DictError::Decompression { offset: 0x60, .. }));
    }

    #[test]
    fn declared_size_too_small_is_an_error() {
        let payload = deflate(b"twelve bytes");
        let err = inflate(&payload, 11, 0x60).unwrap_err();
        assert!(matches!(err, DictError::Decompression { .. }));
    }

    #[test]
    fn truncated_stream_is_an_error() {
        let markup = vec![b'x'; 4096];
        let payload = deflate(&markup);
        let truncated = &payload[..payload.len() / 2];
        assert!(inflate(truncated, markup.len() as u64, 0).is_err());
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(inflate(b"definitely not zlib", 5, 0).is_err());
    }

    #[test]
    fn unallocatable_size_is_an_error() {
        let payload = deflate(b"tiny");
        for size in [u64::MAX, 1 << 40] {
            let err = inflate(&payload, size, 0x60).unwrap_err();
            assert!(matches!(err, DictError::Decompression { offset: 0x60, .. }));
        }
        let mut output = vec![1, 2, 3];
        assert!(inflate_into(&mut output, &payload, u64::MAX, 0).is_err());
        assert!(output.is_empty());
    }

    #[test]
    fn highly_compressible_block_inflates() {
        let markup = vec![b' '; 1 << 20];
        let payload = deflate(&markup);
        assert_eq!(inflate(&payload, markup.len() as u64, 0).unwrap(), markup);
    }

    #[test]
    fn failed_inflate_leaves_buffer_empty() {
        let mut output = vec![1, 2, 3];
        assert!(inflate_into(&mut output, b"junk", 8, 0).is_err());
        assert!(output.is_empty());
    }
}
