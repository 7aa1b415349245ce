//! Sampled content fingerprints.
//!
//! Small files are hashed in full. Files at or above the sample threshold
//! are hashed from three windows only: the start, the middle and the end.
//! A change confined to the unsampled regions of a large file is not
//! detected. The fingerprint decides "same or different"; it is not a
//! security hash.
//!
//! The digest is XXH3-128 over the sampled bytes followed by the file size
//! as a little-endian base-128 varint, rendered as lowercase hex.

use crate::error::{CoreError, CoreResult};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use xxhash_rust::xxh3::xxh3_128;

/// Sampling parameters for [`fingerprint`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashConfig {
    /// Files smaller than this are hashed in full.
    pub sample_threshold: u64,
    /// Size of each sampled window.
    pub sample_size: u64,
}

impl HashConfig {
    /// Creates a config with explicit sampling parameters.
    pub fn new(sample_threshold: u64, sample_size: u64) -> Self {
        Self {
            sample_threshold,
            sample_size,
        }
    }

    /// Returns true if a file of `size` bytes is hashed from samples.
    pub fn is_sampled(&self, size: u64) -> bool {
        !(size < self.sample_threshold
            || self.sample_size < 1
            || size < self.sample_size.saturating_mul(4))
    }
}

impl Default for HashConfig {
    fn default() -> Self {
        Self::new(10 * 1024 * 1024, 32 * 1024)
    }
}

/// Computes the fingerprint of a file on disk.
///
/// The file handle is closed as soon as the sampled bytes are in memory.
pub fn fingerprint(path: &Path, config: &HashConfig) -> CoreResult<String> {
    let mut file = File::open(path).map_err(|e| CoreError::io(path, e))?;
    let size = file.metadata().map_err(|e| CoreError::io(path, e))?.len();
    let data = read_samples(&mut file, size, config, path)?;
    drop(file);
    Ok(digest(&data, size))
}

/// Computes the fingerprint of any seekable source.
///
/// `source` only labels errors.
pub fn fingerprint_reader<R: Read + Seek>(
    mut reader: R,
    source: &Path,
    config: &HashConfig,
) -> CoreResult<String> {
    let size = reader
        .seek(SeekFrom::End(0))
        .map_err(|e| CoreError::io(source, e))?;
    let data = read_samples(&mut reader, size, config, source)?;
    drop(reader);
    Ok(digest(&data, size))
}

fn read_samples<R: Read + Seek>(
    reader: &mut R,
    size: u64,
    config: &HashConfig,
    source: &Path,
) -> CoreResult<Vec<u8>> {
    if !config.is_sampled(size) {
        return read_chunk(reader, 0, size, source);
    }

    let window = config.sample_size;
    let mut data = Vec::with_capacity(usize::try_from(window * 3).unwrap_or(0));
    for offset in [0, size / 2, size - window] {
        data.extend(read_chunk(reader, offset, window, source)?);
    }
    Ok(data)
}

fn read_chunk<R: Read + Seek>(
    reader: &mut R,
    offset: u64,
    len: u64,
    source: &Path,
) -> CoreResult<Vec<u8>> {
    reader
        .seek(SeekFrom::Start(offset))
        .map_err(|e| CoreError::io(source, e))?;

    let mut buf = Vec::with_capacity(usize::try_from(len).unwrap_or(0));
    let read = reader
        .by_ref()
        .take(len)
        .read_to_end(&mut buf)
        .map_err(|e| CoreError::io(source, e))? as u64;

    if read < len {
        return Err(CoreError::ShortRead {
            path: source.to_path_buf(),
            expected: len,
            actual: read,
        });
    }
    Ok(buf)
}

fn digest(data: &[u8], size: u64) -> String {
    let mut out = xxh3_128(data).to_be_bytes().to_vec();
    put_uvarint(&mut out, size);
    hex::encode(out)
}

/// Appends `value` as a base-128 varint: 7 bits per byte, high bit set on
/// every byte except the last.
fn put_uvarint(buf: &mut Vec<u8>, mut value: u64) {
    while value >= 0x80 {
        buf.push((value as u8 & 0x7f) | 0x80);
        value >>= 7;
    }
    buf.push(value as u8);
}
