//! Immutable byte image of a database file.
//!
//! A [`ByteImage`] owns every byte of one database for the lifetime of the
//! engine that wraps it. It is either read fully into memory or
//! memory-mapped, and is never written after construction.
//!
//! All accessors are bounds-checked and return
//! [`WryError::OutOfBounds`] rather than panicking, so a corrupt offset
//! deep inside a redirect chain only fails that one lookup.
//!
//! # Example
//!
//! ```
//! use wrydb::image::ByteImage;
//!
//! let image = ByteImage::from_bytes(vec![0x78, 0x56, 0x34, 0x12, b'h', b'i', 0]);
//! assert_eq!(image.read_u32_le(0)?, 0x12345678);
//! assert_eq!(image.read_uint_le(0, 3)?, 0x345678);
//! assert_eq!(image.read_cstr(4)?, b"hi");
//! # Ok::<(), wrydb::WryError>(())
//! ```

use crate::error::{Result, WryError};
use crate::text::TextDecoder;
use flate2::read::GzDecoder;
use memmap2::Mmap;
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Storage for image bytes - either owned or memory-mapped
enum ImageStorage {
    Owned(Vec<u8>),
    Mmap(Mmap),
}

impl ImageStorage {
    fn as_slice(&self) -> &[u8] {
        match self {
            ImageStorage::Owned(v) => v.as_slice(),
            ImageStorage::Mmap(m) => &m[..],
        }
    }
}

/// Read-only byte buffer over one database file
pub struct ByteImage {
    storage: ImageStorage,
}

fn is_gzip(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("gz"))
        .unwrap_or(false)
}

impl ByteImage {
    /// Read a whole database file into memory.
    ///
    /// Files ending in `.gz` (case-insensitive) are decompressed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| WryError::Io(format!("Failed to open {}: {}", path.display(), e)))?;

        let mut bytes = Vec::new();
        let read = if is_gzip(path) {
            GzDecoder::new(file).read_to_end(&mut bytes)
        } else {
            let mut file = file;
            file.read_to_end(&mut bytes)
        };
        read.map_err(|e| WryError::Io(format!("Failed to read {}: {}", path.display(), e)))?;

        tracing::debug!(path = %path.display(), size = bytes.len(), "loaded database image");
        Ok(Self::from_bytes(bytes))
    }

    /// Memory-map a database file.
    ///
    /// Compressed files cannot be mapped and are loaded instead.
    pub fn map<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if is_gzip(path) {
            return Self::load(path);
        }

        let file = File::open(path)
            .map_err(|e| WryError::Io(format!("Failed to open {}: {}", path.display(), e)))?;
        // SAFETY: the mapping is read-only and database files are not
        // modified while in use.
        let mmap = unsafe { Mmap::map(&file) }
            .map_err(|e| WryError::Io(format!("Failed to mmap {}: {}", path.display(), e)))?;

        tracing::debug!(path = %path.display(), size = mmap.len(), "mapped database image");
        Ok(Self {
            storage: ImageStorage::Mmap(mmap),
        })
    }

    /// Wrap bytes already in memory
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            storage: ImageStorage::Owned(bytes),
        }
    }

    /// Size of the image in bytes
    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    /// True if the image holds no bytes
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True if the image is backed by a memory mapping
    pub fn is_mapped(&self) -> bool {
        matches!(self.storage, ImageStorage::Mmap(_))
    }

    /// The entire image
    pub fn as_slice(&self) -> &[u8] {
        self.storage.as_slice()
    }

    /// Bounds-checked slice of `length` bytes at `offset`
    pub fn get_slice(&self, offset: usize, length: usize) -> Result<&[u8]> {
        let data = self.as_slice();
        match offset.checked_add(length) {
            Some(end) if end <= data.len() => Ok(&data[offset..end]),
            _ => Err(WryError::OutOfBounds(format!(
                "read of {} bytes at offset {} exceeds image size {}",
                length,
                offset,
                data.len()
            ))),
        }
    }

    /// Read one byte
    #[inline]
    pub fn read_u8(&self, offset: usize) -> Result<u8> {
        Ok(self.get_slice(offset, 1)?[0])
    }

    /// Read a little-endian u32
    #[inline]
    pub fn read_u32_le(&self, offset: usize) -> Result<u32> {
        let b = self.get_slice(offset, 4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Read a little-endian u64
    #[inline]
    pub fn read_u64_le(&self, offset: usize) -> Result<u64> {
        let b = self.get_slice(offset, 8)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(b);
        Ok(u64::from_le_bytes(buf))
    }

    /// Read a little-endian 3-byte unsigned integer
    #[inline]
    pub fn read_u24_le(&self, offset: usize) -> Result<u32> {
        let b = self.get_slice(offset, 3)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], 0]))
    }

    /// Read a little-endian unsigned integer of `width` bytes (1..=8).
    ///
    /// The value is zero-extended on the high end.
    pub fn read_uint_le(&self, offset: usize, width: usize) -> Result<u64> {
        if !(1..=8).contains(&width) {
            return Err(WryError::Format(format!(
                "integer width {} not in 1..=8",
                width
            )));
        }
        let b = self.get_slice(offset, width)?;
        let mut buf = [0u8; 8];
        buf[..width].copy_from_slice(b);
        Ok(u64::from_le_bytes(buf))
    }

    /// Bytes from `offset` up to (not including) the next NUL byte.
    ///
    /// Fails if `offset` is past the end or no terminator follows it.
    pub fn read_cstr(&self, offset: usize) -> Result<&[u8]> {
        let data = self.as_slice();
        let tail = data.get(offset..).ok_or_else(|| {
            WryError::OutOfBounds(format!(
                "string at offset {} starts past image size {}",
                offset,
                data.len()
            ))
        })?;
        match memchr::memchr(0, tail) {
            Some(end) => Ok(&tail[..end]),
            None => Err(WryError::OutOfBounds(format!(
                "unterminated string at offset {}",
                offset
            ))),
        }
    }

    /// Decode the NUL-terminated string at `offset`
    pub fn read_string(
        &self,
        offset: usize,
        decoder: TextDecoder,
        placeholder: &str,
    ) -> Result<String> {
        let raw = self.read_cstr(offset)?;
        Ok(decoder.decode(raw, placeholder))
    }
}

impl fmt::Debug for ByteImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteImage")
            .field("size", &self.len())
            .field("mapped", &self.is_mapped())
            .finish()
    }
}

/// Convert an on-disk offset into a slice index
pub(crate) fn to_offset(value: u64) -> Result<usize> {
    usize::try_from(value)
        .map_err(|_| WryError::OutOfBounds(format!("offset {} does not fit in memory", value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_file(data: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(data).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_integer_reads() {
        let image = ByteImage::from_bytes(vec![1, 2, 3, 4, 5, 6, 7, 8, 9]);
        assert_eq!(image.read_u8(0).unwrap(), 1);
        assert_eq!(image.read_u24_le(0).unwrap(), 0x030201);
        assert_eq!(image.read_u32_le(1).unwrap(), 0x05040302);
        assert_eq!(image.read_u64_le(1).unwrap(), 0x0908070605040302);
    }

    #[test]
    fn test_uint_le_zero_padded() {
        let image = ByteImage::from_bytes(vec![0xFF, 0xEE, 0xDD, 0xCC, 0xBB]);
        assert_eq!(image.read_uint_le(0, 1).unwrap(), 0xFF);
        assert_eq!(image.read_uint_le(0, 2).unwrap(), 0xEEFF);
        assert_eq!(image.read_uint_le(0, 5).unwrap(), 0xBB_CCDD_EEFF);
        assert!(matches!(image.read_uint_le(0, 0), Err(WryError::Format(_))));
        assert!(matches!(image.read_uint_le(0, 9), Err(WryError::Format(_))));
    }

    #[test]
    fn test_out_of_bounds() {
        let image = ByteImage::from_bytes(vec![0; 4]);
        assert!(image.read_u32_le(0).is_ok());
        assert!(matches!(image.read_u32_le(1), Err(WryError::OutOfBounds(_))));
        assert!(matches!(image.read_u8(4), Err(WryError::OutOfBounds(_))));
        assert!(matches!(image.get_slice(usize::MAX, 2), Err(WryError::OutOfBounds(_))));
    }

    #[test]
    fn test_cstr() {
        let image = ByteImage::from_bytes(b"abc\0\0xyz".to_vec());
        assert_eq!(image.read_cstr(0).unwrap(), b"abc");
        assert_eq!(image.read_cstr(3).unwrap(), b"");
        assert_eq!(image.read_cstr(1).unwrap(), b"bc");
        // No terminator before the end
        assert!(matches!(image.read_cstr(5), Err(WryError::OutOfBounds(_))));
        assert!(matches!(image.read_cstr(100), Err(WryError::OutOfBounds(_))));
    }

    #[test]
    fn test_load_and_map() {
        let file = create_test_file(b"hello\0");
        let loaded = ByteImage::load(file.path()).unwrap();
        assert!(!loaded.is_mapped());
        assert_eq!(loaded.as_slice(), b"hello\0");

        let mapped = ByteImage::map(file.path()).unwrap();
        assert!(mapped.is_mapped());
        assert_eq!(mapped.read_cstr(0).unwrap(), b"hello");
    }

    #[test]
    fn test_load_gzip() {
        let mut file = NamedTempFile::with_suffix(".dat.gz").unwrap();
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"compressed\0").unwrap();
        file.write_all(&encoder.finish().unwrap()).unwrap();
        file.flush().unwrap();

        let image = ByteImage::map(file.path()).unwrap();
        assert!(!image.is_mapped());
        assert_eq!(image.read_cstr(0).unwrap(), b"compressed");
    }

    #[test]
    fn test_nonexistent_file() {
        let result = ByteImage::load("/nonexistent/path/to/qqwry.dat");
        assert!(matches!(result, Err(WryError::Io(_))));
    }
}
