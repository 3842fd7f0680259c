//! Legacy IPv4 database engine (qqwry.dat layout).
//!
//! ```text
//! +--------------+
//! | header (8)   |  first index offset (u32 LE), last index offset (u32 LE)
//! +--------------+
//! | records      |  [u32 end ip][country][area], strings GBK, NUL-terminated
//! +--------------+
//! | index        |  7-byte entries: start ip (u32 LE) + record offset (u24 LE)
//! +--------------+
//! ```
//!
//! Each index entry starts an address range that runs up to the next
//! entry's start. Records may redirect to shared strings elsewhere in the
//! file, see [`crate::record`].

use crate::error::{Result, WryError};
use crate::image::ByteImage;
use crate::index::{floor_search, SearchMode};
use crate::labels::Labels;
use crate::record::{Dialect, Location, RecordReader};
use crate::text::TextDecoder;
use serde::Serialize;
use std::net::Ipv4Addr;
use std::ops::Range;
use std::path::Path;

/// Size of one index entry
pub const INDEX_ENTRY_SIZE: usize = 7;
/// Width of record offsets
pub const OFFSET_WIDTH: usize = 3;
/// Bytes skipped at the start of every record
const RECORD_PREFIX: usize = 4;
/// Area string the publisher uses for "no information"
pub const PLACEHOLDER_AREA: &str = " CZ88.NET";

/// Parsed 8-byte header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct V4Header {
    /// Offset of the first index entry
    pub first_index_offset: u32,
    /// Offset of the last index entry
    pub last_index_offset: u32,
}

impl V4Header {
    /// Parse and validate the header against the image
    pub fn parse(image: &ByteImage) -> Result<Self> {
        if image.len() < 8 {
            return Err(WryError::Format(format!(
                "file too small: {} bytes (need at least 8)",
                image.len()
            )));
        }
        let header = Self {
            first_index_offset: image.read_u32_le(0)?,
            last_index_offset: image.read_u32_le(4)?,
        };

        if header.last_index_offset < header.first_index_offset {
            return Err(WryError::Format(format!(
                "last index offset {} precedes first index offset {}",
                header.last_index_offset, header.first_index_offset
            )));
        }
        let span = (header.last_index_offset - header.first_index_offset) as usize;
        if span % INDEX_ENTRY_SIZE != 0 {
            return Err(WryError::Format(format!(
                "index span {} is not a multiple of {}",
                span, INDEX_ENTRY_SIZE
            )));
        }
        let index_end = header.last_index_offset as usize + INDEX_ENTRY_SIZE;
        if index_end > image.len() {
            return Err(WryError::Format(format!(
                "index ends at {} beyond file size {}",
                index_end,
                image.len()
            )));
        }
        Ok(header)
    }

    /// Number of index entries
    pub fn index_count(&self) -> usize {
        (self.last_index_offset - self.first_index_offset) as usize / INDEX_ENTRY_SIZE + 1
    }
}

/// One decoded index entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct V4IndexEntry {
    /// First address of the range
    pub start: Ipv4Addr,
    /// Offset of the range's record
    pub record_offset: u32,
}

/// One line of an index dump
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DumpEntry {
    /// First address of the range
    pub ip: Ipv4Addr,
    /// Offset of the range's record
    pub record_offset: u32,
    /// Resolved country
    pub country: String,
    /// Resolved area, blank when the publisher's placeholder
    pub area: String,
}

/// Lookup engine over a qqwry.dat image
#[derive(Debug)]
pub struct V4Engine {
    image: ByteImage,
    header: V4Header,
    index_count: usize,
    labels: Labels,
}

impl V4Engine {
    /// Read a database file into memory and open it
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_image(ByteImage::load(path)?)
    }

    /// Open a database over an existing image
    pub fn from_image(image: ByteImage) -> Result<Self> {
        let header = V4Header::parse(&image)?;
        let index_count = header.index_count();
        tracing::debug!(
            first_index = header.first_index_offset,
            last_index = header.last_index_offset,
            index_count,
            "opened v4 database"
        );
        Ok(Self {
            image,
            header,
            index_count,
            labels: Labels::default(),
        })
    }

    /// Open a database from raw bytes
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        Self::from_image(ByteImage::from_bytes(bytes))
    }

    /// Replace the label set
    pub fn with_labels(mut self, labels: Labels) -> Self {
        self.labels = labels;
        self
    }

    /// Parsed header
    pub fn header(&self) -> &V4Header {
        &self.header
    }

    /// Number of index entries
    pub fn index_count(&self) -> usize {
        self.index_count
    }

    /// Size of the underlying image
    pub fn image_len(&self) -> usize {
        self.image.len()
    }

    /// Labels used for placeholders
    pub fn labels(&self) -> &Labels {
        &self.labels
    }

    fn entry_offset(&self, i: usize) -> usize {
        self.header.first_index_offset as usize + i * INDEX_ENTRY_SIZE
    }

    /// Read index entry `i`
    pub fn entry(&self, i: usize) -> Result<V4IndexEntry> {
        if i >= self.index_count {
            return Err(WryError::OutOfBounds(format!(
                "index entry {} beyond count {}",
                i, self.index_count
            )));
        }
        let at = self.entry_offset(i);
        Ok(V4IndexEntry {
            start: Ipv4Addr::from(self.image.read_u32_le(at)?),
            record_offset: self.image.read_u24_le(at + 4)?,
        })
    }

    /// Index of the range containing `target`
    pub fn find(&self, target: u32) -> Result<usize> {
        // Upper bound is the entry count, so addresses above the last start
        // key land in the last range rather than the second to last.
        floor_search(
            u64::from(target),
            self.index_count,
            SearchMode::ShortCircuit,
            |i| Ok(u64::from(self.image.read_u32_le(self.entry_offset(i))?)),
        )
    }

    fn reader(&self) -> RecordReader<'_> {
        RecordReader::new(
            &self.image,
            OFFSET_WIDTH,
            Dialect::Legacy,
            TextDecoder::Gbk,
            &self.labels.unknown,
        )
    }

    /// Resolve the record an index entry points at
    pub fn resolve(&self, record_offset: u32) -> Result<Location> {
        self.reader()
            .resolve_record(record_offset as usize + RECORD_PREFIX)
    }

    /// Look up a dotted-quad address
    pub fn lookup(&self, ip: &str) -> Result<Location> {
        let addr: Ipv4Addr = ip.trim().parse()?;
        self.lookup_addr(addr)
    }

    /// Look up an address
    pub fn lookup_addr(&self, addr: Ipv4Addr) -> Result<Location> {
        let i = self.find(u32::from(addr))?;
        let entry = self.entry(i)?;
        let location = self.resolve(entry.record_offset)?;
        tracing::trace!(%addr, index = i, record_offset = entry.record_offset, "v4 lookup");
        Ok(location)
    }

    /// Resolve every entry in `range` of index positions, in index order
    pub fn dump(&self, range: Range<usize>) -> Result<Vec<DumpEntry>> {
        if range.end > self.index_count {
            return Err(WryError::OutOfBounds(format!(
                "dump range {}..{} beyond index count {}",
                range.start, range.end, self.index_count
            )));
        }
        range
            .map(|i| {
                let entry = self.entry(i)?;
                let mut location = self.resolve(entry.record_offset)?;
                if location.area == PLACEHOLDER_AREA {
                    location.area.clear();
                }
                Ok(DumpEntry {
                    ip: entry.start,
                    record_offset: entry.record_offset,
                    country: location.country,
                    area: location.area,
                })
            })
            .collect()
    }
}
