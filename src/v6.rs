//! IPv6 database engine (IPDB layout, ipv6wry.db).
//!
//! ```text
//! 0..4    "IPDB"
//! 4..6    version (u16 LE), 1 or 2
//! 6       offset width in bytes (2..=8)
//! 7       address width in bytes (8: top 64 bits of an IPv6 address)
//! 8..16   record count (u64 LE)
//! 16..24  first index offset (u64 LE)
//! 24      address field count (version 2; version 1 always has 2)
//! 25..32  reserved
//! ```
//!
//! Index entries are `[prefix: u64 LE][record offset: offset width LE]`,
//! sorted by prefix. Records follow the same redirect scheme as the v4
//! format with UTF-8 strings and wider offsets.
//!
//! Lookups are fail-soft: [`V6Engine::lookup`] never returns an error.
//! Unparsable addresses and corrupt records produce a sentinel
//! [`ResolvedLocation`] whose country is the invalid-address label.

use crate::error::{Result, WryError};
use crate::image::{to_offset, ByteImage};
use crate::index::{floor_search, SearchMode};
use crate::labels::{render, Labels};
use crate::record::{Dialect, Location, RecordReader};
use crate::text::TextDecoder;
use crate::transition::Transition;
use crate::v4::V4Engine;
use serde::Serialize;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::path::Path;
use std::sync::Arc;

/// Magic bytes at the start of every IPDB file
pub const MAGIC: &[u8; 4] = b"IPDB";
/// Highest supported format version
pub const MAX_VERSION: u16 = 2;
/// Size of the fixed header
pub const HEADER_SIZE: usize = 32;
/// The only supported address width
const ADDRESS_WIDTH: u8 = 8;

const LOOPBACK_RANGE: &str = "0:0:0:0:0:0:0:1";
const MAPPED_RANGE_START: &str = "0:0:0:0:0:FFFF:0:0";
const MAPPED_RANGE_END: &str = "0:0:0:0:0:FFFF:FFFF:FFFF";

/// Parsed IPDB header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct V6Header {
    /// Format version
    pub version: u16,
    /// Width of record offsets in bytes
    pub offset_width: u8,
    /// Width of index keys in bytes
    pub address_width: u8,
    /// Number of index entries
    pub record_count: u64,
    /// Offset of the first index entry
    pub first_index_offset: u64,
    /// Strings per record
    pub address_field_count: u8,
}

impl V6Header {
    /// Parse and validate the header against the image
    pub fn parse(image: &ByteImage) -> Result<Self> {
        if image.len() < HEADER_SIZE {
            return Err(WryError::Format(format!(
                "file too small: {} bytes (need at least {})",
                image.len(),
                HEADER_SIZE
            )));
        }
        if image.get_slice(0, 4)? != MAGIC {
            return Err(WryError::Format("missing IPDB magic".to_string()));
        }

        let version = image.read_uint_le(4, 2)? as u16;
        if version > MAX_VERSION {
            return Err(WryError::Format(format!(
                "unsupported version {} (max {})",
                version, MAX_VERSION
            )));
        }
        let offset_width = image.read_u8(6)?;
        if !(2..=8).contains(&offset_width) {
            return Err(WryError::Format(format!(
                "offset width {} not in 2..=8",
                offset_width
            )));
        }
        let address_width = image.read_u8(7)?;
        if address_width != ADDRESS_WIDTH {
            return Err(WryError::Format(format!(
                "address width {} is not supported, only {}-byte IPv6 prefix indexes can be read",
                address_width, ADDRESS_WIDTH
            )));
        }
        let record_count = image.read_u64_le(8)?;
        if record_count == 0 {
            return Err(WryError::Format("index has no entries".to_string()));
        }
        let first_index_offset = image.read_u64_le(16)?;
        let address_field_count = if version >= 2 { image.read_u8(24)? } else { 2 };

        let header = Self {
            version,
            offset_width,
            address_width,
            record_count,
            first_index_offset,
            address_field_count,
        };

        let index_end = header
            .entry_size()
            .checked_mul(record_count)
            .and_then(|len| len.checked_add(first_index_offset));
        match index_end {
            Some(end) if end <= image.len() as u64 => Ok(header),
            _ => Err(WryError::Format(format!(
                "index of {} entries at {} exceeds file size {}",
                record_count,
                first_index_offset,
                image.len()
            ))),
        }
    }

    /// Size of one index entry
    pub fn entry_size(&self) -> u64 {
        u64::from(self.address_width) + u64::from(self.offset_width)
    }
}

/// One decoded index entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct V6IndexEntry {
    /// Top 64 bits of the first address of the range
    pub start_prefix: u64,
    /// Offset of the range's record
    pub record_offset: u64,
}

/// Result of an IPv6 lookup
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ResolvedLocation {
    /// First address of the matched range
    pub range_start: String,
    /// Last address of the matched range
    pub range_end: String,
    /// Primary label
    pub country: String,
    /// Secondary label, with any transition notes appended
    pub area: String,
    /// Transition mechanism recognised in the address
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transition: Option<Transition>,
    /// Unannotated pair: the record's own strings, or the embedded IPv4
    /// address's location when that lookup succeeded
    #[serde(skip)]
    pub plain: Location,
}

impl ResolvedLocation {
    fn invalid(labels: &Labels) -> Self {
        Self {
            country: labels.invalid_address.clone(),
            plain: Location::new(labels.invalid_address.clone(), ""),
            ..Self::default()
        }
    }

    /// `country area`
    pub fn combined_description(&self) -> String {
        format!("{} {}", self.country, self.area)
    }

    /// The plain (country, area) pair, without transition notes
    pub fn location(&self) -> Location {
        self.plain.clone()
    }
}

/// Render a 64-bit prefix as four upper-case hex groups followed by `::`
pub fn format_prefix(prefix: u64) -> String {
    format!(
        "{:04X}:{:04X}:{:04X}:{:04X}::",
        (prefix >> 48) & 0xFFFF,
        (prefix >> 32) & 0xFFFF,
        (prefix >> 16) & 0xFFFF,
        prefix & 0xFFFF
    )
}

/// Lookup engine over an IPDB image
#[derive(Debug)]
pub struct V6Engine {
    image: ByteImage,
    header: V6Header,
    entry_size: usize,
    first_index: usize,
    count: usize,
    v4: Option<Arc<V4Engine>>,
    labels: Labels,
}

impl V6Engine {
    /// Read a database file into memory and open it
    pub fn open<P: AsRef<Path>>(path: P, v4: Option<Arc<V4Engine>>) -> Result<Self> {
        Self::from_image(ByteImage::load(path)?, v4)
    }

    /// Open a database over an existing image
    pub fn from_image(image: ByteImage, v4: Option<Arc<V4Engine>>) -> Result<Self> {
        let header = V6Header::parse(&image)?;
        let count = usize::try_from(header.record_count)
            .map_err(|_| WryError::Format("record count too large".to_string()))?;
        let first_index = to_offset(header.first_index_offset)
            .map_err(|e| WryError::Format(e.to_string()))?;
        tracing::debug!(
            version = header.version,
            offset_width = header.offset_width,
            records = count,
            with_v4 = v4.is_some(),
            "opened v6 database"
        );
        Ok(Self {
            entry_size: header.entry_size() as usize,
            image,
            header,
            first_index,
            count,
            v4,
            labels: Labels::default(),
        })
    }

    /// Open a database from raw bytes
    pub fn from_bytes(bytes: Vec<u8>, v4: Option<Arc<V4Engine>>) -> Result<Self> {
        Self::from_image(ByteImage::from_bytes(bytes), v4)
    }

    /// Replace the label set
    pub fn with_labels(mut self, labels: Labels) -> Self {
        self.labels = labels;
        self
    }

    /// Parsed header
    pub fn header(&self) -> &V6Header {
        &self.header
    }

    /// Number of index entries
    pub fn index_count(&self) -> usize {
        self.count
    }

    /// Size of the underlying image
    pub fn image_len(&self) -> usize {
        self.image.len()
    }

    /// Labels used for placeholders and annotations
    pub fn labels(&self) -> &Labels {
        &self.labels
    }

    /// True if an IPv4 engine is attached for embedded addresses
    pub fn has_v4(&self) -> bool {
        self.v4.is_some()
    }

    fn entry_offset(&self, i: usize) -> usize {
        self.first_index + i * self.entry_size
    }

    /// Read index entry `i`
    pub fn entry(&self, i: usize) -> Result<V6IndexEntry> {
        if i >= self.count {
            return Err(WryError::OutOfBounds(format!(
                "index entry {} beyond count {}",
                i, self.count
            )));
        }
        let at = self.entry_offset(i);
        Ok(V6IndexEntry {
            start_prefix: self.image.read_u64_le(at)?,
            record_offset: self
                .image
                .read_uint_le(at + 8, self.header.offset_width as usize)?,
        })
    }

    /// Index of the range containing `prefix`
    pub fn find(&self, prefix: u64) -> Result<usize> {
        floor_search(prefix, self.count, SearchMode::Narrowing, |i| {
            self.image.read_u64_le(self.entry_offset(i))
        })
    }

    /// Resolve the record at `record_offset`
    pub fn resolve(&self, record_offset: u64) -> Result<Location> {
        RecordReader::new(
            &self.image,
            self.header.offset_width as usize,
            Dialect::Ipdb,
            TextDecoder::Utf8,
            &self.labels.unknown_data,
        )
        .resolve_record(to_offset(record_offset)?)
    }

    /// Look up an address given as text, never failing.
    ///
    /// Parse errors and corrupt records yield the invalid-address sentinel.
    pub fn lookup(&self, ip: &str) -> ResolvedLocation {
        let addr = match ip.trim().parse::<Ipv6Addr>() {
            Ok(addr) => addr,
            Err(e) => {
                tracing::debug!(ip, error = %e, "unparsable v6 address");
                return ResolvedLocation::invalid(&self.labels);
            }
        };
        match self.try_lookup(addr) {
            Ok(resolved) => resolved,
            Err(e) => {
                tracing::warn!(%addr, error = %e, "v6 lookup failed, returning sentinel");
                ResolvedLocation::invalid(&self.labels)
            }
        }
    }

    /// Look up an address, reporting errors
    pub fn try_lookup(&self, addr: Ipv6Addr) -> Result<ResolvedLocation> {
        let full = u128::from(addr);
        let prefix = (full >> 64) as u64;

        let i = self.find(prefix)?;
        let entry = self.entry(i)?;
        let location = self.resolve(entry.record_offset)?;

        let range_end = if i + 1 < self.count {
            self.entry(i + 1)?.start_prefix.wrapping_sub(1)
        } else {
            u64::MAX
        };

        let mut resolved = ResolvedLocation {
            range_start: format_prefix(entry.start_prefix),
            range_end: format_prefix(range_end),
            country: location.country.clone(),
            area: location.area.clone(),
            transition: Transition::classify(full),
            plain: location,
        };
        self.annotate(&mut resolved);
        tracing::trace!(%addr, index = i, "v6 lookup");
        Ok(resolved)
    }

    /// Location of an embedded IPv4 address, if an engine can resolve it
    fn embedded_location(&self, ipv4: Ipv4Addr) -> Option<Location> {
        let v4 = self.v4.as_ref()?;
        match v4.lookup_addr(ipv4) {
            Ok(location) => Some(location),
            Err(e) => {
                tracing::warn!(%ipv4, error = %e, "embedded ipv4 lookup failed");
                None
            }
        }
    }

    /// Append a rendered note and return the embedded location it used
    fn append_note(
        &self,
        resolved: &mut ResolvedLocation,
        template: &str,
        ipv4: Ipv4Addr,
    ) -> Option<Location> {
        let found = self.embedded_location(ipv4);
        let text = match &found {
            Some(location) => location.describe(),
            None => self.labels.no_ipv4_database.clone(),
        };
        let note = render(template, &ipv4.to_string(), &text);
        resolved.area.push_str(&self.labels.note_separator);
        resolved.area.push_str(&note);
        found
    }

    fn annotate(&self, resolved: &mut ResolvedLocation) {
        let Some(transition) = resolved.transition else {
            return;
        };
        let labels = &self.labels;
        match transition {
            Transition::Loopback => {
                resolved.range_start = LOOPBACK_RANGE.to_string();
                resolved.range_end = LOOPBACK_RANGE.to_string();
                resolved.country = labels.loopback.clone();
                resolved.plain.country = labels.loopback.clone();
            }
            Transition::Ipv4Mapped { ipv4 } => {
                resolved.range_start = MAPPED_RANGE_START.to_string();
                resolved.range_end = MAPPED_RANGE_END.to_string();
                resolved.country = labels.ipv4_mapped.clone();
                if let Some(found) = self.append_note(resolved, &labels.embedded_ipv4, ipv4) {
                    resolved.plain = found;
                }
            }
            Transition::SixToFour { ipv4 } => {
                if let Some(found) = self.append_note(resolved, &labels.embedded_ipv4, ipv4) {
                    resolved.plain = found;
                }
            }
            Transition::Teredo { server, client } => {
                // Each note falls back on its own; the plain pair follows the server
                if let Some(found) = self.append_note(resolved, &labels.teredo_server, server) {
                    resolved.plain = found;
                }
                self.append_note(resolved, &labels.teredo_client, client);
            }
            Transition::Isatap { ipv4 } => {
                self.append_note(resolved, &labels.isatap, ipv4);
            }
        }
    }
}
