//! Whole-database consistency checks.
//!
//! Opening an engine only validates the header. The functions here walk
//! every index entry, resolve its record and report anything a lookup
//! could trip over:
//!
//! - index keys that are not in ascending order
//! - records or redirects pointing outside the file
//! - redirect chains that exceed the hop limit
//! - strings that could not be decoded (reported as warnings)
//!
//! # Usage
//!
//! ```rust,no_run
//! use wrydb::validation::validate_v4;
//! use wrydb::V4Engine;
//!
//! let engine = V4Engine::open("qqwry.dat")?;
//! let report = validate_v4(&engine);
//!
//! if !report.is_valid() {
//!     for error in &report.errors {
//!         eprintln!("  ERROR: {}", error);
//!     }
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use crate::error::Result;
use crate::record::Location;
use crate::v4::V4Engine;
use crate::v6::V6Engine;
use serde::Serialize;
use std::collections::HashSet;

/// Errors reported per category before further ones are summarised
const MAX_REPORTED: usize = 20;

/// Validation report with detailed findings
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    /// Problems that make some lookups fail or return wrong ranges
    pub errors: Vec<String>,
    /// Non-fatal issues
    pub warnings: Vec<String>,
    /// Informational messages about database properties
    pub info: Vec<String>,
    /// Statistics gathered during the walk
    pub stats: DatabaseStats,
}

/// Database statistics gathered during validation
#[derive(Debug, Clone, Default, Serialize)]
pub struct DatabaseStats {
    /// Image size in bytes
    pub file_size: usize,
    /// Format version (0 for qqwry.dat, which has none)
    pub version: u16,
    /// Number of index entries
    pub index_count: usize,
    /// Entries whose record resolved
    pub resolved: usize,
    /// Distinct record offsets referenced by the index
    pub distinct_records: usize,
    /// Entries with at least one undecodable string
    pub placeholder_strings: usize,
}

impl ValidationReport {
    /// Check if the database passed all validations (no errors)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    fn warning(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    fn info(&mut self, msg: impl Into<String>) {
        self.info.push(msg.into());
    }

    /// Record an error unless the cap for this walk is reached
    fn capped_error(&mut self, count: &mut usize, msg: impl Into<String>) {
        *count += 1;
        if *count <= MAX_REPORTED {
            self.error(msg);
        }
    }

    fn summarise_cap(&mut self, count: usize, what: &str) {
        if count > MAX_REPORTED {
            self.error(format!(
                "... {} more {} not shown",
                count - MAX_REPORTED,
                what
            ));
        }
    }
}

impl DatabaseStats {
    /// Human-readable summary
    pub fn summary(&self) -> String {
        format!(
            "Version: {}, Entries: {}, Resolved: {}, Records: {}, Size: {} KB",
            self.version,
            self.index_count,
            self.resolved,
            self.distinct_records,
            self.file_size / 1024
        )
    }
}

/// Walks entries generically over both formats
struct Walk<'a> {
    report: ValidationReport,
    placeholder: &'a str,
    seen: HashSet<u64>,
    failures: usize,
    order_errors: usize,
    prev_key: Option<u64>,
}

impl<'a> Walk<'a> {
    fn new(placeholder: &'a str) -> Self {
        Self {
            report: ValidationReport::default(),
            placeholder,
            seen: HashSet::new(),
            failures: 0,
            order_errors: 0,
            prev_key: None,
        }
    }

    fn entry(&mut self, i: usize, key: u64, record_offset: u64, resolved: Result<Location>) {
        if let Some(prev) = self.prev_key {
            if key < prev {
                let msg = format!("entry {}: start {:#x} precedes previous start {:#x}", i, key, prev);
                self.report.capped_error(&mut self.order_errors, msg);
            }
        }
        self.prev_key = Some(key);
        self.seen.insert(record_offset);

        match resolved {
            Ok(location) => {
                self.report.stats.resolved += 1;
                if location.country == self.placeholder || location.area == self.placeholder {
                    self.report.stats.placeholder_strings += 1;
                }
            }
            Err(e) => {
                let msg = format!("entry {}: record at {:#x}: {}", i, record_offset, e);
                self.report.capped_error(&mut self.failures, msg);
            }
        }
    }

    fn finish(mut self) -> ValidationReport {
        self.report.stats.distinct_records = self.seen.len();
        self.report.summarise_cap(self.order_errors, "ordering errors");
        self.report.summarise_cap(self.failures, "record errors");
        if self.report.stats.placeholder_strings > 0 {
            let msg = format!(
                "{} entries contain undecodable strings",
                self.report.stats.placeholder_strings
            );
            self.report.warning(msg);
        }
        tracing::debug!(
            errors = self.report.errors.len(),
            warnings = self.report.warnings.len(),
            "validation finished"
        );
        self.report
    }
}

/// Validate every entry of a qqwry.dat database
pub fn validate_v4(engine: &V4Engine) -> ValidationReport {
    let mut walk = Walk::new(&engine.labels().unknown);
    let header = engine.header();

    walk.report.stats.file_size = engine.image_len();
    walk.report.stats.index_count = engine.index_count();
    walk.report.info(format!(
        "Index: {} entries at {:#x}..={:#x}",
        engine.index_count(),
        header.first_index_offset,
        header.last_index_offset
    ));

    for i in 0..engine.index_count() {
        match engine.entry(i) {
            Ok(entry) => {
                let resolved = engine.resolve(entry.record_offset);
                walk.entry(
                    i,
                    u64::from(u32::from(entry.start)),
                    u64::from(entry.record_offset),
                    resolved,
                );
            }
            Err(e) => walk.report.error(format!("entry {}: {}", i, e)),
        }
    }
    walk.finish()
}

/// Validate every entry of an IPDB database
pub fn validate_v6(engine: &V6Engine) -> ValidationReport {
    let mut walk = Walk::new(&engine.labels().unknown_data);
    let header = engine.header();

    walk.report.stats.file_size = engine.image_len();
    walk.report.stats.version = header.version;
    walk.report.stats.index_count = engine.index_count();
    walk.report.info(format!(
        "Version {}, offset width {}, {} entries at {:#x}",
        header.version, header.offset_width, header.record_count, header.first_index_offset
    ));
    if header.address_field_count != 2 {
        walk.report.warning(format!(
            "records declare {} fields; only country and area are read",
            header.address_field_count
        ));
    }
    if !engine.has_v4() {
        walk.report
            .info("No IPv4 database attached; embedded addresses will not be resolved");
    }

    for i in 0..engine.index_count() {
        match engine.entry(i) {
            Ok(entry) => {
                let resolved = engine.resolve(entry.record_offset);
                walk.entry(i, entry.start_prefix, entry.record_offset, resolved);
            }
            Err(e) => walk.report.error(format!("entry {}: {}", i, e)),
        }
    }
    walk.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v4_db(entries: &[(u32, &[u8])]) -> Vec<u8> {
        let mut data = vec![0u8; 8];
        let mut offsets = Vec::new();
        for (_, record) in entries {
            offsets.push(data.len() as u32);
            data.extend_from_slice(&[0xFF; 4]);
            data.extend_from_slice(record);
        }
        let first = data.len() as u32;
        for ((start, _), offset) in entries.iter().zip(&offsets) {
            data.extend_from_slice(&start.to_le_bytes());
            data.extend_from_slice(&offset.to_le_bytes()[..3]);
        }
        let last = first + 7 * (entries.len() as u32 - 1);
        data[0..4].copy_from_slice(&first.to_le_bytes());
        data[4..8].copy_from_slice(&last.to_le_bytes());
        data
    }

    #[test]
    fn test_valid_database() {
        let db = V4Engine::from_bytes(v4_db(&[(0, b"A\0a\0"), (100, b"B\0b\0")])).unwrap();
        let report = validate_v4(&db);
        assert!(report.is_valid(), "{:?}", report.errors);
        assert_eq!(report.stats.index_count, 2);
        assert_eq!(report.stats.resolved, 2);
        assert_eq!(report.stats.distinct_records, 2);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_unordered_index() {
        let db = V4Engine::from_bytes(v4_db(&[(100, b"A\0a\0"), (0, b"B\0b\0")])).unwrap();
        let report = validate_v4(&db);
        assert!(!report.is_valid());
        assert!(report.errors[0].contains("entry 1"));
    }

    #[test]
    fn test_broken_record() {
        // Country redirect far past the end of the file
        let db = V4Engine::from_bytes(v4_db(&[(0, &[0x02, 0xFF, 0xFF, 0x7F, b'x', 0])])).unwrap();
        let report = validate_v4(&db);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.stats.resolved, 0);
    }

    #[test]
    fn test_placeholder_warning() {
        let db = V4Engine::from_bytes(v4_db(&[(0, &[0xD6, 0, b'x', 0])])).unwrap();
        let report = validate_v4(&db);
        assert!(report.is_valid());
        assert_eq!(report.stats.placeholder_strings, 1);
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn test_error_cap() {
        let entries: Vec<(u32, &[u8])> = (0..30)
            .map(|i| (1000 - i as u32, b"A\0a\0" as &[u8]))
            .collect();
        let db = V4Engine::from_bytes(v4_db(&entries)).unwrap();
        let report = validate_v4(&db);
        assert_eq!(report.errors.len(), MAX_REPORTED + 1);
        assert!(report.errors[MAX_REPORTED].contains("9 more"));
    }
}
