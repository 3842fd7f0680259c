//! Record resolution with redirect tags.
//!
//! A record holds two strings, country then area. Either may be stored in
//! place or replaced by a redirect:
//!
//! ```text
//! [0x01][offset]          whole record lives at offset
//! [0x02][offset]          country string lives at offset, area follows
//! [bytes...][0x00]        string stored in place
//! ```
//!
//! Redirects are followed iteratively with a hop limit. A chain longer
//! than [`MAX_REDIRECT_DEPTH`] is reported as
//! [`WryError::OutOfBounds`]: well-formed files never nest that deep, and
//! a cyclic chain would otherwise never terminate.

use crate::error::{Result, WryError};
use crate::image::{to_offset, ByteImage};
use crate::text::TextDecoder;

/// Redirect: the whole record lives elsewhere
pub const REDIRECT_RECORD: u8 = 0x01;
/// Redirect: only the country string lives elsewhere
pub const REDIRECT_COUNTRY: u8 = 0x02;
/// Maximum redirect hops followed for one string or record
pub const MAX_REDIRECT_DEPTH: usize = 16;

/// Record layout variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// qqwry.dat: after an in-place country, only a `0x02` tag redirects
    /// the area
    Legacy,
    /// IPDB: the area after an in-place country follows any redirect tag
    Ipdb,
}

/// The two strings of a resolved record
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct Location {
    /// Primary geographic label
    pub country: String,
    /// Secondary label (region, ISP)
    pub area: String,
}

impl Location {
    /// Build a location from its two strings
    pub fn new(country: impl Into<String>, area: impl Into<String>) -> Self {
        Self {
            country: country.into(),
            area: area.into(),
        }
    }

    /// `country area`, as shown to users
    pub fn describe(&self) -> String {
        if self.area.is_empty() {
            self.country.clone()
        } else {
            format!("{} {}", self.country, self.area)
        }
    }
}

/// Resolves records in one image
#[derive(Clone, Copy)]
pub struct RecordReader<'a> {
    image: &'a ByteImage,
    offset_width: usize,
    dialect: Dialect,
    decoder: TextDecoder,
    placeholder: &'a str,
}

impl<'a> RecordReader<'a> {
    /// Create a reader; `placeholder` replaces undecodable strings
    pub fn new(
        image: &'a ByteImage,
        offset_width: usize,
        dialect: Dialect,
        decoder: TextDecoder,
        placeholder: &'a str,
    ) -> Self {
        Self {
            image,
            offset_width,
            dialect,
            decoder,
            placeholder,
        }
    }

    fn read_offset(&self, at: usize) -> Result<usize> {
        to_offset(self.image.read_uint_le(at, self.offset_width)?)
    }

    fn hop(&self, hops: &mut usize, from: usize) -> Result<()> {
        *hops += 1;
        if *hops > MAX_REDIRECT_DEPTH {
            tracing::warn!(offset = from, "redirect chain exceeds {} hops", MAX_REDIRECT_DEPTH);
            return Err(WryError::OutOfBounds(format!(
                "redirect chain at offset {} exceeds {} hops",
                from, MAX_REDIRECT_DEPTH
            )));
        }
        Ok(())
    }

    fn read_string(&self, offset: usize) -> Result<String> {
        self.image
            .read_string(offset, self.decoder, self.placeholder)
    }

    /// Offset of the byte after the NUL-terminated string at `offset`
    fn skip_string(&self, offset: usize) -> Result<usize> {
        Ok(offset + self.image.read_cstr(offset)?.len() + 1)
    }

    /// Resolve a single string, following any redirect tags
    pub fn resolve_area(&self, offset: usize) -> Result<String> {
        let mut offset = offset;
        let mut hops = 0;
        loop {
            match self.image.read_u8(offset)? {
                REDIRECT_RECORD | REDIRECT_COUNTRY => {
                    self.hop(&mut hops, offset)?;
                    offset = self.read_offset(offset + 1)?;
                }
                _ => return self.read_string(offset),
            }
        }
    }

    /// Resolve the country and area of the record at `offset`
    pub fn resolve_record(&self, offset: usize) -> Result<Location> {
        let mut offset = offset;
        let mut hops = 0;
        loop {
            let tag = self.image.read_u8(offset)?;
            if tag == REDIRECT_RECORD {
                self.hop(&mut hops, offset)?;
                offset = self.read_offset(offset + 1)?;
                continue;
            }

            return match self.dialect {
                Dialect::Legacy => self.resolve_legacy(offset, tag),
                Dialect::Ipdb => self.resolve_ipdb(offset, tag),
            };
        }
    }

    fn resolve_legacy(&self, offset: usize, tag: u8) -> Result<Location> {
        if tag == REDIRECT_COUNTRY {
            let country_at = self.read_offset(offset + 1)?;
            let country = self.resolve_area(country_at)?;
            let area = self.resolve_area(offset + 1 + self.offset_width)?;
            return Ok(Location { country, area });
        }

        let country = self.read_string(offset)?;
        let area_at = self.skip_string(offset)?;
        let area = if self.image.read_u8(area_at)? == REDIRECT_COUNTRY {
            self.resolve_area(area_at)?
        } else {
            self.read_string(area_at)?
        };
        Ok(Location { country, area })
    }

    fn resolve_ipdb(&self, offset: usize, tag: u8) -> Result<Location> {
        let country = self.resolve_area(offset)?;
        let area_at = if tag == REDIRECT_COUNTRY {
            offset + 1 + self.offset_width
        } else {
            self.skip_string(offset)?
        };
        let area = self.resolve_area(area_at)?;
        Ok(Location { country, area })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reader(image: &ByteImage, dialect: Dialect) -> RecordReader<'_> {
        RecordReader::new(image, 3, dialect, TextDecoder::Utf8, "?")
    }

    fn u24(v: usize) -> [u8; 3] {
        let b = (v as u32).to_le_bytes();
        [b[0], b[1], b[2]]
    }

    #[test]
    fn test_inline_record() {
        let image = ByteImage::from_bytes(b"CN\0Beijing\0".to_vec());
        for dialect in [Dialect::Legacy, Dialect::Ipdb] {
            let loc = reader(&image, dialect).resolve_record(0).unwrap();
            assert_eq!(loc, Location::new("CN", "Beijing"));
        }
    }

    #[test]
    fn test_full_redirect_is_transparent() {
        // 0: [01][->10] ... 10: "CN\0Beijing\0"
        let mut bytes = vec![REDIRECT_RECORD];
        bytes.extend_from_slice(&u24(10));
        bytes.resize(10, 0xEE);
        bytes.extend_from_slice(b"CN\0Beijing\0");
        let image = ByteImage::from_bytes(bytes);

        for dialect in [Dialect::Legacy, Dialect::Ipdb] {
            let r = reader(&image, dialect);
            assert_eq!(r.resolve_record(0).unwrap(), r.resolve_record(10).unwrap());
        }
    }

    #[test]
    fn test_country_redirect() {
        // 0: [02][->20] "Area\0" ... 20: "Country\0"
        let mut bytes = vec![REDIRECT_COUNTRY];
        bytes.extend_from_slice(&u24(20));
        bytes.extend_from_slice(b"Area\0");
        bytes.resize(20, 0xEE);
        bytes.extend_from_slice(b"Country\0");
        let image = ByteImage::from_bytes(bytes);

        for dialect in [Dialect::Legacy, Dialect::Ipdb] {
            let loc = reader(&image, dialect).resolve_record(0).unwrap();
            assert_eq!(loc, Location::new("Country", "Area"));
        }
    }

    #[test]
    fn test_area_redirect_after_inline_country() {
        // 0: "Country\0" [02][->20] ... 20: "Shared area\0"
        let mut bytes = b"Country\0".to_vec();
        bytes.push(REDIRECT_COUNTRY);
        bytes.extend_from_slice(&u24(20));
        bytes.resize(20, 0xEE);
        bytes.extend_from_slice(b"Shared area\0");
        let image = ByteImage::from_bytes(bytes);

        for dialect in [Dialect::Legacy, Dialect::Ipdb] {
            let loc = reader(&image, dialect).resolve_record(0).unwrap();
            assert_eq!(loc, Location::new("Country", "Shared area"));
        }
    }

    #[test]
    fn test_dialects_differ_on_mode1_area() {
        // 0: "C\0" [01][->10] ... 10: "A\0"
        let mut bytes = b"C\0".to_vec();
        bytes.push(REDIRECT_RECORD);
        bytes.extend_from_slice(&u24(10));
        bytes.resize(10, 0);
        bytes.extend_from_slice(b"A\0");
        let image = ByteImage::from_bytes(bytes);

        let ipdb = reader(&image, Dialect::Ipdb).resolve_record(0).unwrap();
        assert_eq!(ipdb.area, "A");

        // Legacy reads the tag byte as part of a literal string
        let legacy = reader(&image, Dialect::Legacy).resolve_record(0).unwrap();
        assert_eq!(legacy.area.as_bytes()[0], REDIRECT_RECORD);
    }

    #[test]
    fn test_redirect_cycle_is_bounded() {
        // 0: [01][->0] points at itself
        let mut bytes = vec![REDIRECT_RECORD];
        bytes.extend_from_slice(&u24(0));
        bytes.push(0);
        let image = ByteImage::from_bytes(bytes);

        let err = reader(&image, Dialect::Legacy).resolve_record(0).unwrap_err();
        assert!(matches!(err, WryError::OutOfBounds(_)));
        let err = reader(&image, Dialect::Ipdb).resolve_area(0).unwrap_err();
        assert!(matches!(err, WryError::OutOfBounds(_)));
    }

    #[test]
    fn test_redirect_past_end() {
        let mut bytes = vec![REDIRECT_COUNTRY];
        bytes.extend_from_slice(&u24(1000));
        bytes.extend_from_slice(b"x\0");
        let image = ByteImage::from_bytes(bytes);
        let err = reader(&image, Dialect::Legacy).resolve_record(0).unwrap_err();
        assert!(matches!(err, WryError::OutOfBounds(_)));
    }

    #[test]
    fn test_describe() {
        assert_eq!(Location::new("CN", "Beijing").describe(), "CN Beijing");
        assert_eq!(Location::new("CN", "").describe(), "CN");
    }
}
