//! Synthetic database builders shared by the integration tests.
#![allow(dead_code)]

use encoding::all::GBK;
use encoding::{EncoderTrap, Encoding};
use std::net::Ipv4Addr;

/// How a record stores its two strings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// `[country][area]` in place
    Inline,
    /// `[0x01][offset]` to an inline record
    FullRedirect,
    /// `[0x02][offset]` to the country, area in place
    CountryRedirect,
    /// Country in place, `[0x02][offset]` to the area
    AreaRedirect,
    /// `[0x01]` to a record that starts with `[0x02]`
    Nested,
}

pub const LAYOUTS: [Layout; 5] = [
    Layout::Inline,
    Layout::FullRedirect,
    Layout::CountryRedirect,
    Layout::AreaRedirect,
    Layout::Nested,
];

fn cstr(data: &mut Vec<u8>, bytes: &[u8]) -> u64 {
    let at = data.len() as u64;
    data.extend_from_slice(bytes);
    data.push(0);
    at
}

fn offset(data: &mut Vec<u8>, value: u64, width: usize) {
    data.extend_from_slice(&value.to_le_bytes()[..width]);
}

/// Append the record body (everything after any fixed prefix) and return
/// the offset the index should point at
fn record(
    data: &mut Vec<u8>,
    prefix: usize,
    country: &[u8],
    area: &[u8],
    layout: Layout,
    width: usize,
) -> u64 {
    let start = |data: &mut Vec<u8>| {
        let at = data.len() as u64;
        data.extend(std::iter::repeat(0xFF).take(prefix));
        at
    };
    match layout {
        Layout::Inline => {
            let at = start(data);
            cstr(data, country);
            cstr(data, area);
            at
        }
        Layout::FullRedirect => {
            let body = cstr(data, country);
            cstr(data, area);
            let at = start(data);
            data.push(0x01);
            offset(data, body, width);
            at
        }
        Layout::CountryRedirect => {
            let c = cstr(data, country);
            let at = start(data);
            data.push(0x02);
            offset(data, c, width);
            cstr(data, area);
            at
        }
        Layout::AreaRedirect => {
            let a = cstr(data, area);
            let at = start(data);
            cstr(data, country);
            data.push(0x02);
            offset(data, a, width);
            at
        }
        Layout::Nested => {
            let c = cstr(data, country);
            let inner = data.len() as u64;
            data.push(0x02);
            offset(data, c, width);
            cstr(data, area);
            let at = start(data);
            data.push(0x01);
            offset(data, inner, width);
            at
        }
    }
}

pub fn gbk(s: &str) -> Vec<u8> {
    GBK.encode(s, EncoderTrap::Strict).unwrap()
}

/// Builds qqwry.dat images
#[derive(Default)]
pub struct V4Builder {
    entries: Vec<(u32, Vec<u8>, Vec<u8>, Layout)>,
}

impl V4Builder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn range(self, start: Ipv4Addr, country: &str, area: &str) -> Self {
        self.range_with(start, country, area, Layout::Inline)
    }

    pub fn range_with(mut self, start: Ipv4Addr, country: &str, area: &str, layout: Layout) -> Self {
        self.entries
            .push((u32::from(start), gbk(country), gbk(area), layout));
        self
    }

    /// Raw (already encoded) strings
    pub fn raw_range(mut self, start: u32, country: &[u8], area: &[u8]) -> Self {
        self.entries
            .push((start, country.to_vec(), area.to_vec(), Layout::Inline));
        self
    }

    pub fn build(mut self) -> Vec<u8> {
        assert!(!self.entries.is_empty());
        self.entries.sort_by_key(|e| e.0);

        let mut data = vec![0u8; 8];
        let mut offsets = Vec::new();
        for (_, country, area, layout) in &self.entries {
            offsets.push(record(&mut data, 4, country, area, *layout, 3));
        }
        let first = data.len() as u32;
        for ((start, ..), at) in self.entries.iter().zip(offsets) {
            data.extend_from_slice(&start.to_le_bytes());
            offset(&mut data, at, 3);
        }
        let last = first + 7 * (self.entries.len() as u32 - 1);
        data[0..4].copy_from_slice(&first.to_le_bytes());
        data[4..8].copy_from_slice(&last.to_le_bytes());
        data
    }
}

/// Builds IPDB images
pub struct V6Builder {
    offset_width: usize,
    entries: Vec<(u64, String, String, Layout)>,
}

impl Default for V6Builder {
    fn default() -> Self {
        Self {
            offset_width: 3,
            entries: Vec::new(),
        }
    }
}

impl V6Builder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn offset_width(mut self, width: usize) -> Self {
        self.offset_width = width;
        self
    }

    pub fn range(self, prefix: u64, country: &str, area: &str) -> Self {
        self.range_with(prefix, country, area, Layout::Inline)
    }

    pub fn range_with(mut self, prefix: u64, country: &str, area: &str, layout: Layout) -> Self {
        self.entries
            .push((prefix, country.to_string(), area.to_string(), layout));
        self
    }

    pub fn build(mut self) -> Vec<u8> {
        assert!(!self.entries.is_empty());
        self.entries.sort_by_key(|e| e.0);
        let width = self.offset_width;

        let mut data = vec![0u8; 32];
        data[0..4].copy_from_slice(b"IPDB");
        data[4..6].copy_from_slice(&2u16.to_le_bytes());
        data[6] = width as u8;
        data[7] = 8;
        data[8..16].copy_from_slice(&(self.entries.len() as u64).to_le_bytes());
        data[24] = 2;

        let mut offsets = Vec::new();
        for (_, country, area, layout) in &self.entries {
            offsets.push(record(
                &mut data,
                0,
                country.as_bytes(),
                area.as_bytes(),
                *layout,
                width,
            ));
        }
        let first = data.len() as u64;
        data[16..24].copy_from_slice(&first.to_le_bytes());
        for ((prefix, ..), at) in self.entries.iter().zip(offsets) {
            data.extend_from_slice(&prefix.to_le_bytes());
            offset(&mut data, at, width);
        }
        data
    }
}

/// Small IPv4 database used across tests
pub fn sample_v4() -> Vec<u8> {
    V4Builder::new()
        .range(Ipv4Addr::new(0, 0, 0, 0), "IANA", "保留地址")
        .range(Ipv4Addr::new(1, 1, 1, 0), "TestCountry", "TestArea")
        .range_with(
            Ipv4Addr::new(1, 2, 4, 0),
            "中国",
            "CNNIC",
            Layout::CountryRedirect,
        )
        .range_with(
            Ipv4Addr::new(10, 0, 0, 0),
            "局域网",
            " CZ88.NET",
            Layout::AreaRedirect,
        )
        .range_with(
            Ipv4Addr::new(65, 54, 227, 0),
            "美国",
            "微软公司",
            Layout::FullRedirect,
        )
        .range(Ipv4Addr::new(65, 54, 228, 0), "美国", "")
        .range_with(
            Ipv4Addr::new(192, 0, 2, 0),
            "Documentation",
            "TEST-NET-1",
            Layout::Nested,
        )
        .range(Ipv4Addr::new(192, 0, 3, 0), "IANA", "保留地址")
        .build()
}

/// Small IPv6 database used across tests
pub fn sample_v6() -> Vec<u8> {
    V6Builder::new()
        .range(0, "IANA", "Reserved")
        .range_with(0x2001_0000_0000_0000, "Teredo", "Tunnel", Layout::FullRedirect)
        .range(0x2001_0001_0000_0000, "IANA", "Special")
        .range_with(0x2002_0000_0000_0000, "6to4", "Relay", Layout::CountryRedirect)
        .range(0x2003_0000_0000_0000, "Europe", "RIPE")
        .range_with(0x2400_0000_0000_0000, "Asia", "APNIC", Layout::Nested)
        .range(0x2600_0000_0000_0000, "America", "ARIN")
        .range(0xFE80_0000_0000_0000, "Link-local", "LAN")
        .range(0xFEC0_0000_0000_0000, "IANA", "Reserved")
        .build()
}
