//! IPv6 transition mechanism classification.
//!
//! Several IPv6 addressing schemes carry an IPv4 address inside the
//! 128-bit value. The rules below are checked in order and the first one
//! that matches wins.

use serde::Serialize;
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

/// A recognised transition mechanism and its embedded IPv4 addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Transition {
    /// `::1`
    Loopback,
    /// `::ffff:a.b.c.d`
    Ipv4Mapped {
        /// Embedded address
        ipv4: Ipv4Addr,
    },
    /// `2002:AABB:CCDD::/48`
    SixToFour {
        /// Embedded address
        ipv4: Ipv4Addr,
    },
    /// `2001:0000:SSSS:SSSS:...:CCCC:CCCC` (client bits inverted)
    Teredo {
        /// Teredo server address
        server: Ipv4Addr,
        /// Client's public address
        client: Ipv4Addr,
    },
    /// `...:0:5efe:a.b.c.d`
    Isatap {
        /// Embedded address
        ipv4: Ipv4Addr,
    },
}

fn low32(value: u128) -> Ipv4Addr {
    Ipv4Addr::from((value & 0xFFFF_FFFF) as u32)
}

impl Transition {
    /// Classify a full 128-bit address
    pub fn classify(addr: u128) -> Option<Self> {
        let high = (addr >> 64) as u64;

        if addr == 1 {
            return Some(Transition::Loopback);
        }
        if high == 0 && (addr >> 32) & 0xFFFF_FFFF == 0xFFFF {
            return Some(Transition::Ipv4Mapped { ipv4: low32(addr) });
        }
        if (high >> 48) & 0xFFFF == 0x2002 {
            let ipv4 = Ipv4Addr::from(((high & 0x0000_FFFF_FFFF_0000) >> 16) as u32);
            return Some(Transition::SixToFour { ipv4 });
        }
        if (high >> 32) & 0xFFFF_FFFF == 0x2001_0000 {
            return Some(Transition::Teredo {
                server: Ipv4Addr::from((high & 0xFFFF_FFFF) as u32),
                client: low32(!addr),
            });
        }
        if (addr >> 32) & 0xFFFF_FFFF == 0x5EFE {
            return Some(Transition::Isatap { ipv4: low32(addr) });
        }
        None
    }

    /// Classify an [`Ipv6Addr`]
    pub fn of(addr: Ipv6Addr) -> Option<Self> {
        Self::classify(u128::from(addr))
    }

    /// Short mechanism name
    pub fn name(&self) -> &'static str {
        match self {
            Transition::Loopback => "loopback",
            Transition::Ipv4Mapped { .. } => "ipv4-mapped",
            Transition::SixToFour { .. } => "6to4",
            Transition::Teredo { .. } => "teredo",
            Transition::Isatap { .. } => "isatap",
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
