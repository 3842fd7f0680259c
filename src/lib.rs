//! wrydb - IP geolocation lookups over qqwry.dat and IPDB databases
//!
//! wrydb reads the two database formats published for Chinese IP
//! geolocation: the legacy IPv4 `qqwry.dat` file and the IPv6 `IPDB`
//! file (`ipv6wry.db`). Both map address ranges to a pair of strings,
//! a country and an area.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use wrydb::{Locator, V4Engine, V6Engine};
//!
//! let v4 = Arc::new(V4Engine::open("qqwry.dat")?);
//! let v6 = Arc::new(V6Engine::open("ipv6wry.db", Some(Arc::clone(&v4)))?);
//!
//! let location = v4.lookup("1.2.4.8")?;
//! println!("{} {}", location.country, location.area);
//!
//! // IPv6 lookups never fail; bad input yields a sentinel result
//! let resolved = v6.lookup("2002:c000:0204::1");
//! println!("{} .. {}: {}", resolved.range_start, resolved.range_end, resolved.combined_description());
//!
//! // Dispatch by address family with a shared LRU cache
//! let locator = Locator::new(Some(v4), Some(v6), 1000);
//! let location = locator.resolve("::ffff:1.2.4.8")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌────────────┐   ┌────────────┐
//! │  V4Engine  │◄──│  V6Engine  │  embedded IPv4 addresses
//! └─────┬──────┘   └─────┬──────┘
//!       │ floor search   │
//!       ▼                ▼
//! ┌──────────────────────────────┐
//! │ RecordReader (redirect tags) │
//! ├──────────────────────────────┤
//! │ ByteImage (owned or mmap)    │
//! └──────────────────────────────┘
//! ```
//!
//! Engines are immutable once opened and can be shared across threads.
//! The [`LookupCache`] inside a [`Locator`] is the only mutable state.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Bounded LRU cache of resolved locations
pub mod cache;
/// Runtime configuration
pub mod config;
/// Error types for database operations
pub mod error;
/// Immutable database images
pub mod image;
pub mod index;
/// Engine-generated text
pub mod labels;
pub mod locator;
pub mod record;
pub mod splitter;
/// Text decoding with placeholder fallback
pub mod text;
pub mod transition;
/// Legacy IPv4 engine
pub mod v4;
/// IPDB IPv6 engine
pub mod v6;
pub mod validation;

// Re-exports for Rust consumers

pub use crate::cache::{CacheStats, LookupCache, DEFAULT_CACHE_CAPACITY};
pub use crate::config::WryConfig;
pub use crate::error::{Result, WryError};
pub use crate::image::ByteImage;
pub use crate::labels::{Labels, Locale};
pub use crate::locator::{Locator, Query};
pub use crate::record::Location;
pub use crate::splitter::{split, LocationFields};
pub use crate::text::TextDecoder;
pub use crate::transition::Transition;

/// IPv4 lookup engine
pub use crate::v4::V4Engine;

/// IPv6 lookup engine and its result type
pub use crate::v6::{ResolvedLocation, V6Engine};

// Version information
/// Library version string
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
