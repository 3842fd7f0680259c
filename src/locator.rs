//! Query dispatch with cache-through resolution.
//!
//! A [`Locator`] owns the configured engines and the lookup cache. Raw
//! queries are normalised by [`Query::parse`]: forwarded-for style lists
//! keep their last element, `a-b` selects a range of v4 index entries and
//! anything else is an address routed by the presence of `:`.

use crate::cache::LookupCache;
use crate::config::WryConfig;
use crate::error::{Result, WryError};
use crate::image::ByteImage;
use crate::record::Location;
use crate::v4::{DumpEntry, V4Engine};
use crate::v6::V6Engine;
use std::ops::Range;
use std::path::Path;
use std::sync::Arc;

/// A normalised query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    /// A single address, IPv6 if it contains `:`
    Address(String),
    /// Index positions `first..last` of the v4 database
    IndexRange(Range<usize>),
}

impl Query {
    /// Normalise a raw query string
    pub fn parse(raw: &str) -> Result<Self> {
        let last = raw.rsplit(',').next().unwrap_or(raw).trim();
        if last.is_empty() {
            return Err(WryError::InvalidAddress("empty query".to_string()));
        }
        if let Some((first, end)) = last.split_once('-') {
            let first = first.trim().parse::<usize>();
            let end = end.trim().parse::<usize>();
            return match (first, end) {
                (Ok(first), Ok(end)) if first <= end => Ok(Query::IndexRange(first..end)),
                _ => Err(WryError::InvalidAddress(format!(
                    "invalid index range '{}'",
                    last
                ))),
            };
        }
        Ok(Query::Address(last.to_string()))
    }
}

/// Owns engines and cache; shared by reference across request handlers
#[derive(Debug)]
pub struct Locator {
    v4: Option<Arc<V4Engine>>,
    v6: Option<Arc<V6Engine>>,
    cache: LookupCache,
}

fn open_image(path: &Path, mmap: bool) -> Result<ByteImage> {
    if mmap {
        ByteImage::map(path)
    } else {
        ByteImage::load(path)
    }
}

impl Locator {
    /// Combine already opened engines
    pub fn new(
        v4: Option<Arc<V4Engine>>,
        v6: Option<Arc<V6Engine>>,
        cache_capacity: usize,
    ) -> Self {
        Self {
            v4,
            v6,
            cache: LookupCache::new(cache_capacity),
        }
    }

    /// Open the databases named by `config`.
    ///
    /// The v6 engine shares the v4 engine for embedded address notes.
    pub fn from_config(config: &WryConfig) -> Result<Self> {
        let labels = config.labels()?;

        let v4 = match &config.v4_database {
            Some(path) => {
                let engine = V4Engine::from_image(open_image(path, config.mmap)?)?
                    .with_labels(labels.clone());
                Some(Arc::new(engine))
            }
            None => None,
        };
        let v6 = match &config.v6_database {
            Some(path) => {
                let engine = V6Engine::from_image(open_image(path, config.mmap)?, v4.clone())?
                    .with_labels(labels);
                Some(Arc::new(engine))
            }
            None => None,
        };
        if v4.is_none() && v6.is_none() {
            return Err(WryError::Config("no database configured".to_string()));
        }
        Ok(Self::new(v4, v6, config.cache_capacity))
    }

    /// The IPv4 engine, if configured
    pub fn v4(&self) -> Option<&Arc<V4Engine>> {
        self.v4.as_ref()
    }

    /// The IPv6 engine, if configured
    pub fn v6(&self) -> Option<&Arc<V6Engine>> {
        self.v6.as_ref()
    }

    /// The lookup cache
    pub fn cache(&self) -> &LookupCache {
        &self.cache
    }

    fn require_v4(&self) -> Result<&V4Engine> {
        self.v4
            .as_deref()
            .ok_or_else(|| WryError::Config("no IPv4 database configured".to_string()))
    }

    fn require_v6(&self) -> Result<&V6Engine> {
        self.v6
            .as_deref()
            .ok_or_else(|| WryError::Config("no IPv6 database configured".to_string()))
    }

    /// Resolve a normalised address, consulting the cache first.
    ///
    /// IPv6 lookups are fail-soft and their sentinel results are cached;
    /// IPv4 errors propagate and are not cached.
    pub fn resolve(&self, address: &str) -> Result<Location> {
        let address = address.trim();
        self.cache.get_or_try_insert_with(address, || {
            if address.contains(':') {
                Ok(self.require_v6()?.lookup(address).location())
            } else {
                self.require_v4()?.lookup(address)
            }
        })
    }

    /// Dump v4 index entries
    pub fn dump(&self, range: Range<usize>) -> Result<Vec<DumpEntry>> {
        self.require_v4()?.dump(range)
    }
}
