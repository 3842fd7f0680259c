//! Runtime configuration.
//!
//! Settings come from an optional TOML or JSON file followed by `WRYDB_*`
//! environment variables, later sources overriding earlier ones:
//!
//! ```toml
//! v4_database = "/var/lib/wrydb/qqwry.dat"
//! v6_database = "/var/lib/wrydb/ipv6wry.db"
//! cache_capacity = 1000
//! mmap = false
//! locale = "zh-cn"
//!
//! [labels]
//! loopback = "localhost"
//! ```
//!
//! `WRYDB_V4_DATABASE=/tmp/qqwry.dat` sets the IPv4 database path.

use crate::cache::DEFAULT_CACHE_CAPACITY;
use crate::error::{Result, WryError};
use crate::labels::{Labels, Locale};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Environment variable prefix
pub const ENV_PREFIX: &str = "WRYDB";

/// Resolved configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WryConfig {
    /// Path of the qqwry.dat database
    pub v4_database: Option<PathBuf>,
    /// Path of the IPDB database
    pub v6_database: Option<PathBuf>,
    /// Lookup cache size, 0 disables caching
    pub cache_capacity: usize,
    /// Memory-map databases instead of reading them into memory
    pub mmap: bool,
    /// Built-in label set
    pub locale: Locale,
    /// Individual label overrides, keyed by label name
    pub labels: HashMap<String, String>,
}

impl Default for WryConfig {
    fn default() -> Self {
        Self {
            v4_database: None,
            v6_database: None,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            mmap: false,
            locale: Locale::default(),
            labels: HashMap::new(),
        }
    }
}

impl WryConfig {
    /// Load configuration from `path` (if given) and the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            if !path.exists() {
                return Err(WryError::Config(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            builder = builder.add_source(config::File::from(path));
        }

        // E.g. `WRYDB_CACHE_CAPACITY=0 wrydb query 1.2.3.4` disables the cache
        builder = builder.add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true));

        let settings = builder.build()?;
        let cfg: WryConfig = settings.try_deserialize()?;
        tracing::debug!(?cfg, "loaded configuration");
        Ok(cfg)
    }

    /// Locale labels with any overrides applied
    pub fn labels(&self) -> Result<Labels> {
        let mut labels = self.locale.labels();
        for (name, value) in &self.labels {
            let slot = match name.as_str() {
                "unknown" => &mut labels.unknown,
                "unknown_data" => &mut labels.unknown_data,
                "loopback" => &mut labels.loopback,
                "ipv4_mapped" => &mut labels.ipv4_mapped,
                "invalid_address" => &mut labels.invalid_address,
                "no_ipv4_database" => &mut labels.no_ipv4_database,
                "embedded_ipv4" => &mut labels.embedded_ipv4,
                "teredo_server" => &mut labels.teredo_server,
                "teredo_client" => &mut labels.teredo_client,
                "isatap" => &mut labels.isatap,
                "note_separator" => &mut labels.note_separator,
                other => {
                    return Err(WryError::Config(format!("unknown label '{}'", other)));
                }
            };
            *slot = value.clone();
        }
        Ok(labels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    #[test]
    fn test_defaults() {
        let cfg = WryConfig::default();
        assert_eq!(cfg.cache_capacity, 1000);
        assert!(!cfg.mmap);
        assert_eq!(cfg.locale, Locale::En);
        assert_eq!(cfg.labels().unwrap(), Labels::english());
    }

    #[test]
    fn test_load_toml_file() {
        let mut file = Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
v4_database = "/data/qqwry.dat"
cache_capacity = 10
locale = "zh-cn"

[labels]
loopback = "localhost"
"#
        )
        .unwrap();

        let cfg = WryConfig::load(Some(file.path())).unwrap();
        assert_eq!(cfg.v4_database, Some(PathBuf::from("/data/qqwry.dat")));
        assert_eq!(cfg.v6_database, None);
        assert_eq!(cfg.cache_capacity, 10);
        assert_eq!(cfg.locale, Locale::ZhCn);

        let labels = cfg.labels().unwrap();
        assert_eq!(labels.loopback, "localhost");
        assert_eq!(labels.unknown, "未知");
    }

    #[test]
    fn test_missing_file() {
        let err = WryConfig::load(Some(Path::new("/nonexistent/wrydb.toml"))).unwrap_err();
        assert!(matches!(err, WryError::Config(_)));
    }

    #[test]
    fn test_unknown_label() {
        let mut cfg = WryConfig::default();
        cfg.labels.insert("bogus".to_string(), "x".to_string());
        assert!(matches!(cfg.labels(), Err(WryError::Config(_))));
    }
}
