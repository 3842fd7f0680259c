use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::Level;
use wrydb::{Locale, Locator, WryConfig};

/// Send logs to stderr, debug-level with `--debug`
pub fn init_logging(debug: bool) {
    let level = if debug { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

/// Load configuration and apply command-line overrides
pub fn load_config(
    path: Option<&Path>,
    v4_db: Option<PathBuf>,
    v6_db: Option<PathBuf>,
    zh: bool,
) -> Result<WryConfig> {
    let mut config = WryConfig::load(path).context("Failed to load configuration")?;
    if v4_db.is_some() {
        config.v4_database = v4_db;
    }
    if v6_db.is_some() {
        config.v6_database = v6_db;
    }
    if zh {
        config.locale = Locale::ZhCn;
    }
    Ok(config)
}

pub fn open_locator(config: &WryConfig) -> Result<Locator> {
    let describe = |p: &Option<PathBuf>| {
        p.as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "-".to_string())
    };
    Locator::from_config(config).with_context(|| {
        format!(
            "Failed to open databases (v4: {}, v6: {})",
            describe(&config.v4_database),
            describe(&config.v6_database)
        )
    })
}

pub fn format_number(n: usize) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

pub fn format_bytes(bytes: usize) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.2} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.2} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
