use anyhow::{Context, Result};
use std::io::{self, Write};
use wrydb::v4::DumpEntry;
use wrydb::WryConfig;

use crate::cli_utils::open_locator;
use crate::DumpFormat;

pub fn cmd_dump(config: &WryConfig, first: usize, last: usize, format: DumpFormat) -> Result<()> {
    if first > last {
        anyhow::bail!("FIRST ({}) must not exceed LAST ({})", first, last);
    }
    let locator = open_locator(config)?;
    let entries = locator
        .dump(first..last)
        .with_context(|| format!("Dump failed for {}..{}", first, last))?;
    print_dump(&entries, format)
}

pub fn print_dump(entries: &[DumpEntry], format: DumpFormat) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match format {
        DumpFormat::Text => {
            for e in entries {
                writeln!(out, "{:<15} {:#08x} {} {}", e.ip, e.record_offset, e.country, e.area)?;
            }
        }
        DumpFormat::Json => {
            writeln!(out, "{}", serde_json::to_string_pretty(entries)?)?;
        }
        DumpFormat::Csv => {
            let mut writer = csv::Writer::from_writer(out);
            for e in entries {
                writer.serialize(e)?;
            }
            writer.flush()?;
        }
    }
    Ok(())
}
