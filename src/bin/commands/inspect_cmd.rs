use anyhow::Result;
use serde_json::json;
use wrydb::WryConfig;

use crate::cli_utils::{format_bytes, format_number, open_locator};

pub fn cmd_inspect(config: &WryConfig, json_output: bool) -> Result<()> {
    let locator = open_locator(config)?;
    let capacity = locator.cache().capacity();

    if json_output {
        let mut output = json!({ "cache_capacity": capacity });
        if let (Some(engine), Some(path)) = (locator.v4(), &config.v4_database) {
            output["v4"] = json!({
                "file": path.display().to_string(),
                "file_size": engine.image_len(),
                "header": engine.header(),
                "index_count": engine.index_count(),
            });
        }
        if let (Some(engine), Some(path)) = (locator.v6(), &config.v6_database) {
            output["v6"] = json!({
                "file": path.display().to_string(),
                "file_size": engine.image_len(),
                "header": engine.header(),
                "ipv4_attached": engine.has_v4(),
            });
        }
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if let (Some(engine), Some(path)) = (locator.v4(), &config.v4_database) {
        let header = engine.header();
        println!("IPv4 database: {}", path.display());
        println!("  Format:       qqwry.dat");
        println!("  Size:         {}", format_bytes(engine.image_len()));
        println!("  Entries:      {}", format_number(engine.index_count()));
        println!(
            "  Index:        {:#x}..={:#x}",
            header.first_index_offset, header.last_index_offset
        );
        println!();
    }
    if let (Some(engine), Some(path)) = (locator.v6(), &config.v6_database) {
        let header = engine.header();
        println!("IPv6 database: {}", path.display());
        println!("  Format:       IPDB v{}", header.version);
        println!("  Size:         {}", format_bytes(engine.image_len()));
        println!("  Entries:      {}", format_number(engine.index_count()));
        println!("  Offset width: {} bytes", header.offset_width);
        println!("  Fields:       {}", header.address_field_count);
        println!("  Index at:     {:#x}", header.first_index_offset);
        println!(
            "  IPv4 notes:   {}",
            if engine.has_v4() { "enabled" } else { "no IPv4 database" }
        );
        println!();
    }
    println!("Cache capacity: {}", format_number(capacity));
    Ok(())
}
