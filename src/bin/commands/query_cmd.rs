use anyhow::{Context, Result};
use serde_json::json;
use wrydb::{split, Query, WryConfig};

use crate::cli_utils::open_locator;
use crate::commands::dump_cmd::print_dump;
use crate::DumpFormat;

pub fn cmd_query(config: &WryConfig, address: String, json_output: bool, fields: bool) -> Result<()> {
    let query = Query::parse(&address).with_context(|| format!("Invalid query: {}", address))?;
    let locator = open_locator(config)?;

    let ip = match query {
        Query::IndexRange(range) => {
            let entries = locator
                .dump(range.clone())
                .with_context(|| format!("Dump failed for {}..{}", range.start, range.end))?;
            let format = if json_output {
                DumpFormat::Json
            } else {
                DumpFormat::Text
            };
            return print_dump(&entries, format);
        }
        Query::Address(ip) => ip,
    };

    let location = locator
        .resolve(&ip)
        .with_context(|| format!("Query failed for: {}", ip))?;
    let split_fields = if fields {
        split(&location.country, &location.area)
    } else {
        None
    };

    if json_output {
        let mut output = json!({
            "ip": ip,
            "country": location.country,
            "area": location.area,
        });
        if fields {
            output["fields"] = json!(split_fields);
        }
        // Annotated text with transition notes, IPv6 only
        if let Some(v6) = locator.v6().filter(|_| ip.contains(':')) {
            output["description"] = json!(v6.lookup(&ip).combined_description());
        }
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{} {} {}", ip, location.country, location.area);
        if let Some(f) = split_fields {
            println!("country:  {}", f.country);
            println!("province: {}", f.province);
            println!("city:     {}", f.city);
            println!("block:    {}", f.block);
            println!("carrier:  {}", f.carrier);
            println!("network:  {}", f.network);
        }
    }
    Ok(())
}
