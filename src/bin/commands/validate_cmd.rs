use anyhow::Result;
use serde_json::json;
use std::path::Path;
use std::time::Instant;
use wrydb::validation::{validate_v4, validate_v6, ValidationReport};
use wrydb::WryConfig;

use crate::cli_utils::open_locator;

fn print_report(label: &str, path: &Path, report: &ValidationReport, verbose: bool) {
    println!("Validating {}: {}", label, path.display());
    println!("  {}", report.stats.summary());
    println!();

    if !report.errors.is_empty() {
        println!("❌ ERRORS ({}):", report.errors.len());
        for error in &report.errors {
            println!("  • {}", error);
        }
        println!();
    }

    if !report.warnings.is_empty() && verbose {
        println!("⚠️  WARNINGS ({}):", report.warnings.len());
        for warning in &report.warnings {
            println!("  • {}", warning);
        }
        println!();
    } else if !report.warnings.is_empty() {
        println!(
            "⚠️  {} warning(s) (use --verbose to show)",
            report.warnings.len()
        );
        println!();
    }

    if verbose && !report.info.is_empty() {
        println!("ℹ️  INFORMATION ({}):", report.info.len());
        for info in &report.info {
            println!("  • {}", info);
        }
        println!();
    }
}

pub fn cmd_validate(config: &WryConfig, json_output: bool, verbose: bool) -> Result<()> {
    let locator = open_locator(config)?;

    let start = Instant::now();
    let mut reports = Vec::new();
    if let (Some(engine), Some(path)) = (locator.v4(), &config.v4_database) {
        reports.push(("v4", path.as_path(), validate_v4(engine)));
    }
    if let (Some(engine), Some(path)) = (locator.v6(), &config.v6_database) {
        reports.push(("v6", path.as_path(), validate_v6(engine)));
    }
    let duration = start.elapsed();
    let valid = reports.iter().all(|(_, _, r)| r.is_valid());

    if json_output {
        let mut output = json!({
            "is_valid": valid,
            "duration_ms": duration.as_millis(),
        });
        for (label, path, report) in &reports {
            output[*label] = json!({
                "database": path.display().to_string(),
                "is_valid": report.is_valid(),
                "report": report,
            });
        }
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        for (label, path, report) in &reports {
            print_report(label, path, report, verbose);
        }
        println!("Validation time: {}ms", duration.as_millis());
        if valid {
            println!("✅ VALIDATION PASSED");
        } else {
            let errors: usize = reports.iter().map(|(_, _, r)| r.errors.len()).sum();
            println!("❌ VALIDATION FAILED");
            println!("   {} error(s) found.", errors);
        }
    }

    if valid {
        Ok(())
    } else {
        std::process::exit(1);
    }
}
