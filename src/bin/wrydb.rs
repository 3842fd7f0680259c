mod cli_utils;
mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use commands::{cmd_dump, cmd_inspect, cmd_query, cmd_validate};

#[derive(Parser)]
#[command(name = "wrydb")]
#[command(
    about = "IP geolocation lookups over qqwry.dat and IPDB databases",
    long_about = "wrydb - IP geolocation lookups over qqwry.dat (IPv4) and IPDB (IPv6) databases\n\n\
    Database paths come from the configuration file, WRYDB_* environment\n\
    variables, or the --v4-db/--v6-db flags.\n\n\
    Examples:\n\
      wrydb --v4-db qqwry.dat query 1.2.4.8\n\
      wrydb --v4-db qqwry.dat --v6-db ipv6wry.db query 2002:c000:0204::1 --json\n\
      wrydb --v4-db qqwry.dat dump 0 100 --format csv\n\
      wrydb --config wrydb.toml validate --verbose"
)]
#[command(version)]
struct Cli {
    /// Configuration file (TOML or JSON)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// IPv4 database (qqwry.dat), overrides the configuration
    #[arg(long, global = true, value_name = "FILE")]
    v4_db: Option<PathBuf>,

    /// IPv6 database (IPDB), overrides the configuration
    #[arg(long, global = true, value_name = "FILE")]
    v6_db: Option<PathBuf>,

    /// Use Simplified Chinese labels
    #[arg(long, global = true)]
    zh: bool,

    /// Print debug logs to stderr
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Output format for dumps
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DumpFormat {
    Text,
    Json,
    Csv,
}

#[derive(Subcommand)]
enum Commands {
    /// Look up one address (or an `a-b` range of IPv4 index entries)
    Query {
        /// Address to look up; comma-separated lists use the last element
        #[arg(value_name = "ADDRESS")]
        address: String,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,

        /// Include fields split from the country and area
        #[arg(short, long)]
        fields: bool,
    },

    /// Print IPv4 index entries FIRST..LAST with their resolved records
    Dump {
        /// First index position
        #[arg(value_name = "FIRST")]
        first: usize,

        /// Index position after the last one printed
        #[arg(value_name = "LAST")]
        last: usize,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: DumpFormat,
    },

    /// Show header information for the configured databases
    Inspect {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Check every entry of the configured databases
    Validate {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,

        /// Show warnings and informational messages
        #[arg(short, long)]
        verbose: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    cli_utils::init_logging(cli.debug);

    let config = cli_utils::load_config(
        cli.config.as_deref(),
        cli.v4_db.clone(),
        cli.v6_db.clone(),
        cli.zh,
    )?;

    match cli.command {
        Commands::Query {
            address,
            json,
            fields,
        } => cmd_query(&config, address, json, fields),
        Commands::Dump {
            first,
            last,
            format,
        } => cmd_dump(&config, first, last, format),
        Commands::Inspect { json } => cmd_inspect(&config, json),
        Commands::Validate { json, verbose } => cmd_validate(&config, json, verbose),
    }
}
