use std::path::PathBuf;

use clap::Parser;
use eyre::Result;
use log::info;
use visualphp::{build_catalog, init_logging, to_json, Config};

/// Prints a JSON description of the allow-listed PHP functions.
#[derive(Parser)]
#[command(name = "catalog", version)]
struct Cli {
    /// Config file to use instead of ./visualphp.toml
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::discover()?,
    };
    let records = build_catalog(&config)?;
    info!("described {} function(s)", records.len());
    println!("{}", to_json(&records)?);
    Ok(())
}
