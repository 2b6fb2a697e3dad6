use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use wayback_archiver::{read_index, write_index};

/// Normalize a raw archive index export into the archiver's input format
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Raw index export (JSON array of rows)
    input_file: PathBuf,

    /// Where to write the normalized index
    output_file: PathBuf,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let records = read_index(&cli.input_file)?;
    write_index(&records, &cli.output_file).with_context(|| {
        format!(
            "Failed to write normalized index to {}",
            cli.output_file.display()
        )
    })?;

    info!(
        "Converted {} records to {}",
        records.len(),
        cli.output_file.display()
    );
    Ok(())
}
