use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use wayback_archiver::mapper::WAYBACK_BASE_URL;
use wayback_archiver::pipeline::DEFAULT_OUTPUT_DIR;
use wayback_archiver::{load_records, HttpFetcher, Pipeline, PipelineConfig, UrlMapper};

/// Download archived pages from the Wayback Machine
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input JSON file containing index records
    input_file: PathBuf,

    /// Output directory
    #[arg(long, default_value = DEFAULT_OUTPUT_DIR)]
    output: PathBuf,

    /// Limit number of pages to download (0 means no limit)
    #[arg(long)]
    limit: Option<usize>,

    /// Delay between requests in seconds
    #[arg(long, default_value = "1.0", value_parser = parse_delay)]
    delay: Duration,

    /// Number of parallel workers, each honoring the delay
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u16).range(1..))]
    workers: u16,

    /// Extra attempts for network errors and 5xx responses
    #[arg(long, default_value_t = 0)]
    retries: u32,

    /// Write a JSON report of every download outcome
    #[arg(long)]
    report: Option<PathBuf>,

    /// Archive host serving the `/web/{timestamp}/{url}` snapshots
    #[arg(long, default_value = WAYBACK_BASE_URL, hide = true)]
    archive_base: String,
}

fn parse_delay(value: &str) -> std::result::Result<Duration, String> {
    let seconds: f64 = value
        .parse()
        .map_err(|_| format!("`{}` is not a number", value))?;
    Duration::try_from_secs_f64(seconds)
        .map_err(|_| "delay must be a non-negative number of seconds".to_string())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let records = load_records(&cli.input_file)?;
    info!("Found {} URLs to download", records.len());

    let config = PipelineConfig {
        output_root: cli.output,
        limit: cli.limit,
        delay: cli.delay,
        workers: usize::from(cli.workers),
        retries: cli.retries,
        ..PipelineConfig::default()
    };
    let fetcher = HttpFetcher::new().context("Failed to create HTTP client")?;
    let pipeline =
        Pipeline::new(fetcher, config).with_mapper(UrlMapper::new(cli.archive_base));

    // Ctrl-C stops new fetches; pages already saved stay on disk.
    signal_hook::flag::register(signal_hook::consts::SIGINT, pipeline.cancel_flag())
        .context("Failed to install interrupt handler")?;

    let summary = pipeline.run(&records);

    if let Some(report) = &cli.report {
        summary
            .write_report(report)
            .with_context(|| format!("Failed to write report to {}", report.display()))?;
        info!("Report saved to {}", report.display());
    }

    for page in summary.failures() {
        warn!(
            "Failed: {} ({})",
            page.snapshot_url,
            page.error_message.as_deref().unwrap_or("unknown error")
        );
    }

    if summary.cancelled {
        anyhow::bail!("Interrupted; re-run with the same index to resume");
    }
    info!("All downloads completed");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_accepts_fractional_seconds() {
        assert_eq!(parse_delay("0.25"), Ok(Duration::from_millis(250)));
        assert_eq!(parse_delay("0"), Ok(Duration::ZERO));
    }

    #[test]
    fn delay_rejects_values_a_duration_cannot_hold() {
        for value in ["-1", "NaN", "inf", "1e20", "soon"] {
            assert!(parse_delay(value).is_err(), "accepted {}", value);
        }
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
