use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use sportsdesk_tracks::enrich_file;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "track-enrich")]
#[command(about = "Attach base64 track maps to an F1 calendar export", long_about = None)]
#[command(version)]
struct Cli {
    /// Calendar JSON array to read
    #[arg(short, long, default_value = "f1_2026_calendar.json")]
    input: PathBuf,

    /// Where to write the enriched calendar
    #[arg(short, long, default_value = "f1_2026_calendar_with_tracks.json")]
    output: PathBuf,

    /// Directory holding one base64 text file per circuit
    #[arg(short, long, env = "TRACKS_DIR", default_value = "tracks")]
    tracks_dir: PathBuf,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        "sportsdesk_tracks=debug"
    } else {
        "sportsdesk_tracks=warn"
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let report = enrich_file(&cli.input, &cli.output, &cli.tracks_dir)?;

    if cli.verbose {
        println!(
            "{} of {} sessions matched a known circuit",
            report.enriched.to_string().bold(),
            report.sessions
        );
    }
    println!(
        "{} {}",
        "Updated calendar written to".green(),
        cli.output.display()
    );
    Ok(())
}
