//! Report the FITS frames of a directory grouped by exposure time.

use anyhow::{Context, Result};
use astroframe::{group_by_exposure, ExposureGroups, FitsCodec, PipelineConfig};
use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "Group FITS frames in a directory by EXPTIME")]
struct Args {
    #[arg(help = "Directory holding the frames (not searched recursively)")]
    directory: PathBuf,

    #[arg(short = 'c', long, help = "Pipeline configuration JSON file")]
    config: Option<PathBuf>,

    #[arg(long, help = "File extension to pick up (overrides config)")]
    extension: Option<String>,

    #[arg(short = 'o', long, help = "Write the JSON report here instead of stdout")]
    output: Option<PathBuf>,
}

#[derive(Serialize)]
struct Report<'a> {
    directory: &'a PathBuf,
    file_count: usize,
    groups: &'a ExposureGroups,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let config = PipelineConfig::load_or_default(args.config.as_deref())
        .context("Failed to load pipeline configuration")?;
    let extension = args.extension.as_deref().unwrap_or(&config.fits_extension);

    let groups = group_by_exposure(&FitsCodec, &args.directory, extension)
        .with_context(|| format!("Failed to group frames in {:?}", args.directory))?;

    for (exposure, paths) in groups.iter() {
        info!("EXPTIME {}: {} frame(s)", exposure, paths.len());
    }

    let report = Report {
        directory: &args.directory,
        file_count: groups.file_count(),
        groups: &groups,
    };
    let json =
        serde_json::to_string_pretty(&report).context("Failed to serialize report to JSON")?;

    match &args.output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write report to {path:?}"))?;
            info!("Report saved to {:?}", path);
        }
        None => println!("{json}"),
    }
    Ok(())
}
