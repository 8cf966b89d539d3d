//! Compose two gray frames into a red/green color frame.
//!
//! The red frame's header is kept; selected keys of the green frame's header
//! are merged over it.

use anyhow::{Context, Result};
use astroframe::{
    combine_planes, decode, encode, extract_subset, io::FormatAdapter, merge, remove_pedestal,
    FitsCodec, Header, Image, PipelineConfig,
};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "Combine two gray FITS frames into one color frame")]
struct Args {
    #[arg(help = "Frame for the red channel")]
    red: PathBuf,

    #[arg(help = "Frame for the green channel")]
    green: PathBuf,

    #[arg(short = 'o', long, help = "Output FITS file")]
    output: PathBuf,

    #[arg(
        short = 'k',
        long = "key",
        help = "Header key copied from the green frame (repeatable)"
    )]
    keys: Vec<String>,

    #[arg(short = 'c', long, help = "Pipeline configuration JSON file")]
    config: Option<PathBuf>,

    #[arg(long, help = "Overwrite the output file if it exists")]
    overwrite: bool,
}

fn load_plane(path: &Path) -> Result<(Image, Header)> {
    let (raw, header) = FitsCodec
        .open_for_read(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let (image, mut header) = decode(raw, header)?;
    let image = remove_pedestal(&image, &mut header)?;
    Ok((image, header))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let config = PipelineConfig::load_or_default(args.config.as_deref())
        .context("Failed to load pipeline configuration")?;

    let (red, red_header) = load_plane(&args.red)?;
    let (green, green_header) = load_plane(&args.green)?;

    let color = combine_planes(&red, &green).context("Frames cannot be combined")?;

    let keys: Vec<&str> = args.keys.iter().map(String::as_str).collect();
    let green_subset = extract_subset(&green_header, &keys)
        .with_context(|| format!("Green frame {} lacks a requested key", args.green.display()))?;
    let header = merge(&red_header, &green_subset);

    let (raw, header) = encode(&color, &header, config.convert_to_uint16);
    FitsCodec
        .write(&raw, &header, &args.output, args.overwrite)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    info!("Saved {} color frame to {}", color.shape(), args.output.display());
    Ok(())
}
