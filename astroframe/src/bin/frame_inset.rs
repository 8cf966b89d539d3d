//! Crop frames around a point of interest and overlay a magnified inset.
//!
//! Each input file runs through decode, pedestal removal, crop, inset,
//! optional display stretch and encode. Files are processed in parallel and
//! independently: a failure on one file is reported and does not stop the
//! others.

use anyhow::{bail, Context, Result};
use astroframe::{
    crop_with_header, crop_with_inset, decode, encode, io::FormatAdapter, pixel_arg::PixelPoint,
    remove_pedestal, stretch_image, timing::ScopedTimer, FitsCodec, MidtoneBalance,
    PipelineConfig, StretchParams,
};
use clap::Parser;
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Crop FITS frames and overlay a magnified inset of a detail region"
)]
struct Args {
    #[arg(required = true, help = "Input FITS files")]
    inputs: Vec<PathBuf>,

    #[arg(
        short = 'o',
        long,
        default_value = "./inset_frames",
        help = "Output directory for processed frames"
    )]
    output_dir: PathBuf,

    #[arg(short = 'c', long, help = "Pipeline configuration JSON file")]
    config: Option<PathBuf>,

    #[arg(long, help = "Crop center as x,y in source pixels", value_name = "X,Y")]
    center: PixelPoint,

    #[arg(long, help = "Crop width in pixels (overrides config)")]
    crop_width: Option<usize>,

    #[arg(long, help = "Crop height in pixels (overrides config)")]
    crop_height: Option<usize>,

    #[arg(
        long,
        help = "Inset source center as x,y (column,row) in cropped-frame pixels",
        value_name = "X,Y",
        requires = "inset_radii"
    )]
    inset_center: Option<PixelPoint>,

    #[arg(long, help = "Inset source half-size as rx,ry (columns,rows)", value_name = "RX,RY")]
    inset_radii: Option<PixelPoint>,

    #[arg(long, help = "Apply a display stretch with this midtone balance (0 < m < 1)")]
    midtone: Option<f64>,

    #[arg(long, help = "Clip shadows at the median when stretching")]
    shadow_clipping: bool,

    #[arg(long, help = "Overwrite existing output files")]
    overwrite: bool,
}

struct Job<'a> {
    args: &'a Args,
    config: &'a PipelineConfig,
    stretch: Option<StretchParams>,
}

impl Job<'_> {
    fn output_path(&self, input: &Path) -> Result<PathBuf> {
        let stem = input
            .file_stem()
            .and_then(|s| s.to_str())
            .with_context(|| format!("Input path has no file name: {}", input.display()))?;
        let extension = &self.config.fits_extension;
        Ok(self.args.output_dir.join(format!("{stem}_inset.{extension}")))
    }

    fn process(&self, input: &Path) -> Result<PathBuf> {
        let _timer = ScopedTimer::new(input.display().to_string());
        let codec = FitsCodec;

        let (raw, header) = codec
            .open_for_read(input)
            .with_context(|| format!("Failed to read {}", input.display()))?;
        let (image, mut header) = decode(raw, header)?;
        let image = remove_pedestal(&image, &mut header)?;

        let width = self.args.crop_width.unwrap_or(self.config.crop_width);
        let height = self.args.crop_height.unwrap_or(self.config.crop_height);
        let (mut image, header) = crop_with_header(
            &image,
            self.args.center.x,
            self.args.center.y,
            width,
            height,
            &header,
            &self.config.feature_keys,
        )
        .context("Crop failed")?;

        if let (Some(center), Some(radii)) = (self.args.inset_center, self.args.inset_radii) {
            let inset = self.config.inset.params(center.row_col(), radii.row_col());
            crop_with_inset(&mut image, &inset).context("Inset overlay failed")?;
        }

        if let Some(params) = &self.stretch {
            image = stretch_image(&image, params)?;
        }

        let (raw, header) = encode(&image, &header, self.config.convert_to_uint16);
        let output = self.output_path(input)?;
        codec
            .write(&raw, &header, &output, self.args.overwrite)
            .with_context(|| format!("Failed to write {}", output.display()))?;
        Ok(output)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let config = PipelineConfig::load_or_default(args.config.as_deref())
        .context("Failed to load pipeline configuration")?;

    let stretch = args
        .midtone
        .map(|m| {
            MidtoneBalance::new(m)
                .map(|m| StretchParams::new(m).with_shadow_clipping(args.shadow_clipping))
        })
        .transpose()?;

    fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("Failed to create output directory: {:?}", args.output_dir))?;

    info!(
        "Processing {} frame(s), crop center {}",
        args.inputs.len(),
        args.center
    );

    let job = Job {
        args: &args,
        config: &config,
        stretch,
    };
    let results: Vec<(&PathBuf, Result<PathBuf>)> = args
        .inputs
        .par_iter()
        .map(|input| (input, job.process(input)))
        .collect();

    let mut failures = 0;
    for (input, result) in &results {
        match result {
            Ok(output) => info!("{} -> {}", input.display(), output.display()),
            Err(e) => {
                failures += 1;
                warn!("{} failed: {:#}", input.display(), e);
            }
        }
    }

    info!("Done: {} succeeded, {} failed", results.len() - failures, failures);
    if failures > 0 {
        bail!("{failures} of {} frame(s) failed", results.len());
    }
    Ok(())
}
