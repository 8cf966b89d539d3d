//! Astronomical frame pipeline.
//!
//! Decodes FITS frames into normalized `f64` images, applies geometric and
//! tonal transforms that keep the header consistent with the pixel grid, and
//! encodes the result back to FITS.
//!
//! ```text
//! FormatAdapter -> normalize::decode -> geometry / tone -> normalize::encode -> FormatAdapter
//! ```

pub mod config;
pub mod discovery;
pub mod error;
pub mod geometry;
pub mod header;
pub mod header_ops;
pub mod image;
pub mod io;
pub mod normalize;
pub mod pixel_arg;
pub mod stats;
pub mod timing;
pub mod tone;

pub use config::{InsetConfig, PipelineConfig};
pub use discovery::{group_by_exposure, ExposureGroups};
pub use error::{FrameError, Result};
pub use geometry::{
    crop, crop_rect, crop_rect_with_header, crop_with_header, crop_with_inset, with_inset,
    InsetParams, PixelRect,
};
pub use header::{FeatureKey, Header, HeaderValue};
pub use header_ops::{extract_subset, merge, translate_crop_coordinates};
pub use image::{Image, PixelShape};
pub use io::{FitsCodec, FormatAdapter};
pub use normalize::{combine_planes, decode, encode, remove_pedestal, RawImage, SampleEncoding};
pub use tone::{histogram_stretch, mtf, stretch_image, MidtoneBalance, StretchParams};
