//! Conversion between stored sample encodings and normalized float frames.
//!
//! Frames enter the pipeline as 16-bit unsigned or floating point arrays and
//! are carried as `f64` samples nominally in `[0, 1]`. Color cubes are stored
//! plane-first on disk and handled channel-last in memory.

use crate::error::{FrameError, Result};
use crate::header::{keys, Header};
use crate::image::Image;
use ndarray::{Array3, ArrayD, Axis, Ix3};
use std::fmt;
use tracing::debug;

/// Full-scale value of a 16-bit sample
pub const U16_FULL_SCALE: f64 = 65535.0;

/// Storage type of raw samples
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleEncoding {
    U8,
    I16,
    U16,
    I32,
    I64,
    F32,
    F64,
}

impl SampleEncoding {
    /// FITS BITPIX code; unsigned 16-bit is stored as offset 16-bit
    pub fn bitpix(self) -> i64 {
        match self {
            SampleEncoding::U8 => 8,
            SampleEncoding::I16 | SampleEncoding::U16 => 16,
            SampleEncoding::I32 => 32,
            SampleEncoding::I64 => 64,
            SampleEncoding::F32 => -32,
            SampleEncoding::F64 => -64,
        }
    }
}

impl fmt::Display for SampleEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SampleEncoding::U8 => "uint8",
            SampleEncoding::I16 => "int16",
            SampleEncoding::U16 => "uint16",
            SampleEncoding::I32 => "int32",
            SampleEncoding::I64 => "int64",
            SampleEncoding::F32 => "float32",
            SampleEncoding::F64 => "float64",
        };
        f.write_str(name)
    }
}

/// Pixel array exactly as stored, in file axis order
#[derive(Debug, Clone, PartialEq)]
pub enum RawImage {
    U8(ArrayD<u8>),
    I16(ArrayD<i16>),
    U16(ArrayD<u16>),
    I32(ArrayD<i32>),
    I64(ArrayD<i64>),
    F32(ArrayD<f32>),
    F64(ArrayD<f64>),
}

impl RawImage {
    pub fn encoding(&self) -> SampleEncoding {
        match self {
            RawImage::U8(_) => SampleEncoding::U8,
            RawImage::I16(_) => SampleEncoding::I16,
            RawImage::U16(_) => SampleEncoding::U16,
            RawImage::I32(_) => SampleEncoding::I32,
            RawImage::I64(_) => SampleEncoding::I64,
            RawImage::F32(_) => SampleEncoding::F32,
            RawImage::F64(_) => SampleEncoding::F64,
        }
    }

    pub fn shape(&self) -> &[usize] {
        match self {
            RawImage::U8(a) => a.shape(),
            RawImage::I16(a) => a.shape(),
            RawImage::U16(a) => a.shape(),
            RawImage::I32(a) => a.shape(),
            RawImage::I64(a) => a.shape(),
            RawImage::F32(a) => a.shape(),
            RawImage::F64(a) => a.shape(),
        }
    }

    pub fn bitpix(&self) -> i64 {
        self.encoding().bitpix()
    }
}

/// Normalize a stored frame to `f64` samples.
///
/// Unsigned 16-bit samples are scaled by 1/65535; float samples pass through
/// unchanged. A rank-3 cube `(C, H, W)` becomes a channel-last `(H, W, C)`
/// color frame. The header is returned unchanged.
pub fn decode(raw: RawImage, header: Header) -> Result<(Image, Header)> {
    let encoding = raw.encoding();
    let samples: ArrayD<f64> = match raw {
        RawImage::U16(a) => a.mapv(|v| f64::from(v) / U16_FULL_SCALE),
        RawImage::F32(a) => a.mapv(f64::from),
        RawImage::F64(a) => a,
        _ => return Err(FrameError::UnsupportedEncoding(encoding)),
    };

    let rank = samples.ndim();
    let image = if rank == 3 {
        let planes = samples
            .into_dimensionality::<Ix3>()
            .map_err(|_| FrameError::UnsupportedRank(rank))?;
        Image::Color(channel_last(planes))
    } else {
        Image::from_dyn(samples)?
    };

    debug!(
        "Decoded {} frame {} with {} channel(s)",
        encoding,
        image.shape(),
        image.channels()
    );
    Ok((image, header))
}

/// Convert a normalized frame back to a storable array.
///
/// With `convert_to_uint16`, samples are clipped to `[0, 1]`, scaled by 65535
/// and truncated; NaN becomes 0. Otherwise the `f64` samples are kept as is.
pub fn encode(image: &Image, header: &Header, convert_to_uint16: bool) -> (RawImage, Header) {
    let samples: ArrayD<f64> = match image {
        Image::Gray(a) => a.clone().into_dyn(),
        Image::Color(a) => channel_first(a).into_dyn(),
    };

    let raw = if convert_to_uint16 {
        RawImage::U16(samples.mapv(to_u16))
    } else {
        RawImage::F64(samples)
    };

    (raw, header.clone())
}

fn to_u16(value: f64) -> u16 {
    // NaN survives clamp and saturates to 0 in the cast
    (value.clamp(0.0, 1.0) * U16_FULL_SCALE) as u16
}

fn channel_last(planes: Array3<f64>) -> Array3<f64> {
    planes
        .permuted_axes([1, 2, 0])
        .as_standard_layout()
        .into_owned()
}

fn channel_first(pixels: &Array3<f64>) -> Array3<f64> {
    pixels
        .view()
        .permuted_axes([2, 0, 1])
        .as_standard_layout()
        .into_owned()
}

/// Subtract the `PEDESTAL` bias recorded in the header.
///
/// The pedestal is in 16-bit ADU, so `PEDESTAL / 65535` is subtracted from
/// every sample and negative results are clamped to 0 (NaN is kept). The key
/// is removed so the subtraction cannot be applied twice. Without the key
/// the image is returned unchanged.
pub fn remove_pedestal(image: &Image, header: &mut Header) -> Result<Image> {
    let Some(value) = header.get(keys::PEDESTAL) else {
        return Ok(image.clone());
    };
    let pedestal = value
        .as_f64()
        .ok_or_else(|| FrameError::NonNumericKey(keys::PEDESTAL.to_string()))?;

    let offset = pedestal / U16_FULL_SCALE;
    let corrected = image.map(|v| {
        let v = v - offset;
        if v < 0.0 {
            0.0
        } else {
            v
        }
    });
    header.remove(keys::PEDESTAL);

    debug!("Removed pedestal of {} ADU", pedestal);
    Ok(corrected)
}

/// Stack two gray frames as the red and green channels of a color frame.
///
/// The blue channel is all zeros.
pub fn combine_planes(red: &Image, green: &Image) -> Result<Image> {
    let (red, green) = match (red, green) {
        (Image::Gray(r), Image::Gray(g)) => (r, g),
        _ => {
            let rank = if red.is_color() { 3 } else { 2 };
            let other = if green.is_color() { 3 } else { 2 };
            return Err(FrameError::UnsupportedRank(rank.max(other)));
        }
    };
    if red.dim() != green.dim() {
        return Err(FrameError::ShapeMismatch {
            left: red.dim(),
            right: green.dim(),
        });
    }

    let (height, width) = red.dim();
    let mut color = Array3::<f64>::zeros((height, width, 3));
    color.index_axis_mut(Axis(2), 0).assign(red);
    color.index_axis_mut(Axis(2), 1).assign(green);

    Ok(Image::Color(color))
}
