//! Display stretching: clip to a sample range, rescale to `[0, 1]`, then bend
//! the midtones with the midtone transfer function.

use crate::error::{FrameError, Result};
use crate::image::Image;
use crate::stats::{median, MinMaxScan};
use ndarray::{Array, ArrayBase, Data, Dimension};

/// Midtone balance `m`, validated to lie strictly inside `(0, 1)`.
///
/// Inside that range the transfer function's denominator `(2m - 1)x - m`
/// stays negative for every `x` in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MidtoneBalance(f64);

impl MidtoneBalance {
    /// `m = 0.5`, the identity curve
    pub const NEUTRAL: MidtoneBalance = MidtoneBalance(0.5);

    pub fn new(m: f64) -> Result<Self> {
        if m > 0.0 && m < 1.0 {
            Ok(Self(m))
        } else {
            Err(FrameError::InvalidParameter(format!(
                "midtone balance must lie in (0, 1), got {m}"
            )))
        }
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl Default for MidtoneBalance {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

/// Midtone transfer function `(m - 1)x / ((2m - 1)x - m)`.
///
/// Maps 0 to 0 and 1 to 1; `m < 0.5` brightens midtones, `m > 0.5` darkens them.
pub fn mtf(x: f64, m: MidtoneBalance) -> f64 {
    let m = m.0;
    (m - 1.0) * x / ((2.0 * m - 1.0) * x - m)
}

/// Parameters of a histogram stretch
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StretchParams {
    pub midtone: MidtoneBalance,
    /// Lower clip point; defaults to the minimum, or the median with shadow clipping
    pub low: Option<f64>,
    /// Upper clip point; defaults to the maximum
    pub high: Option<f64>,
    pub shadow_clipping: bool,
}

impl StretchParams {
    pub fn new(midtone: MidtoneBalance) -> Self {
        Self {
            midtone,
            ..Self::default()
        }
    }

    pub fn with_low(mut self, low: f64) -> Self {
        self.low = Some(low);
        self
    }

    pub fn with_high(mut self, high: f64) -> Self {
        self.high = Some(high);
        self
    }

    pub fn with_shadow_clipping(mut self, enabled: bool) -> Self {
        self.shadow_clipping = enabled;
        self
    }
}

/// Stretch an array of samples for display
///
/// # Arguments
/// * `samples` - Input samples of any dimensionality; NaN is ignored when
///   computing default clip points and stays NaN in the output
/// * `params` - Midtone balance and optional clip points
///
/// # Returns
/// A new array of the same shape with values in `[0, 1]`. When `low == high`
/// every finite sample maps to 0.
///
/// # Errors
/// `InvalidParameter` if `high < low` or either is NaN; a stats error if a
/// default clip point is needed but the input has no non-NaN samples.
pub fn histogram_stretch<S, D>(
    samples: &ArrayBase<S, D>,
    params: &StretchParams,
) -> Result<Array<f64, D>>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    let low = match params.low {
        Some(low) => low,
        None if params.shadow_clipping => median(samples.iter().copied())?,
        None => MinMaxScan::new(samples.iter().copied()).min()?,
    };
    let high = match params.high {
        Some(high) => high,
        None => MinMaxScan::new(samples.iter().copied()).max()?,
    };
    if low.is_nan() || high.is_nan() || high < low {
        return Err(FrameError::InvalidParameter(format!(
            "stretch range [{low}, {high}] is empty"
        )));
    }

    let span = high - low;
    let midtone = params.midtone;
    Ok(samples.mapv(|v| {
        let clipped = v.clamp(low, high);
        let normalized = if span > 0.0 { (clipped - low) / span } else { 0.0 };
        mtf(normalized, midtone)
    }))
}

/// [`histogram_stretch`] over a whole frame; color channels share one range
pub fn stretch_image(image: &Image, params: &StretchParams) -> Result<Image> {
    Ok(match image {
        Image::Gray(a) => Image::Gray(histogram_stretch(a, params)?),
        Image::Color(a) => Image::Color(histogram_stretch(a, params)?),
    })
}
