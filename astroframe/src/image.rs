//! In-memory frame representation and its pixel dimensions.

use crate::error::{FrameError, Result};
use ndarray::{s, Array2, Array3, ArrayD, ArrayView3, ArrayViewD, ArrayViewMut3, Axis, Ix2, Ix3};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

/// Image dimensions structure
///
/// Uses usize for direct compatibility with ndarray indexing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelShape {
    /// Image width in pixels
    pub width: usize,
    /// Image height in pixels
    pub height: usize,
}

impl PixelShape {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    /// Get total number of pixels
    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }

    /// Check if a point is within bounds
    pub fn contains(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.height
    }
}

impl fmt::Display for PixelShape {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A normalized frame.
///
/// Gray frames are `(height, width)`; color frames are `(height, width, channel)`
/// with the channel axis last. Sample values are nominally in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub enum Image {
    Gray(Array2<f64>),
    Color(Array3<f64>),
}

impl Image {
    /// Wrap a dynamic-rank array, accepting only rank 2 or 3
    pub fn from_dyn(array: ArrayD<f64>) -> Result<Self> {
        let rank = array.ndim();
        match rank {
            2 => array
                .into_dimensionality::<Ix2>()
                .map(Image::Gray)
                .map_err(|_| FrameError::UnsupportedRank(rank)),
            3 => array
                .into_dimensionality::<Ix3>()
                .map(Image::Color)
                .map_err(|_| FrameError::UnsupportedRank(rank)),
            _ => Err(FrameError::UnsupportedRank(rank)),
        }
    }

    pub fn into_dyn(self) -> ArrayD<f64> {
        match self {
            Image::Gray(a) => a.into_dyn(),
            Image::Color(a) => a.into_dyn(),
        }
    }

    pub fn view_dyn(&self) -> ArrayViewD<'_, f64> {
        match self {
            Image::Gray(a) => a.view().into_dyn(),
            Image::Color(a) => a.view().into_dyn(),
        }
    }

    /// Gray frames are viewed with a unit channel axis
    pub fn view3(&self) -> ArrayView3<'_, f64> {
        match self {
            Image::Gray(a) => a.view().insert_axis(Axis(2)),
            Image::Color(a) => a.view(),
        }
    }

    pub fn view3_mut(&mut self) -> ArrayViewMut3<'_, f64> {
        match self {
            Image::Gray(a) => a.view_mut().insert_axis(Axis(2)),
            Image::Color(a) => a.view_mut(),
        }
    }

    pub fn shape(&self) -> PixelShape {
        let (height, width) = match self {
            Image::Gray(a) => a.dim(),
            Image::Color(a) => (a.dim().0, a.dim().1),
        };
        PixelShape::new(width, height)
    }

    pub fn width(&self) -> usize {
        self.shape().width
    }

    pub fn height(&self) -> usize {
        self.shape().height
    }

    pub fn channels(&self) -> usize {
        match self {
            Image::Gray(_) => 1,
            Image::Color(a) => a.dim().2,
        }
    }

    pub fn is_color(&self) -> bool {
        matches!(self, Image::Color(_))
    }

    /// All samples in logical order
    pub fn values(&self) -> impl Iterator<Item = &f64> {
        self.view_dyn().into_iter()
    }

    pub fn map<F>(&self, f: F) -> Image
    where
        F: Fn(f64) -> f64,
    {
        match self {
            Image::Gray(a) => Image::Gray(a.mapv(f)),
            Image::Color(a) => Image::Color(a.mapv(f)),
        }
    }

    /// Owned copy of the half-open row/column window, all channels kept
    pub fn slice(&self, rows: Range<usize>, cols: Range<usize>) -> Image {
        match self {
            Image::Gray(a) => Image::Gray(a.slice(s![rows, cols]).to_owned()),
            Image::Color(a) => Image::Color(a.slice(s![rows, cols, ..]).to_owned()),
        }
    }
}
