//! Spatial transforms that keep the header consistent with the pixel grid.
//!
//! Coordinates are `(x, y)` = (column, row) with the origin at the first
//! stored pixel. Every operation validates its geometry up front and fails
//! with `OutOfBounds` rather than producing a truncated or overlapping
//! result.

use crate::error::{FrameError, Result};
use crate::header::{FeatureKey, Header};
use crate::header_ops::{set_dimensions, translate_feature_coordinates};
use crate::image::{Image, PixelShape};
use ndarray::{s, Array3, ArrayViewMut3};
use serde::{Deserialize, Serialize};
use std::ops::Range;
use tracing::debug;

/// Default crop edge length in pixels
pub const DEFAULT_CROP_SIZE: usize = 512;

fn out_of_bounds(what: &str, shape: PixelShape) -> FrameError {
    FrameError::OutOfBounds(format!("{what} exceeds image {shape}"))
}

fn centered_range(center: usize, size: usize, limit: usize) -> Option<Range<usize>> {
    let start = center.checked_sub(size / 2)?;
    let end = center.checked_add(size / 2)?;
    (end <= limit).then_some(start..end)
}

/// Extract the window of `width x height` centered on `(center_x, center_y)`.
///
/// The window spans `center - size/2 .. center + size/2` (half-open) on each
/// axis, so an odd size yields one pixel less than requested.
pub fn crop(
    image: &Image,
    center_x: usize,
    center_y: usize,
    width: usize,
    height: usize,
) -> Result<Image> {
    let shape = image.shape();
    let (cols, rows) = crop_ranges(shape, center_x, center_y, width, height)?;
    Ok(image.slice(rows, cols))
}

/// [`crop`] that also updates `NAXIS1`/`NAXIS2` and the tracked feature
/// coordinates of `header` for the new origin.
pub fn crop_with_header(
    image: &Image,
    center_x: usize,
    center_y: usize,
    width: usize,
    height: usize,
    header: &Header,
    features: &[FeatureKey],
) -> Result<(Image, Header)> {
    let shape = image.shape();
    let (cols, rows) = crop_ranges(shape, center_x, center_y, width, height)?;
    let mut cropped_header =
        translate_feature_coordinates(header, features, cols.start as i64, rows.start as i64)?;

    let cropped = image.slice(rows, cols);
    set_dimensions(&mut cropped_header, cropped.shape());
    Ok((cropped, cropped_header))
}

fn crop_ranges(
    shape: PixelShape,
    center_x: usize,
    center_y: usize,
    width: usize,
    height: usize,
) -> Result<(Range<usize>, Range<usize>)> {
    let cols = centered_range(center_x, width, shape.width);
    let rows = centered_range(center_y, height, shape.height);
    match (cols, rows) {
        (Some(cols), Some(rows)) => Ok((cols, rows)),
        _ => Err(out_of_bounds(
            &format!("{width}x{height} crop at ({center_x}, {center_y})"),
            shape,
        )),
    }
}

/// Inclusive pixel rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelRect {
    pub left: usize,
    pub right: usize,
    pub top: usize,
    pub bottom: usize,
}

impl PixelRect {
    pub fn new(left: usize, right: usize, top: usize, bottom: usize) -> Self {
        Self {
            left,
            right,
            top,
            bottom,
        }
    }

    pub fn width(&self) -> usize {
        self.right - self.left + 1
    }

    pub fn height(&self) -> usize {
        self.bottom - self.top + 1
    }

    fn validate(&self, shape: PixelShape) -> Result<()> {
        if self.left > self.right || self.top > self.bottom {
            return Err(FrameError::InvalidParameter(format!(
                "inverted rectangle {self:?}"
            )));
        }
        if !shape.contains(self.right, self.bottom) {
            return Err(out_of_bounds(&format!("rectangle {self:?}"), shape));
        }
        Ok(())
    }
}

/// Extract the inclusive rectangle `[top..=bottom] x [left..=right]`
pub fn crop_rect(image: &Image, rect: PixelRect) -> Result<Image> {
    rect.validate(image.shape())?;
    Ok(image.slice(rect.top..rect.bottom + 1, rect.left..rect.right + 1))
}

/// [`crop_rect`] that also returns an updated copy of `header`.
///
/// The copy has `NAXIS1`/`NAXIS2` set to the cropped size and every tracked
/// feature translated by `(-left, -top)`.
pub fn crop_rect_with_header(
    image: &Image,
    rect: PixelRect,
    header: &Header,
    features: &[FeatureKey],
) -> Result<(Image, Header)> {
    let cropped = crop_rect(image, rect)?;
    let mut cropped_header =
        translate_feature_coordinates(header, features, rect.left as i64, rect.top as i64)?;
    set_dimensions(&mut cropped_header, cropped.shape());
    Ok((cropped, cropped_header))
}

/// Parameters of a magnified inset overlay
///
/// Center and radii tuples are `(row, column)`, the ndarray index order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InsetParams {
    pub center_x: usize,
    pub center_y: usize,
    /// Half-width of the source box; the box spans `center_x ± radius_x` inclusive
    pub radius_x: usize,
    pub radius_y: usize,
    /// Nearest-neighbour magnification factor
    pub scale: usize,
    pub border_value: f64,
    pub border_thickness: usize,
}

impl InsetParams {
    /// Inset around `center = (row, column)` with half-sizes `radii = (rows, columns)`
    pub fn new(center: (usize, usize), radii: (usize, usize)) -> Self {
        Self {
            center_y: center.0,
            center_x: center.1,
            radius_y: radii.0,
            radius_x: radii.1,
            scale: 4,
            border_value: f64::NAN,
            border_thickness: 2,
        }
    }

    pub fn with_scale(mut self, scale: usize) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_border(mut self, value: f64, thickness: usize) -> Self {
        self.border_value = value;
        self.border_thickness = thickness;
        self
    }
}

/// Half-open pixel ranges an inset touches
struct InsetLayout {
    box_rows: Range<usize>,
    box_cols: Range<usize>,
    inset_rows: Range<usize>,
    inset_cols: Range<usize>,
}

impl InsetLayout {
    fn plan(shape: PixelShape, params: &InsetParams) -> Result<Self> {
        if params.scale == 0 {
            return Err(FrameError::InvalidParameter(
                "inset scale must be at least 1".to_string(),
            ));
        }

        let left = params.center_x.checked_sub(params.radius_x);
        let top = params.center_y.checked_sub(params.radius_y);
        let right = params.center_x.checked_add(params.radius_x);
        let bottom = params.center_y.checked_add(params.radius_y);
        let (Some(left), Some(top), Some(right), Some(bottom)) = (left, top, right, bottom) else {
            return Err(out_of_bounds("inset source box", shape));
        };
        if !shape.contains(right, bottom) {
            return Err(out_of_bounds("inset source box", shape));
        }

        let inset_width = (right - left + 1).checked_mul(params.scale);
        let inset_height = (bottom - top + 1).checked_mul(params.scale);
        let (inset_width, inset_height) = match (inset_width, inset_height) {
            (Some(w), Some(h)) if w <= shape.width && h <= shape.height => (w, h),
            _ => {
                return Err(out_of_bounds(
                    &format!("inset magnified x{}", params.scale),
                    shape,
                ))
            }
        };

        let layout = Self {
            box_rows: top..bottom + 1,
            box_cols: left..right + 1,
            inset_rows: shape.height - inset_height..shape.height,
            inset_cols: shape.width - inset_width..shape.width,
        };
        if layout.box_rows.end > layout.inset_rows.start
            && layout.box_cols.end > layout.inset_cols.start
        {
            return Err(FrameError::OutOfBounds(format!(
                "{inset_width}x{inset_height} inset would cover its source box in image {shape}"
            )));
        }
        Ok(layout)
    }
}

fn fill(view: &mut ArrayViewMut3<'_, f64>, rows: Range<usize>, cols: Range<usize>, value: f64) {
    if rows.is_empty() || cols.is_empty() {
        return;
    }
    view.slice_mut(s![rows, cols, ..]).fill(value);
}

/// Overlay a magnified copy of a region onto the bottom-right corner, in place.
///
/// 1. The source box `center ± radii` (inclusive) is copied.
/// 2. A ring of `border_thickness` pixels around the box, corners included,
///    is painted with `border_value`; the box interior is untouched.
/// 3. The copy is magnified `scale` times by pixel replication and pasted
///    flush against the bottom-right corner.
/// 4. Bands of `border_thickness` pixels are painted along the top and left
///    edges of the inset. The block diagonal to the inset's top-left corner
///    is left as is.
///
/// Borders are clipped to the image. The source box must lie inside the
/// image and must not be covered by the inset.
pub fn crop_with_inset(image: &mut Image, params: &InsetParams) -> Result<()> {
    let shape = image.shape();
    let layout = InsetLayout::plan(shape, params)?;
    let scale = params.scale;
    let thickness = params.border_thickness;
    let value = params.border_value;

    let mut view = image.view3_mut();
    let source = view
        .slice(s![layout.box_rows.clone(), layout.box_cols.clone(), ..])
        .to_owned();

    // Ring around the source box
    let (rows, cols) = (&layout.box_rows, &layout.box_cols);
    let outer_rows = rows.start.saturating_sub(thickness)..(rows.end + thickness).min(shape.height);
    let outer_cols = cols.start.saturating_sub(thickness)..(cols.end + thickness).min(shape.width);
    fill(&mut view, outer_rows.start..rows.start, outer_cols.clone(), value);
    fill(&mut view, rows.end..outer_rows.end, outer_cols.clone(), value);
    fill(&mut view, rows.clone(), outer_cols.start..cols.start, value);
    fill(&mut view, rows.clone(), cols.end..outer_cols.end, value);

    let (source_rows, source_cols, channels) = source.dim();
    let inset = Array3::from_shape_fn(
        (source_rows * scale, source_cols * scale, channels),
        |(y, x, c)| source[[y / scale, x / scale, c]],
    );
    view.slice_mut(s![layout.inset_rows.clone(), layout.inset_cols.clone(), ..])
        .assign(&inset);

    let (rows, cols) = (&layout.inset_rows, &layout.inset_cols);
    fill(&mut view, rows.start.saturating_sub(thickness)..rows.start, cols.clone(), value);
    fill(&mut view, rows.clone(), cols.start.saturating_sub(thickness)..cols.start, value);

    debug!(
        "Inset {}x{} at ({}, {}) magnified x{} into {}",
        source_cols, source_rows, params.center_x, params.center_y, scale, shape
    );
    Ok(())
}

/// Copy-on-write form of [`crop_with_inset`]; `image` is left untouched
pub fn with_inset(image: &Image, params: &InsetParams) -> Result<Image> {
    let mut overlaid = image.clone();
    crop_with_inset(&mut overlaid, params)?;
    Ok(overlaid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::HeaderValue;
    use ndarray::Array2;

    fn ramp(width: usize, height: usize) -> Image {
        Image::Gray(Array2::from_shape_fn((height, width), |(y, x)| {
            (y * width + x) as f64
        }))
    }

    fn gray(image: &Image) -> &Array2<f64> {
        match image {
            Image::Gray(a) => a,
            Image::Color(_) => panic!("expected gray frame"),
        }
    }

    #[test]
    fn test_crop_centered_window() {
        let image = ramp(200, 200);
        let cropped = crop(&image, 50, 50, 100, 100).unwrap();
        assert_eq!(cropped.shape(), PixelShape::new(100, 100));
        assert_eq!(gray(&cropped)[[0, 0]], 0.0);

        let cropped = crop(&image, 100, 60, 10, 4).unwrap();
        assert_eq!(cropped.shape(), PixelShape::new(10, 4));
        assert_eq!(gray(&cropped)[[0, 0]], (58 * 200 + 95) as f64);
    }

    #[test]
    fn test_crop_odd_size_loses_one_pixel() {
        let cropped = crop(&ramp(20, 20), 10, 10, 5, 7).unwrap();
        assert_eq!(cropped.shape(), PixelShape::new(4, 6));
    }

    #[test]
    fn test_crop_out_of_bounds() {
        let image = ramp(100, 100);
        assert!(matches!(
            crop(&image, 10, 50, 40, 40),
            Err(FrameError::OutOfBounds(_))
        ));
        assert!(matches!(
            crop(&image, 50, 90, 40, 40),
            Err(FrameError::OutOfBounds(_))
        ));
        assert!(crop(&image, 50, 50, 100, 100).is_ok());
    }

    #[test]
    fn test_crop_huge_center_is_out_of_bounds() {
        let image = ramp(100, 100);
        assert!(matches!(
            crop(&image, usize::MAX, 50, 40, 40),
            Err(FrameError::OutOfBounds(_))
        ));
        assert!(matches!(
            crop(&image, 50, usize::MAX - 1, 40, 40),
            Err(FrameError::OutOfBounds(_))
        ));
    }

    #[test]
    fn test_crop_with_header_tracks_origin() {
        let header: Header = [("MOON-X", 60), ("MOON-Y", 70)].into_iter().collect();
        let features = [FeatureKey::named("moon")];

        let (cropped, cropped_header) =
            crop_with_header(&ramp(200, 200), 50, 50, 40, 20, &header, &features).unwrap();

        assert_eq!(cropped.shape(), PixelShape::new(40, 20));
        assert_eq!(cropped_header.get("MOON-X"), Some(&HeaderValue::Integer(30)));
        assert_eq!(cropped_header.get("MOON-Y"), Some(&HeaderValue::Integer(30)));
        assert_eq!(cropped_header.get("NAXIS1"), Some(&HeaderValue::Integer(40)));
    }

    #[test]
    fn test_crop_rect_is_inclusive() {
        let image = ramp(10, 8);
        let rect = PixelRect::new(2, 5, 1, 3);
        let cropped = crop_rect(&image, rect).unwrap();

        assert_eq!(cropped.shape(), PixelShape::new(4, 3));
        assert_eq!(gray(&cropped)[[0, 0]], 12.0);
        assert_eq!(gray(&cropped)[[2, 3]], 35.0);

        let single = crop_rect(&image, PixelRect::new(9, 9, 7, 7)).unwrap();
        assert_eq!(gray(&single)[[0, 0]], 79.0);
    }

    #[test]
    fn test_crop_rect_rejects_bad_rects() {
        let image = ramp(10, 8);
        assert!(matches!(
            crop_rect(&image, PixelRect::new(2, 10, 0, 1)),
            Err(FrameError::OutOfBounds(_))
        ));
        assert!(matches!(
            crop_rect(&image, PixelRect::new(5, 4, 0, 1)),
            Err(FrameError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_crop_rect_with_header() {
        let header: Header = [
            ("MOON-X", HeaderValue::from(120)),
            ("MOON-Y", HeaderValue::from(80)),
            ("SUN-X", HeaderValue::from(120)),
            ("SUN-Y", HeaderValue::from(80)),
            ("NAXIS1", HeaderValue::from(200)),
            ("NAXIS2", HeaderValue::from(150)),
        ]
        .into_iter()
        .collect();
        let rect = PixelRect::new(20, 139, 10, 99);

        let (cropped, cropped_header) = crop_rect_with_header(
            &ramp(200, 150),
            rect,
            &header,
            &crate::header::default_feature_keys(),
        )
        .unwrap();

        assert_eq!(cropped.shape(), PixelShape::new(120, 90));
        assert_eq!(cropped_header.get("NAXIS1"), Some(&HeaderValue::Integer(120)));
        assert_eq!(cropped_header.get("NAXIS2"), Some(&HeaderValue::Integer(90)));
        for (x, y) in [("MOON-X", "MOON-Y"), ("SUN-X", "SUN-Y")] {
            assert_eq!(cropped_header.get(x), Some(&HeaderValue::Integer(100)));
            assert_eq!(cropped_header.get(y), Some(&HeaderValue::Integer(70)));
        }
        assert_eq!(header.get("MOON-X"), Some(&HeaderValue::Integer(120)));
    }

    #[test]
    fn test_inset_layout() {
        let mut image = Image::Gray(Array2::zeros((40, 40)));
        if let Image::Gray(a) = &mut image {
            a.slice_mut(s![5..8, 5..8]).fill(1.0);
            a[[6, 6]] = 2.0;
        }
        let params = InsetParams::new((6, 6), (1, 1)).with_border(-1.0, 2);

        crop_with_inset(&mut image, &params).unwrap();
        let a = gray(&image);

        // Source box untouched, ring painted with corners
        assert_eq!(a[[6, 6]], 2.0);
        assert_eq!(a[[5, 5]], 1.0);
        assert_eq!(a[[3, 3]], -1.0);
        assert_eq!(a[[9, 9]], -1.0);
        assert_eq!(a[[4, 6]], -1.0);
        assert_eq!(a[[10, 10]], 0.0);

        // 3x3 box magnified x4 into rows/cols 28..40
        assert_eq!(a[[28, 28]], 1.0);
        assert_eq!(a[[32, 32]], 2.0);
        assert_eq!(a[[35, 35]], 2.0);
        assert_eq!(a[[36, 36]], 1.0);
        assert_eq!(a[[39, 39]], 1.0);

        // Top and left bands, corner block skipped
        assert_eq!(a[[26, 30]], -1.0);
        assert_eq!(a[[27, 39]], -1.0);
        assert_eq!(a[[30, 26]], -1.0);
        assert_eq!(a[[39, 27]], -1.0);
        assert_eq!(a[[26, 26]], 0.0);
        assert_eq!(a[[27, 27]], 0.0);
        assert_eq!(a[[25, 30]], 0.0);
    }

    #[test]
    fn test_inset_tuples_are_row_then_column() {
        let mut a = Array2::zeros((40, 60));
        a[[5, 20]] = 7.0;
        let mut image = Image::Gray(a);
        let params = InsetParams::new((5, 20), (1, 1))
            .with_scale(2)
            .with_border(-1.0, 1);
        assert_eq!((params.center_y, params.center_x), (5, 20));

        crop_with_inset(&mut image, &params).unwrap();
        let a = gray(&image);

        // Source box rows 4..=6, columns 19..=21; inset in rows 34..40, columns 54..60
        assert_eq!(a[[3, 20]], -1.0);
        assert_eq!(a[[5, 18]], -1.0);
        assert_eq!(a[[5, 20]], 7.0);
        assert_eq!(a[[20, 5]], 0.0);
        assert_eq!(a[[36, 56]], 7.0);
        assert_eq!(a[[37, 57]], 7.0);
        assert_eq!(a[[34, 54]], 0.0);
        assert_eq!(a.iter().filter(|&&v| v == 7.0).count(), 5);
    }

    #[test]
    fn test_inset_huge_geometry_is_rejected() {
        let mut image = ramp(20, 20);
        let original = image.clone();

        for params in [
            InsetParams::new((5, 5), (usize::MAX, 1)),
            InsetParams::new((usize::MAX, usize::MAX), (0, 0)),
            InsetParams::new((5, 5), (1, 1)).with_scale(usize::MAX),
        ] {
            assert!(matches!(
                crop_with_inset(&mut image, &params),
                Err(FrameError::OutOfBounds(_))
            ));
        }
        assert_eq!(image, original);
    }

    #[test]
    fn test_inset_border_clipped_at_edges() {
        let mut image = Image::Gray(Array2::ones((20, 20)));
        let params = InsetParams::new((1, 1), (1, 1)).with_scale(2).with_border(0.0, 3);

        crop_with_inset(&mut image, &params).unwrap();
        let a = gray(&image);
        assert_eq!(a[[0, 0]], 1.0);
        assert_eq!(a[[3, 0]], 0.0);
        assert_eq!(a[[5, 5]], 0.0);
        assert_eq!(a[[6, 6]], 1.0);
    }

    #[test]
    fn test_inset_nan_border_on_color() {
        let mut image = Image::Color(Array3::from_elem((30, 30, 3), 0.5));
        let params = InsetParams::new((5, 5), (2, 2)).with_scale(2);

        crop_with_inset(&mut image, &params).unwrap();
        match &image {
            Image::Color(a) => {
                assert!(a[[2, 5, 1]].is_nan());
                assert_eq!(a[[25, 25, 2]], 0.5);
                assert!(a[[19, 25, 0]].is_nan());
            }
            Image::Gray(_) => panic!("expected color frame"),
        }
    }

    #[test]
    fn test_inset_rejects_bad_geometry() {
        let mut image = ramp(20, 20);
        let original = image.clone();

        let outside = InsetParams::new((1, 10), (2, 2));
        assert!(matches!(
            crop_with_inset(&mut image, &outside),
            Err(FrameError::OutOfBounds(_))
        ));

        let too_large = InsetParams::new((5, 5), (2, 2)).with_scale(5);
        assert!(matches!(
            crop_with_inset(&mut image, &too_large),
            Err(FrameError::OutOfBounds(_))
        ));

        let overlapping = InsetParams::new((15, 15), (2, 2)).with_scale(2);
        assert!(matches!(
            crop_with_inset(&mut image, &overlapping),
            Err(FrameError::OutOfBounds(_))
        ));

        let zero_scale = InsetParams::new((5, 5), (1, 1)).with_scale(0);
        assert!(matches!(
            crop_with_inset(&mut image, &zero_scale),
            Err(FrameError::InvalidParameter(_))
        ));

        assert_eq!(image, original);
    }

    #[test]
    fn test_with_inset_leaves_input() {
        let image = ramp(30, 30);
        let overlaid = with_inset(&image, &InsetParams::new((4, 4), (1, 1))).unwrap();
        assert_eq!(image, ramp(30, 30));
        assert_ne!(gray(&overlaid)[[29, 29]], gray(&image)[[29, 29]]);
    }
}
