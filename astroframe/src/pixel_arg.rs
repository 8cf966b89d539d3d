//! Type-safe pixel arguments for the command-line tools.
//!
//! Provides clap-compatible types for points (`"x,y"`) and inclusive
//! rectangles (`"left,right,top,bottom"`) with parsing, validation and
//! display formatting.

use crate::geometry::PixelRect;
use std::fmt;
use std::str::FromStr;

fn parse_components<const N: usize>(s: &str, names: [&str; N]) -> Result<[usize; N], String> {
    let parts: Vec<&str> = s.split(',').collect();
    if parts.len() != N {
        return Err(format!("Expected {} comma-separated values: {}", N, names.join(",")));
    }

    let mut values = [0usize; N];
    for ((value, part), name) in values.iter_mut().zip(parts).zip(names) {
        *value = part
            .trim()
            .parse::<usize>()
            .map_err(|_| format!("Invalid {name} value '{}'", part.trim()))?;
    }
    Ok(values)
}

/// Pixel position given as `"x,y"`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelPoint {
    pub x: usize,
    pub y: usize,
}

impl PixelPoint {
    /// `(row, column)`, the ndarray index order
    pub fn row_col(&self) -> (usize, usize) {
        (self.y, self.x)
    }
}

impl FromStr for PixelPoint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let [x, y] = parse_components(s, ["x", "y"])?;
        Ok(PixelPoint { x, y })
    }
}

impl fmt::Display for PixelPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

/// Parse `"left,right,top,bottom"`; both edges are inclusive and must not be inverted
impl FromStr for PixelRect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let [left, right, top, bottom] =
            parse_components(s, ["left", "right", "top", "bottom"])?;
        if left > right {
            return Err(format!("left ({left}) must not exceed right ({right})"));
        }
        if top > bottom {
            return Err(format!("top ({top}) must not exceed bottom ({bottom})"));
        }
        Ok(PixelRect::new(left, right, top, bottom))
    }
}

impl fmt::Display for PixelRect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.left, self.right, self.top, self.bottom)
    }
}
