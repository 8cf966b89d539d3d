//! NaN-aware reductions over frame samples.
//!
//! Frames routinely carry NaN sentinels (inset borders are painted with NaN
//! by default), so every reduction here skips NaN samples and reports how
//! many were seen instead of letting them poison the result.

use num_traits::Float;
use thiserror::Error;

/// Error types for sample reductions
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StatsError {
    #[error("No finite data: {total} samples, {nan} NaN")]
    NoData { total: usize, nan: usize },
}

/// Single-pass scan for the minimum and maximum non-NaN values
#[derive(Debug, Clone)]
pub struct MinMaxScan<T: Float> {
    min_value: Option<T>,
    max_value: Option<T>,
    total: usize,
    nan_count: usize,
}

impl<T: Float> MinMaxScan<T> {
    pub fn new<I>(data: I) -> Self
    where
        I: IntoIterator<Item = T>,
    {
        let mut scan = Self {
            min_value: None,
            max_value: None,
            total: 0,
            nan_count: 0,
        };

        for value in data {
            scan.total += 1;
            if value.is_nan() {
                scan.nan_count += 1;
                continue;
            }

            match (scan.min_value, scan.max_value) {
                (Some(min), Some(max)) => {
                    if value < min {
                        scan.min_value = Some(value);
                    }
                    if value > max {
                        scan.max_value = Some(value);
                    }
                }
                _ => {
                    scan.min_value = Some(value);
                    scan.max_value = Some(value);
                }
            }
        }

        scan
    }

    fn no_data(&self) -> StatsError {
        StatsError::NoData {
            total: self.total,
            nan: self.nan_count,
        }
    }

    pub fn min(&self) -> Result<T, StatsError> {
        self.min_value.ok_or_else(|| self.no_data())
    }

    pub fn max(&self) -> Result<T, StatsError> {
        self.max_value.ok_or_else(|| self.no_data())
    }

    pub fn min_max(&self) -> Result<(T, T), StatsError> {
        Ok((self.min()?, self.max()?))
    }

    pub fn has_nan(&self) -> bool {
        self.nan_count > 0
    }

    pub fn nan_count(&self) -> usize {
        self.nan_count
    }
}

/// Median of the non-NaN samples.
///
/// For even-length data, returns the average of the two middle values.
pub fn median<I>(values: I) -> Result<f64, StatsError>
where
    I: IntoIterator<Item = f64>,
{
    let mut total = 0;
    let mut valid: Vec<f64> = values
        .into_iter()
        .inspect(|_| total += 1)
        .filter(|v| !v.is_nan())
        .collect();

    if valid.is_empty() {
        return Err(StatsError::NoData { total, nan: total });
    }

    let len = valid.len();
    let mid = len / 2;
    let (lower, upper, _) = valid.select_nth_unstable_by(mid, f64::total_cmp);
    let upper = *upper;

    if len % 2 == 0 {
        let lower_max = lower.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Ok((lower_max + upper) / 2.0)
    } else {
        Ok(upper)
    }
}
