//! Statistics over pixel buffers
//!
//! [`DifferenceReport`] compares two aligned buffers, [`PixelSummary`]
//! describes a single one. Both are built from a value histogram, so the
//! median never needs a sorted copy of the samples.

use std::collections::BTreeMap;
use std::fmt;

use crate::image_pipeline::common::error::{ConversionError, Result};
use crate::image_pipeline::raw::types::{PixelBuffer, Shape};

/// Distinct differences listed in full up to this many.
pub const MAX_LISTED_DIFFERENCES: usize = 10;
/// Side of the top-left sample region shown by [`PixelSummary`].
pub const CORNER_SIZE: usize = 5;

/// Value -> occurrence count, ascending by value.
type Histogram = BTreeMap<i64, u64>;

fn median(histogram: &Histogram, total: u64) -> f64 {
    let lower_rank = (total - 1) / 2;
    let upper_rank = total / 2;
    let mut lower = None;
    let mut seen = 0u64;

    for (&value, &count) in histogram {
        let next = seen + count;
        if lower.is_none() && lower_rank < next {
            lower = Some(value);
        }
        if upper_rank < next {
            let lower = lower.unwrap_or(value);
            return (lower + value) as f64 / 2.0;
        }
        seen = next;
    }
    0.0
}

fn mean(histogram: &Histogram, total: u64) -> f64 {
    let sum: i128 = histogram
        .iter()
        .map(|(&value, &count)| value as i128 * count as i128)
        .sum();
    sum as f64 / total as f64
}

fn require_samples(buffer: &PixelBuffer) -> Result<()> {
    if buffer.is_empty() {
        return Err(ConversionError::InvalidDimensions(buffer.width(), buffer.height()));
    }
    Ok(())
}

/// Summary of `second - first` over two buffers of the same shape.
#[derive(Debug, Clone, PartialEq)]
pub struct DifferenceReport {
    pub shape: Shape,
    pub min: i64,
    pub max: i64,
    pub mean: f64,
    pub median: f64,
    /// Samples whose difference is exactly -1
    pub minus_one_count: u64,
    pub total: u64,
    histogram: Histogram,
}

impl DifferenceReport {
    pub fn compute(first: &PixelBuffer, second: &PixelBuffer) -> Result<Self> {
        if first.shape() != second.shape() {
            return Err(ConversionError::DimensionMismatch {
                expected: first.shape(),
                found: second.shape(),
            });
        }
        require_samples(first)?;

        let mut histogram = Histogram::new();
        for (&a, &b) in first.data().iter().zip(second.data()) {
            *histogram.entry(b as i64 - a as i64).or_insert(0) += 1;
        }

        let total = first.data().len() as u64;
        let (&min, _) = histogram.first_key_value().ok_or_else(|| {
            ConversionError::InvalidDimensions(first.width(), first.height())
        })?;
        let (&max, _) = histogram.last_key_value().ok_or_else(|| {
            ConversionError::InvalidDimensions(first.width(), first.height())
        })?;

        Ok(Self {
            shape: first.shape(),
            min,
            max,
            mean: mean(&histogram, total),
            median: median(&histogram, total),
            minus_one_count: histogram.get(&-1).copied().unwrap_or(0),
            total,
            histogram,
        })
    }

    pub fn minus_one_percentage(&self) -> f64 {
        self.minus_one_count as f64 / self.total as f64 * 100.0
    }

    /// Every distinct difference, ascending.
    pub fn distinct_values(&self) -> impl Iterator<Item = i64> + '_ {
        self.histogram.keys().copied()
    }

    pub fn distinct_count(&self) -> usize {
        self.histogram.len()
    }

    /// How many samples differ by exactly `difference`.
    pub fn count_of(&self, difference: i64) -> u64 {
        self.histogram.get(&difference).copied().unwrap_or(0)
    }

    /// True when every sample went down by exactly one.
    pub fn is_uniform_decrement(&self) -> bool {
        self.minus_one_count == self.total
    }
}

impl fmt::Display for DifferenceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Pixel difference statistics ({}):", self.shape)?;
        writeln!(f, "  min:    {}", self.min)?;
        writeln!(f, "  max:    {}", self.max)?;
        writeln!(f, "  mean:   {:.2}", self.mean)?;
        writeln!(f, "  median: {:.2}", self.median)?;
        writeln!(
            f,
            "  samples at -1: {} / {} ({:.2}%)",
            self.minus_one_count,
            self.total,
            self.minus_one_percentage()
        )?;

        let listed: Vec<i64> = self.distinct_values().take(MAX_LISTED_DIFFERENCES).collect();
        if self.distinct_count() <= MAX_LISTED_DIFFERENCES {
            write!(f, "  distinct differences: {:?}", listed)
        } else {
            write!(
                f,
                "  first {} of {} distinct differences: {:?}",
                MAX_LISTED_DIFFERENCES,
                self.distinct_count(),
                listed
            )
        }
    }
}

/// Self-check statistics of one buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelSummary {
    pub shape: Shape,
    pub bits_per_sample: u32,
    pub min: u16,
    pub max: u16,
    pub mean: f64,
    pub median: f64,
    /// Population standard deviation
    pub std_dev: f64,
    /// Top-left region of the first channel
    pub corner: Vec<Vec<u16>>,
}

impl PixelSummary {
    pub fn compute(buffer: &PixelBuffer) -> Result<Self> {
        require_samples(buffer)?;

        let mut histogram = Histogram::new();
        for &value in buffer.data() {
            *histogram.entry(value as i64).or_insert(0) += 1;
        }
        let total = buffer.data().len() as u64;
        let mean = mean(&histogram, total);
        let variance = histogram
            .iter()
            .map(|(&value, &count)| (value as f64 - mean).powi(2) * count as f64)
            .sum::<f64>()
            / total as f64;
        let (min, max) = buffer
            .value_range()
            .ok_or_else(|| ConversionError::InvalidDimensions(buffer.width(), buffer.height()))?;

        Ok(Self {
            shape: buffer.shape(),
            bits_per_sample: buffer.bits_per_sample(),
            min,
            max,
            mean,
            median: median(&histogram, total),
            std_dev: variance.sqrt(),
            corner: buffer.corner(CORNER_SIZE, CORNER_SIZE),
        })
    }
}

impl fmt::Display for PixelSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  size:      {} ({} bit)", self.shape, self.bits_per_sample)?;
        writeln!(f, "  range:     {} - {}", self.min, self.max)?;
        writeln!(f, "  mean:      {:.2}", self.mean)?;
        writeln!(f, "  median:    {:.2}", self.median)?;
        writeln!(f, "  std dev:   {:.2}", self.std_dev)?;
        write!(f, "  top-left {}x{}:", CORNER_SIZE, CORNER_SIZE)?;
        for row in &self.corner {
            write!(f, "\n    {:?}", row)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer(width: usize, height: usize, data: Vec<u16>) -> PixelBuffer {
        PixelBuffer::from_samples(width, height, data).unwrap()
    }

    #[test]
    fn test_uniform_decrement() {
        let original = buffer(2, 2, vec![1, 2, 3, 4]);
        let modified = buffer(2, 2, vec![0, 1, 2, 3]);
        let report = DifferenceReport::compute(&original, &modified).unwrap();

        assert_eq!(report.min, -1);
        assert_eq!(report.max, -1);
        assert_eq!(report.mean, -1.0);
        assert_eq!(report.median, -1.0);
        assert_eq!(report.minus_one_percentage(), 100.0);
        assert!(report.is_uniform_decrement());
        assert_eq!(report.distinct_values().collect::<Vec<_>>(), vec![-1]);
    }

    #[test]
    fn test_zero_floor_scenario() {
        let original = buffer(3, 3, vec![1, 2, 3, 0, 5, 6, 7, 8, 9]);
        let modified = buffer(3, 3, vec![0, 1, 2, 0, 4, 5, 6, 7, 8]);
        let report = DifferenceReport::compute(&original, &modified).unwrap();

        assert_eq!(report.min, -1);
        assert_eq!(report.max, 0);
        assert_eq!(report.median, -1.0);
        assert!((report.mean - (-8.0 / 9.0)).abs() < 1e-12);
        assert_eq!(report.minus_one_count, 8);
        assert_eq!(report.count_of(0), 1);
        assert_eq!(report.total, 9);
        assert!((report.minus_one_percentage() - 88.888_888).abs() < 1e-3);
        assert!(!report.is_uniform_decrement());
        assert_eq!(report.distinct_values().collect::<Vec<_>>(), vec![-1, 0]);

        let text = report.to_string();
        assert!(text.contains("8 / 9 (88.89%)"));
        assert!(text.contains("distinct differences: [-1, 0]"));
    }

    #[test]
    fn test_even_count_median_averages_middle_values() {
        let original = buffer(4, 1, vec![10, 10, 10, 10]);
        let modified = buffer(4, 1, vec![7, 9, 10, 14]);
        let report = DifferenceReport::compute(&original, &modified).unwrap();

        // Differences -3, -1, 0, 4.
        assert_eq!(report.median, -0.5);
        assert_eq!(report.mean, 0.0);
    }

    #[test]
    fn test_many_distinct_differences_are_truncated_in_display() {
        let original = buffer(12, 1, vec![20; 12]);
        let modified = buffer(12, 1, (0..12).collect());
        let report = DifferenceReport::compute(&original, &modified).unwrap();

        assert_eq!(report.distinct_count(), 12);
        let text = report.to_string();
        assert!(text.contains("first 10 of 12 distinct differences"));
        assert!(text.contains("[-20, -19, -18, -17, -16, -15, -14, -13, -12, -11]"));
    }

    #[test]
    fn test_shape_mismatch_is_an_error() {
        let a = buffer(3, 2, vec![1; 6]);
        let b = buffer(2, 3, vec![1; 6]);

        let result = DifferenceReport::compute(&a, &b);
        assert!(matches!(result, Err(ConversionError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_empty_buffers_are_rejected() {
        let empty = buffer(0, 0, Vec::new());
        assert!(matches!(
            DifferenceReport::compute(&empty, &empty),
            Err(ConversionError::InvalidDimensions(0, 0))
        ));
        assert!(PixelSummary::compute(&empty).is_err());
    }

    #[test]
    fn test_summary_statistics() {
        let summary = PixelSummary::compute(&buffer(2, 2, vec![2, 4, 4, 6])).unwrap();

        assert_eq!(summary.min, 2);
        assert_eq!(summary.max, 6);
        assert_eq!(summary.mean, 4.0);
        assert_eq!(summary.median, 4.0);
        assert!((summary.std_dev - 2f64.sqrt()).abs() < 1e-12);
        assert_eq!(summary.corner, vec![vec![2, 4], vec![4, 6]]);
    }
}
