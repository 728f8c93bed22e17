//! Basic descriptive statistics of sample traces.

use std::ops::Range;

/// Arithmetic mean, `NaN` for an empty slice.
pub fn mean(data: &[f64]) -> f64 {
    data.iter().sum::<f64>() / data.len() as f64
}

/// Population standard deviation (no Bessel correction).
pub fn std(data: &[f64]) -> f64 {
    let m = mean(data);
    (data.iter().map(|x| (x - m).powi(2)).sum::<f64>() / data.len() as f64).sqrt()
}

/// Median, `None` for an empty slice.
pub fn median(data: &[f64]) -> Option<f64> {
    if data.is_empty() {
        return None;
    }
    let mut sorted = data.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let n = sorted.len();
    Some(if n % 2 == 1 {
        sorted[n / 2]
    } else {
        0.5 * (sorted[n / 2 - 1] + sorted[n / 2])
    })
}

/// Counts of integer values, one bin per integer.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    /// Value of the first bin.
    pub lo: i64,
    /// Count per bin.
    pub counts: Vec<u64>,
}

impl Histogram {
    /// Bins for every integer in `lo..hi`; values outside are dropped.
    pub fn unit_bins(data: impl IntoIterator<Item = i64>, lo: i64, hi: i64) -> Self {
        let mut counts = vec![0u64; (hi - lo).max(0) as usize];
        for v in data {
            if v >= lo && v < hi {
                counts[(v - lo) as usize] += 1;
            }
        }
        Self { lo, counts }
    }

    /// Largest bin count.
    pub fn max_count(&self) -> u64 {
        self.counts.iter().copied().max().unwrap_or(0)
    }

    /// Bins from the first to the last non-empty one.
    pub fn occupied(&self) -> Option<Range<usize>> {
        let first = self.counts.iter().position(|&n| n > 0)?;
        let last = self.counts.iter().rposition(|&n| n > 0)?;
        Some(first..last + 1)
    }

    /// `(value - shift, count)` pairs of the occupied bins.
    pub fn points(&self, shift: i64) -> Vec<(f64, f64)> {
        self.occupied()
            .map(|range| {
                range
                    .map(|k| ((self.lo + k as i64 - shift) as f64, self.counts[k] as f64))
                    .collect()
            })
            .unwrap_or_default()
    }
}
