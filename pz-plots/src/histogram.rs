//! Fixed-width binning of column values.

/// Counts of values falling into equal-width bins over `[min, max]`.
///
/// The last bin is closed on the right so the maximum value is counted.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    min: f64,
    max: f64,
    counts: Vec<u64>,
}

impl Histogram {
    /// Bin the finite values over their own range.
    ///
    /// Returns `None` when there are no finite values or `bins` is zero.
    pub fn new(values: &[f64], bins: usize) -> Option<Self> {
        let range = finite_range(values)?;
        Self::with_range(values, bins, range)
    }

    /// Bin the finite values over a given range; values outside it are dropped.
    pub fn with_range(values: &[f64], bins: usize, (min, max): (f64, f64)) -> Option<Self> {
        if bins == 0 || !min.is_finite() || !max.is_finite() || max < min {
            return None;
        }
        // A single distinct value still gets a visible bar
        let (min, max) = if max == min {
            (min - 0.5, max + 0.5)
        } else {
            (min, max)
        };

        let width = (max - min) / bins as f64;
        let mut counts = vec![0u64; bins];
        for &value in values.iter().filter(|v| v.is_finite()) {
            if value < min || value > max {
                continue;
            }
            let index = (((value - min) / width) as usize).min(bins - 1);
            counts[index] += 1;
        }
        Some(Self { min, max, counts })
    }

    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    pub fn range(&self) -> (f64, f64) {
        (self.min, self.max)
    }

    pub fn bin_width(&self) -> f64 {
        (self.max - self.min) / self.counts.len() as f64
    }

    /// Bins as `(left edge, right edge, count)`.
    pub fn bins(&self) -> impl Iterator<Item = (f64, f64, u64)> + '_ {
        let width = self.bin_width();
        self.counts.iter().enumerate().map(move |(i, &count)| {
            let left = self.min + i as f64 * width;
            (left, left + width, count)
        })
    }

    pub fn max_count(&self) -> u64 {
        self.counts.iter().copied().max().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }
}

/// Min and max over the finite values, `None` if there are none.
pub fn finite_range(values: &[f64]) -> Option<(f64, f64)> {
    values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(None, |range, v| match range {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

/// Range covering both inputs.
pub(crate) fn union_range(a: Option<(f64, f64)>, b: Option<(f64, f64)>) -> Option<(f64, f64)> {
    match (a, b) {
        (Some((a_lo, a_hi)), Some((b_lo, b_hi))) => Some((a_lo.min(b_lo), a_hi.max(b_hi))),
        (a, b) => a.or(b),
    }
}

/// Range widened by `fraction` of its span on both sides, or by 0.5 when degenerate.
pub(crate) fn padded((min, max): (f64, f64), fraction: f64) -> (f64, f64) {
    let pad = if max > min {
        (max - min) * fraction
    } else {
        0.5
    };
    (min - pad, max + pad)
}
