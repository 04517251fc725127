//! Small numeric helpers shared by the zone, effort and resampling code.

/// Position of a query point between two samples of a sorted axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bracket {
    pub lower: usize,
    pub upper: usize,
    /// Fraction of the way from `lower` to `upper`, in [0, 1]
    pub frac: f64,
}

impl Bracket {
    /// Interpolate between two values at this bracket's fraction. Exact at
    /// both ends of the interval.
    pub fn lerp(&self, a: f64, b: f64) -> f64 {
        a * (1.0 - self.frac) + b * self.frac
    }

    /// Interpolate optional values. At an interval end only that end's value
    /// is needed; inside the interval both must be present.
    pub fn lerp_option(&self, a: Option<f64>, b: Option<f64>) -> Option<f64> {
        if self.frac <= 0.0 {
            return a;
        }
        if self.frac >= 1.0 {
            return b;
        }
        Some(self.lerp(a?, b?))
    }
}

/// Integrate `y` over `x` with the trapezoidal rule.
///
/// Lengths must match; extra trailing values in the longer slice are ignored.
pub fn trapezoid(x: &[f64], y: &[f64]) -> f64 {
    x.windows(2)
        .zip(y.windows(2))
        .map(|(xw, yw)| (xw[1] - xw[0]) * (yw[0] + yw[1]) * 0.5)
        .sum()
}

/// Locate each query on a non-decreasing axis.
///
/// Queries must be ascending; the scan is a single forward pass. Queries
/// outside the axis clamp to the first or last interval.
pub fn bracket_sorted(axis: &[f64], queries: &[f64]) -> Vec<Bracket> {
    if axis.is_empty() {
        return Vec::new();
    }
    let last = axis.len() - 1;
    let mut idx = 0usize;
    queries
        .iter()
        .map(|&q| {
            while idx + 1 < last && axis[idx + 1] < q {
                idx += 1;
            }
            if last == 0 {
                return Bracket {
                    lower: 0,
                    upper: 0,
                    frac: 0.0,
                };
            }
            // The final interval ends exactly at the query when q hits the last sample
            let (x0, x1) = (axis[idx], axis[idx + 1]);
            let frac = if (x1 - x0).abs() > f64::EPSILON {
                ((q - x0) / (x1 - x0)).clamp(0.0, 1.0)
            } else {
                0.0
            };
            Bracket {
                lower: idx,
                upper: idx + 1,
                frac,
            }
        })
        .collect()
}

/// Linear interpolation of `values` (sampled on `axis`) at ascending queries.
pub fn interpolate_sorted(axis: &[f64], values: &[f64], queries: &[f64]) -> Vec<f64> {
    bracket_sorted(axis, queries)
        .into_iter()
        .map(|b| b.lerp(values[b.lower], values[b.upper]))
        .collect()
}

/// Running maximum, used to strip negative jitter from cumulative signals.
pub fn running_max(values: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    let mut current = f64::NEG_INFINITY;
    for &v in values {
        if v > current {
            current = v;
        }
        out.push(current);
    }
    out
}
