//! Side-by-side comparison of effort segments.
//!
//! Efforts of different activities are sampled at different instants, so they
//! are first aligned on a common distance grid. Each effort then gets elapsed
//! time, speed, heart rate and altitude at every grid distance, plus the time
//! gap to a baseline effort.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{EffortError, Result};
use crate::numeric::{bracket_sorted, running_max};
use crate::series::TimeSeries;
use crate::units::format_duration;

/// Default grid spacing in meters.
pub const DEFAULT_STEP_METERS: f64 = 1.0;

/// One effort interpolated on the comparison grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignedEffort {
    pub name: String,
    /// Elapsed seconds at each grid distance
    pub time: Vec<f64>,
    pub speed: Vec<Option<f64>>,
    pub heart_rate: Vec<Option<f64>>,
    pub altitude: Vec<Option<f64>>,
    /// Seconds behind (positive) or ahead of (negative) the baseline
    pub time_delta: Vec<f64>,
}

impl AlignedEffort {
    pub fn final_time(&self) -> f64 {
        self.time.last().copied().unwrap_or(f64::NAN)
    }

    pub fn final_delta(&self) -> f64 {
        self.time_delta.last().copied().unwrap_or(f64::NAN)
    }
}

/// Efforts aligned on a shared distance grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffortComparison {
    /// Grid distances in meters, from 0 to the shortest effort's distance
    pub distance: Vec<f64>,
    pub efforts: Vec<AlignedEffort>,
    /// Index of the baseline effort
    pub baseline: usize,
}

impl EffortComparison {
    /// Legend labels such as `"Tuesday - 4:10 (+0:05)"`, with `(baseline)` for
    /// the baseline effort.
    pub fn labels(&self) -> Vec<String> {
        self.efforts
            .iter()
            .enumerate()
            .map(|(i, effort)| {
                let gap = if i == self.baseline {
                    "baseline".to_string()
                } else {
                    let delta = effort.final_delta().round();
                    let sign = if delta > 0.0 { "+" } else { "" };
                    format!("{}{}", sign, format_duration(delta))
                };
                format!(
                    "{} - {} ({})",
                    effort.name,
                    format_duration(effort.final_time()),
                    gap
                )
            })
            .collect()
    }
}

/// Align effort segments on a distance grid with `step_m` spacing.
///
/// Segments are rebased to start at zero distance and time. The grid runs
/// from 0 to the shortest segment's distance, which is always included as the
/// last point.
pub fn compare_efforts(
    segments: &[(&str, &TimeSeries)],
    baseline: usize,
    step_m: f64,
) -> Result<EffortComparison> {
    if segments.is_empty() {
        return Err(EffortError::InvalidParameter(
            "no efforts to compare".to_string(),
        ));
    }
    if baseline >= segments.len() {
        return Err(EffortError::InvalidParameter(format!(
            "baseline {} out of range for {} efforts",
            baseline,
            segments.len()
        )));
    }
    if !(step_m.is_finite() && step_m > 0.0) {
        return Err(EffortError::InvalidParameter(format!(
            "grid step must be positive, got {}",
            step_m
        )));
    }

    let end = segments
        .iter()
        .map(|(_, s)| s.distance_span())
        .fold(f64::INFINITY, f64::min);
    if !(end > 0.0) {
        return Err(EffortError::InvalidParameter(
            "efforts must cover a positive distance".to_string(),
        ));
    }

    let mut grid: Vec<f64> = (0..)
        .map(|k| k as f64 * step_m)
        .take_while(|&d| d < end)
        .collect();
    grid.push(end);

    let mut efforts: Vec<AlignedEffort> = segments
        .iter()
        .map(|(name, series)| align(name, series, &grid))
        .collect();

    let baseline_time = efforts[baseline].time.clone();
    for effort in &mut efforts {
        effort.time_delta = effort
            .time
            .iter()
            .zip(&baseline_time)
            .map(|(t, base)| t - base)
            .collect();
    }

    debug!(
        "[Compare] Aligned {} efforts over {:.0}m ({} points)",
        efforts.len(),
        end,
        grid.len()
    );

    Ok(EffortComparison {
        distance: grid,
        efforts,
        baseline,
    })
}

fn align(name: &str, series: &TimeSeries, grid: &[f64]) -> AlignedEffort {
    let samples = series.samples();
    let (d0, t0) = (series.first().distance, series.first().elapsed_time);
    let axis = running_max(&series.distances().iter().map(|d| d - d0).collect::<Vec<_>>());

    let brackets = bracket_sorted(&axis, grid);
    let mut aligned = AlignedEffort {
        name: name.to_string(),
        time: Vec::with_capacity(grid.len()),
        speed: Vec::with_capacity(grid.len()),
        heart_rate: Vec::with_capacity(grid.len()),
        altitude: Vec::with_capacity(grid.len()),
        time_delta: Vec::new(),
    };
    for b in &brackets {
        let (lo, hi) = (&samples[b.lower], &samples[b.upper]);
        aligned.time.push(b.lerp(lo.elapsed_time, hi.elapsed_time) - t0);
        aligned.speed.push(b.lerp_option(lo.speed, hi.speed));
        aligned.heart_rate.push(b.lerp_option(lo.heart_rate, hi.heart_rate));
        aligned.altitude.push(b.lerp_option(lo.altitude, hi.altitude));
    }
    aligned
}
