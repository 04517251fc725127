//! Fixed-rate resampling of irregular recordings.
//!
//! Devices record at irregular intervals ("smart recording"). Resampling puts
//! every activity on the same `t0 + k * period` grid before comparison.

use chrono::Duration;
use log::debug;

use crate::error::{EffortError, Result};
use crate::numeric::{bracket_sorted, Bracket};
use crate::series::{TimeSeries, MIN_SAMPLES};
use crate::{Cadence, GpsPoint, Sample};

/// Resolution of the fractional cadence field (1/128 rpm).
pub const FRACTIONAL_CADENCE_STEPS: f64 = 128.0;

/// Resample `series` onto a fixed grid of `period` seconds.
///
/// The grid starts at the first sample and keeps every point not later than
/// the last sample. Continuous channels are linearly interpolated; an optional
/// channel is absent at a grid point when either bracketing sample lacks it,
/// unless the grid point falls exactly on a sample.
pub fn resample_to_fixed_rate(series: &TimeSeries, period: f64) -> Result<TimeSeries> {
    if !(period.is_finite() && period > 0.0) {
        return Err(EffortError::InvalidParameter(format!(
            "resample period must be positive and finite, got {}",
            period
        )));
    }

    let t0 = series.first().elapsed_time;
    // Tolerance so that a grid point landing on the last sample is kept
    let steps = (series.duration() / period + 1e-9).floor() as usize;
    if steps + 1 < MIN_SAMPLES {
        return Err(EffortError::InsufficientSamples {
            count: steps + 1,
            minimum: MIN_SAMPLES,
        });
    }
    let grid: Vec<f64> = (0..=steps).map(|k| t0 + k as f64 * period).collect();

    let samples = series.samples();
    let start = series.start_time();
    let brackets = bracket_sorted(&series.elapsed_times(), &grid);

    let resampled = brackets
        .iter()
        .zip(&grid)
        .map(|(b, &t)| {
            let (lo, hi) = (&samples[b.lower], &samples[b.upper]);
            let offset = Duration::try_milliseconds(((t - t0) * 1000.0).round() as i64)
                .ok_or_else(|| {
                    EffortError::InvalidParameter(format!("elapsed time {}s out of range", t))
                })?;
            Ok(Sample {
                timestamp: start + offset,
                elapsed_time: t,
                distance: b.lerp(lo.distance, hi.distance),
                speed: b.lerp_option(lo.speed, hi.speed),
                heart_rate: b.lerp_option(lo.heart_rate, hi.heart_rate),
                cadence: interpolate_cadence(b, lo.cadence, hi.cadence),
                altitude: b.lerp_option(lo.altitude, hi.altitude),
                position: interpolate_position(b, lo.position, hi.position),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    debug!(
        "[Resample] {} samples -> {} at {}s",
        series.len(),
        resampled.len(),
        period
    );

    TimeSeries::new(resampled)
}

fn interpolate_position(b: &Bracket, lo: Option<GpsPoint>, hi: Option<GpsPoint>) -> Option<GpsPoint> {
    let latitude = b.lerp_option(lo.map(|p| p.latitude), hi.map(|p| p.latitude))?;
    let longitude = b.lerp_option(lo.map(|p| p.longitude), hi.map(|p| p.longitude))?;
    Some(GpsPoint::new(latitude, longitude))
}

/// Interpolate cadence on its combined value, then split it back into whole
/// rpm and a fraction rounded to the recording resolution.
fn interpolate_cadence(b: &Bracket, lo: Option<Cadence>, hi: Option<Cadence>) -> Option<Cadence> {
    let combined = b.lerp_option(lo.map(|c| c.combined_rpm()), hi.map(|c| c.combined_rpm()))?;
    Some(split_cadence(combined))
}

/// Split a combined rpm value, carrying into the whole part when the rounded
/// fraction reaches one.
pub fn split_cadence(combined_rpm: f64) -> Cadence {
    let combined = combined_rpm.clamp(0.0, u8::MAX as f64);
    let mut rpm = combined.floor();
    let mut fractional =
        ((combined - rpm) * FRACTIONAL_CADENCE_STEPS).round() / FRACTIONAL_CADENCE_STEPS;
    if fractional >= 1.0 {
        rpm += 1.0;
        fractional = 0.0;
    }
    if rpm > u8::MAX as f64 {
        return Cadence::new(u8::MAX, 0.0);
    }
    Cadence::new(rpm as u8, fractional)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::test_support::{start, steady_run};

    #[test]
    fn test_grid_aligned_is_unchanged() {
        let series = steady_run(30, 3.7, 142.0);
        let resampled = resample_to_fixed_rate(&series, 1.0).unwrap();
        assert_eq!(resampled, series);
    }

    #[test]
    fn test_irregular_to_one_hertz() {
        let samples = vec![
            Sample::new(start(), 0.0, 0.0).with_heart_rate(100.0),
            Sample::new(start(), 2.0, 8.0).with_heart_rate(120.0),
            Sample::new(start(), 2.5, 10.0),
            Sample::new(start(), 5.5, 25.0).with_heart_rate(150.0),
        ];
        let series = TimeSeries::new(samples).unwrap();
        let resampled = resample_to_fixed_rate(&series, 1.0).unwrap();

        assert_eq!(resampled.elapsed_times(), vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
        let expected = [0.0, 4.0, 8.0, 12.5, 17.5, 22.5];
        for (got, want) in resampled.distances().iter().zip(expected) {
            assert!((got - want).abs() < 1e-9, "{} != {}", got, want);
        }
        // Heart rate missing on a neighbour stays missing
        assert_eq!(
            resampled.heart_rates(),
            vec![Some(100.0), Some(110.0), Some(120.0), None, None, None]
        );
        assert_eq!(
            resampled.last().timestamp,
            start() + Duration::seconds(5)
        );
    }

    #[test]
    fn test_coarser_period() {
        let series = steady_run(10, 2.0, 130.0);
        let resampled = resample_to_fixed_rate(&series, 3.0).unwrap();
        assert_eq!(resampled.elapsed_times(), vec![0.0, 3.0, 6.0, 9.0]);
        assert_eq!(resampled.last().distance, 18.0);
    }

    #[test]
    fn test_invalid_period() {
        let series = steady_run(10, 2.0, 130.0);
        for period in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                resample_to_fixed_rate(&series, period),
                Err(EffortError::InvalidParameter(_))
            ));
        }
    }

    #[test]
    fn test_period_longer_than_series() {
        let series = steady_run(10, 2.0, 130.0);
        assert!(matches!(
            resample_to_fixed_rate(&series, 11.0),
            Err(EffortError::InsufficientSamples { count: 1, .. })
        ));
    }

    #[test]
    fn test_cadence_carry() {
        let samples = vec![
            Sample::new(start(), 0.0, 0.0).with_cadence(Cadence::new(85, 127.0 / 128.0)),
            Sample::new(start(), 2.0, 6.0).with_cadence(Cadence::new(86, 0.0)),
        ];
        let series = TimeSeries::new(samples).unwrap();
        let resampled = resample_to_fixed_rate(&series, 1.0).unwrap();
        assert_eq!(resampled.samples()[1].cadence, Some(Cadence::new(86, 0.0)));
    }

    #[test]
    fn test_split_cadence() {
        assert_eq!(split_cadence(85.5), Cadence::new(85, 0.5));
        assert_eq!(split_cadence(85.3), Cadence::new(85, 38.0 / 128.0));
        assert_eq!(split_cadence(-2.0), Cadence::new(0, 0.0));
    }

    #[test]
    fn test_position_interpolated() {
        let samples = vec![
            Sample::new(start(), 0.0, 0.0).with_position(GpsPoint::new(45.0, 6.0)),
            Sample::new(start(), 2.0, 8.0).with_position(GpsPoint::new(45.002, 6.002)),
        ];
        let series = TimeSeries::new(samples).unwrap();
        let resampled = resample_to_fixed_rate(&series, 1.0).unwrap();
        let mid = resampled.samples()[1].position.unwrap();
        assert!((mid.latitude - 45.001).abs() < 1e-12);
        assert!((mid.longitude - 6.001).abs() < 1e-12);
    }
}
