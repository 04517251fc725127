//! Per-activity time series.
//!
//! A [`TimeSeries`] owns the samples of exactly one activity. It is validated
//! once at construction (at least two samples, strictly increasing elapsed
//! time) and never mutated: smoothing, slicing and resampling all return new
//! series.

use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::{EffortError, Result};
use crate::numeric::running_max;
use crate::units::speed_to_pace;
use crate::Sample;

/// Minimum number of samples a series must hold.
pub const MIN_SAMPLES: usize = 2;

/// Ordered samples of one activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Sample>", into = "Vec<Sample>")]
pub struct TimeSeries {
    samples: Vec<Sample>,
}

impl TryFrom<Vec<Sample>> for TimeSeries {
    type Error = EffortError;

    fn try_from(samples: Vec<Sample>) -> Result<Self> {
        TimeSeries::new(samples)
    }
}

impl From<TimeSeries> for Vec<Sample> {
    fn from(series: TimeSeries) -> Self {
        series.samples
    }
}

impl TimeSeries {
    /// Build a series, checking sample count and time ordering.
    pub fn new(samples: Vec<Sample>) -> Result<Self> {
        if samples.len() < MIN_SAMPLES {
            return Err(EffortError::InsufficientSamples {
                count: samples.len(),
                minimum: MIN_SAMPLES,
            });
        }
        for (i, pair) in samples.windows(2).enumerate() {
            let (previous, current) = (pair[0].elapsed_time, pair[1].elapsed_time);
            if !(current > previous) {
                return Err(EffortError::NonIncreasingTime {
                    index: i + 1,
                    previous,
                    current,
                });
            }
        }
        Ok(Self { samples })
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always false for a constructed series; provided for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn first(&self) -> &Sample {
        &self.samples[0]
    }

    pub fn last(&self) -> &Sample {
        &self.samples[self.samples.len() - 1]
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.first().timestamp
    }

    /// Elapsed seconds between the first and last sample.
    pub fn duration(&self) -> f64 {
        self.last().elapsed_time - self.first().elapsed_time
    }

    /// Distance between the first and last sample.
    pub fn distance_span(&self) -> f64 {
        self.last().distance - self.first().distance
    }

    pub fn elapsed_times(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.elapsed_time).collect()
    }

    pub fn distances(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.distance).collect()
    }

    pub fn heart_rates(&self) -> Vec<Option<f64>> {
        self.samples.iter().map(|s| s.heart_rate).collect()
    }

    /// Pace in seconds per km derived from the speed channel.
    pub fn paces(&self) -> Vec<Option<f64>> {
        self.samples
            .iter()
            .map(|s| s.speed.map(|v| speed_to_pace(v).seconds_per_km))
            .collect()
    }

    pub fn has_heart_rate(&self) -> bool {
        self.samples.iter().any(|s| s.heart_rate.is_some())
    }

    pub fn has_speed(&self) -> bool {
        self.samples.iter().any(|s| s.speed.is_some())
    }

    /// True when cumulative distance never decreases.
    pub fn is_distance_monotonic(&self) -> bool {
        self.samples
            .windows(2)
            .all(|w| w[1].distance >= w[0].distance)
    }

    /// Copy of the series with negative distance jitter removed (running
    /// maximum). Returns an identical copy when the series is already monotonic.
    pub fn with_monotonic_distance(&self) -> TimeSeries {
        if self.is_distance_monotonic() {
            return self.clone();
        }
        let smoothed = running_max(&self.distances());
        let corrected = self
            .samples
            .iter()
            .zip(smoothed.iter())
            .filter(|(s, d)| s.distance != **d)
            .count();
        warn!(
            "[Series] Corrected {} non-monotonic distance samples out of {}",
            corrected,
            self.samples.len()
        );
        let samples = self
            .samples
            .iter()
            .zip(smoothed)
            .map(|(s, distance)| Sample {
                distance,
                ..s.clone()
            })
            .collect();
        TimeSeries { samples }
    }

    /// Samples `start..=end` with distance and elapsed time rebased to zero.
    pub fn slice_rebased(&self, start: usize, end: usize) -> Result<TimeSeries> {
        if start >= end || end >= self.samples.len() {
            return Err(EffortError::InvalidParameter(format!(
                "window [{}, {}] is not a valid range for {} samples",
                start,
                end,
                self.samples.len()
            )));
        }
        let origin = &self.samples[start];
        let (d0, t0) = (origin.distance, origin.elapsed_time);
        let samples = self.samples[start..=end]
            .iter()
            .map(|s| Sample {
                distance: s.distance - d0,
                elapsed_time: s.elapsed_time - t0,
                ..s.clone()
            })
            .collect();
        TimeSeries::new(samples)
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn test_rejects_short_series() {
        let err = TimeSeries::new(vec![Sample::new(start(), 0.0, 0.0)]).unwrap_err();
        assert!(matches!(
            err,
            EffortError::InsufficientSamples { count: 1, minimum: 2 }
        ));
    }

    #[test]
    fn test_rejects_repeated_time() {
        let samples = vec![
            Sample::new(start(), 0.0, 0.0),
            Sample::new(start(), 1.0, 3.0),
            Sample::new(start(), 1.0, 6.0),
        ];
        assert!(matches!(
            TimeSeries::new(samples),
            Err(EffortError::NonIncreasingTime { index: 2, .. })
        ));
    }

    #[test]
    fn test_spans() {
        let series = series_from(&[10.0, 11.0, 15.0], &[100.0, 104.0, 130.0]);
        assert_eq!(series.duration(), 5.0);
        assert_eq!(series.distance_span(), 30.0);
        assert_eq!(series.len(), 3);
    }

    #[test]
    fn test_monotonic_distance() {
        let series = series_from(&[0.0, 1.0, 2.0, 3.0], &[0.0, 5.0, 4.5, 9.0]);
        assert!(!series.is_distance_monotonic());

        let fixed = series.with_monotonic_distance();
        assert!(fixed.is_distance_monotonic());
        assert_eq!(fixed.distances(), vec![0.0, 5.0, 5.0, 9.0]);
        // Original untouched
        assert_eq!(series.distances()[2], 4.5);
    }

    #[test]
    fn test_slice_rebased() {
        let series = steady_run(10, 4.0, 150.0);
        let slice = series.slice_rebased(2, 6).unwrap();
        assert_eq!(slice.len(), 5);
        assert_eq!(slice.first().distance, 0.0);
        assert_eq!(slice.first().elapsed_time, 0.0);
        assert_eq!(slice.last().distance, 16.0);
        assert_eq!(slice.last().elapsed_time, 4.0);
        assert_eq!(slice.last().heart_rate, Some(150.0));

        assert!(series.slice_rebased(6, 6).is_err());
        assert!(series.slice_rebased(2, 11).is_err());
    }

    #[test]
    fn test_paces_from_speed() {
        let series = steady_run(2, 4.0, 150.0);
        assert_eq!(series.paces(), vec![Some(250.0); 3]);
    }

    #[test]
    fn test_serde_validates() {
        let series = steady_run(3, 4.0, 140.0);
        let json = serde_json::to_string(&series).unwrap();
        let back: TimeSeries = serde_json::from_str(&json).unwrap();
        assert_eq!(back, series);

        assert!(serde_json::from_str::<TimeSeries>("[]").is_err());
    }
}
