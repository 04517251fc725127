//! # Run Efforts
//!
//! Best-effort search and per-activity metrics for running recordings.
//!
//! This library provides:
//! - Best-effort search: fastest time over target distances and farthest
//!   distance over target durations, using an O(N) sliding window
//! - Time-in-zone accumulation for heart rate and pace
//! - Fixed-rate resampling of irregular recordings
//! - Flat per-activity metrics and cross-activity period bests
//!
//! ## Features
//!
//! - **`parallel`** - Enable parallel batch import with rayon
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::DateTime;
//! use run_efforts::{find_best_efforts, EffortTarget, Sample, TimeSeries};
//!
//! let start = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
//! let samples: Vec<Sample> = (0..=100)
//!     .map(|i| Sample::new(start, i as f64, 4.0 * i as f64))
//!     .collect();
//! let series = TimeSeries::new(samples).unwrap();
//!
//! let efforts = find_best_efforts(&series, &[EffortTarget::distance("400m", 400.0)]);
//! let best = efforts.get("400m").unwrap();
//! assert_eq!(best.value(), Some(100.0));
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{EffortError, OptionExt, Result};

// Unit conversions (semicircles, cadence, pace)
pub mod units;
pub use units::{pace_to_speed, speed_to_pace, Pace};

// Integration and interpolation helpers
pub mod numeric;

// Validated per-activity time series
pub mod series;
pub use series::TimeSeries;

// Decoded input model and conversion into a time series
pub mod records;
pub use records::{DecodedActivity, DecodedRecord, LapSummary, SessionSummary, SportInfo};

// Fixed-rate resampling
pub mod resample;
pub use resample::resample_to_fixed_rate;

// Best-effort search engine
pub mod efforts;
pub use efforts::{
    extract_effort_segment, find_best_efforts, BestEfforts, EffortResult, EffortTarget,
    EffortWindow, DEFAULT_TARGETS,
};

// Time-in-zone accumulation
pub mod zones;
pub use zones::{time_in_zones, Zone, ZoneSet, ZoneTimeTable};

// Flat per-activity metrics
pub mod metrics;
pub use metrics::{aggregate, ActivityMetrics, FlatMetrics, MetricValue, ZoneTimes};

// Analysis configuration
pub mod config;
pub use config::AnalysisConfig;

// Per-activity pipeline
pub mod analyzer;
pub use analyzer::{classify, ActivityAnalysis, ActivityAnalyzer, ActivityKind};

// Cross-activity queries
pub mod history;
pub use history::{EffortHistory, PeriodBest};

// Batch import with injected file listing and decoding
pub mod importer;
pub use importer::{
    ActivityDecoder, DirectoryLister, FileLister, ImportReport, ImportedActivity, Importer,
    JsonDecoder,
};

// Effort comparison alignment
pub mod compare;
pub use compare::{compare_efforts, AlignedEffort, EffortComparison};

// Algorithm toolbox - flat access to the pure algorithms
pub mod algorithms;

// ============================================================================
// Core Types
// ============================================================================

/// A GPS coordinate in degrees.
///
/// # Example
/// ```
/// use run_efforts::GpsPoint;
/// let point = GpsPoint::new(51.5074, -0.1278); // London
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsPoint {
    /// Create a new GPS point.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

/// Running cadence as recorded: whole leg revolutions per minute plus a
/// fractional part in [0, 1).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cadence {
    pub rpm: u8,
    pub fractional: f64,
}

impl Cadence {
    pub fn new(rpm: u8, fractional: f64) -> Self {
        Self { rpm, fractional }
    }

    /// Revolutions per minute as one continuous value.
    pub fn combined_rpm(&self) -> f64 {
        self.rpm as f64 + self.fractional
    }

    /// Steps per minute (two steps per revolution).
    pub fn steps_per_minute(&self) -> f64 {
        units::rpm_to_steps_per_minute(self.rpm as f64, self.fractional)
    }
}

/// One row of an activity time series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Absolute instant of the sample
    pub timestamp: DateTime<Utc>,
    /// Seconds since the first sample
    pub elapsed_time: f64,
    /// Cumulative distance in meters
    pub distance: f64,
    /// Speed in m/s
    pub speed: Option<f64>,
    /// Heart rate in bpm
    pub heart_rate: Option<f64>,
    pub cadence: Option<Cadence>,
    /// Altitude in meters
    pub altitude: Option<f64>,
    pub position: Option<GpsPoint>,
}

impl Sample {
    /// Sample with only time and distance; optional channels are empty.
    pub fn new(timestamp: DateTime<Utc>, elapsed_time: f64, distance: f64) -> Self {
        Self {
            timestamp,
            elapsed_time,
            distance,
            speed: None,
            heart_rate: None,
            cadence: None,
            altitude: None,
            position: None,
        }
    }

    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = Some(speed);
        self
    }

    pub fn with_heart_rate(mut self, heart_rate: f64) -> Self {
        self.heart_rate = Some(heart_rate);
        self
    }

    pub fn with_cadence(mut self, cadence: Cadence) -> Self {
        self.cadence = Some(cadence);
        self
    }

    pub fn with_altitude(mut self, altitude: f64) -> Self {
        self.altitude = Some(altitude);
        self
    }

    pub fn with_position(mut self, position: GpsPoint) -> Self {
        self.position = Some(position);
        self
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gps_point_validation() {
        assert!(GpsPoint::new(51.5074, -0.1278).is_valid());
        assert!(!GpsPoint::new(91.0, 0.0).is_valid());
        assert!(!GpsPoint::new(0.0, 181.0).is_valid());
        assert!(!GpsPoint::new(f64::NAN, 0.0).is_valid());
    }

    #[test]
    fn test_cadence_steps() {
        let cadence = Cadence::new(85, 0.5);
        assert_eq!(cadence.combined_rpm(), 85.5);
        assert_eq!(cadence.steps_per_minute(), 171.0);
    }

    #[test]
    fn test_sample_builder() {
        let ts = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let sample = Sample::new(ts, 1.0, 4.0)
            .with_heart_rate(150.0)
            .with_altitude(12.5);
        assert_eq!(sample.heart_rate, Some(150.0));
        assert_eq!(sample.altitude, Some(12.5));
        assert!(sample.speed.is_none());
    }
}
