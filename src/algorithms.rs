//! # Algorithm Toolbox
//!
//! This module provides direct access to the pure algorithms behind the
//! analyzer. Use these to run a single step on your own data without going
//! through [`ActivityAnalyzer`](crate::ActivityAnalyzer) or the importer.
//!
//! ## Core Algorithms
//!
//! - **Best Efforts**: O(N) sliding window, with O(N²) reference searches
//! - **Zones**: Time spent in each zone by trapezoidal integration
//! - **Resampling**: Fixed-rate grid interpolation
//! - **Comparison**: Distance-aligned effort overlays
//!
//! ## Numeric Utilities
//!
//! - **Haversine Distance**: Great-circle distance between GPS points
//! - **Trapezoid**: Integral of a sampled signal
//! - **Running Max**: Strip negative jitter from cumulative distance
//!
//! # Example
//!
//! ```rust
//! use run_efforts::algorithms::{best_time_for_distance, best_time_for_distance_naive};
//!
//! let times = vec![0.0, 10.0, 20.0, 30.0, 40.0];
//! let distances = vec![0.0, 45.0, 100.0, 140.0, 200.0];
//!
//! let fast = best_time_for_distance(&times, &distances, 100.0).unwrap();
//! let slow = best_time_for_distance_naive(&times, &distances, 100.0).unwrap();
//! assert_eq!(fast.value, slow.value);
//! assert_eq!(fast.value, 20.0);
//! ```

// =============================================================================
// Core Types (re-exported from lib)
// =============================================================================

pub use crate::{
    Cadence, EffortTarget, EffortWindow, GpsPoint, Pace, Sample, TimeSeries, Zone, ZoneSet,
    ZoneTimeTable,
};

// =============================================================================
// Best-Effort Search
// =============================================================================

/// Fastest time over a target distance, sliding window.
///
/// `times` and `distances` must be parallel arrays with non-decreasing
/// distance. Returns `None` when the recording never covers the target.
pub use crate::efforts::best_time_for_distance;

/// Quadratic reference search for distance targets. Same result as
/// [`best_time_for_distance`] on monotonic distance.
pub use crate::efforts::best_time_for_distance_naive;

/// Farthest distance within a target duration, sliding window.
pub use crate::efforts::best_distance_for_duration;

/// Quadratic reference search for duration targets.
pub use crate::efforts::best_distance_for_duration_naive;

/// Index range and value of a best window.
pub use crate::efforts::WindowMatch;

/// Run every target over a series with the reference searches.
pub use crate::efforts::find_best_efforts_naive;

pub use crate::efforts::{STANDARD_DISTANCES, STANDARD_DURATIONS};

// =============================================================================
// Zones
// =============================================================================

/// Seconds spent in each zone of a signal sampled at `times`.
pub use crate::zones::time_in_zones;

pub use crate::zones::{HEART_RATE_ZONE_RATIOS, PACE_ZONE_RATIOS};

// =============================================================================
// Resampling
// =============================================================================

pub use crate::resample::{resample_to_fixed_rate, split_cadence};

// =============================================================================
// Comparison
// =============================================================================

pub use crate::compare::compare_efforts;

// =============================================================================
// Numeric and Geographic Utilities
// =============================================================================

/// Great-circle distance in meters.
pub use crate::records::haversine_distance;

pub use crate::numeric::{interpolate_sorted, running_max, trapezoid};

pub use crate::units::{
    format_duration, pace_to_speed, rpm_to_steps_per_minute, semicircles_to_degrees,
    speed_to_pace,
};
