//! Decoded activity input.
//!
//! A decoder collaborator hands over record, session, lap and sport messages
//! with raw recording units (semicircles, leg RPM). These structs mirror those
//! messages; every field is optional because devices omit whatever they do
//! not measure. [`DecodedActivity::to_time_series`] converts the record
//! messages into a validated [`TimeSeries`].

use chrono::{DateTime, Duration, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::{EffortError, Result};
use crate::series::TimeSeries;
use crate::units::{rpm_to_steps_per_minute, semicircles_to_degrees, speed_to_pace, Pace};
use crate::{Cadence, GpsPoint, Sample};

// ============================================================================
// Message Types
// ============================================================================

/// One per-sample record message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodedRecord {
    pub timestamp: Option<DateTime<Utc>>,
    /// Cumulative distance in meters
    pub distance: Option<f64>,
    /// Speed in m/s
    pub speed: Option<f64>,
    pub heart_rate: Option<f64>,
    /// Leg revolutions per minute
    pub cadence: Option<u8>,
    pub fractional_cadence: Option<f64>,
    /// Latitude in semicircles
    pub position_lat: Option<i32>,
    /// Longitude in semicircles
    pub position_long: Option<i32>,
    pub altitude: Option<f64>,
}

impl DecodedRecord {
    /// Position in degrees when both coordinates are present and valid.
    pub fn position(&self) -> Option<GpsPoint> {
        position_from_semicircles(self.position_lat, self.position_long)
    }

    pub fn cadence(&self) -> Option<Cadence> {
        self.cadence
            .map(|rpm| Cadence::new(rpm, self.fractional_cadence.unwrap_or(0.0)))
    }
}

/// Whole-activity summary message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSummary {
    pub start_time: Option<DateTime<Utc>>,
    /// Timer time, pauses excluded
    pub total_timer_time: Option<f64>,
    /// Wall-clock time, pauses included
    pub total_elapsed_time: Option<f64>,
    pub total_distance: Option<f64>,
    pub total_calories: Option<f64>,
    pub avg_speed: Option<f64>,
    pub max_speed: Option<f64>,
    pub total_ascent: Option<f64>,
    pub total_descent: Option<f64>,
    pub avg_cadence: Option<u8>,
    pub avg_fractional_cadence: Option<f64>,
    pub max_cadence: Option<u8>,
    pub max_fractional_cadence: Option<f64>,
    pub num_laps: Option<u32>,
    pub avg_heart_rate: Option<f64>,
    pub max_heart_rate: Option<f64>,
    pub start_position_lat: Option<i32>,
    pub start_position_long: Option<i32>,
}

impl SessionSummary {
    pub fn avg_pace(&self) -> Option<Pace> {
        self.avg_speed.map(speed_to_pace)
    }

    pub fn max_pace(&self) -> Option<Pace> {
        self.max_speed.map(speed_to_pace)
    }

    pub fn avg_cadence_spm(&self) -> Option<f64> {
        cadence_spm(self.avg_cadence, self.avg_fractional_cadence)
    }

    pub fn max_cadence_spm(&self) -> Option<f64> {
        cadence_spm(self.max_cadence, self.max_fractional_cadence)
    }

    pub fn start_position(&self) -> Option<GpsPoint> {
        position_from_semicircles(self.start_position_lat, self.start_position_long)
    }

    /// Start time plus total elapsed time.
    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        let start = self.start_time?;
        let elapsed = Duration::try_milliseconds((self.total_elapsed_time? * 1000.0).round() as i64)?;
        start.checked_add_signed(elapsed)
    }
}

/// Per-lap summary message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LapSummary {
    pub start_time: Option<DateTime<Utc>>,
    pub total_timer_time: Option<f64>,
    pub total_elapsed_time: Option<f64>,
    pub total_distance: Option<f64>,
    pub avg_speed: Option<f64>,
    pub max_speed: Option<f64>,
    pub avg_heart_rate: Option<f64>,
    pub max_heart_rate: Option<f64>,
    pub avg_cadence: Option<u8>,
    pub avg_fractional_cadence: Option<f64>,
    pub max_cadence: Option<u8>,
    pub max_fractional_cadence: Option<f64>,
    pub start_position_lat: Option<i32>,
    pub start_position_long: Option<i32>,
    pub end_position_lat: Option<i32>,
    pub end_position_long: Option<i32>,
}

impl LapSummary {
    pub fn avg_pace(&self) -> Option<Pace> {
        self.avg_speed.map(speed_to_pace)
    }

    pub fn max_pace(&self) -> Option<Pace> {
        self.max_speed.map(speed_to_pace)
    }

    pub fn avg_cadence_spm(&self) -> Option<f64> {
        cadence_spm(self.avg_cadence, self.avg_fractional_cadence)
    }

    pub fn max_cadence_spm(&self) -> Option<f64> {
        cadence_spm(self.max_cadence, self.max_fractional_cadence)
    }

    pub fn start_position(&self) -> Option<GpsPoint> {
        position_from_semicircles(self.start_position_lat, self.start_position_long)
    }

    pub fn end_position(&self) -> Option<GpsPoint> {
        position_from_semicircles(self.end_position_lat, self.end_position_long)
    }
}

/// Sport message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SportInfo {
    /// User-facing profile name, e.g. "Run"
    pub name: Option<String>,
    /// Sport family, e.g. "running"
    pub sport: Option<String>,
    pub sub_sport: Option<String>,
}

impl SportInfo {
    pub fn new(sport: &str) -> Self {
        Self {
            sport: Some(sport.to_string()),
            ..Default::default()
        }
    }

    /// True when the sport family contains `family` (case-insensitive), so
    /// "trail_running" matches "running".
    pub fn is_sport(&self, family: &str) -> bool {
        self.sport
            .as_deref()
            .map(|s| s.to_ascii_lowercase().contains(&family.to_ascii_lowercase()))
            .unwrap_or(false)
    }
}

/// Everything the decoder extracted from one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodedActivity {
    /// File type declared by the container ("activity", "settings", ...)
    pub file_type: Option<String>,
    pub records: Vec<DecodedRecord>,
    pub session: Option<SessionSummary>,
    pub laps: Vec<LapSummary>,
    pub sport: Option<SportInfo>,
}

impl Default for DecodedActivity {
    fn default() -> Self {
        Self {
            file_type: Some("activity".to_string()),
            records: Vec::new(),
            session: None,
            laps: Vec::new(),
            sport: None,
        }
    }
}

impl DecodedActivity {
    /// Convert record messages into a time series.
    ///
    /// Records without a timestamp, or whose elapsed time (microsecond
    /// resolution) is not later than the previous kept record, are dropped.
    /// Cumulative distance comes from the distance field when the recording
    /// has one (gaps carry the last value forward) and is otherwise summed
    /// from GPS positions.
    pub fn to_time_series(&self) -> Result<TimeSeries> {
        let start = self.records.iter().find_map(|r| r.timestamp);

        let mut kept: Vec<(&DecodedRecord, DateTime<Utc>, f64)> =
            Vec::with_capacity(self.records.len());
        if let Some(start) = start {
            for record in &self.records {
                let Some(ts) = record.timestamp else {
                    continue;
                };
                let elapsed = elapsed_seconds(start, ts);
                if kept.last().map_or(elapsed >= 0.0, |&(_, _, prev)| elapsed > prev) {
                    kept.push((record, ts, elapsed));
                }
            }
        }

        let dropped = self.records.len() - kept.len();
        if dropped > 0 {
            warn!(
                "[Records] Dropped {} of {} records without a usable timestamp",
                dropped,
                self.records.len()
            );
        }

        if kept.is_empty() {
            return Err(EffortError::InsufficientSamples {
                count: 0,
                minimum: crate::series::MIN_SAMPLES,
            });
        }

        let records: Vec<&DecodedRecord> = kept.iter().map(|(r, _, _)| *r).collect();
        let distances = cumulative_distances(&records)?;

        let samples = kept
            .iter()
            .zip(distances)
            .map(|(&(record, ts, elapsed), distance)| {
                Sample {
                    timestamp: ts,
                    elapsed_time: elapsed,
                    distance,
                    speed: record.speed,
                    heart_rate: record.heart_rate,
                    cadence: record.cadence(),
                    altitude: record.altitude,
                    position: record.position(),
                }
            })
            .collect();

        TimeSeries::new(samples)
    }
}

/// Seconds from `start` to `ts`, at microsecond resolution.
fn elapsed_seconds(start: DateTime<Utc>, ts: DateTime<Utc>) -> f64 {
    let delta = ts - start;
    match delta.num_microseconds() {
        Some(us) => us as f64 / 1e6,
        None => delta.num_milliseconds() as f64 / 1e3,
    }
}

fn cumulative_distances(records: &[&DecodedRecord]) -> Result<Vec<f64>> {
    if records.iter().any(|r| r.distance.is_some()) {
        let mut last = 0.0;
        return Ok(records
            .iter()
            .map(|r| {
                if let Some(d) = r.distance {
                    last = d;
                }
                last
            })
            .collect());
    }

    if records.iter().any(|r| r.position().is_some()) {
        debug!("[Records] No distance field, summing GPS positions");
        let mut total = 0.0;
        let mut previous: Option<GpsPoint> = None;
        return Ok(records
            .iter()
            .map(|r| {
                if let Some(point) = r.position() {
                    if let Some(prev) = previous {
                        total += haversine_distance(&prev, &point);
                    }
                    previous = Some(point);
                }
                total
            })
            .collect());
    }

    Err(EffortError::InvalidParameter(
        "recording has neither distance nor position data".to_string(),
    ))
}

fn position_from_semicircles(lat: Option<i32>, long: Option<i32>) -> Option<GpsPoint> {
    let point = GpsPoint::new(semicircles_to_degrees(lat?), semicircles_to_degrees(long?));
    point.is_valid().then_some(point)
}

fn cadence_spm(rpm: Option<u8>, fractional: Option<f64>) -> Option<f64> {
    rpm.map(|rpm| rpm_to_steps_per_minute(rpm as f64, fractional.unwrap_or(0.0)))
}

/// Calculate haversine distance between two GPS points in meters
pub fn haversine_distance(p1: &GpsPoint, p2: &GpsPoint) -> f64 {
    use geo::{Distance, Haversine, Point};
    let point1 = Point::new(p1.longitude, p1.latitude);
    let point2 = Point::new(p2.longitude, p2.latitude);
    Haversine::distance(point1, point2)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn at(seconds: i64) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(1_700_000_000 + seconds, 0)
    }

    fn record(seconds: i64, distance: Option<f64>) -> DecodedRecord {
        DecodedRecord {
            timestamp: at(seconds),
            distance,
            ..Default::default()
        }
    }

    #[test]
    fn test_records_to_series() {
        let activity = DecodedActivity {
            records: vec![
                DecodedRecord {
                    heart_rate: Some(120.0),
                    cadence: Some(85),
                    fractional_cadence: Some(0.5),
                    ..record(0, Some(0.0))
                },
                record(1, Some(3.5)),
                record(3, None),
                record(4, Some(12.0)),
            ],
            ..Default::default()
        };

        let series = activity.to_time_series().unwrap();
        assert_eq!(series.elapsed_times(), vec![0.0, 1.0, 3.0, 4.0]);
        // Gap carries the last distance forward
        assert_eq!(series.distances(), vec![0.0, 3.5, 3.5, 12.0]);
        assert_eq!(series.first().heart_rate, Some(120.0));
        assert_eq!(
            series.first().cadence.map(|c| c.steps_per_minute()),
            Some(171.0)
        );
    }

    #[test]
    fn test_duplicate_and_missing_timestamps_dropped() {
        let activity = DecodedActivity {
            records: vec![
                record(0, Some(0.0)),
                record(0, Some(1.0)),
                DecodedRecord::default(),
                record(2, Some(8.0)),
            ],
            ..Default::default()
        };
        let series = activity.to_time_series().unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.distances(), vec![0.0, 8.0]);
    }

    #[test]
    fn test_sub_millisecond_timestamps() {
        let t0 = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let at = |us: i64| DecodedRecord {
            timestamp: Some(t0 + Duration::microseconds(us)),
            distance: Some(us as f64 / 1e5),
            ..Default::default()
        };
        let activity = DecodedActivity {
            records: vec![at(0), at(400), at(400), at(1_000_000)],
            ..Default::default()
        };
        let series = activity.to_time_series().unwrap();
        assert_eq!(series.elapsed_times(), vec![0.0, 0.0004, 1.0]);
    }

    #[test]
    fn test_distance_from_positions() {
        // 0.001 degree of latitude is ~111 m
        let lat_step = (0.001 / 180.0 * 2_147_483_648.0) as i32;
        let records = (0..3)
            .map(|i| DecodedRecord {
                timestamp: at(i * 30),
                position_lat: Some(i as i32 * lat_step),
                position_long: Some(0),
                ..Default::default()
            })
            .collect();
        let activity = DecodedActivity {
            records,
            ..Default::default()
        };

        let series = activity.to_time_series().unwrap();
        let d = series.distances();
        assert_eq!(d[0], 0.0);
        assert!((d[1] - 111.2).abs() < 1.0, "got {}", d[1]);
        assert!((d[2] - 2.0 * d[1]).abs() < 1e-6);
        assert!(series.first().position.is_some());
    }

    #[test]
    fn test_no_distance_channel() {
        let activity = DecodedActivity {
            records: vec![record(0, None), record(1, None)],
            ..Default::default()
        };
        assert!(matches!(
            activity.to_time_series(),
            Err(EffortError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_empty_records() {
        assert!(matches!(
            DecodedActivity::default().to_time_series(),
            Err(EffortError::InsufficientSamples { count: 0, .. })
        ));
    }

    #[test]
    fn test_session_derived_fields() {
        let session = SessionSummary {
            start_time: at(0),
            total_elapsed_time: Some(1_800.5),
            avg_speed: Some(4.0),
            avg_cadence: Some(88),
            avg_fractional_cadence: Some(0.0),
            start_position_lat: Some(1 << 29),
            start_position_long: Some(0),
            ..Default::default()
        };
        assert_eq!(session.avg_pace().unwrap().format_mm_ss(), "04:10");
        assert_eq!(session.avg_cadence_spm(), Some(176.0));
        assert_eq!(session.max_cadence_spm(), None);
        assert!((session.start_position().unwrap().latitude - 45.0).abs() < 1e-9);
        assert_eq!(
            session.end_time(),
            at(1_800).map(|t| t + Duration::milliseconds(500))
        );
    }

    #[test]
    fn test_sport_matching() {
        assert!(SportInfo::new("running").is_sport("running"));
        assert!(SportInfo::new("Trail_Running").is_sport("running"));
        assert!(!SportInfo::new("cycling").is_sport("running"));
        assert!(!SportInfo::default().is_sport("running"));
    }

    #[test]
    fn test_deserialize_partial_json() {
        let json = r#"{
            "records": [
                {"timestamp": "2023-11-14T22:13:20Z", "distance": 0.0, "heart_rate": 130},
                {"timestamp": "2023-11-14T22:13:21Z", "distance": 3.9}
            ],
            "sport": {"sport": "running"}
        }"#;
        let activity: DecodedActivity = serde_json::from_str(json).unwrap();
        assert_eq!(activity.records.len(), 2);
        assert_eq!(activity.file_type.as_deref(), Some("activity"));
        assert!(activity.session.is_none());
        assert_eq!(activity.to_time_series().unwrap().len(), 2);
    }
}
