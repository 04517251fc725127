//! Per-activity metrics record.
//!
//! [`aggregate`] assembles session totals, lap summaries, best efforts and zone
//! times into a typed [`ActivityMetrics`]. [`ActivityMetrics::flatten`] turns
//! it into the flat `Category_FieldName -> value` table that reporting tools
//! consume, with `NaN` standing in for anything the activity did not record.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

use crate::efforts::{BestEfforts, EffortResult, EffortTarget};
use crate::error::Result;
use crate::records::{LapSummary, SessionSummary, SportInfo};
use crate::series::TimeSeries;
use crate::units::{format_duration, Pace};
use crate::zones::{ZoneSet, ZoneSignal, ZoneTimeTable};
use crate::GpsPoint;

// ============================================================================
// Flat Output
// ============================================================================

/// One scalar in the flat metrics table.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricValue {
    /// Plain number; `NaN` when unavailable
    Number(f64),
    /// Seconds
    Duration(f64),
    Text(String),
    Timestamp(DateTime<Utc>),
}

impl MetricValue {
    pub fn missing() -> Self {
        MetricValue::Number(f64::NAN)
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, MetricValue::Number(v) | MetricValue::Duration(v) if v.is_nan())
    }

    /// Numeric view of numbers and durations.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetricValue::Number(v) | MetricValue::Duration(v) => Some(*v),
            _ => None,
        }
    }

    fn number(value: Option<f64>) -> Self {
        MetricValue::Number(value.unwrap_or(f64::NAN))
    }

    fn duration(value: Option<f64>) -> Self {
        value.map_or_else(Self::missing, MetricValue::Duration)
    }

    fn pace(value: Option<Pace>) -> Self {
        Self::duration(value.filter(|p| p.is_valid()).map(|p| p.seconds_per_km))
    }

    fn timestamp(value: Option<DateTime<Utc>>) -> Self {
        value.map_or_else(Self::missing, MetricValue::Timestamp)
    }

    fn text(value: Option<&str>) -> Self {
        value.map_or_else(Self::missing, |s| MetricValue::Text(s.to_string()))
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Number(v) => write!(f, "{}", v),
            MetricValue::Duration(v) => write!(f, "{}", format_duration(*v)),
            MetricValue::Text(s) => write!(f, "{}", s),
            MetricValue::Timestamp(t) => write!(f, "{}", t.to_rfc3339()),
        }
    }
}

impl Serialize for MetricValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            MetricValue::Number(v) | MetricValue::Duration(v) => serializer.serialize_f64(*v),
            MetricValue::Text(s) => serializer.serialize_str(s),
            MetricValue::Timestamp(t) => serializer.serialize_str(&t.to_rfc3339()),
        }
    }
}

/// Ordered flat metrics table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatMetrics {
    entries: Vec<(String, MetricValue)>,
}

impl FlatMetrics {
    fn push(&mut self, name: impl Into<String>, value: MetricValue) {
        self.entries.push((name.into(), value));
    }

    pub fn entries(&self) -> &[(String, MetricValue)] {
        &self.entries
    }

    pub fn get(&self, name: &str) -> Option<&MetricValue> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// JSON object in table order. Missing numbers serialize as `null`.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl Serialize for FlatMetrics {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_map(self.entries.iter().map(|(k, v)| (k, v)))
    }
}

// ============================================================================
// Typed Metrics
// ============================================================================

/// Session totals with fallbacks from the series.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionTotals {
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub timer_time: Option<f64>,
    pub elapsed_time: Option<f64>,
    pub distance: Option<f64>,
    pub calories: Option<f64>,
    pub avg_speed: Option<f64>,
    pub max_speed: Option<f64>,
    pub avg_pace: Option<Pace>,
    pub max_pace: Option<Pace>,
    pub total_ascent: Option<f64>,
    pub total_descent: Option<f64>,
    pub avg_cadence_spm: Option<f64>,
    pub max_cadence_spm: Option<f64>,
    pub num_laps: Option<u32>,
    pub avg_heart_rate: Option<f64>,
    pub max_heart_rate: Option<f64>,
    pub start_position: Option<GpsPoint>,
}

impl SessionTotals {
    /// Take the session message where present; start time, elapsed time,
    /// distance, lap count and start position fall back to the recording.
    pub fn resolve(series: &TimeSeries, session: Option<&SessionSummary>, laps: &[LapSummary]) -> Self {
        let s = session.cloned().unwrap_or_default();

        let start_time = s.start_time.or(Some(series.start_time()));
        let elapsed_time = s.total_elapsed_time.or(Some(series.duration()));
        let end_time = match (start_time, elapsed_time) {
            (Some(start), Some(elapsed)) => Duration::try_milliseconds((elapsed * 1000.0).round() as i64)
                .and_then(|d| start.checked_add_signed(d)),
            _ => None,
        };
        let num_laps = s
            .num_laps
            .or_else(|| (!laps.is_empty()).then_some(laps.len() as u32));

        Self {
            start_time,
            end_time,
            timer_time: s.total_timer_time,
            elapsed_time,
            distance: s.total_distance.or(Some(series.distance_span())),
            calories: s.total_calories,
            avg_speed: s.avg_speed,
            max_speed: s.max_speed,
            avg_pace: s.avg_pace(),
            max_pace: s.max_pace(),
            total_ascent: s.total_ascent,
            total_descent: s.total_descent,
            avg_cadence_spm: s.avg_cadence_spm(),
            max_cadence_spm: s.max_cadence_spm(),
            num_laps,
            avg_heart_rate: s.avg_heart_rate,
            max_heart_rate: s.max_heart_rate,
            start_position: s.start_position().or(series.first().position),
        }
    }
}

/// Per-lap values kept for the joined lap strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LapTotals {
    pub distance: Option<f64>,
    pub timer_time: Option<f64>,
    pub avg_pace: Option<Pace>,
    pub max_pace: Option<Pace>,
    pub avg_heart_rate: Option<f64>,
    pub max_heart_rate: Option<f64>,
    pub avg_cadence_spm: Option<f64>,
    pub max_cadence_spm: Option<f64>,
}

impl From<&LapSummary> for LapTotals {
    fn from(lap: &LapSummary) -> Self {
        Self {
            distance: lap.total_distance,
            timer_time: lap.total_timer_time,
            avg_pace: lap.avg_pace(),
            max_pace: lap.max_pace(),
            avg_heart_rate: lap.avg_heart_rate,
            max_heart_rate: lap.max_heart_rate,
            avg_cadence_spm: lap.avg_cadence_spm(),
            max_cadence_spm: lap.max_cadence_spm(),
        }
    }
}

/// Zone times for one signal, with the zones they were computed on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneTimes {
    pub signal: ZoneSignal,
    pub zones: ZoneSet,
    /// `None` when the recording lacks the signal
    pub table: Option<ZoneTimeTable>,
}

impl ZoneTimes {
    pub fn new(signal: ZoneSignal, zones: ZoneSet, table: ZoneTimeTable) -> Self {
        Self {
            signal,
            zones,
            table: Some(table),
        }
    }

    /// Configured zones for a signal the recording does not carry. Flattens
    /// to the same keys as a computed table, with missing values.
    pub fn unavailable(signal: ZoneSignal, zones: ZoneSet) -> Self {
        Self {
            signal,
            zones,
            table: None,
        }
    }

    fn prefix(&self) -> &'static str {
        match self.signal {
            ZoneSignal::HeartRate => "HR",
            ZoneSignal::Pace => "Pace",
        }
    }
}

/// Everything computed for one activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityMetrics {
    pub sport: Option<SportInfo>,
    pub session: SessionTotals,
    pub laps: Vec<LapTotals>,
    pub distance_efforts: Vec<EffortResult>,
    pub duration_efforts: Vec<EffortResult>,
    pub heart_rate_zones: Option<ZoneTimes>,
    pub pace_zones: Option<ZoneTimes>,
}

impl ActivityMetrics {
    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.session.start_time
    }

    /// Effort result by target name, distance or duration.
    pub fn effort(&self, name: &str) -> Option<&EffortResult> {
        self.distance_efforts
            .iter()
            .chain(&self.duration_efforts)
            .find(|r| r.target.name() == name)
    }

    pub fn efforts(&self) -> impl Iterator<Item = &EffortResult> {
        self.distance_efforts.iter().chain(&self.duration_efforts)
    }

    /// Flatten into `Category_FieldName` entries.
    pub fn flatten(&self) -> FlatMetrics {
        let mut flat = FlatMetrics::default();

        let sport = self.sport.as_ref();
        flat.push("Sport_Name", MetricValue::text(sport.and_then(|s| s.name.as_deref())));
        flat.push("Sport_Type", MetricValue::text(sport.and_then(|s| s.sport.as_deref())));
        flat.push(
            "Sport_SubType",
            MetricValue::text(sport.and_then(|s| s.sub_sport.as_deref())),
        );

        let s = &self.session;
        flat.push("Metric_TotalTimerTime", MetricValue::duration(s.timer_time));
        flat.push("Metric_TotalElapsedTime", MetricValue::duration(s.elapsed_time));
        flat.push("Metric_TotalDistance", MetricValue::number(s.distance));
        flat.push("Metric_TotalCalories", MetricValue::number(s.calories));
        flat.push("Metric_StartTime", MetricValue::timestamp(s.start_time));
        flat.push("Metric_EndTime", MetricValue::timestamp(s.end_time));
        flat.push("Metric_AvgSpeed_ms", MetricValue::number(s.avg_speed));
        flat.push("Metric_MaxSpeed_ms", MetricValue::number(s.max_speed));
        flat.push("Metric_AvgPace", MetricValue::pace(s.avg_pace));
        flat.push("Metric_MaxPace", MetricValue::pace(s.max_pace));
        flat.push("Metric_TotalAscent", MetricValue::number(s.total_ascent));
        flat.push("Metric_TotalDescent", MetricValue::number(s.total_descent));
        flat.push("Metric_AvgCadence_spm", MetricValue::number(s.avg_cadence_spm));
        flat.push("Metric_MaxCadence_spm", MetricValue::number(s.max_cadence_spm));
        flat.push("Metric_NbLaps", MetricValue::number(s.num_laps.map(f64::from)));
        flat.push("Metric_AvgHeartRate", MetricValue::number(s.avg_heart_rate));
        flat.push("Metric_MaxHeartRate", MetricValue::number(s.max_heart_rate));
        flat.push(
            "Metric_StartPosition_Lat",
            MetricValue::number(s.start_position.map(|p| p.latitude)),
        );
        flat.push(
            "Metric_StartPosition_Long",
            MetricValue::number(s.start_position.map(|p| p.longitude)),
        );

        self.flatten_laps(&mut flat);

        for zone_times in [&self.heart_rate_zones, &self.pace_zones].into_iter().flatten() {
            flatten_zones(&mut flat, zone_times);
        }

        for result in self.efforts() {
            flatten_effort(&mut flat, result);
        }

        flat
    }

    fn flatten_laps(&self, flat: &mut FlatMetrics) {
        let joined = |field: fn(&LapTotals) -> String| -> MetricValue {
            if self.laps.is_empty() {
                return MetricValue::missing();
            }
            MetricValue::Text(self.laps.iter().map(field).collect::<Vec<_>>().join(","))
        };

        flat.push("Laps_Distance", joined(|l| join_number(l.distance)));
        flat.push("Laps_Time", joined(|l| join_number(l.timer_time)));
        flat.push("Laps_AvgPace", joined(|l| join_pace(l.avg_pace)));
        flat.push("Laps_MaxPace", joined(|l| join_pace(l.max_pace)));
        flat.push("Laps_AvgHR", joined(|l| join_number(l.avg_heart_rate)));
        flat.push("Laps_MaxHR", joined(|l| join_number(l.max_heart_rate)));
        flat.push("Laps_AvgCadence_spm", joined(|l| join_number(l.avg_cadence_spm)));
        flat.push("Laps_MaxCadence_spm", joined(|l| join_number(l.max_cadence_spm)));
    }
}

fn join_number(value: Option<f64>) -> String {
    value.map_or_else(|| "NaN".to_string(), |v| v.to_string())
}

fn join_pace(value: Option<Pace>) -> String {
    value.map_or_else(|| "--:--".to_string(), |p| p.format_mm_ss())
}

fn flatten_zones(flat: &mut FlatMetrics, zone_times: &ZoneTimes) {
    let prefix = zone_times.prefix();
    flat.push(
        format!("{}_ZoneNames", prefix),
        MetricValue::Text(zone_times.zones.names().join(",")),
    );
    flat.push(
        format!("{}_ZoneBoundaries", prefix),
        MetricValue::Text(
            zone_times
                .zones
                .zones()
                .iter()
                .map(|z| z.low.to_string())
                .collect::<Vec<_>>()
                .join(","),
        ),
    );
    let Some(table) = &zone_times.table else {
        for i in 0..zone_times.zones.len() {
            flat.push(format!("{}_Time_Zone_{}", prefix, i), MetricValue::missing());
            flat.push(format!("{}_Ratio_Zone_{}", prefix, i), MetricValue::missing());
        }
        return;
    };
    let percentages = table.percentages();
    for (i, ((_, seconds), ratio)) in table.entries().iter().zip(percentages).enumerate() {
        flat.push(format!("{}_Time_Zone_{}", prefix, i), MetricValue::Duration(*seconds));
        flat.push(format!("{}_Ratio_Zone_{}", prefix, i), MetricValue::Number(ratio));
    }
}

fn flatten_effort(flat: &mut FlatMetrics, result: &EffortResult) {
    let window = result.window.as_ref();
    match &result.target {
        EffortTarget::Distance { name, .. } => {
            flat.push(
                format!("DistanceEffort_{}_Time", name),
                MetricValue::duration(window.map(|w| w.elapsed_time)),
            );
            flat.push(
                format!("DistanceEffort_{}_Pace", name),
                MetricValue::pace(window.map(|w| w.pace)),
            );
        }
        EffortTarget::Duration { name, .. } => {
            flat.push(
                format!("DurationEffort_{}_Distance", name),
                MetricValue::number(window.map(|w| w.distance)),
            );
            flat.push(
                format!("DurationEffort_{}_Pace", name),
                MetricValue::pace(window.map(|w| w.pace)),
            );
        }
    }
}

/// Assemble the metrics of one activity. Never fails: whatever the inputs
/// lack stays `None`.
pub fn aggregate(
    series: &TimeSeries,
    sport: Option<&SportInfo>,
    session: Option<&SessionSummary>,
    laps: &[LapSummary],
    best_efforts: &BestEfforts,
    zone_times: Vec<ZoneTimes>,
) -> ActivityMetrics {
    let mut heart_rate_zones = None;
    let mut pace_zones = None;
    for times in zone_times {
        match times.signal {
            ZoneSignal::HeartRate => heart_rate_zones = Some(times),
            ZoneSignal::Pace => pace_zones = Some(times),
        }
    }

    ActivityMetrics {
        sport: sport.cloned(),
        session: SessionTotals::resolve(series, session, laps),
        laps: laps.iter().map(LapTotals::from).collect(),
        distance_efforts: best_efforts.distance_efforts().cloned().collect(),
        duration_efforts: best_efforts.duration_efforts().cloned().collect(),
        heart_rate_zones,
        pace_zones,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::efforts::find_best_efforts;
    use crate::series::test_support::{start, steady_run};
    use crate::zones::{series_time_in_zones, ZoneSet};

    fn sample_metrics() -> ActivityMetrics {
        let series = steady_run(600, 4.0, 150.0);
        let efforts = find_best_efforts(
            &series,
            &[
                EffortTarget::distance("1km", 1000.0),
                EffortTarget::distance("5km", 5000.0),
                EffortTarget::duration("5min", 300.0),
            ],
        );
        let zones = ZoneSet::heart_rate(190.0).unwrap();
        let table = series_time_in_zones(&series, ZoneSignal::HeartRate, &zones);
        let laps = vec![
            LapSummary {
                total_distance: Some(1000.0),
                total_timer_time: Some(250.0),
                avg_speed: Some(4.0),
                avg_heart_rate: Some(148.0),
                ..Default::default()
            },
            LapSummary {
                total_distance: Some(1400.0),
                total_timer_time: Some(350.0),
                avg_speed: Some(4.0),
                ..Default::default()
            },
        ];

        aggregate(
            &series,
            Some(&SportInfo::new("running")),
            None,
            &laps,
            &efforts,
            vec![ZoneTimes::new(ZoneSignal::HeartRate, zones, table)],
        )
    }

    #[test]
    fn test_session_fallbacks() {
        let metrics = sample_metrics();
        assert_eq!(metrics.start_time(), Some(start()));
        assert_eq!(metrics.session.elapsed_time, Some(600.0));
        assert_eq!(metrics.session.distance, Some(2400.0));
        assert_eq!(metrics.session.num_laps, Some(2));
        assert_eq!(metrics.session.end_time, Some(start() + Duration::seconds(600)));
        assert_eq!(metrics.session.calories, None);
    }

    #[test]
    fn test_flatten_names_and_sentinels() {
        let flat = sample_metrics().flatten();

        assert_eq!(flat.get("Sport_Type"), Some(&MetricValue::Text("running".into())));
        assert!(flat.get("Sport_Name").unwrap().is_missing());
        assert_eq!(flat.get("Metric_TotalDistance"), Some(&MetricValue::Number(2400.0)));
        assert!(flat.get("Metric_TotalAscent").unwrap().is_missing());
        assert!(flat.get("Metric_TotalTimerTime").unwrap().is_missing());

        assert_eq!(
            flat.get("DistanceEffort_1km_Time"),
            Some(&MetricValue::Duration(250.0))
        );
        assert!(flat.get("DistanceEffort_5km_Time").unwrap().is_missing());
        assert_eq!(
            flat.get("DurationEffort_5min_Distance"),
            Some(&MetricValue::Number(1200.0))
        );
        assert!(flat.get("Pace_ZoneNames").is_none());
    }

    #[test]
    fn test_flatten_laps() {
        let flat = sample_metrics().flatten();
        assert_eq!(flat.get("Laps_Distance"), Some(&MetricValue::Text("1000,1400".into())));
        assert_eq!(flat.get("Laps_AvgPace"), Some(&MetricValue::Text("04:10,04:10".into())));
        assert_eq!(flat.get("Laps_AvgHR"), Some(&MetricValue::Text("148,NaN".into())));
        assert_eq!(flat.get("Laps_MaxPace"), Some(&MetricValue::Text("--:--,--:--".into())));
    }

    #[test]
    fn test_flatten_zones() {
        let flat = sample_metrics().flatten();
        assert_eq!(
            flat.get("HR_ZoneNames"),
            Some(&MetricValue::Text("Warm Up,Easy,Aerobic,Threshold,Maximum".into()))
        );
        // 150 bpm of 190 max sits in [133, 152)
        assert_eq!(flat.get("HR_Time_Zone_2"), Some(&MetricValue::Duration(600.0)));
        assert_eq!(flat.get("HR_Ratio_Zone_2"), Some(&MetricValue::Number(100.0)));
        assert_eq!(flat.get("HR_Time_Zone_0"), Some(&MetricValue::Duration(0.0)));
    }

    #[test]
    fn test_missing_signal_keeps_zone_keys() {
        let with_hr = sample_metrics().flatten();

        let series = steady_run(600, 4.0, 150.0);
        let efforts = find_best_efforts(
            &series,
            &[
                EffortTarget::distance("1km", 1000.0),
                EffortTarget::distance("5km", 5000.0),
                EffortTarget::duration("5min", 300.0),
            ],
        );
        let laps = vec![LapSummary::default(), LapSummary::default()];
        let without_hr = aggregate(
            &series,
            Some(&SportInfo::new("running")),
            None,
            &laps,
            &efforts,
            vec![ZoneTimes::unavailable(
                ZoneSignal::HeartRate,
                ZoneSet::heart_rate(190.0).unwrap(),
            )],
        )
        .flatten();

        assert_eq!(with_hr.names(), without_hr.names());
        assert_eq!(
            without_hr.get("HR_ZoneNames"),
            Some(&MetricValue::Text("Warm Up,Easy,Aerobic,Threshold,Maximum".into()))
        );
        assert!(without_hr.get("HR_Time_Zone_4").unwrap().is_missing());
        assert!(without_hr.get("HR_Ratio_Zone_0").unwrap().is_missing());
    }

    #[test]
    fn test_no_laps_is_missing() {
        let series = steady_run(10, 3.0, 140.0);
        let metrics = aggregate(&series, None, None, &[], &BestEfforts::default(), vec![]);
        let flat = metrics.flatten();
        assert!(flat.get("Laps_Distance").unwrap().is_missing());
        assert!(flat.get("Metric_NbLaps").unwrap().is_missing());
        assert!(flat.get("HR_ZoneNames").is_none());
    }

    #[test]
    fn test_json_keeps_order() {
        let flat = sample_metrics().flatten();
        let json = flat.to_json().unwrap();
        assert!(json.starts_with(r#"{"Sport_Name":null,"Sport_Type":"running""#));
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["Metric_TotalDistance"], 2400.0);
        assert_eq!(value["Metric_StartTime"], start().to_rfc3339());
    }

    #[test]
    fn test_metric_value_display() {
        assert_eq!(MetricValue::Duration(3_723.0).to_string(), "1:02:03");
        assert_eq!(MetricValue::missing().to_string(), "NaN");
        assert_eq!(MetricValue::Number(1.5).as_f64(), Some(1.5));
        assert_eq!(MetricValue::Text("x".into()).as_f64(), None);
    }
}
