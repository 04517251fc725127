//! Per-activity analysis pipeline.
//!
//! decoded records -> time series -> (resample) -> (monotonic distance)
//! -> best efforts + zone times -> metrics

use log::info;
use serde::{Deserialize, Serialize};

use crate::config::AnalysisConfig;
use crate::efforts::{find_best_efforts, BestEfforts};
use crate::error::Result;
use crate::metrics::{aggregate, ActivityMetrics, FlatMetrics, ZoneTimes};
use crate::records::{DecodedActivity, LapSummary, SessionSummary, SportInfo};
use crate::resample::resample_to_fixed_rate;
use crate::series::TimeSeries;
use crate::zones::{series_time_in_zones, ZoneSet, ZoneSignal};

/// File type of recordings that hold an activity.
pub const ACTIVITY_FILE_TYPE: &str = "activity";

/// What a decoded file turned out to be.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivityKind {
    /// An activity of one of the configured sports
    Analyzable,
    /// A valid activity of another sport
    OtherSport(String),
    /// Settings, monitoring or otherwise empty files
    NotAnActivity,
}

/// Classify a decoded file against the analyzable sport families.
pub fn classify(decoded: &DecodedActivity, sports: &[String]) -> ActivityKind {
    let is_activity_file = decoded
        .file_type
        .as_deref()
        .map_or(true, |t| t.eq_ignore_ascii_case(ACTIVITY_FILE_TYPE));
    if !is_activity_file || decoded.records.is_empty() {
        return ActivityKind::NotAnActivity;
    }

    match &decoded.sport {
        Some(sport) if sports.iter().any(|family| sport.is_sport(family)) => {
            ActivityKind::Analyzable
        }
        Some(sport) => ActivityKind::OtherSport(
            sport.sport.clone().unwrap_or_else(|| "unknown".to_string()),
        ),
        None => ActivityKind::OtherSport("unknown".to_string()),
    }
}

/// Result of analyzing one activity.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityAnalysis {
    /// Series the efforts were searched on (after resampling and smoothing)
    pub series: TimeSeries,
    pub efforts: BestEfforts,
    pub metrics: ActivityMetrics,
}

impl ActivityAnalysis {
    pub fn flatten(&self) -> FlatMetrics {
        self.metrics.flatten()
    }

    /// Rebased samples of a named effort.
    pub fn extract(&self, name: &str) -> Result<TimeSeries> {
        self.efforts.extract(&self.series, name)
    }
}

/// Runs the per-activity pipeline with one configuration.
#[derive(Debug, Clone, Default)]
pub struct ActivityAnalyzer {
    config: AnalysisConfig,
}

impl ActivityAnalyzer {
    /// Create an analyzer; the configuration is validated first.
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn classify(&self, decoded: &DecodedActivity) -> ActivityKind {
        classify(decoded, &self.config.sports)
    }

    /// Analyze a decoded activity.
    pub fn analyze(&self, decoded: &DecodedActivity) -> Result<ActivityAnalysis> {
        let series = decoded.to_time_series()?;
        self.analyze_series(
            series,
            decoded.sport.as_ref(),
            decoded.session.as_ref(),
            &decoded.laps,
        )
    }

    /// Analyze an already-built series with optional summary messages.
    pub fn analyze_series(
        &self,
        series: TimeSeries,
        sport: Option<&SportInfo>,
        session: Option<&SessionSummary>,
        laps: &[LapSummary],
    ) -> Result<ActivityAnalysis> {
        let config = &self.config;

        let series = match config.resample_period {
            Some(period) => resample_to_fixed_rate(&series, period)?,
            None => series,
        };
        let series = if config.enforce_monotonic_distance {
            series.with_monotonic_distance()
        } else {
            series
        };

        let efforts = find_best_efforts(&series, &config.targets);

        // Configured zones are always reported; a missing signal has no table
        let mut zone_times = vec![zone_times_for(
            &series,
            ZoneSignal::HeartRate,
            config.heart_rate_zone_set()?,
            series.has_heart_rate(),
        )];
        if let Some(zones) = config.pace_zone_set()? {
            zone_times.push(zone_times_for(&series, ZoneSignal::Pace, zones, series.has_speed()));
        }

        let metrics = aggregate(&series, sport, session, laps, &efforts, zone_times);

        info!(
            "[Analyzer] Analyzed {:.0}m in {:.0}s: {}/{} efforts found",
            series.distance_span(),
            series.duration(),
            efforts.found_count(),
            efforts.len()
        );

        Ok(ActivityAnalysis {
            series,
            efforts,
            metrics,
        })
    }
}

fn zone_times_for(series: &TimeSeries, signal: ZoneSignal, zones: ZoneSet, available: bool) -> ZoneTimes {
    if !available {
        return ZoneTimes::unavailable(signal, zones);
    }
    let table = series_time_in_zones(series, signal, &zones);
    ZoneTimes::new(signal, zones, table)
}
