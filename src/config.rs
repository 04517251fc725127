//! Analysis configuration.
//!
//! Everything tunable about the per-activity pipeline lives here: which
//! efforts to search for, how to bucket heart rate and pace, whether to
//! resample, and which sports count as analyzable. Loaded from JSON; every
//! field has a default so a partial file is enough.

use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};

use crate::efforts::{EffortTarget, DEFAULT_TARGETS};
use crate::error::{EffortError, Result};
use crate::zones::ZoneSet;

/// Configuration for activity analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Effort targets in reporting order.
    /// Default: standard distances (400m to marathon) then durations (30s to 2h)
    pub targets: Vec<EffortTarget>,

    /// Maximum heart rate used to derive the default heart rate zones.
    /// Default: 190 bpm
    pub max_heart_rate: f64,

    /// Explicit heart rate zones. When absent, zones are derived from
    /// `max_heart_rate`.
    pub heart_rate_zones: Option<ZoneSet>,

    /// Threshold pace in seconds per km, used to derive pace zones when
    /// `pace_zones` is absent. Default: none (no pace zones)
    pub threshold_pace: Option<f64>,

    /// Explicit pace zones over seconds per km.
    pub pace_zones: Option<ZoneSet>,

    /// Resample every activity to this period (seconds) before analysis.
    /// Default: none (analyze as recorded)
    pub resample_period: Option<f64>,

    /// Replace cumulative distance by its running maximum before the effort
    /// search, so GPS jitter cannot break the sliding window.
    /// Default: true
    pub enforce_monotonic_distance: bool,

    /// Sport families that are analyzed; other activities are reported but
    /// skipped. Default: ["running"]
    pub sports: Vec<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            targets: DEFAULT_TARGETS.clone(),
            max_heart_rate: 190.0,
            heart_rate_zones: None,
            threshold_pace: None,
            pace_zones: None,
            resample_period: None,
            enforce_monotonic_distance: true,
            sports: vec!["running".to_string()],
        }
    }
}

impl AnalysisConfig {
    /// Parse and validate a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&json)?;
        info!(
            "[Config] Loaded {} with {} targets",
            path.display(),
            config.targets.len()
        );
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Heart rate zones in effect.
    pub fn heart_rate_zone_set(&self) -> Result<ZoneSet> {
        match &self.heart_rate_zones {
            Some(zones) => Ok(zones.clone()),
            None => ZoneSet::heart_rate(self.max_heart_rate)
                .map_err(|e| EffortError::Config(e.to_string())),
        }
    }

    /// Pace zones in effect, if any are configured.
    pub fn pace_zone_set(&self) -> Result<Option<ZoneSet>> {
        match (&self.pace_zones, self.threshold_pace) {
            (Some(zones), _) => Ok(Some(zones.clone())),
            (None, Some(threshold)) => ZoneSet::pace(threshold)
                .map(Some)
                .map_err(|e| EffortError::Config(e.to_string())),
            (None, None) => Ok(None),
        }
    }

    /// Check the configuration for values the pipeline cannot use.
    pub fn validate(&self) -> Result<()> {
        for (i, target) in self.targets.iter().enumerate() {
            let goal = target.goal();
            if !(goal.is_finite() && goal > 0.0) {
                return Err(EffortError::Config(format!(
                    "target '{}' must be positive, got {}",
                    target.name(),
                    goal
                )));
            }
            if self.targets[..i].iter().any(|t| t.name() == target.name()) {
                return Err(EffortError::Config(format!(
                    "duplicate target name '{}'",
                    target.name()
                )));
            }
        }

        if !(self.max_heart_rate.is_finite() && self.max_heart_rate > 0.0) {
            return Err(EffortError::Config(format!(
                "max_heart_rate must be positive, got {}",
                self.max_heart_rate
            )));
        }

        if let Some(pace) = self.threshold_pace {
            if !(pace.is_finite() && pace > 0.0) {
                return Err(EffortError::Config(format!(
                    "threshold_pace must be positive, got {}",
                    pace
                )));
            }
        }

        if let Some(period) = self.resample_period {
            if !(period.is_finite() && period > 0.0) {
                return Err(EffortError::Config(format!(
                    "resample_period must be positive, got {}",
                    period
                )));
            }
        }

        for zones in [&self.heart_rate_zones, &self.pace_zones].into_iter().flatten() {
            zones
                .validate()
                .map_err(|e| EffortError::Config(e.to_string()))?;
        }

        if self.sports.is_empty() {
            return Err(EffortError::Config(
                "at least one sport must be analyzable".to_string(),
            ));
        }

        Ok(())
    }
}
