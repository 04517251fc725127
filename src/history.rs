//! Cross-activity effort history.
//!
//! Holds the best efforts of many activities keyed by activity id and answers
//! "best over a period" and "evolution over time" queries. Activities can be
//! added, replaced and removed incrementally.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::efforts::{EffortResult, EffortTarget};
use crate::error::{EffortError, Result};
use crate::metrics::ActivityMetrics;
use crate::units::Pace;

/// Efforts of one stored activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub activity_id: String,
    pub start_time: DateTime<Utc>,
    pub efforts: Vec<EffortResult>,
}

/// One activity's value for one target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffortRecord {
    pub activity_id: String,
    pub start_time: DateTime<Utc>,
    /// Seconds for distance targets, meters for duration targets
    pub value: f64,
    pub pace: Pace,
}

/// Best value for one target over a period; `best` is `None` when no activity
/// in the period reached it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodBest {
    pub target: EffortTarget,
    pub best: Option<EffortRecord>,
}

/// Store of per-activity best efforts.
#[derive(Debug, Clone, Default)]
pub struct EffortHistory {
    entries: HashMap<String, HistoryEntry>,
}

impl EffortHistory {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Activity Management
    // ========================================================================

    /// Add (or replace) an activity's efforts.
    pub fn add_efforts(&mut self, activity_id: &str, start_time: DateTime<Utc>, efforts: Vec<EffortResult>) {
        let entry = HistoryEntry {
            activity_id: activity_id.to_string(),
            start_time,
            efforts,
        };
        if self.entries.insert(activity_id.to_string(), entry).is_some() {
            debug!("[History] Replaced efforts of {}", activity_id);
        }
    }

    /// Add an analyzed activity. Fails when the metrics carry no start time.
    pub fn add_activity(&mut self, activity_id: &str, metrics: &ActivityMetrics) -> Result<()> {
        let start_time = metrics.start_time().ok_or_else(|| {
            EffortError::InvalidParameter(format!("activity {} has no start time", activity_id))
        })?;
        self.add_efforts(activity_id, start_time, metrics.efforts().cloned().collect());
        Ok(())
    }

    pub fn remove_activity(&mut self, activity_id: &str) -> bool {
        self.entries.remove(activity_id).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn has_activity(&self, activity_id: &str) -> bool {
        self.entries.contains_key(activity_id)
    }

    /// Activity ids in chronological order.
    pub fn activity_ids(&self) -> Vec<&str> {
        self.chronological()
            .into_iter()
            .map(|e| e.activity_id.as_str())
            .collect()
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Entries sorted by start time, ties by id, so queries are deterministic.
    fn chronological(&self) -> Vec<&HistoryEntry> {
        let mut entries: Vec<&HistoryEntry> = self.entries.values().collect();
        entries.sort_by(|a, b| {
            a.start_time
                .cmp(&b.start_time)
                .then_with(|| a.activity_id.cmp(&b.activity_id))
        });
        entries
    }

    /// Targets in order of first appearance across the history.
    pub fn targets(&self) -> Vec<EffortTarget> {
        let mut targets: Vec<EffortTarget> = Vec::new();
        for entry in self.chronological() {
            for result in &entry.efforts {
                if !targets.iter().any(|t| t.name() == result.target.name()) {
                    targets.push(result.target.clone());
                }
            }
        }
        targets
    }

    /// Best effort per target over activities with `start < start_time <= end`.
    ///
    /// Distance targets keep the shortest time, duration targets the longest
    /// distance. Ties keep the earlier activity.
    pub fn best_efforts_for_period(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<PeriodBest> {
        let in_period: Vec<&HistoryEntry> = self
            .chronological()
            .into_iter()
            .filter(|e| start < e.start_time && e.start_time <= end)
            .collect();

        let bests: Vec<PeriodBest> = self
            .targets()
            .into_iter()
            .map(|target| {
                let mut best: Option<EffortRecord> = None;
                for entry in &in_period {
                    let Some(record) = record_for(entry, target.name()) else {
                        continue;
                    };
                    let better = match &best {
                        None => true,
                        Some(b) if target.is_distance() => record.value < b.value,
                        Some(b) => record.value > b.value,
                    };
                    if better {
                        best = Some(record);
                    }
                }
                PeriodBest { target, best }
            })
            .collect();

        info!(
            "[History] Period {} - {}: {} activities, {}/{} targets reached",
            start,
            end,
            in_period.len(),
            bests.iter().filter(|b| b.best.is_some()).count(),
            bests.len()
        );
        bests
    }

    /// Chronological values of one target across all activities that reached it.
    pub fn effort_evolution(&self, name: &str) -> Result<Vec<EffortRecord>> {
        if !self.targets().iter().any(|t| t.name() == name) {
            return Err(EffortError::UnknownTarget(name.to_string()));
        }
        Ok(self
            .chronological()
            .into_iter()
            .filter_map(|entry| record_for(entry, name))
            .collect())
    }
}

fn record_for(entry: &HistoryEntry, name: &str) -> Option<EffortRecord> {
    let result = entry.efforts.iter().find(|r| r.target.name() == name)?;
    Some(EffortRecord {
        activity_id: entry.activity_id.clone(),
        start_time: entry.start_time,
        value: result.value()?,
        pace: result.pace()?,
    })
}
