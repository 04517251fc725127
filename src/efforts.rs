//! Best-effort search for running activities.
//!
//! For every distance target the engine finds the shortest elapsed time over
//! which the activity covered that distance; for every duration target it
//! finds the longest distance covered within that time.
//!
//! ## Features
//! - O(N) sliding window per target
//! - O(N²) all-pairs baselines with identical tie-breaking, for verification
//! - Pace, average and maximum heart rate for each found window
//! - Extraction of the effort as a rebased sub-series
//!
//! ## Example
//! ```rust
//! use run_efforts::efforts::best_time_for_distance;
//!
//! let times: Vec<f64> = (0..=10).map(|i| i as f64).collect();
//! let distances: Vec<f64> = (0..=10).map(|i| 4.0 * i as f64).collect();
//! let best = best_time_for_distance(&times, &distances, 20.0).unwrap();
//! assert_eq!(best.value, 5.0);
//! ```

use log::{debug, info};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::{OptionExt, Result};
use crate::numeric::trapezoid;
use crate::series::TimeSeries;
use crate::units::{Pace, HALF_MARATHON_METERS, MARATHON_METERS, MILE_METERS};

/// Standard distance targets (name, meters)
pub const STANDARD_DISTANCES: &[(&str, f64)] = &[
    ("400m", 400.0),
    ("500m", 500.0),
    ("800m", 800.0),
    ("1km", 1_000.0),
    ("1mile", MILE_METERS),
    ("5km", 5_000.0),
    ("10km", 10_000.0),
    ("15km", 15_000.0),
    ("10miles", 10.0 * MILE_METERS),
    ("HalfMarathon", HALF_MARATHON_METERS),
    ("Marathon", MARATHON_METERS),
];

/// Standard duration targets (name, seconds)
pub const STANDARD_DURATIONS: &[(&str, f64)] = &[
    ("30s", 30.0),
    ("1min", 60.0),
    ("2min", 120.0),
    ("5min", 300.0),
    ("10min", 600.0),
    ("12min", 720.0),
    ("20min", 1_200.0),
    ("30min", 1_800.0),
    ("45min", 2_700.0),
    ("1h", 3_600.0),
    ("1h15min", 4_500.0),
    ("1h30min", 5_400.0),
    ("1h45min", 6_300.0),
    ("2h", 7_200.0),
];

/// Default target set: all standard distances followed by all standard durations.
pub static DEFAULT_TARGETS: Lazy<Vec<EffortTarget>> = Lazy::new(|| {
    STANDARD_DISTANCES
        .iter()
        .map(|&(name, meters)| EffortTarget::distance(name, meters))
        .chain(
            STANDARD_DURATIONS
                .iter()
                .map(|&(name, seconds)| EffortTarget::duration(name, seconds)),
        )
        .collect()
});

/// What a best effort is searched for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EffortTarget {
    /// Fastest time over at least `meters`
    Distance { name: String, meters: f64 },
    /// Farthest distance within at most `seconds`
    Duration { name: String, seconds: f64 },
}

impl EffortTarget {
    pub fn distance(name: &str, meters: f64) -> Self {
        EffortTarget::Distance {
            name: name.to_string(),
            meters,
        }
    }

    pub fn duration(name: &str, seconds: f64) -> Self {
        EffortTarget::Duration {
            name: name.to_string(),
            seconds,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            EffortTarget::Distance { name, .. } | EffortTarget::Duration { name, .. } => name,
        }
    }

    /// Target magnitude: meters for distance targets, seconds for durations.
    pub fn goal(&self) -> f64 {
        match self {
            EffortTarget::Distance { meters, .. } => *meters,
            EffortTarget::Duration { seconds, .. } => *seconds,
        }
    }

    pub fn is_distance(&self) -> bool {
        matches!(self, EffortTarget::Distance { .. })
    }
}

/// Raw outcome of a window search: inclusive sample indices and the optimized
/// quantity (elapsed seconds or meters).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowMatch {
    pub start: usize,
    pub end: usize,
    pub value: f64,
}

/// A found effort with its derived values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EffortWindow {
    /// First sample of the window
    pub start: usize,
    /// Last sample of the window (inclusive)
    pub end: usize,
    /// Elapsed seconds between start and end
    pub elapsed_time: f64,
    /// Meters covered between start and end
    pub distance: f64,
    pub pace: Pace,
    pub avg_heart_rate: Option<f64>,
    pub max_heart_rate: Option<f64>,
}

/// Best effort for one target. `window` is `None` when the activity never
/// reached the target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffortResult {
    pub target: EffortTarget,
    pub window: Option<EffortWindow>,
}

impl EffortResult {
    pub fn is_found(&self) -> bool {
        self.window.is_some()
    }

    /// Best time (distance targets) or best distance (duration targets).
    pub fn value(&self) -> Option<f64> {
        self.window.map(|w| match self.target {
            EffortTarget::Distance { .. } => w.elapsed_time,
            EffortTarget::Duration { .. } => w.distance,
        })
    }

    pub fn pace(&self) -> Option<Pace> {
        self.window.map(|w| w.pace)
    }
}

/// Best efforts of one activity, in target order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BestEfforts {
    results: Vec<EffortResult>,
}

impl BestEfforts {
    pub fn new(results: Vec<EffortResult>) -> Self {
        Self { results }
    }

    pub fn results(&self) -> &[EffortResult] {
        &self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn found_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_found()).count()
    }

    /// Get the result for a target name, if configured.
    pub fn get(&self, name: &str) -> Option<&EffortResult> {
        self.results.iter().find(|r| r.target.name() == name)
    }

    /// Like [`get`](Self::get) but fails with `UnknownTarget`.
    pub fn lookup(&self, name: &str) -> Result<&EffortResult> {
        self.get(name).ok_or_unknown_target(name)
    }

    /// Found window for a target; `UnknownTarget` or `EffortUnavailable` otherwise.
    pub fn window(&self, name: &str) -> Result<&EffortWindow> {
        self.lookup(name)?.window.as_ref().ok_or_unavailable(name)
    }

    pub fn distance_efforts(&self) -> impl Iterator<Item = &EffortResult> {
        self.results.iter().filter(|r| r.target.is_distance())
    }

    pub fn duration_efforts(&self) -> impl Iterator<Item = &EffortResult> {
        self.results.iter().filter(|r| !r.target.is_distance())
    }

    /// Extract the named effort from the series it was computed on.
    pub fn extract(&self, series: &TimeSeries, name: &str) -> Result<TimeSeries> {
        extract_effort_segment(series, self.lookup(name)?)
    }
}

/// Shortest elapsed time over which at least `target` meters were covered.
///
/// Sliding window: `end` advances one sample at a time and `start` is pulled
/// forward to the tightest position where the window still covers the target.
/// `start` never moves back, so the scan is O(N) amortized. Ties keep the
/// earliest window.
///
/// Exactly matches [`best_time_for_distance_naive`] when `times` strictly
/// increases and `distances` never decreases.
pub fn best_time_for_distance(
    times: &[f64],
    distances: &[f64],
    target: f64,
) -> Option<WindowMatch> {
    let n = times.len().min(distances.len());
    if n < 2 || !(target > 0.0) {
        return None;
    }
    if distances[n - 1] - distances[0] < target {
        return None; // Activity too short
    }

    // First window reaching the target from the first sample
    let mut start = 0usize;
    let mut end = 1usize;
    while end < n && distances[end] - distances[start] < target {
        end += 1;
    }

    let mut best: Option<WindowMatch> = None;
    while end < n {
        // Drop leading samples while the span still covers the target
        while start + 1 < end && distances[end] - distances[start + 1] >= target {
            start += 1;
        }
        if distances[end] - distances[start] >= target {
            let elapsed = times[end] - times[start];
            if best.map_or(true, |b| elapsed < b.value) {
                best = Some(WindowMatch {
                    start,
                    end,
                    value: elapsed,
                });
            }
        }
        end += 1;
    }

    best
}

/// All-pairs baseline for [`best_time_for_distance`]: for every start, the
/// first end that covers the target.
pub fn best_time_for_distance_naive(
    times: &[f64],
    distances: &[f64],
    target: f64,
) -> Option<WindowMatch> {
    let n = times.len().min(distances.len());
    if n < 2 || !(target > 0.0) {
        return None;
    }

    let mut best: Option<WindowMatch> = None;
    for start in 0..n {
        for end in start + 1..n {
            if distances[end] - distances[start] >= target {
                let elapsed = times[end] - times[start];
                if best.map_or(true, |b| elapsed < b.value) {
                    best = Some(WindowMatch {
                        start,
                        end,
                        value: elapsed,
                    });
                }
                break;
            }
        }
    }
    best
}

/// Longest distance covered within at most `target` seconds.
///
/// Mirror of [`best_time_for_distance`] with the roles swapped: `start`
/// advances one sample at a time and `end` is pushed as far as the window's
/// time span allows. Both pointers only move forward. Ties keep the earliest
/// window. Matches [`best_distance_for_duration_naive`] whenever `times`
/// strictly increases.
pub fn best_distance_for_duration(
    times: &[f64],
    distances: &[f64],
    target: f64,
) -> Option<WindowMatch> {
    let n = times.len().min(distances.len());
    if n < 2 || !(target > 0.0) {
        return None;
    }
    if times[n - 1] - times[0] < target {
        return None; // Activity too short
    }

    let mut best: Option<WindowMatch> = None;
    let mut end = 0usize;
    for start in 0..n - 1 {
        end = end.max(start);
        while end + 1 < n && times[end + 1] - times[start] <= target {
            end += 1;
        }
        if end == start {
            continue; // Recording gap longer than the target
        }
        let covered = distances[end] - distances[start];
        if best.map_or(true, |b| covered > b.value) {
            best = Some(WindowMatch {
                start,
                end,
                value: covered,
            });
        }
    }

    best
}

/// All-pairs baseline for [`best_distance_for_duration`]: for every start, the
/// last end within the target duration.
pub fn best_distance_for_duration_naive(
    times: &[f64],
    distances: &[f64],
    target: f64,
) -> Option<WindowMatch> {
    let n = times.len().min(distances.len());
    if n < 2 || !(target > 0.0) || times[n - 1] - times[0] < target {
        return None;
    }

    let mut best: Option<WindowMatch> = None;
    for start in 0..n {
        let mut last = None;
        for end in start + 1..n {
            if times[end] - times[start] <= target {
                last = Some(end);
            } else {
                break;
            }
        }
        if let Some(end) = last {
            let covered = distances[end] - distances[start];
            if best.map_or(true, |b| covered > b.value) {
                best = Some(WindowMatch {
                    start,
                    end,
                    value: covered,
                });
            }
        }
    }
    best
}

/// Compute the best effort for every target with the sliding-window engine.
pub fn find_best_efforts(series: &TimeSeries, targets: &[EffortTarget]) -> BestEfforts {
    let efforts = search(
        series,
        targets,
        best_time_for_distance,
        best_distance_for_duration,
    );
    info!(
        "[Efforts] Found {}/{} efforts over {} samples ({:.0}m, {:.0}s)",
        efforts.found_count(),
        targets.len(),
        series.len(),
        series.distance_span(),
        series.duration()
    );
    efforts
}

/// Same as [`find_best_efforts`] using the all-pairs baselines.
pub fn find_best_efforts_naive(series: &TimeSeries, targets: &[EffortTarget]) -> BestEfforts {
    search(
        series,
        targets,
        best_time_for_distance_naive,
        best_distance_for_duration_naive,
    )
}

type WindowSearch = fn(&[f64], &[f64], f64) -> Option<WindowMatch>;

fn search(
    series: &TimeSeries,
    targets: &[EffortTarget],
    by_distance: WindowSearch,
    by_duration: WindowSearch,
) -> BestEfforts {
    let times = series.elapsed_times();
    let distances = series.distances();

    let results = targets
        .iter()
        .map(|target| {
            let found = match target {
                EffortTarget::Distance { meters, .. } => by_distance(&times, &distances, *meters),
                EffortTarget::Duration { seconds, .. } => {
                    by_duration(&times, &distances, *seconds)
                }
            };
            if let Some(m) = &found {
                debug!(
                    "[Efforts] {} -> {:.1} over samples [{}, {}]",
                    target.name(),
                    m.value,
                    m.start,
                    m.end
                );
            }
            EffortResult {
                target: target.clone(),
                window: found.map(|m| describe_window(series, &m)),
            }
        })
        .collect();

    BestEfforts::new(results)
}

/// Derive pace and heart-rate figures for a matched window.
fn describe_window(series: &TimeSeries, m: &WindowMatch) -> EffortWindow {
    let samples = &series.samples()[m.start..=m.end];
    let first = &samples[0];
    let last = &samples[samples.len() - 1];
    let elapsed_time = last.elapsed_time - first.elapsed_time;
    let distance = last.distance - first.distance;

    let (hr_times, hr_values): (Vec<f64>, Vec<f64>) = samples
        .iter()
        .filter_map(|s| s.heart_rate.map(|hr| (s.elapsed_time, hr)))
        .unzip();

    let avg_heart_rate = match hr_values.len() {
        0 => None,
        1 => Some(hr_values[0]),
        len => {
            let span = hr_times[len - 1] - hr_times[0];
            Some(trapezoid(&hr_times, &hr_values) / span)
        }
    };
    let max_heart_rate = hr_values.iter().copied().reduce(f64::max);

    EffortWindow {
        start: m.start,
        end: m.end,
        elapsed_time,
        distance,
        pace: Pace::from_distance_time(distance, elapsed_time),
        avg_heart_rate,
        max_heart_rate,
    }
}

/// Samples of a found effort with distance and time rebased to zero.
///
/// Fails with `EffortUnavailable` when the effort was never achieved.
pub fn extract_effort_segment(series: &TimeSeries, result: &EffortResult) -> Result<TimeSeries> {
    let window = result.window.as_ref().ok_or_unavailable(result.target.name())?;
    series.slice_rebased(window.start, window.end)
}
