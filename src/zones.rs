//! Time-in-zone calculations for heart rate and pace.
//!
//! Zones are an explicit ordered list of named intervals. Time is accumulated
//! by integrating a 0/1 "inside this zone" indicator over elapsed time with the
//! trapezoidal rule, so irregular sampling is weighted correctly and an
//! interval that crosses a boundary gives half its duration to each side.
//!
//! ## Features
//! - Heart rate zones from max HR (5 zones by default)
//! - Pace zones from threshold pace (6 zones by default)
//! - Custom zones from boundary lists
//!
//! ## Example
//! ```rust
//! use run_efforts::zones::{time_in_zones, ZoneSet};
//!
//! let zones = ZoneSet::heart_rate(190.0).unwrap();
//! let times = vec![0.0, 1.0, 2.0, 3.0];
//! let hr = vec![Some(150.0), Some(150.0), Some(150.0), Some(150.0)];
//! let table = time_in_zones(&times, &hr, &zones);
//! assert_eq!(table.get("Aerobic"), Some(3.0));
//! ```

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{EffortError, Result};
use crate::series::TimeSeries;

/// Heart rate zone names and lower bounds as a fraction of max HR.
pub const HEART_RATE_ZONE_RATIOS: &[(&str, f64)] = &[
    ("Warm Up", 0.50),
    ("Easy", 0.60),
    ("Aerobic", 0.70),
    ("Threshold", 0.80),
    ("Maximum", 0.90),
];

/// Pace zone names and lower bounds as a fraction of threshold pace
/// (seconds per km, so the fastest zone comes first).
pub const PACE_ZONE_RATIOS: &[(&str, f64)] = &[
    ("Sprint", 0.0),
    ("Interval", 0.90),
    ("Threshold", 0.97),
    ("Tempo", 1.03),
    ("Steady", 1.12),
    ("Easy", 1.29),
];

fn unbounded() -> f64 {
    f64::INFINITY
}

fn is_unbounded(high: &f64) -> bool {
    *high == f64::INFINITY
}

/// A named interval over a signal's domain.
///
/// `[low, high)` unless `upper_inclusive` is set, in which case `[low, high]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub name: String,
    pub low: f64,
    /// Upper bound; omitted in JSON when open-ended
    #[serde(default = "unbounded", skip_serializing_if = "is_unbounded")]
    pub high: f64,
    #[serde(default)]
    pub upper_inclusive: bool,
}

impl Zone {
    /// Half-open zone `[low, high)`.
    pub fn new(name: &str, low: f64, high: f64) -> Self {
        Self {
            name: name.to_string(),
            low,
            high,
            upper_inclusive: false,
        }
    }

    /// Closed zone `[low, high]`.
    pub fn closed(name: &str, low: f64, high: f64) -> Self {
        Self {
            upper_inclusive: true,
            ..Self::new(name, low, high)
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        if !value.is_finite() || value < self.low {
            return false;
        }
        if self.upper_inclusive {
            value <= self.high
        } else {
            value < self.high
        }
    }

    fn validate(&self) -> Result<()> {
        if self.low.is_nan() || self.high.is_nan() || self.low >= self.high {
            return Err(EffortError::InvalidParameter(format!(
                "zone '{}' has an empty range [{}, {}]",
                self.name, self.low, self.high
            )));
        }
        Ok(())
    }
}

/// Ordered list of zones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Zone>", into = "Vec<Zone>")]
pub struct ZoneSet {
    zones: Vec<Zone>,
}

impl TryFrom<Vec<Zone>> for ZoneSet {
    type Error = EffortError;

    fn try_from(zones: Vec<Zone>) -> Result<Self> {
        ZoneSet::new(zones)
    }
}

impl From<ZoneSet> for Vec<Zone> {
    fn from(set: ZoneSet) -> Self {
        set.zones
    }
}

impl ZoneSet {
    /// Build a zone set. Zones must be non-empty ranges with unique names.
    pub fn new(zones: Vec<Zone>) -> Result<Self> {
        if zones.is_empty() {
            return Err(EffortError::InvalidParameter(
                "zone set must contain at least one zone".to_string(),
            ));
        }
        for (i, zone) in zones.iter().enumerate() {
            zone.validate()?;
            if zones[..i].iter().any(|z| z.name == zone.name) {
                return Err(EffortError::InvalidParameter(format!(
                    "duplicate zone name '{}'",
                    zone.name
                )));
            }
        }
        Ok(Self { zones })
    }

    /// Contiguous half-open zones from ascending lower bounds; the last zone
    /// is open-ended.
    pub fn from_boundaries(names: &[&str], lows: &[f64]) -> Result<Self> {
        if names.len() != lows.len() {
            return Err(EffortError::InvalidParameter(format!(
                "{} zone names for {} boundaries",
                names.len(),
                lows.len()
            )));
        }
        let zones = names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let high = lows.get(i + 1).copied().unwrap_or(f64::INFINITY);
                Zone::new(name, lows[i], high)
            })
            .collect();
        Self::new(zones)
    }

    /// Default heart rate zones for a maximum heart rate. Fails with
    /// `InvalidParameter` unless `max_heart_rate` is positive and finite.
    pub fn heart_rate(max_heart_rate: f64) -> Result<Self> {
        Self::from_ratios(HEART_RATE_ZONE_RATIOS, max_heart_rate)
    }

    /// Default pace zones for a threshold pace in seconds per km. Fails with
    /// `InvalidParameter` unless the threshold is positive and finite.
    pub fn pace(threshold_seconds_per_km: f64) -> Result<Self> {
        Self::from_ratios(PACE_ZONE_RATIOS, threshold_seconds_per_km)
    }

    fn from_ratios(ratios: &[(&str, f64)], reference: f64) -> Result<Self> {
        if !(reference.is_finite() && reference > 0.0) {
            return Err(EffortError::InvalidParameter(format!(
                "zone reference must be positive, got {}",
                reference
            )));
        }
        let zones = ratios
            .iter()
            .enumerate()
            .map(|(i, &(name, ratio))| {
                let high = ratios
                    .get(i + 1)
                    .map(|&(_, next)| next * reference)
                    .unwrap_or(f64::INFINITY);
                Zone::new(name, ratio * reference, high)
            })
            .collect();
        Self::new(zones)
    }

    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.zones.iter().map(|z| z.name.as_str()).collect()
    }

    /// Index of the first zone containing `value`.
    pub fn zone_for(&self, value: f64) -> Option<usize> {
        self.zones.iter().position(|z| z.contains(value))
    }

    /// Re-check ranges and names, e.g. after deserializing a config.
    pub fn validate(&self) -> Result<()> {
        Self::new(self.zones.clone()).map(|_| ())
    }
}

/// Seconds spent in each zone, in zone order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ZoneTimeTable {
    entries: Vec<(String, f64)>,
}

impl ZoneTimeTable {
    pub fn entries(&self) -> &[(String, f64)] {
        &self.entries
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, seconds)| *seconds)
    }

    /// Seconds by zone index.
    pub fn seconds(&self) -> Vec<f64> {
        self.entries.iter().map(|(_, s)| *s).collect()
    }

    /// Total time inside any zone. May be below the activity duration.
    pub fn total(&self) -> f64 {
        self.entries.iter().map(|(_, s)| s).sum()
    }

    /// Share of the in-zone total per zone, in percent. NaN when no time was
    /// spent in any zone.
    pub fn percentages(&self) -> Vec<f64> {
        let total = self.total();
        self.entries
            .iter()
            .map(|(_, s)| if total > 0.0 { s / total * 100.0 } else { f64::NAN })
            .collect()
    }
}

/// Accumulate time per zone.
///
/// `times` and `signal` are parallel; extra trailing values in the longer one
/// are ignored. Missing or non-finite values count as outside every zone.
pub fn time_in_zones(times: &[f64], signal: &[Option<f64>], zones: &ZoneSet) -> ZoneTimeTable {
    let n = times.len().min(signal.len());

    let entries = zones
        .zones()
        .iter()
        .map(|zone| {
            let inside = |i: usize| match signal[i] {
                Some(v) if zone.contains(v) => 1.0,
                _ => 0.0,
            };
            let seconds: f64 = (1..n)
                .map(|i| (times[i] - times[i - 1]) * (inside(i - 1) + inside(i)) * 0.5)
                .sum();
            (zone.name.clone(), seconds)
        })
        .collect::<Vec<_>>();

    let table = ZoneTimeTable { entries };
    debug!(
        "[Zones] {:.0}s in {} zones over {} samples",
        table.total(),
        zones.len(),
        n
    );
    table
}

/// Signal channel of a series to bucket into zones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneSignal {
    HeartRate,
    /// Pace in seconds per km, derived from speed
    Pace,
}

/// Time in zones for one channel of a series.
pub fn series_time_in_zones(series: &TimeSeries, signal: ZoneSignal, zones: &ZoneSet) -> ZoneTimeTable {
    let values = match signal {
        ZoneSignal::HeartRate => series.heart_rates(),
        ZoneSignal::Pace => series.paces(),
    };
    time_in_zones(&series.elapsed_times(), &values, zones)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::test_support::steady_run;

    #[test]
    fn test_constant_heart_rate() {
        let times: Vec<f64> = (0..=600).map(|i| i as f64).collect();
        let hr = vec![Some(150.0); times.len()];
        let zones = ZoneSet::new(vec![
            Zone::new("low", 100.0, 139.0),
            Zone::new("mid", 140.0, 160.0),
        ])
        .unwrap();

        let table = time_in_zones(&times, &hr, &zones);
        assert_eq!(table.get("mid"), Some(600.0));
        assert_eq!(table.get("low"), Some(0.0));
        assert_eq!(table.get("high"), None);
    }

    #[test]
    fn test_boundary_crossing_gets_half_credit() {
        let zones = ZoneSet::from_boundaries(&["a", "b"], &[0.0, 10.0]).unwrap();
        let table = time_in_zones(&[0.0, 4.0], &[Some(5.0), Some(15.0)], &zones);
        assert_eq!(table.seconds(), vec![2.0, 2.0]);
    }

    #[test]
    fn test_half_open_and_closed() {
        let open = Zone::new("z", 140.0, 160.0);
        assert!(open.contains(140.0));
        assert!(!open.contains(160.0));
        assert!(!open.contains(f64::NAN));

        let closed = Zone::closed("z", 140.0, 160.0);
        assert!(closed.contains(160.0));
    }

    #[test]
    fn test_missing_values_contribute_nothing() {
        let zones = ZoneSet::from_boundaries(&["all"], &[0.0]).unwrap();
        let times = vec![0.0, 1.0, 2.0, 3.0];
        let hr = vec![Some(120.0), None, Some(120.0), Some(120.0)];
        let table = time_in_zones(&times, &hr, &zones);
        // Intervals touching the gap get half credit each
        assert_eq!(table.get("all"), Some(2.0));
    }

    #[test]
    fn test_partition_conserves_time() {
        let zones = ZoneSet::heart_rate(200.0).unwrap();
        let times: Vec<f64> = (0..50).map(|i| i as f64 * 1.5).collect();
        let hr: Vec<Option<f64>> = (0..50).map(|i| Some(100.0 + 2.0 * i as f64)).collect();
        let table = time_in_zones(&times, &hr, &zones);
        assert!((table.total() - 73.5).abs() < 1e-9);
        assert!((table.percentages().iter().sum::<f64>() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_default_heart_rate_zones() {
        let zones = ZoneSet::heart_rate(200.0).unwrap();
        assert_eq!(
            zones.names(),
            vec!["Warm Up", "Easy", "Aerobic", "Threshold", "Maximum"]
        );
        assert_eq!(zones.zones()[0].low, 100.0);
        assert_eq!(zones.zones()[4].high, f64::INFINITY);
        assert_eq!(zones.zone_for(165.0), Some(3));
        assert_eq!(zones.zone_for(90.0), None);
    }

    #[test]
    fn test_pace_zones_from_series() {
        // 4 m/s = 250 s/km, threshold 255 s/km -> Threshold zone
        let zones = ZoneSet::pace(255.0).unwrap();
        let series = steady_run(120, 4.0, 150.0);
        let table = series_time_in_zones(&series, ZoneSignal::Pace, &zones);
        assert_eq!(table.get("Threshold"), Some(120.0));
        assert_eq!(table.total(), 120.0);
    }

    #[test]
    fn test_invalid_zone_sets() {
        assert!(ZoneSet::new(vec![]).is_err());
        assert!(ZoneSet::new(vec![Zone::new("a", 10.0, 5.0)]).is_err());
        assert!(ZoneSet::new(vec![Zone::new("a", 0.0, 5.0), Zone::new("a", 5.0, 9.0)]).is_err());
        assert!(ZoneSet::from_boundaries(&["a", "b"], &[10.0, 5.0]).is_err());
        assert!(ZoneSet::from_boundaries(&["a"], &[1.0, 2.0]).is_err());

        for reference in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                ZoneSet::heart_rate(reference),
                Err(EffortError::InvalidParameter(_))
            ));
            assert!(ZoneSet::pace(reference).is_err());
        }
    }

    #[test]
    fn test_zone_json() {
        let zones = ZoneSet::from_boundaries(&["a", "b"], &[0.0, 10.0]).unwrap();
        let json = serde_json::to_string(&zones).unwrap();
        assert_eq!(
            json,
            r#"[{"name":"a","low":0.0,"high":10.0,"upper_inclusive":false},{"name":"b","low":10.0,"upper_inclusive":false}]"#
        );
        let back: ZoneSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, zones);
        assert!(serde_json::from_str::<ZoneSet>("[]").is_err());
    }
}
