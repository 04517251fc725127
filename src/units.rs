//! Unit conversions for raw recording values.
//!
//! Recordings store positions in semicircles, cadence as leg revolutions per
//! minute plus a fractional part, and speed in m/s. Everything downstream
//! works in degrees, steps per minute and pace per kilometre.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Half marathon distance in meters
pub const HALF_MARATHON_METERS: f64 = 21_097.5;

/// Marathon distance in meters
pub const MARATHON_METERS: f64 = 42_195.0;

/// One statute mile in meters
pub const MILE_METERS: f64 = 1_609.34;

/// Slowest speed considered when converting to pace (60:00/km).
pub const MIN_PACE_SPEED: f64 = 1.0 / 3.6;

/// Semicircle to degree factor (2^31 semicircles = 180 degrees).
const SEMICIRCLE_TO_DEGREES: f64 = 180.0 / 2_147_483_648.0;

/// Convert a raw semicircle angle to degrees.
pub fn semicircles_to_degrees(semicircles: i32) -> f64 {
    semicircles as f64 * SEMICIRCLE_TO_DEGREES
}

/// Convert raw cadence (leg RPM) and its fractional part to steps per minute.
///
/// One leg revolution is two steps; the fractional part is what allows odd
/// step counts.
pub fn rpm_to_steps_per_minute(cadence_rpm: f64, fractional_cadence: f64) -> f64 {
    (cadence_rpm + fractional_cadence) * 2.0
}

/// Convert m/s to km/h.
pub fn speed_to_kph(speed_ms: f64) -> f64 {
    speed_ms * 3.6
}

/// Pace as seconds per kilometre.
///
/// Displayed like a clock duration (`4:10/km`), which is how runners read it.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Pace {
    pub seconds_per_km: f64,
}

impl Pace {
    pub fn from_seconds_per_km(seconds_per_km: f64) -> Self {
        Self { seconds_per_km }
    }

    /// Pace of covering `distance_m` in `time_s`.
    pub fn from_distance_time(distance_m: f64, time_s: f64) -> Self {
        if time_s > 0.0 {
            speed_to_pace(distance_m / time_s)
        } else {
            speed_to_pace(f64::NAN)
        }
    }

    pub fn is_valid(&self) -> bool {
        self.seconds_per_km.is_finite() && self.seconds_per_km > 0.0
    }

    /// Pace as a chrono duration per kilometre.
    pub fn as_duration(&self) -> Option<chrono::Duration> {
        if !self.is_valid() {
            return None;
        }
        chrono::Duration::try_milliseconds((self.seconds_per_km * 1000.0).round() as i64)
    }

    /// Zero-padded `MM:SS`, as used in joined lap strings.
    pub fn format_mm_ss(&self) -> String {
        if !self.is_valid() {
            return "--:--".to_string();
        }
        let total = self.seconds_per_km.round() as u64;
        format!("{:02}:{:02}", total / 60, total % 60)
    }
}

impl fmt::Display for Pace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_valid() {
            return write!(f, "N/A");
        }
        let total = self.seconds_per_km.round() as u64;
        write!(f, "{}:{:02}/km", total / 60, total % 60)
    }
}

/// Convert a speed in m/s to pace.
///
/// Speeds below [`MIN_PACE_SPEED`] (including zero) clamp to 60:00/km so a
/// standing runner never yields an infinite pace. NaN stays NaN.
pub fn speed_to_pace(speed_ms: f64) -> Pace {
    if speed_ms.is_nan() {
        return Pace::from_seconds_per_km(f64::NAN);
    }
    Pace::from_seconds_per_km(1000.0 / speed_ms.max(MIN_PACE_SPEED))
}

/// Convert a pace back to a speed in m/s.
pub fn pace_to_speed(pace: Pace) -> f64 {
    1000.0 / pace.seconds_per_km
}

/// Format seconds as `H:MM:SS` (or `M:SS` under an hour). Negative values get a
/// leading minus instead of wrapping around.
pub fn format_duration(seconds: f64) -> String {
    if !seconds.is_finite() {
        return "N/A".to_string();
    }
    if seconds < 0.0 {
        return format!("-{}", format_duration(-seconds));
    }
    let total = seconds.round() as u64;
    let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
    if h > 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{}:{:02}", m, s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_semicircles() {
        assert!((semicircles_to_degrees(1 << 30) - 90.0).abs() < 1e-12);
        assert!((semicircles_to_degrees(-(1 << 30)) + 90.0).abs() < 1e-12);
        assert_eq!(semicircles_to_degrees(0), 0.0);
    }

    #[test]
    fn test_cadence() {
        assert_eq!(rpm_to_steps_per_minute(85.0, 0.0), 170.0);
        assert_eq!(rpm_to_steps_per_minute(85.0, 0.5), 171.0);
    }

    #[test]
    fn test_pace_from_speed() {
        // 4 m/s = 4:10/km
        let pace = speed_to_pace(4.0);
        assert!((pace.seconds_per_km - 250.0).abs() < 1e-9);
        assert_eq!(pace.to_string(), "4:10/km");
        assert_eq!(pace.format_mm_ss(), "04:10");
        assert_eq!(
            pace.as_duration(),
            Some(chrono::Duration::milliseconds(250_000))
        );
    }

    #[test]
    fn test_pace_clamped_when_standing() {
        assert_eq!(speed_to_pace(0.0).seconds_per_km, 3600.0);
        assert_eq!(speed_to_pace(0.1).format_mm_ss(), "60:00");
        assert!(!speed_to_pace(f64::NAN).is_valid());
        assert_eq!(speed_to_pace(f64::NAN).to_string(), "N/A");
    }

    #[test]
    fn test_pace_speed_round_trip() {
        for speed in [0.5, 1.0, 2.75, 4.0, 5.5, 7.3, 10.0] {
            let back = pace_to_speed(speed_to_pace(speed));
            assert!((back - speed).abs() < 1e-12, "{} -> {}", speed, back);
        }
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(59.6), "1:00");
        assert_eq!(format_duration(1_234.0), "20:34");
        assert_eq!(format_duration(3_723.0), "1:02:03");
        assert_eq!(format_duration(-65.0), "-1:05");
        assert_eq!(format_duration(f64::NAN), "N/A");
    }
}
