use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct AttendanceEntry {
    #[schema(example = 42)]
    pub id: u64,
    #[schema(example = 7)]
    pub user_id: u64,
    #[schema(value_type = String, format = DateTime)]
    pub check_in: DateTime<Utc>,
    /// Absent while the user is still clocked in.
    #[schema(value_type = Option<String>, format = DateTime)]
    pub check_out: Option<DateTime<Utc>>,
    /// Set once, at check-out.
    #[schema(example = 8.5)]
    pub regular_hours: Option<f64>,
    #[schema(example = 2.0)]
    pub overtime_hours: f64,
}

impl AttendanceEntry {
    pub fn is_open(&self) -> bool {
        self.check_out.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum ClockState {
    ClockedIn,
    ClockedOut,
}

/// Elapsed wall-clock time in hours, rounded to two decimals.
pub fn regular_hours_between(check_in: DateTime<Utc>, check_out: DateTime<Utc>) -> f64 {
    let millis = (check_out - check_in).num_milliseconds() as f64;
    round_hours(millis / MILLIS_PER_HOUR)
}

/// Rounds half away from zero to two decimal places.
pub fn round_hours(hours: f64) -> f64 {
    (hours * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 9, h, m, s).unwrap()
    }

    #[test]
    fn nine_to_half_past_five_is_eight_and_a_half() {
        assert_eq!(regular_hours_between(at(9, 0, 0), at(17, 30, 0)), 8.5);
    }

    #[test]
    fn rounds_to_two_decimals() {
        // 1h20m = 1.3333..
        assert_eq!(regular_hours_between(at(9, 0, 0), at(10, 20, 0)), 1.33);
        // 2h40m = 2.6666..
        assert_eq!(regular_hours_between(at(9, 0, 0), at(11, 40, 0)), 2.67);
        assert_eq!(regular_hours_between(at(9, 0, 0), at(9, 0, 0)), 0.0);
    }

    #[test]
    fn spans_midnight() {
        let start = at(22, 0, 0);
        let end = start + Duration::hours(3) + Duration::minutes(15);
        assert_eq!(regular_hours_between(start, end), 3.25);
    }
}
