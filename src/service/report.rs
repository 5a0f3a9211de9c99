//! Weekly/monthly totals and salary estimates, derived in memory from the
//! attendance ledger. Nothing here touches storage.

use chrono::{
    DateTime, Datelike, Duration, FixedOffset, Months, NaiveDate, NaiveTime, TimeZone, Utc,
};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;

use crate::error::{ServiceError, ServiceResult};
use crate::model::attendance::{AttendanceEntry, round_hours};
use crate::model::settings::{DEFAULT_HOURLY_RATE, DEFAULT_OT_HOURLY_RATE, Settings};

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Period {
    Today,
    Week,
    #[default]
    Month,
}

/// Half-open `[start, end)` interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

fn local_midnight(date: NaiveDate, offset: FixedOffset) -> DateTime<Utc> {
    let local = date.and_time(NaiveTime::MIN);
    Utc.from_utc_datetime(&(local - Duration::seconds(offset.local_minus_utc() as i64)))
}

impl Window {
    /// The calendar day, ISO week (Monday start) or month containing `now`,
    /// cut at midnight in `offset`.
    pub fn for_period(period: Period, now: DateTime<Utc>, offset: FixedOffset) -> Self {
        let today = now.with_timezone(&offset).date_naive();
        let (first, next) = match period {
            Period::Today => (today, today + Duration::days(1)),
            Period::Week => {
                let monday =
                    today - Duration::days(today.weekday().num_days_from_monday() as i64);
                (monday, monday + Duration::days(7))
            }
            Period::Month => {
                let first = today - Duration::days(today.day0() as i64);
                let next = first
                    .checked_add_months(Months::new(1))
                    .unwrap_or(NaiveDate::MAX);
                (first, next)
            }
        };
        Self {
            start: local_midnight(first, offset),
            end: local_midnight(next, offset),
        }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at < self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Rates {
    pub hourly_rate: f64,
    pub ot_hourly_rate: f64,
}

impl Default for Rates {
    fn default() -> Self {
        Self {
            hourly_rate: DEFAULT_HOURLY_RATE,
            ot_hourly_rate: DEFAULT_OT_HOURLY_RATE,
        }
    }
}

impl From<&Settings> for Rates {
    fn from(settings: &Settings) -> Self {
        Self {
            hourly_rate: settings.hourly_rate,
            ot_hourly_rate: settings.ot_hourly_rate,
        }
    }
}

impl Rates {
    /// Any finite value is accepted, including zero and negatives.
    pub fn validated(hourly_rate: f64, ot_hourly_rate: f64) -> ServiceResult<Self> {
        if !hourly_rate.is_finite() || !ot_hourly_rate.is_finite() {
            return Err(ServiceError::Validation(
                "Rates must be finite numbers.".to_string(),
            ));
        }
        Ok(Self {
            hourly_rate,
            ot_hourly_rate,
        })
    }

    pub fn salary(&self, regular_hours: f64, overtime_hours: f64) -> f64 {
        regular_hours * self.hourly_rate + overtime_hours * self.ot_hourly_rate
    }
}

/// Two decimals, the only precision hours and money are shown with.
pub fn format_hours(value: f64) -> String {
    format!("{:.2}", value)
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ReportLine {
    pub entry_id: u64,
    #[schema(value_type = String, format = Date)]
    pub date: NaiveDate,
    #[schema(value_type = String, format = DateTime)]
    pub check_in: DateTime<Utc>,
    #[schema(value_type = String, format = DateTime)]
    pub check_out: DateTime<Utc>,
    pub regular_hours: f64,
    pub overtime_hours: f64,
    pub salary: f64,
    pub regular_hours_display: String,
    pub overtime_hours_display: String,
    pub salary_display: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Summary {
    #[schema(value_type = String, format = DateTime)]
    pub window_start: DateTime<Utc>,
    #[schema(value_type = String, format = DateTime)]
    pub window_end: DateTime<Utc>,
    pub rates: Rates,
    pub lines: Vec<ReportLine>,
    /// In-window entries still clocked in; they add nothing to the totals.
    pub open_entries: usize,
    pub total_regular_hours: f64,
    pub total_overtime_hours: f64,
    pub total_salary: f64,
    pub total_regular_hours_display: String,
    pub total_overtime_hours_display: String,
    pub total_salary_display: String,
}

/// Totals for the closed entries whose check-in falls inside `window`.
/// Lines keep the order of `entries`.
pub fn summarize(
    entries: &[AttendanceEntry],
    window: &Window,
    rates: Rates,
    offset: FixedOffset,
) -> Summary {
    let mut lines = Vec::new();
    let mut open_entries = 0;
    let mut total_regular = 0.0;
    let mut total_overtime = 0.0;

    for entry in entries.iter().filter(|e| window.contains(e.check_in)) {
        let Some(check_out) = entry.check_out else {
            open_entries += 1;
            continue;
        };

        let regular = entry.regular_hours.unwrap_or(0.0);
        let overtime = entry.overtime_hours;
        let salary = rates.salary(regular, overtime);
        total_regular += regular;
        total_overtime += overtime;

        lines.push(ReportLine {
            entry_id: entry.id,
            date: entry.check_in.with_timezone(&offset).date_naive(),
            check_in: entry.check_in,
            check_out,
            regular_hours: regular,
            overtime_hours: overtime,
            salary,
            regular_hours_display: format_hours(regular),
            overtime_hours_display: format_hours(overtime),
            salary_display: format_hours(salary),
        });
    }

    let total_regular_hours = round_hours(total_regular);
    let total_overtime_hours = round_hours(total_overtime);
    let total_salary = round_hours(rates.salary(total_regular_hours, total_overtime_hours));

    Summary {
        window_start: window.start,
        window_end: window.end,
        rates,
        lines,
        open_entries,
        total_regular_hours,
        total_overtime_hours,
        total_salary,
        total_regular_hours_display: format_hours(total_regular_hours),
        total_overtime_hours_display: format_hours(total_overtime_hours),
        total_salary_display: format_hours(total_salary),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    fn closed(id: u64, check_in: DateTime<Utc>, regular: f64, overtime: f64) -> AttendanceEntry {
        AttendanceEntry {
            id,
            user_id: 1,
            check_in,
            check_out: Some(check_in + Duration::minutes((regular * 60.0) as i64)),
            regular_hours: Some(regular),
            overtime_hours: overtime,
        }
    }

    fn open(id: u64, check_in: DateTime<Utc>) -> AttendanceEntry {
        AttendanceEntry {
            id,
            user_id: 1,
            check_in,
            check_out: None,
            regular_hours: None,
            overtime_hours: 0.0,
        }
    }

    #[test]
    fn month_window() {
        let w = Window::for_period(Period::Month, at(2026, 3, 18, 15, 0), utc());
        assert_eq!(w.start, at(2026, 3, 1, 0, 0));
        assert_eq!(w.end, at(2026, 4, 1, 0, 0));

        let w = Window::for_period(Period::Month, at(2026, 12, 31, 23, 59), utc());
        assert_eq!(w.start, at(2026, 12, 1, 0, 0));
        assert_eq!(w.end, at(2027, 1, 1, 0, 0));
    }

    #[test]
    fn week_starts_monday() {
        // 2026-03-12 is a Thursday
        let w = Window::for_period(Period::Week, at(2026, 3, 12, 10, 0), utc());
        assert_eq!(w.start, at(2026, 3, 9, 0, 0));
        assert_eq!(w.end, at(2026, 3, 16, 0, 0));

        // a Sunday still belongs to the week that began six days earlier
        let w = Window::for_period(Period::Week, at(2026, 3, 15, 23, 0), utc());
        assert_eq!(w.start, at(2026, 3, 9, 0, 0));
    }

    #[test]
    fn today_window_respects_offset() {
        let plus_six = FixedOffset::east_opt(6 * 3600).unwrap();
        // 20:00 UTC on the 9th is 02:00 on the 10th at +06:00
        let w = Window::for_period(Period::Today, at(2026, 3, 9, 20, 0), plus_six);
        assert_eq!(w.start, at(2026, 3, 9, 18, 0));
        assert_eq!(w.end, at(2026, 3, 10, 18, 0));
    }

    #[test]
    fn window_is_half_open() {
        let w = Window::for_period(Period::Month, at(2026, 3, 5, 0, 0), utc());
        assert!(w.contains(at(2026, 3, 1, 0, 0)));
        assert!(!w.contains(at(2026, 4, 1, 0, 0)));
        assert!(!w.contains(at(2026, 2, 28, 23, 59)));
    }

    #[test]
    fn empty_input_gives_zero_totals() {
        let w = Window::for_period(Period::Month, at(2026, 3, 5, 0, 0), utc());
        let s = summarize(&[], &w, Rates::default(), utc());
        assert!(s.lines.is_empty());
        assert_eq!(s.open_entries, 0);
        assert_eq!(s.total_regular_hours, 0.0);
        assert_eq!(s.total_overtime_hours, 0.0);
        assert_eq!(s.total_salary, 0.0);
        assert_eq!(s.total_salary_display, "0.00");
    }

    #[test]
    fn single_day_salary() {
        let w = Window::for_period(Period::Month, at(2026, 3, 20, 0, 0), utc());
        let entries = vec![closed(1, at(2026, 3, 9, 9, 0), 8.5, 2.0)];
        let s = summarize(&entries, &w, Rates::validated(200.0, 400.0).unwrap(), utc());

        assert_eq!(s.lines.len(), 1);
        assert_eq!(s.lines[0].salary, 2500.0);
        assert_eq!(s.lines[0].regular_hours_display, "8.50");
        assert_eq!(s.lines[0].overtime_hours_display, "2.00");
        assert_eq!(s.total_regular_hours, 8.5);
        assert_eq!(s.total_overtime_hours, 2.0);
        assert_eq!(s.total_salary, 2500.0);
        assert_eq!(s.total_salary_display, "2500.00");
    }

    #[test]
    fn open_and_out_of_window_entries_do_not_count() {
        let w = Window::for_period(Period::Month, at(2026, 3, 20, 0, 0), utc());
        let entries = vec![
            open(4, at(2026, 3, 19, 9, 0)),
            closed(3, at(2026, 3, 10, 9, 0), 4.25, 0.0),
            closed(2, at(2026, 3, 9, 9, 0), 8.0, 1.0),
            closed(1, at(2026, 2, 27, 9, 0), 8.0, 0.0),
        ];
        let s = summarize(&entries, &w, Rates::default(), utc());

        assert_eq!(s.open_entries, 1);
        assert_eq!(
            s.lines.iter().map(|l| l.entry_id).collect::<Vec<_>>(),
            vec![3, 2]
        );
        assert_eq!(s.total_regular_hours, 12.25);
        assert_eq!(s.total_overtime_hours, 1.0);
        assert_eq!(s.total_salary, 12.25 * 200.0 + 400.0);
    }

    #[test]
    fn totals_do_not_drift() {
        let w = Window::for_period(Period::Month, at(2026, 3, 20, 0, 0), utc());
        let entries: Vec<_> = (0..3)
            .map(|i| closed(i, at(2026, 3, 2 + i as u32, 9, 0), 0.1, 0.2))
            .collect();
        let s = summarize(&entries, &w, Rates::default(), utc());
        assert_eq!(s.total_regular_hours, 0.3);
        assert_eq!(s.total_overtime_hours_display, "0.60");
    }

    #[test]
    fn summarizing_is_repeatable() {
        let w = Window::for_period(Period::Week, at(2026, 3, 12, 0, 0), utc());
        let entries = vec![
            closed(2, at(2026, 3, 10, 9, 0), 7.75, 0.5),
            closed(1, at(2026, 3, 9, 9, 0), 8.0, 0.0),
        ];
        let first = summarize(&entries, &w, Rates::default(), utc());
        let second = summarize(&entries, &w, Rates::default(), utc());
        assert_eq!(first, second);
    }

    #[test]
    fn rates_must_be_finite() {
        assert!(Rates::validated(f64::NAN, 400.0).is_err());
        assert!(Rates::validated(200.0, f64::INFINITY).is_err());
        assert!(Rates::validated(0.0, -1.0).is_ok());
    }

    #[test]
    fn period_parsing() {
        assert_eq!(Period::from_str("week").unwrap(), Period::Week);
        assert_eq!(Period::from_str("Month").unwrap(), Period::Month);
        assert!(Period::from_str("year").is_err());
        assert_eq!(Period::default(), Period::Month);
    }
}
