//! Fractional-hour wall-clock helpers: 10.5 means 10:30.

use chrono::{DateTime, Local};

use crate::ids::DayId;

pub fn split_hour(value: f64) -> (u32, u32) {
    let hour = value.trunc() as u32;
    let minute = ((value - value.trunc()) * 60.0).round() as u32;
    (hour, minute)
}

pub fn fmt_hour(value: f64) -> String {
    let (hour, minute) = split_hour(value);
    format!("{:02}:{:02}", hour, minute)
}

pub fn fmt_range(start: f64, end: f64) -> String {
    format!("{} - {}", fmt_hour(start), fmt_hour(end))
}

/// Wall-clock instant for a fractional hour on the given day.
pub fn at_hour(day: DayId, value: f64) -> DateTime<Local> {
    day.local() + chrono::Duration::minutes((value * 60.0).round() as i64)
}

/// Every whole hour a `[start, end)` interval touches.
pub fn occupied_hours(start: f64, end: f64) -> std::ops::Range<u32> {
    let first = start.floor() as u32;
    let last = (end.ceil() as u32).max(first + 1);
    first..last
}

#[cfg(test)]
mod tests {
    use chrono::Timelike as _;

    use super::*;

    #[test]
    fn test_fmt_hour() {
        assert_eq!("09:00", fmt_hour(9.0));
        assert_eq!("10:30", fmt_hour(10.5));
        assert_eq!("22:45", fmt_hour(22.75));
        assert_eq!("08:00 - 22:00", fmt_range(8.0, 22.0));
    }

    #[test]
    fn test_at_hour() {
        let day = DayId::from_date(chrono::NaiveDate::from_ymd_opt(2024, 6, 10).unwrap());
        let at = at_hour(day, 10.5);
        assert_eq!(10, at.hour());
        assert_eq!(30, at.minute());
    }

    #[test]
    fn test_occupied_hours() {
        assert_eq!(10..11, occupied_hours(10.0, 11.0));
        assert_eq!(10..12, occupied_hours(10.5, 11.5));
        assert_eq!(9..12, occupied_hours(9.0, 11.5));
        // degenerate interval still occupies its starting hour
        assert_eq!(10..11, occupied_hours(10.0, 10.0));
    }
}
