use bson::oid::ObjectId;
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::DayId;

/// A published working interval `[start_at, end_at)` for a trainer at a
/// center. Intervals may overlap; a day's working hours are the union of
/// every interval touching it.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Availability {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub trainer: ObjectId,
    pub center: ObjectId,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub start_at: DateTime<Utc>,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub end_at: DateTime<Utc>,
}

impl Availability {
    pub fn new(
        trainer: ObjectId,
        center: ObjectId,
        start_at: DateTime<Local>,
        end_at: DateTime<Local>,
    ) -> Availability {
        Availability {
            id: ObjectId::new(),
            trainer,
            center,
            start_at: start_at.with_timezone(&Utc),
            end_at: end_at.with_timezone(&Utc),
        }
    }

    pub fn start_local(&self) -> DateTime<Local> {
        self.start_at.with_timezone(&Local)
    }

    pub fn end_local(&self) -> DateTime<Local> {
        self.end_at.with_timezone(&Local)
    }

    pub fn duration_hours(&self) -> f64 {
        (self.end_at - self.start_at).num_minutes() as f64 / 60.0
    }

    pub fn covers(&self, from: DateTime<Local>, to: DateTime<Local>) -> bool {
        self.start_local() <= from && self.end_local() >= to
    }

    /// Part of the interval falling on the given day, or None.
    pub fn clip_to_day(&self, day: DayId) -> Option<(DateTime<Local>, DateTime<Local>)> {
        let day_start = day.local();
        let day_end = day.next().local();
        let start = self.start_local().max(day_start);
        let end = self.end_local().min(day_end);
        if start < end {
            Some((start, end))
        } else {
            None
        }
    }
}

/// Merged union of all intervals touching the given day, ascending.
pub fn working_hours(
    day: DayId,
    availability: &[Availability],
) -> Vec<(DateTime<Local>, DateTime<Local>)> {
    let mut clipped: Vec<_> = availability
        .iter()
        .filter_map(|a| a.clip_to_day(day))
        .collect();
    clipped.sort_by_key(|(start, _)| *start);

    let mut merged: Vec<(DateTime<Local>, DateTime<Local>)> = Vec::new();
    for (start, end) in clipped {
        match merged.last_mut() {
            Some((_, last_end)) if start <= *last_end => {
                if end > *last_end {
                    *last_end = end;
                }
            }
            _ => merged.push((start, end)),
        }
    }
    merged
}

/// Whole hours of the day fully covered by the trainer's working hours.
pub fn covered_hours(day: DayId, availability: &[Availability]) -> Vec<u32> {
    let mut hours = Vec::new();
    for (start, end) in working_hours(day, availability) {
        let mut current = start;
        let offset_min = (current - day.local()).num_minutes();
        if offset_min % 60 != 0 {
            // partial leading hour is not bookable as a whole slot
            current = day.local() + chrono::Duration::minutes((offset_min / 60 + 1) * 60);
        }
        while current + chrono::Duration::hours(1) <= end {
            let hour = (current - day.local()).num_hours() as u32;
            hours.push(hour);
            current += chrono::Duration::hours(1);
        }
    }
    hours.sort_unstable();
    hours.dedup();
    hours
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::hours::at_hour;

    fn day() -> DayId {
        DayId::from_date(NaiveDate::from_ymd_opt(2024, 6, 10).unwrap())
    }

    fn avail(start: f64, end: f64) -> Availability {
        Availability::new(
            ObjectId::new(),
            ObjectId::new(),
            at_hour(day(), start),
            at_hour(day(), end),
        )
    }

    #[test]
    fn test_covers() {
        let a = avail(9.0, 17.0);
        assert!(a.covers(at_hour(day(), 10.0), at_hour(day(), 11.0)));
        assert!(a.covers(at_hour(day(), 9.0), at_hour(day(), 17.0)));
        assert!(!a.covers(at_hour(day(), 8.0), at_hour(day(), 10.0)));
        assert!(!a.covers(at_hour(day(), 16.0), at_hour(day(), 18.0)));
    }

    #[test]
    fn test_covered_hours_single_window() {
        let hours = covered_hours(day(), &[avail(9.0, 17.0)]);
        assert_eq!((9..17).collect::<Vec<u32>>(), hours);
    }

    #[test]
    fn test_covered_hours_union_of_adjacent_windows() {
        let hours = covered_hours(day(), &[avail(9.0, 9.5), avail(9.5, 12.0)]);
        assert_eq!(vec![9, 10, 11], hours);
    }

    #[test]
    fn test_covered_hours_overlapping_windows() {
        let hours = covered_hours(day(), &[avail(9.0, 11.0), avail(10.0, 13.0)]);
        assert_eq!(vec![9, 10, 11, 12], hours);
    }

    #[test]
    fn test_covered_hours_partial_window_is_not_bookable() {
        let hours = covered_hours(day(), &[avail(9.5, 10.5)]);
        assert!(hours.is_empty());
    }

    #[test]
    fn test_no_availability_means_no_hours() {
        assert!(covered_hours(day(), &[]).is_empty());
    }

    #[test]
    fn test_clip_to_day_spanning_midnight() {
        let a = Availability::new(
            ObjectId::new(),
            ObjectId::new(),
            at_hour(day().prev(), 22.0),
            at_hour(day(), 2.0),
        );
        let (start, end) = a.clip_to_day(day()).unwrap();
        assert_eq!(day().local(), start);
        assert_eq!(at_hour(day(), 2.0), end);
        assert!(a.clip_to_day(day().next()).is_none());
    }

    #[test]
    fn test_duration_hours() {
        assert_eq!(8.0, avail(9.0, 17.0).duration_hours());
        assert_eq!(1.5, avail(9.0, 10.5).duration_hours());
    }
}
