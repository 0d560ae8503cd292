use bson::oid::ObjectId;
use chrono::{DateTime, Local, Utc, Weekday};
use serde::{Deserialize, Serialize};
use strum::Display;

use crate::{
    decimal::Decimal,
    hours::{at_hour, occupied_hours},
    ids::DayId,
};

/// A time-boxed session on a court. `start_time`/`end_time` are fractional
/// hours on `date`; `customer` and `group` are mutually exclusive.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Booking {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub number: u64,
    pub court: ObjectId,
    pub trainer: ObjectId,
    pub training_type: ObjectId,
    pub center: ObjectId,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub date: DateTime<Utc>,
    pub start_time: f64,
    pub end_time: f64,
    pub state: BookingState,
    pub customer: Option<ObjectId>,
    pub group: Option<ObjectId>,
    #[serde(default)]
    pub participants: Vec<ObjectId>,
    #[serde(default)]
    pub one_day_sent: bool,
    #[serde(default)]
    pub two_hour_sent: bool,
    #[serde(default)]
    pub self_booked: bool,
    /// Recorded on confirm; cancellation credits back exactly these amounts.
    #[serde(default)]
    pub charges: Vec<Charge>,
    pub recurrence: Option<Recurrence>,
    #[serde(default)]
    pub version: u64,
}

impl Booking {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        number: u64,
        court: ObjectId,
        trainer: ObjectId,
        training_type: ObjectId,
        center: ObjectId,
        day: DayId,
        start_time: f64,
        end_time: f64,
        customer: Option<ObjectId>,
        group: Option<ObjectId>,
    ) -> Booking {
        Booking {
            id: ObjectId::new(),
            number,
            court,
            trainer,
            training_type,
            center,
            date: day.id(),
            start_time,
            end_time,
            state: BookingState::Draft,
            customer,
            group,
            participants: Vec::new(),
            one_day_sent: false,
            two_hour_sent: false,
            self_booked: false,
            charges: Vec::new(),
            recurrence: None,
            version: 0,
        }
    }

    pub fn day(&self) -> DayId {
        DayId::from(self.date)
    }

    pub fn start_at(&self) -> DateTime<Local> {
        at_hour(self.day(), self.start_time)
    }

    pub fn end_at(&self) -> DateTime<Local> {
        at_hour(self.day(), self.end_time)
    }

    pub fn duration_hours(&self) -> f64 {
        self.end_time - self.start_time
    }

    /// Whole hours the booking occupies on its day.
    pub fn occupied(&self) -> std::ops::Range<u32> {
        occupied_hours(self.start_time, self.end_time)
    }

    /// Same court, same day, time ranges overlap. State filtering is the
    /// caller's concern.
    pub fn overlaps(&self, other: &Booking) -> bool {
        self.court == other.court
            && self.date == other.date
            && self.start_time < other.end_time
            && other.start_time < self.end_time
    }

    /// Time-driven follow-up state, if the booking is due for one.
    pub fn due_transition(&self, now: DateTime<Local>) -> Option<BookingState> {
        match self.state {
            BookingState::Confirmed if now >= self.start_at() => Some(BookingState::InProgress),
            BookingState::InProgress if now >= self.end_at() => Some(BookingState::Completed),
            _ => None,
        }
    }

    pub fn needs_one_day_reminder(&self, now: DateTime<Local>) -> bool {
        self.state == BookingState::Confirmed
            && !self.one_day_sent
            && self.day() == DayId::new(now).next()
    }

    pub fn needs_two_hour_reminder(&self, now: DateTime<Local>) -> bool {
        if self.state != BookingState::Confirmed || self.two_hour_sent {
            return false;
        }
        let start = self.start_at();
        start >= now + chrono::Duration::hours(2)
            && start <= now + chrono::Duration::minutes(150)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default, Display)]
#[serde(rename_all = "snake_case")]
pub enum BookingState {
    #[default]
    Draft,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
}

impl BookingState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingState::Completed | BookingState::Cancelled)
    }

    /// States that occupy the court for conflict purposes.
    pub fn is_active(&self) -> bool {
        matches!(self, BookingState::Confirmed | BookingState::InProgress)
    }

    pub fn can_confirm(&self) -> bool {
        matches!(self, BookingState::Draft)
    }

    pub fn can_cancel(&self) -> bool {
        matches!(self, BookingState::Draft | BookingState::Confirmed)
    }

    /// Administrative reset; terminal `Completed`/`Cancelled` stay terminal.
    pub fn can_reset(&self) -> bool {
        matches!(self, BookingState::Confirmed | BookingState::InProgress)
    }
}

/// A single ledger debit applied on confirmation.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct Charge {
    pub account: ObjectId,
    pub amount: Decimal,
}

/// Rule for expanding a template booking into future drafts.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Recurrence {
    pub months: u32,
    pub times_per_week: u32,
    /// Weekday numbers, 0 = Monday. Empty means the template's own weekday.
    #[serde(default)]
    pub weekdays: Vec<u32>,
    pub start_time: Option<f64>,
    pub end_time: Option<f64>,
}

impl Recurrence {
    pub fn weekday_set(&self, fallback: Weekday) -> Vec<Weekday> {
        if self.weekdays.is_empty() {
            return vec![fallback];
        }
        self.weekdays
            .iter()
            .filter_map(|d| Weekday::try_from(*d as u8).ok())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone as _};

    use super::*;

    fn day() -> DayId {
        DayId::from_date(NaiveDate::from_ymd_opt(2024, 6, 10).unwrap())
    }

    fn booking(start: f64, end: f64) -> Booking {
        Booking::new(
            1,
            ObjectId::new(),
            ObjectId::new(),
            ObjectId::new(),
            ObjectId::new(),
            day(),
            start,
            end,
            Some(ObjectId::new()),
            None,
        )
    }

    fn at(hour: u32, minute: u32) -> DateTime<Local> {
        Local
            .with_ymd_and_hms(2024, 6, 10, hour, minute, 0)
            .single()
            .unwrap()
    }

    #[test]
    fn test_overlap_same_court() {
        let mut a = booking(10.0, 11.0);
        let mut b = booking(10.5, 11.5);
        b.court = a.court;
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));

        // adjacent intervals do not overlap
        let mut c = booking(11.0, 12.0);
        c.court = a.court;
        assert!(!a.overlaps(&c));

        // identical range is a conflict
        let mut d = booking(10.0, 11.0);
        d.court = a.court;
        assert!(a.overlaps(&d));

        // other court never conflicts
        let e = booking(10.0, 11.0);
        assert!(!a.overlaps(&e));

        // other day never conflicts
        let mut f = booking(10.0, 11.0);
        f.court = a.court;
        f.date = day().next().id();
        assert!(!a.overlaps(&f));

        a.start_time = 9.0;
        a.end_time = 13.0;
        b.start_time = 10.0;
        b.end_time = 11.0;
        assert!(a.overlaps(&b));
    }

    #[test]
    fn test_occupied_hours() {
        assert_eq!(10..11, booking(10.0, 11.0).occupied());
        assert_eq!(10..12, booking(10.5, 11.5).occupied());
    }

    #[test]
    fn test_due_transition() {
        let mut b = booking(10.0, 11.0);
        assert_eq!(None, b.due_transition(at(10, 30)));

        b.state = BookingState::Confirmed;
        assert_eq!(None, b.due_transition(at(9, 59)));
        assert_eq!(
            Some(BookingState::InProgress),
            b.due_transition(at(10, 0))
        );

        b.state = BookingState::InProgress;
        assert_eq!(None, b.due_transition(at(10, 59)));
        assert_eq!(Some(BookingState::Completed), b.due_transition(at(11, 0)));

        b.state = BookingState::Completed;
        assert_eq!(None, b.due_transition(at(12, 0)));
    }

    #[test]
    fn test_state_predicates() {
        assert!(BookingState::Draft.can_confirm());
        assert!(!BookingState::Confirmed.can_confirm());
        assert!(BookingState::Draft.can_cancel());
        assert!(BookingState::Confirmed.can_cancel());
        assert!(!BookingState::InProgress.can_cancel());
        assert!(!BookingState::Cancelled.can_cancel());
        assert!(BookingState::Confirmed.is_active());
        assert!(BookingState::InProgress.is_active());
        assert!(!BookingState::Draft.is_active());
        assert!(BookingState::Confirmed.can_reset());
        assert!(!BookingState::Completed.can_reset());
    }

    #[test]
    fn test_reminder_windows() {
        let mut b = booking(12.0, 13.0);
        b.state = BookingState::Confirmed;

        let yesterday = Local
            .with_ymd_and_hms(2024, 6, 9, 15, 0, 0)
            .single()
            .unwrap();
        assert!(b.needs_one_day_reminder(yesterday));
        assert!(!b.needs_one_day_reminder(at(8, 0)));

        b.one_day_sent = true;
        assert!(!b.needs_one_day_reminder(yesterday));

        assert!(b.needs_two_hour_reminder(at(9, 45)));
        assert!(!b.needs_two_hour_reminder(at(9, 15)));
        assert!(!b.needs_two_hour_reminder(at(10, 30)));

        b.two_hour_sent = true;
        assert!(!b.needs_two_hour_reminder(at(9, 45)));
    }

    #[test]
    fn test_weekday_set_fallback() {
        let rule = Recurrence {
            months: 1,
            times_per_week: 1,
            weekdays: vec![],
            start_time: None,
            end_time: None,
        };
        assert_eq!(vec![Weekday::Mon], rule.weekday_set(Weekday::Mon));

        let rule = Recurrence {
            months: 1,
            times_per_week: 2,
            weekdays: vec![0, 3],
            start_time: None,
            end_time: None,
        };
        assert_eq!(
            vec![Weekday::Mon, Weekday::Thu],
            rule.weekday_set(Weekday::Fri)
        );
    }
}
