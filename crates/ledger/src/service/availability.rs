use chrono::{DateTime, Datelike as _, Local, NaiveDate, Timelike as _, Weekday};
use eyre::Error;
use log::info;
use model::{
    availability::{covered_hours, Availability},
    hours::{at_hour, fmt_hour, occupied_hours},
    ids::DayId,
    session::Session,
};
use mongodb::bson::oid::ObjectId;
use storage::{
    availability::AvailabilityStore, bookings::BookingStore, centers::CenterStore,
    courts::CourtStore, trainers::TrainerStore,
};
use thiserror::Error;
use tx_macro::tx;

/// Bulk generation cap; one oversized request must not hold a transaction
/// open for hundreds of writes.
pub const MAX_GENERATED_RECORDS: usize = 500;

/// A bookable whole-hour start time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FreeSlot {
    pub hour: u32,
    pub label: String,
}

impl FreeSlot {
    fn new(hour: u32) -> FreeSlot {
        FreeSlot {
            hour,
            label: fmt_hour(hour as f64),
        }
    }
}

#[derive(Clone)]
pub struct AvailabilityService {
    availability: AvailabilityStore,
    bookings: BookingStore,
    centers: CenterStore,
    courts: CourtStore,
    trainers: TrainerStore,
}

impl AvailabilityService {
    pub fn new(
        availability: AvailabilityStore,
        bookings: BookingStore,
        centers: CenterStore,
        courts: CourtStore,
        trainers: TrainerStore,
    ) -> AvailabilityService {
        AvailabilityService {
            availability,
            bookings,
            centers,
            courts,
            trainers,
        }
    }

    /// Free hourly slots on a court for a day, optionally narrowed to hours
    /// the trainer is available. Read-only.
    pub async fn free_slots(
        &self,
        session: &mut Session,
        court: ObjectId,
        day: DayId,
        trainer: Option<ObjectId>,
        now: DateTime<Local>,
    ) -> Result<Vec<FreeSlot>, AvailabilityError> {
        let court = self
            .courts
            .get_by_id(session, court)
            .await?
            .ok_or(AvailabilityError::CourtNotFound)?;
        let center = self
            .centers
            .get_by_id(session, court.center)
            .await?
            .ok_or_else(|| eyre::eyre!("Center not found: {}", court.center))?;

        let booked: Vec<(f64, f64)> = self
            .bookings
            .find_active_on(session, court.id, day)
            .await?
            .iter()
            .map(|b| (b.start_time, b.end_time))
            .collect();

        let covered = match trainer {
            Some(trainer) => {
                // availability published at another center never frees hours here
                let touching = self
                    .availability
                    .find_touching(session, trainer, Some(court.center), day.id(), day.next().id())
                    .await?;
                Some(covered_hours(day, &touching))
            }
            None => None,
        };

        let elapsed = if day == DayId::new(now) {
            Some(now.hour() as f64 + now.minute() as f64 / 60.0)
        } else {
            None
        };

        Ok(compute_free_slots(
            center.work_start,
            center.work_end,
            &booked,
            covered.as_deref(),
            elapsed,
        ))
    }

    /// Creates one availability record per matching day in the range, then
    /// refreshes monthly hours once per touched month.
    #[tx]
    pub async fn generate(
        &self,
        session: &mut Session,
        trainer: ObjectId,
        center: ObjectId,
        date_start: NaiveDate,
        date_end: NaiveDate,
        start_time: f64,
        end_time: f64,
        weekdays: Option<Vec<Weekday>>,
    ) -> Result<usize, AvailabilityError> {
        if date_end < date_start {
            return Err(AvailabilityError::InvalidRange(
                "End date is before start date",
            ));
        }
        if end_time <= start_time {
            return Err(AvailabilityError::InvalidRange(
                "End time must be after start time",
            ));
        }

        let days = matching_days(date_start, date_end, weekdays.as_deref());
        if days.len() > MAX_GENERATED_RECORDS {
            return Err(AvailabilityError::TooManyRecords {
                requested: days.len(),
                max: MAX_GENERATED_RECORDS,
            });
        }
        if days.is_empty() {
            return Ok(0);
        }

        let records: Vec<Availability> = days
            .iter()
            .map(|date| {
                let day = DayId::from_date(*date);
                Availability::new(trainer, center, at_hour(day, start_time), at_hour(day, end_time))
            })
            .collect();
        self.availability.insert_many(session, &records).await?;

        let mut months: Vec<NaiveDate> = days
            .iter()
            .filter_map(|d| d.with_day(1))
            .collect();
        months.sort_unstable();
        months.dedup();
        for month in months {
            self.recompute_hours(session, trainer, month).await?;
        }

        info!(
            "Generated {} availability records for trainer {}",
            records.len(),
            trainer
        );
        Ok(records.len())
    }

    #[tx]
    pub async fn remove(
        &self,
        session: &mut Session,
        id: ObjectId,
    ) -> Result<(), AvailabilityError> {
        let removed = self
            .availability
            .delete(session, id)
            .await?
            .ok_or(AvailabilityError::NotFound)?;
        if let Some(month) = removed.start_local().date_naive().with_day(1) {
            self.recompute_hours(session, removed.trainer, month).await?;
        }
        Ok(())
    }

    /// Sums availability durations clipped to the month and stores the
    /// metric on the trainer.
    pub async fn recompute_hours(
        &self,
        session: &mut Session,
        trainer: ObjectId,
        month_anchor: NaiveDate,
    ) -> Result<(), Error> {
        let month_start = DayId::from_date(month_anchor);
        let next_month = month_anchor
            .checked_add_months(chrono::Months::new(1))
            .unwrap_or(month_anchor);
        let month_end = DayId::from_date(next_month);

        let touching = self
            .availability
            .find_touching(session, trainer, None, month_start.id(), month_end.id())
            .await?;
        let hours: f64 = touching
            .iter()
            .map(|a| {
                let start = a.start_local().max(month_start.local());
                let end = a.end_local().min(month_end.local());
                (end - start).num_minutes().max(0) as f64 / 60.0
            })
            .sum();

        self.trainers
            .set_monthly_hours(session, trainer, hours)
            .await?;
        Ok(())
    }
}

/// Hour-grid computation behind `free_slots`. `covered` is `Some` when a
/// trainer filter applies; an empty list then means no coverage at all.
pub fn compute_free_slots(
    work_start: f64,
    work_end: f64,
    booked: &[(f64, f64)],
    covered: Option<&[u32]>,
    elapsed: Option<f64>,
) -> Vec<FreeSlot> {
    let mut slots = Vec::new();
    for hour in (work_start.ceil() as u32)..(work_end.floor() as u32) {
        if let Some(after) = elapsed {
            if (hour as f64) < after {
                continue;
            }
        }
        if booked
            .iter()
            .any(|(start, end)| occupied_hours(*start, *end).contains(&hour))
        {
            continue;
        }
        if let Some(covered) = covered {
            if !covered.contains(&hour) {
                continue;
            }
        }
        slots.push(FreeSlot::new(hour));
    }
    slots
}

/// Days in `[start, end]` matching the weekday filter, ascending.
pub fn matching_days(
    start: NaiveDate,
    end: NaiveDate,
    weekdays: Option<&[Weekday]>,
) -> Vec<NaiveDate> {
    let mut days = Vec::new();
    let mut day = start;
    while day <= end {
        let matches = match weekdays {
            Some(filter) => filter.contains(&day.weekday()),
            None => true,
        };
        if matches {
            days.push(day);
        }
        day += chrono::Duration::days(1);
    }
    days
}

#[derive(Debug, Error)]
pub enum AvailabilityError {
    #[error("Court not found")]
    CourtNotFound,
    #[error("Availability not found")]
    NotFound,
    #[error("{0}")]
    InvalidRange(&'static str),
    #[error("Too many records to generate at once: {requested} (max {max})")]
    TooManyRecords { requested: usize, max: usize },
    #[error("{0:?}")]
    Common(#[from] eyre::Error),
}

impl From<mongodb::error::Error> for AvailabilityError {
    fn from(value: mongodb::error::Error) -> Self {
        AvailabilityError::Common(value.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hours(slots: &[FreeSlot]) -> Vec<u32> {
        slots.iter().map(|s| s.hour).collect()
    }

    #[test]
    fn test_open_hours_only() {
        let slots = compute_free_slots(8.0, 22.0, &[], None, None);
        assert_eq!((8..22).collect::<Vec<u32>>(), hours(&slots));
        assert_eq!("08:00", slots[0].label);
    }

    #[test]
    fn test_booked_hours_are_removed() {
        let slots = compute_free_slots(8.0, 12.0, &[(9.0, 10.0), (10.5, 11.5)], None, None);
        assert_eq!(vec![8], hours(&slots));
    }

    #[test]
    fn test_trainer_window_intersection() {
        // court open 08-22, trainer available 09-17, one confirmed 10-11
        let covered: Vec<u32> = (9..17).collect();
        let slots = compute_free_slots(8.0, 22.0, &[(10.0, 11.0)], Some(&covered), None);
        assert_eq!(vec![9, 11, 12, 13, 14, 15, 16], hours(&slots));
    }

    #[test]
    fn test_no_coverage_means_empty() {
        let slots = compute_free_slots(8.0, 22.0, &[], Some(&[]), None);
        assert!(slots.is_empty());
    }

    #[test]
    fn test_elapsed_hours_are_dropped() {
        let slots = compute_free_slots(8.0, 12.0, &[], None, Some(10.5));
        assert_eq!(vec![11], hours(&slots));

        // exactly on the hour boundary the hour is still bookable
        let slots = compute_free_slots(8.0, 12.0, &[], None, Some(10.0));
        assert_eq!(vec![10, 11], hours(&slots));
    }

    #[test]
    fn test_fractional_open_hours() {
        let slots = compute_free_slots(8.5, 21.5, &[], None, None);
        assert_eq!((9..21).collect::<Vec<u32>>(), hours(&slots));
    }

    #[test]
    fn test_matching_days_weekday_filter() {
        let start = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap(); // Monday
        let end = NaiveDate::from_ymd_opt(2024, 6, 23).unwrap();
        let days = matching_days(start, end, Some(&[Weekday::Mon, Weekday::Wed]));
        assert_eq!(
            vec![
                NaiveDate::from_ymd_opt(2024, 6, 10).unwrap(),
                NaiveDate::from_ymd_opt(2024, 6, 12).unwrap(),
                NaiveDate::from_ymd_opt(2024, 6, 17).unwrap(),
                NaiveDate::from_ymd_opt(2024, 6, 19).unwrap(),
            ],
            days
        );

        let all = matching_days(start, end, None);
        assert_eq!(14, all.len());
    }
}
