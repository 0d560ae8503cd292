use model::{booking::Booking, court::CourtState, hours::fmt_range, session::Session};
use storage::{
    availability::AvailabilityStore, bookings::BookingStore, centers::CenterStore,
    courts::CourtStore,
};
use thiserror::Error;

/// Validates a candidate booking against every placement rule. Runs inside
/// the same transaction as the write it protects; callers also bump the
/// slot marker (`BookingStore::reserve_slot`) so two transactions on the
/// same court and day conflict instead of both validating against stale
/// snapshots.
#[derive(Clone)]
pub struct Guard {
    availability: AvailabilityStore,
    bookings: BookingStore,
    centers: CenterStore,
    courts: CourtStore,
}

impl Guard {
    pub fn new(
        availability: AvailabilityStore,
        bookings: BookingStore,
        centers: CenterStore,
        courts: CourtStore,
    ) -> Guard {
        Guard {
            availability,
            bookings,
            centers,
            courts,
        }
    }

    pub async fn validate(
        &self,
        session: &mut Session,
        candidate: &Booking,
    ) -> Result<(), BookingRuleError> {
        if candidate.end_time <= candidate.start_time {
            return Err(BookingRuleError::InvalidTimeRange);
        }

        let court = self
            .courts
            .get_by_id(session, candidate.court)
            .await?
            .ok_or(BookingRuleError::CourtNotFound)?;
        if !court.is_bookable() {
            return Err(BookingRuleError::CourtUnavailable(court.state));
        }

        let center = self
            .centers
            .get_by_id(session, court.center)
            .await?
            .ok_or_else(|| eyre::eyre!("Center not found: {}", court.center))?;
        if candidate.start_time < center.work_start || candidate.end_time > center.work_end {
            return Err(BookingRuleError::OutOfHours {
                work_hours: fmt_range(center.work_start, center.work_end),
            });
        }

        let occupying = self
            .bookings
            .find_active_on(session, candidate.court, candidate.day())
            .await?;
        for other in &occupying {
            if other.id != candidate.id && candidate.overlaps(other) {
                return Err(BookingRuleError::Conflict { with: other.number });
            }
        }

        let covering = self
            .availability
            .find_covering(
                session,
                candidate.trainer,
                candidate.center,
                candidate.start_at().to_utc(),
                candidate.end_at().to_utc(),
            )
            .await?;
        if covering.is_none() {
            return Err(BookingRuleError::TrainerUnavailable);
        }

        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum BookingRuleError {
    #[error("End time must be after start time")]
    InvalidTimeRange,
    #[error("Court not found")]
    CourtNotFound,
    #[error("Court is not available: {0}")]
    CourtUnavailable(CourtState),
    #[error("Booking is outside of work hours: {work_hours}")]
    OutOfHours { work_hours: String },
    #[error("Time slot is already taken by booking #{with}")]
    Conflict { with: u64 },
    #[error("Trainer has no availability covering this time")]
    TrainerUnavailable,
    #[error("{0:?}")]
    Common(#[from] eyre::Error),
}

impl From<mongodb::error::Error> for BookingRuleError {
    fn from(value: mongodb::error::Error) -> Self {
        BookingRuleError::Common(value.into())
    }
}
