use std::sync::Arc;

use chrono::Local;
use eyre::eyre;
use log::info;
use model::booking::{Booking, BookingState, Charge, Recurrence};
use model::hours::fmt_range;
use model::ids::DayId;
use model::session::Session;
use mongodb::bson::oid::ObjectId;
use service::availability::{
    AvailabilityError, AvailabilityService, FreeSlot, MAX_GENERATED_RECORDS,
};
use service::groups::Groups;
use service::guard::{BookingRuleError, Guard};
use service::notification::{send_best_effort, Notifier};
use service::recurrence::expand_dates;
use service::settlement::{settlement_plan, short_accounts, Settlement};
use storage::bookings::BookingStore;
use storage::courts::CourtStore;
use storage::session::Db;
use storage::training_types::TrainingTypeStore;
use storage::Storage;
use thiserror::Error;
use tx_macro::tx;

pub mod service;

#[derive(Clone)]
pub struct Ledger {
    pub db: Db,
    pub availability: AvailabilityService,
    pub guard: Guard,
    pub settlement: Settlement,
    pub groups: Groups,
    pub bookings: BookingStore,
    pub courts: CourtStore,
    pub training_types: TrainingTypeStore,
    pub notifier: Arc<dyn Notifier>,
}

/// Everything needed to open a draft booking.
pub struct BookingRequest {
    pub court: ObjectId,
    pub trainer: ObjectId,
    pub training_type: ObjectId,
    pub day: DayId,
    pub start_time: f64,
    /// Defaults to the training type's standard duration.
    pub end_time: Option<f64>,
    pub customer: Option<ObjectId>,
    pub group: Option<ObjectId>,
    /// Account that placed the request; a trainer booking their own slot
    /// gets the booking marked accordingly.
    pub created_by: Option<ObjectId>,
    pub recurrence: Option<Recurrence>,
}

impl Ledger {
    pub fn new(storage: Storage, notifier: Arc<dyn Notifier>) -> Self {
        let availability = AvailabilityService::new(
            storage.availability.clone(),
            storage.bookings.clone(),
            storage.centers.clone(),
            storage.courts.clone(),
            storage.trainers.clone(),
        );
        let guard = Guard::new(
            storage.availability,
            storage.bookings.clone(),
            storage.centers,
            storage.courts.clone(),
        );
        let settlement = Settlement::new(
            storage.accounts.clone(),
            storage.groups.clone(),
            storage.prices,
            storage.trainers,
            storage.training_types.clone(),
        );
        let groups = Groups::new(
            storage.accounts,
            storage.groups,
            storage.training_types.clone(),
            notifier.clone(),
        );
        Ledger {
            db: storage.db,
            availability,
            guard,
            settlement,
            groups,
            bookings: storage.bookings,
            courts: storage.courts,
            training_types: storage.training_types,
            notifier,
        }
    }

    pub async fn get_booking(&self, session: &mut Session, id: ObjectId) -> Result<Booking, eyre::Error> {
        self.bookings
            .get_by_id(session, id)
            .await?
            .ok_or_else(|| eyre!("Booking not found: {}", id))
    }

    /// Free hourly slots on a court for a day. Read-only.
    pub async fn free_slots(
        &self,
        session: &mut Session,
        court: ObjectId,
        day: DayId,
        trainer: Option<ObjectId>,
    ) -> Result<Vec<FreeSlot>, AvailabilityError> {
        self.availability
            .free_slots(session, court, day, trainer, Local::now())
            .await
    }

    #[tx]
    pub async fn create_booking(
        &self,
        session: &mut Session,
        request: BookingRequest,
    ) -> Result<Booking, CreateBookingError> {
        let training_type = self
            .training_types
            .get_by_id(session, request.training_type)
            .await?
            .ok_or(CreateBookingError::TypeNotFound)?;
        if !training_type.active {
            return Err(CreateBookingError::TypeInactive);
        }

        match (request.customer, request.group) {
            (Some(_), Some(_)) | (None, None) => {
                return Err(CreateBookingError::AmbiguousParty);
            }
            (None, Some(group)) => {
                let group = self
                    .groups
                    .get(session, group)
                    .await
                    .map_err(|err| CreateBookingError::Common(eyre!(err)))?;
                if group.training_type != training_type.id {
                    return Err(CreateBookingError::GroupTypeMismatch);
                }
            }
            (Some(_), None) => {}
        }

        let court = self
            .courts
            .get_by_id(session, request.court)
            .await?
            .ok_or(CreateBookingError::Rule(BookingRuleError::CourtNotFound))?;

        let end_time = request
            .end_time
            .unwrap_or(request.start_time + training_type.duration_hours);
        let number = self.bookings.next_number(session).await?;

        let mut booking = Booking::new(
            number,
            request.court,
            request.trainer,
            request.training_type,
            court.center,
            request.day,
            request.start_time,
            end_time,
            request.customer,
            request.group,
        );
        booking.self_booked = request.created_by == Some(request.trainer);
        booking.recurrence = request.recurrence;

        // shared slot write so concurrent transactions on this court and day
        // conflict instead of validating against stale snapshots
        self.bookings
            .reserve_slot(session, booking.court, booking.day())
            .await?;
        self.guard.validate(session, &booking).await?;
        self.bookings.insert(session, &booking).await?;
        info!("Created booking #{} ({})", booking.number, booking.id);
        Ok(booking)
    }

    /// Moves a draft or confirmed booking to a new day or time slot. All
    /// placement rules are re-checked for the new slot.
    #[tx]
    pub async fn reschedule_booking(
        &self,
        session: &mut Session,
        id: ObjectId,
        day: DayId,
        start_time: f64,
        end_time: f64,
    ) -> Result<(), CreateBookingError> {
        let mut booking = self
            .bookings
            .get_by_id(session, id)
            .await?
            .ok_or(CreateBookingError::BookingNotFound)?;
        if booking.state.is_terminal() {
            return Err(CreateBookingError::Terminal(booking.state));
        }

        // both the vacated and the target slot change occupancy
        self.bookings
            .reserve_slot(session, booking.court, booking.day())
            .await?;
        self.bookings
            .reserve_slot(session, booking.court, day)
            .await?;

        booking.date = day.id();
        booking.start_time = start_time;
        booking.end_time = end_time;
        self.guard.validate(session, &booking).await?;
        self.bookings
            .update_schedule(session, id, day, start_time, end_time)
            .await?;
        Ok(())
    }

    /// Confirms a draft: re-checks placement, charges every participant per
    /// the settlement policy and records the debits on the booking. Notices
    /// go out only after the transaction commits.
    pub async fn confirm_booking(
        &self,
        session: &mut Session,
        id: ObjectId,
    ) -> Result<(), ConfirmError> {
        let (booking, plan) = self.settle_confirmation(session, id).await?;

        for charge in &plan {
            send_best_effort(
                self.notifier.as_ref(),
                charge.account,
                &format!("Balance change: -{}", charge.amount),
            )
            .await;
            send_best_effort(
                self.notifier.as_ref(),
                charge.account,
                &format!(
                    "Booking #{} confirmed: {} {}",
                    booking.number,
                    booking.day().date(),
                    fmt_range(booking.start_time, booking.end_time),
                ),
            )
            .await;
        }
        info!("Confirmed booking #{}", booking.number);
        Ok(())
    }

    #[tx]
    async fn settle_confirmation(
        &self,
        session: &mut Session,
        id: ObjectId,
    ) -> Result<(Booking, Vec<Charge>), ConfirmError> {
        let booking = self
            .bookings
            .get_by_id(session, id)
            .await?
            .ok_or(ConfirmError::BookingNotFound)?;
        if !booking.state.can_confirm() {
            return Err(ConfirmError::InvalidTransition(booking.state));
        }
        self.bookings
            .reserve_slot(session, booking.court, booking.day())
            .await?;
        self.guard.validate(session, &booking).await?;

        let training_type = self.settlement.training_type(session, &booking).await?;
        let roster = self.settlement.roster(session, &booking).await?;
        if roster.len() < training_type.min_participants as usize {
            return Err(ConfirmError::TooFewParticipants {
                required: training_type.min_participants,
                actual: roster.len() as u32,
            });
        }

        let total = self
            .settlement
            .total_price(session, &booking, &training_type)
            .await?;
        let plan = settlement_plan(training_type.participation_resolved(), total, &roster);

        let accounts = self.settlement.load_accounts(session, &roster).await?;
        let short = short_accounts(&accounts, &plan);
        if !short.is_empty() {
            return Err(ConfirmError::InsufficientFunds(short));
        }

        self.settlement.apply(session, &plan, false).await?;
        self.bookings.set_charges(session, id, &plan).await?;
        self.bookings
            .set_state(session, id, BookingState::Confirmed)
            .await?;
        Ok((booking, plan))
    }

    /// Cancels a draft or confirmed booking, crediting back exactly what was
    /// charged on confirm. Credit notices go out after the commit.
    pub async fn cancel_booking(
        &self,
        session: &mut Session,
        id: ObjectId,
    ) -> Result<(), CancelError> {
        let (booking, refunded) = self.apply_cancellation(session, id).await?;
        self.notify_refunds(&booking, &refunded).await;
        info!("Cancelled booking #{}", booking.number);
        Ok(())
    }

    #[tx]
    async fn apply_cancellation(
        &self,
        session: &mut Session,
        id: ObjectId,
    ) -> Result<(Booking, Vec<Charge>), CancelError> {
        let booking = self
            .bookings
            .get_by_id(session, id)
            .await?
            .ok_or(CancelError::BookingNotFound)?;
        if !booking.state.can_cancel() {
            return Err(CancelError::InvalidTransition(booking.state));
        }

        let refunded = self.refund(session, &booking).await?;
        self.bookings
            .set_state(session, id, BookingState::Cancelled)
            .await?;
        Ok((booking, refunded))
    }

    /// Administrative reset back to draft. Charges are credited back; the
    /// booking has to be confirmed again to re-occupy the slot.
    pub async fn reset_booking(
        &self,
        session: &mut Session,
        id: ObjectId,
    ) -> Result<(), CancelError> {
        let (booking, refunded) = self.apply_reset(session, id).await?;
        self.notify_refunds(&booking, &refunded).await;
        info!("Reset booking #{} to draft", booking.number);
        Ok(())
    }

    #[tx]
    async fn apply_reset(
        &self,
        session: &mut Session,
        id: ObjectId,
    ) -> Result<(Booking, Vec<Charge>), CancelError> {
        let booking = self
            .bookings
            .get_by_id(session, id)
            .await?
            .ok_or(CancelError::BookingNotFound)?;
        if !booking.state.can_reset() {
            return Err(CancelError::InvalidTransition(booking.state));
        }

        let refunded = self.refund(session, &booking).await?;
        self.bookings
            .set_state(session, id, BookingState::Draft)
            .await?;
        Ok((booking, refunded))
    }

    /// Credits back the recorded charges and clears them. Returns what was
    /// refunded so the caller can notify after its transaction commits.
    async fn refund(
        &self,
        session: &mut Session,
        booking: &Booking,
    ) -> Result<Vec<Charge>, eyre::Error> {
        if booking.charges.is_empty() {
            return Ok(Vec::new());
        }
        self.settlement.apply(session, &booking.charges, true).await?;
        self.bookings.set_charges(session, booking.id, &[]).await?;
        Ok(booking.charges.clone())
    }

    async fn notify_refunds(&self, booking: &Booking, refunded: &[Charge]) {
        for charge in refunded {
            send_best_effort(
                self.notifier.as_ref(),
                charge.account,
                &format!("Booking #{}: {} credited back", booking.number, charge.amount),
            )
            .await;
        }
    }

    #[tx]
    pub async fn add_participant(
        &self,
        session: &mut Session,
        id: ObjectId,
        account: ObjectId,
    ) -> Result<(), ParticipantError> {
        let booking = self
            .bookings
            .get_by_id(session, id)
            .await?
            .ok_or(ParticipantError::BookingNotFound)?;
        if booking.state != BookingState::Draft {
            return Err(ParticipantError::NotDraft(booking.state));
        }
        if booking.group.is_some() {
            return Err(ParticipantError::GroupRoster);
        }
        if booking.customer == Some(account) || booking.participants.contains(&account) {
            return Err(ParticipantError::AlreadyListed);
        }

        let training_type = self.settlement.training_type(session, &booking).await?;
        // the primary customer counts toward the cap
        if booking.participants.len() as u32 + 2 > training_type.max_participants {
            return Err(ParticipantError::RosterFull {
                max: training_type.max_participants,
            });
        }
        self.bookings.add_participant(session, id, account).await?;
        Ok(())
    }

    #[tx]
    pub async fn remove_participant(
        &self,
        session: &mut Session,
        id: ObjectId,
        account: ObjectId,
    ) -> Result<(), ParticipantError> {
        let booking = self
            .bookings
            .get_by_id(session, id)
            .await?
            .ok_or(ParticipantError::BookingNotFound)?;
        if booking.state != BookingState::Draft {
            return Err(ParticipantError::NotDraft(booking.state));
        }
        if !booking.participants.contains(&account) {
            return Err(ParticipantError::NotListed);
        }
        self.bookings
            .remove_participant(session, id, account)
            .await?;
        Ok(())
    }

    /// Expands a template booking's recurrence rule into future drafts. Any
    /// draft failing a placement rule aborts the whole batch.
    #[tx]
    pub async fn generate_recurrences(
        &self,
        session: &mut Session,
        id: ObjectId,
    ) -> Result<Vec<Booking>, RecurrenceError> {
        let template = self
            .bookings
            .get_by_id(session, id)
            .await?
            .ok_or(RecurrenceError::BookingNotFound)?;
        let rule = template
            .recurrence
            .clone()
            .ok_or(RecurrenceError::NoRule)?;

        let weekdays = rule.weekday_set(template.day().week_day());
        let dates = expand_dates(
            template.day().date(),
            &weekdays,
            rule.months,
            rule.times_per_week,
        );
        if dates.len() > MAX_GENERATED_RECORDS {
            return Err(RecurrenceError::TooManyRecords {
                requested: dates.len(),
                max: MAX_GENERATED_RECORDS,
            });
        }

        let start_time = rule.start_time.unwrap_or(template.start_time);
        let end_time = rule.end_time.unwrap_or(template.end_time);

        let mut created = Vec::with_capacity(dates.len());
        for date in dates {
            let number = self.bookings.next_number(session).await?;
            let mut booking = Booking::new(
                number,
                template.court,
                template.trainer,
                template.training_type,
                template.center,
                DayId::from_date(date),
                start_time,
                end_time,
                template.customer,
                template.group,
            );
            booking.self_booked = template.self_booked;
            self.guard
                .validate(session, &booking)
                .await
                .map_err(|source| RecurrenceError::SlotRejected { date, source })?;
            self.bookings.insert(session, &booking).await?;
            created.push(booking);
        }
        info!(
            "Expanded booking #{} into {} drafts",
            template.number,
            created.len()
        );
        Ok(created)
    }
}

#[derive(Debug, Error)]
pub enum CreateBookingError {
    #[error("Booking not found")]
    BookingNotFound,
    #[error("Training type not found")]
    TypeNotFound,
    #[error("Training type is not active")]
    TypeInactive,
    #[error("Exactly one of customer or group is required")]
    AmbiguousParty,
    #[error("Group is registered for a different training type")]
    GroupTypeMismatch,
    #[error("Booking is already {0}")]
    Terminal(BookingState),
    #[error(transparent)]
    Rule(#[from] BookingRuleError),
    #[error("{0:?}")]
    Common(#[from] eyre::Error),
}

impl From<mongodb::error::Error> for CreateBookingError {
    fn from(value: mongodb::error::Error) -> Self {
        CreateBookingError::Common(value.into())
    }
}

#[derive(Debug, Error)]
pub enum ConfirmError {
    #[error("Booking not found")]
    BookingNotFound,
    #[error("Cannot confirm a booking that is {0}")]
    InvalidTransition(BookingState),
    #[error("Not enough participants: required {required}, got {actual}")]
    TooFewParticipants { required: u32, actual: u32 },
    #[error("Insufficient funds on {0:?}")]
    InsufficientFunds(Vec<ObjectId>),
    #[error(transparent)]
    Rule(#[from] BookingRuleError),
    #[error("{0:?}")]
    Common(#[from] eyre::Error),
}

impl From<mongodb::error::Error> for ConfirmError {
    fn from(value: mongodb::error::Error) -> Self {
        ConfirmError::Common(value.into())
    }
}

#[derive(Debug, Error)]
pub enum CancelError {
    #[error("Booking not found")]
    BookingNotFound,
    #[error("Cannot cancel a booking that is {0}")]
    InvalidTransition(BookingState),
    #[error("{0:?}")]
    Common(#[from] eyre::Error),
}

impl From<mongodb::error::Error> for CancelError {
    fn from(value: mongodb::error::Error) -> Self {
        CancelError::Common(value.into())
    }
}

#[derive(Debug, Error)]
pub enum ParticipantError {
    #[error("Booking not found")]
    BookingNotFound,
    #[error("Participants can only change while the booking is a draft, not {0}")]
    NotDraft(BookingState),
    #[error("Group bookings take their roster from the group")]
    GroupRoster,
    #[error("Account is already on the booking")]
    AlreadyListed,
    #[error("Account is not on the booking")]
    NotListed,
    #[error("Roster is full: at most {max} participants")]
    RosterFull { max: u32 },
    #[error("{0:?}")]
    Common(#[from] eyre::Error),
}

impl From<mongodb::error::Error> for ParticipantError {
    fn from(value: mongodb::error::Error) -> Self {
        ParticipantError::Common(value.into())
    }
}

#[derive(Debug, Error)]
pub enum RecurrenceError {
    #[error("Booking not found")]
    BookingNotFound,
    #[error("Booking has no recurrence rule")]
    NoRule,
    #[error("Too many drafts to generate at once: {requested} (max {max})")]
    TooManyRecords { requested: usize, max: usize },
    #[error("Generated slot on {date} was rejected: {source}")]
    SlotRejected {
        date: chrono::NaiveDate,
        source: BookingRuleError,
    },
    #[error("{0:?}")]
    Common(#[from] eyre::Error),
}

impl From<mongodb::error::Error> for RecurrenceError {
    fn from(value: mongodb::error::Error) -> Self {
        RecurrenceError::Common(value.into())
    }
}
