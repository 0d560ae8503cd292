use async_trait::async_trait;
use chrono::Local;
use eyre::{Error, Result};
use ledger::Ledger;
use log::{error, info};
use model::{booking::Booking, ids::DayId, session::Session};
use tx_macro::tx;

use crate::Task;

/// Advances confirmed bookings whose start has passed to in-progress and
/// in-progress bookings whose end has passed to completed.
pub struct LifecycleBg {
    ledger: Ledger,
}

#[async_trait]
impl Task for LifecycleBg {
    const NAME: &'static str = "lifecycle";

    async fn process(&mut self) -> Result<(), Error> {
        let mut session = self.ledger.db.start_session().await?;
        let now = Local::now();

        let due = self
            .ledger
            .bookings
            .find_active_until(&mut session, DayId::new(now))
            .await?;
        for booking in due {
            if booking.due_transition(now).is_none() {
                continue;
            }
            if let Err(err) = self.advance(&mut session, booking).await {
                error!("Failed to advance booking lifecycle: {:#}", err);
            }
        }
        Ok(())
    }
}

impl LifecycleBg {
    pub fn new(ledger: Ledger) -> LifecycleBg {
        LifecycleBg { ledger }
    }

    /// A booking long past its end goes through both transitions in one pass.
    #[tx]
    async fn advance(&self, session: &mut Session, booking: Booking) -> Result<()> {
        let mut booking = booking;
        while let Some(next) = booking.due_transition(Local::now()) {
            info!("Booking #{}: {} -> {}", booking.number, booking.state, next);
            self.ledger
                .bookings
                .set_state(session, booking.id, next)
                .await?;
            booking.state = next;
        }
        Ok(())
    }
}
