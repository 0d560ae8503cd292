use async_trait::async_trait;
use chrono::Local;
use eyre::{Error, Result};
use ledger::service::notification::send_best_effort;
use ledger::Ledger;
use log::error;
use model::{booking::Booking, hours::fmt_range, ids::DayId, session::Session};
use tx_macro::tx;

use crate::Task;

/// Sends the day-before and two-hour reminders to everyone on the roster.
/// Sent flags live on the booking, so a reschedule re-arms both.
pub struct ReminderBg {
    ledger: Ledger,
}

#[async_trait]
impl Task for ReminderBg {
    const NAME: &'static str = "reminder";

    async fn process(&mut self) -> Result<(), Error> {
        let mut session = self.ledger.db.start_session().await?;
        let now = Local::now();
        let today = DayId::new(now);

        let upcoming = self
            .ledger
            .bookings
            .find_confirmed_between(&mut session, today, today.next())
            .await?;
        for booking in upcoming {
            let one_day = booking.needs_one_day_reminder(now);
            let two_hour = booking.needs_two_hour_reminder(now);
            if !one_day && !two_hour {
                continue;
            }
            if let Err(err) = self
                .remind(&mut session, booking, one_day, two_hour)
                .await
            {
                error!("Failed to send booking reminder: {:#}", err);
            }
        }
        Ok(())
    }
}

impl ReminderBg {
    pub fn new(ledger: Ledger) -> ReminderBg {
        ReminderBg { ledger }
    }

    #[tx]
    async fn remind(
        &self,
        session: &mut Session,
        booking: Booking,
        one_day: bool,
        two_hour: bool,
    ) -> Result<()> {
        let messages = reminder_messages(&booking, one_day, two_hour);
        let roster = self.ledger.settlement.roster(session, &booking).await?;
        for account in roster {
            for message in &messages {
                send_best_effort(self.ledger.notifier.as_ref(), account, message).await;
            }
        }
        self.ledger
            .bookings
            .set_reminder_sent(session, booking.id, one_day, two_hour)
            .await?;
        Ok(())
    }
}

/// One message per due window; both windows can land in the same sweep for
/// a booking just past midnight.
fn reminder_messages(booking: &Booking, one_day: bool, two_hour: bool) -> Vec<String> {
    let mut messages = Vec::new();
    if one_day {
        messages.push(format!(
            "Reminder: booking #{} is tomorrow, {} {}",
            booking.number,
            booking.day().date(),
            fmt_range(booking.start_time, booking.end_time),
        ));
    }
    if two_hour {
        messages.push(format!(
            "Reminder: booking #{} starts soon, {} {}",
            booking.number,
            booking.day().date(),
            fmt_range(booking.start_time, booking.end_time),
        ));
    }
    messages
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use mongodb::bson::oid::ObjectId;

    use super::*;

    fn booking() -> Booking {
        Booking::new(
            7,
            ObjectId::new(),
            ObjectId::new(),
            ObjectId::new(),
            ObjectId::new(),
            DayId::from_date(NaiveDate::from_ymd_opt(2024, 6, 11).unwrap()),
            1.0,
            2.0,
            Some(ObjectId::new()),
            None,
        )
    }

    #[test]
    fn test_single_window_sends_one_message() {
        let messages = reminder_messages(&booking(), true, false);
        assert_eq!(1, messages.len());
        assert!(messages[0].contains("tomorrow"));

        let messages = reminder_messages(&booking(), false, true);
        assert_eq!(1, messages.len());
        assert!(messages[0].contains("starts soon"));
    }

    #[test]
    fn test_both_windows_due_sends_both_messages() {
        // an early-morning booking can hit both windows in one sweep
        let messages = reminder_messages(&booking(), true, true);
        assert_eq!(2, messages.len());
        assert!(messages[0].contains("tomorrow"));
        assert!(messages[1].contains("starts soon"));
    }
}
