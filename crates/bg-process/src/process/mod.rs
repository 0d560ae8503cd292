use eyre::Context as _;
use ledger::Ledger;
use lifecycle::LifecycleBg;
use log::error;
use reminder::ReminderBg;

use crate::Task;

pub mod lifecycle;
pub mod reminder;

pub struct BgProcessor {
    pub lifecycle: LifecycleBg,
    pub reminder: ReminderBg,
}

impl BgProcessor {
    pub fn new(ledger: Ledger) -> BgProcessor {
        BgProcessor {
            lifecycle: LifecycleBg::new(ledger.clone()),
            reminder: ReminderBg::new(ledger),
        }
    }

    /// Runs every sweep; a failing task never blocks the others.
    pub async fn process(&mut self) {
        let result = self
            .lifecycle
            .process()
            .await
            .context(LifecycleBg::NAME);
        if let Err(err) = result {
            error!("Lifecycle sweep failed: {:#}", err);
        }

        let result = self.reminder.process().await.context(ReminderBg::NAME);
        if let Err(err) = result {
            error!("Reminder sweep failed: {:#}", err);
        }
    }
}
