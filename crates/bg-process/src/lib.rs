use std::time::Duration;

use async_trait::async_trait;
use eyre::Error;
use ledger::Ledger;
use process::BgProcessor;
use tokio::time;

pub mod process;

const SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// A periodic sweep over the booking book.
#[async_trait]
pub trait Task {
    const NAME: &'static str;

    async fn process(&mut self) -> Result<(), Error>;
}

pub fn start(ledger: Ledger) {
    tokio::spawn(async move {
        let mut processor = BgProcessor::new(ledger);
        let mut interval = time::interval(SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            processor.process().await;
        }
    });
}
