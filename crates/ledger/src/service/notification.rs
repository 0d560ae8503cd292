use async_trait::async_trait;
use eyre::Error;
use log::{error, info};
use mongodb::bson::oid::ObjectId;

/// Outbound message contract. Delivery is best-effort; transports live
/// outside this crate.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, account: ObjectId, message: &str) -> Result<(), Error>;
}

/// Fallback sink that only writes to the log.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, account: ObjectId, message: &str) -> Result<(), Error> {
        info!("notify {}: {}", account, message);
        Ok(())
    }
}

/// Failures are logged and swallowed; a lost message never rolls back a
/// settlement or a state transition.
pub async fn send_best_effort(notifier: &dyn Notifier, account: ObjectId, message: &str) {
    if let Err(err) = notifier.notify(account, message).await {
        error!("Failed to notify {}: {}", account, err);
    }
}
