use bson::{to_bson, to_document, Document};
use eyre::{eyre, Error, Result};
use futures_util::TryStreamExt as _;
use log::info;
use model::{
    booking::{Booking, BookingState, Charge},
    ids::DayId,
    session::Session,
};
use mongodb::{
    bson::{doc, oid::ObjectId},
    options::{ReturnDocument, UpdateOptions},
    Collection, Database, IndexModel,
};

const COLLECTION: &str = "bookings";
const COUNTERS: &str = "counters";

#[derive(Clone)]
pub struct BookingStore {
    store: Collection<Booking>,
    counters: Collection<Document>,
}

impl BookingStore {
    pub(crate) async fn new(db: &Database) -> Result<Self> {
        let store: Collection<Booking> = db.collection(COLLECTION);
        store
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "court": 1, "date": 1 })
                    .build(),
            )
            .await?;
        store
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "trainer": 1, "date": 1 })
                    .build(),
            )
            .await?;
        Ok(BookingStore {
            store,
            counters: db.collection(COUNTERS),
        })
    }

    /// Next value of the booking sequence.
    pub async fn next_number(&self, session: &mut Session) -> Result<u64> {
        let counter = self
            .counters
            .find_one_and_update(
                doc! { "_id": "booking" },
                doc! { "$inc": { "seq": 1i64 } },
            )
            .session(&mut *session)
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await?
            .ok_or_else(|| eyre!("Booking counter is missing"))?;
        Ok(counter.get_i64("seq").unwrap_or_default() as u64)
    }

    /// Bumps a per-(court, day) marker document. Every transaction that can
    /// change what occupies the slot writes it, so two concurrent writers on
    /// the same court and day hit a MongoDB write conflict instead of
    /// committing around each other's snapshots.
    pub async fn reserve_slot(
        &self,
        session: &mut Session,
        court: ObjectId,
        day: DayId,
    ) -> Result<()> {
        self.counters
            .update_one(
                doc! { "_id": format!("slot_{}_{}", court.to_hex(), day.date()) },
                doc! { "$inc": { "seq": 1i64 } },
            )
            .session(&mut *session)
            .with_options(UpdateOptions::builder().upsert(true).build())
            .await?;
        Ok(())
    }

    pub async fn get_by_id(&self, session: &mut Session, id: ObjectId) -> Result<Option<Booking>> {
        Ok(self
            .store
            .find_one(doc! { "_id": id })
            .session(&mut *session)
            .await?)
    }

    pub async fn insert(&self, session: &mut Session, booking: &Booking) -> Result<()> {
        info!("Inserting booking: {:?}", booking);
        let result = self
            .store
            .update_one(
                doc! { "_id": booking.id },
                doc! { "$setOnInsert": to_document(booking)? },
            )
            .session(&mut *session)
            .with_options(UpdateOptions::builder().upsert(true).build())
            .await?;
        if result.upserted_id.is_none() {
            return Err(Error::msg("Booking already exists"));
        }
        Ok(())
    }

    /// Bookings occupying the court on the given day.
    pub async fn find_active_on(
        &self,
        session: &mut Session,
        court: ObjectId,
        day: DayId,
    ) -> Result<Vec<Booking>> {
        let mut cursor = self
            .store
            .find(doc! {
                "court": court,
                "date": day.id(),
                "state": { "$in": ["confirmed", "in_progress"] },
            })
            .session(&mut *session)
            .await?;
        Ok(cursor.stream(&mut *session).try_collect().await?)
    }

    /// Active bookings due for a time-driven transition up to the given day.
    pub async fn find_active_until(
        &self,
        session: &mut Session,
        day: DayId,
    ) -> Result<Vec<Booking>> {
        let mut cursor = self
            .store
            .find(doc! {
                "date": { "$lte": day.id() },
                "state": { "$in": ["confirmed", "in_progress"] },
            })
            .session(&mut *session)
            .await?;
        Ok(cursor.stream(&mut *session).try_collect().await?)
    }

    /// Confirmed bookings in `[from, to]` by day, for the reminder sweep.
    pub async fn find_confirmed_between(
        &self,
        session: &mut Session,
        from: DayId,
        to: DayId,
    ) -> Result<Vec<Booking>> {
        let mut cursor = self
            .store
            .find(doc! {
                "date": { "$gte": from.id(), "$lte": to.id() },
                "state": "confirmed",
            })
            .session(&mut *session)
            .await?;
        Ok(cursor.stream(&mut *session).try_collect().await?)
    }

    pub async fn set_state(
        &self,
        session: &mut Session,
        id: ObjectId,
        state: BookingState,
    ) -> Result<()> {
        info!("Setting booking {} state: {}", id, state);
        let result = self
            .store
            .update_one(
                doc! { "_id": id },
                doc! {
                    "$set": {
                        "state": to_bson(&state)?,
                        "one_day_sent": false,
                        "two_hour_sent": false,
                    },
                    "$inc": { "version": 1 },
                },
            )
            .session(&mut *session)
            .await?;
        if result.modified_count == 0 {
            return Err(eyre!("Booking not found: {}", id));
        }
        Ok(())
    }

    /// Moves a booking in time or space. Reminder flags reset so the new
    /// schedule is re-notified.
    pub async fn update_schedule(
        &self,
        session: &mut Session,
        id: ObjectId,
        day: DayId,
        start_time: f64,
        end_time: f64,
    ) -> Result<()> {
        info!(
            "Rescheduling booking {}: {} {}-{}",
            id,
            day.date(),
            start_time,
            end_time
        );
        let result = self
            .store
            .update_one(
                doc! { "_id": id },
                doc! {
                    "$set": {
                        "date": day.id(),
                        "start_time": start_time,
                        "end_time": end_time,
                        "one_day_sent": false,
                        "two_hour_sent": false,
                    },
                    "$inc": { "version": 1 },
                },
            )
            .session(&mut *session)
            .await?;
        if result.modified_count == 0 {
            return Err(eyre!("Booking not found: {}", id));
        }
        Ok(())
    }

    /// Records the debits applied on confirm, or clears them after a refund.
    pub async fn set_charges(
        &self,
        session: &mut Session,
        id: ObjectId,
        charges: &[Charge],
    ) -> Result<()> {
        let result = self
            .store
            .update_one(
                doc! { "_id": id },
                doc! { "$set": { "charges": to_bson(charges)? }, "$inc": { "version": 1 } },
            )
            .session(&mut *session)
            .await?;
        if result.modified_count == 0 {
            return Err(eyre!("Booking not found: {}", id));
        }
        Ok(())
    }

    pub async fn add_participant(
        &self,
        session: &mut Session,
        id: ObjectId,
        account: ObjectId,
    ) -> Result<()> {
        info!("Adding participant {} to booking {}", account, id);
        let result = self
            .store
            .update_one(
                doc! { "_id": id },
                doc! { "$push": { "participants": account }, "$inc": { "version": 1 } },
            )
            .session(&mut *session)
            .await?;
        if result.modified_count == 0 {
            return Err(eyre!("Booking not found: {}", id));
        }
        Ok(())
    }

    pub async fn remove_participant(
        &self,
        session: &mut Session,
        id: ObjectId,
        account: ObjectId,
    ) -> Result<()> {
        info!("Removing participant {} from booking {}", account, id);
        let result = self
            .store
            .update_one(
                doc! { "_id": id },
                doc! { "$pull": { "participants": account }, "$inc": { "version": 1 } },
            )
            .session(&mut *session)
            .await?;
        if result.modified_count == 0 {
            return Err(eyre!("Booking not found: {}", id));
        }
        Ok(())
    }

    pub async fn set_reminder_sent(
        &self,
        session: &mut Session,
        id: ObjectId,
        one_day: bool,
        two_hour: bool,
    ) -> Result<()> {
        let mut set = Document::new();
        if one_day {
            set.insert("one_day_sent", true);
        }
        if two_hour {
            set.insert("two_hour_sent", true);
        }
        if set.is_empty() {
            return Ok(());
        }
        self.store
            .update_one(doc! { "_id": id }, doc! { "$set": set })
            .session(&mut *session)
            .await?;
        Ok(())
    }
}
