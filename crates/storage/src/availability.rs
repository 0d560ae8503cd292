use bson::to_document;
use chrono::{DateTime, Utc};
use eyre::{Error, Result};
use futures_util::TryStreamExt as _;
use log::info;
use model::{availability::Availability, session::Session};
use mongodb::{
    bson::{doc, oid::ObjectId},
    options::UpdateOptions,
    Collection, Database, IndexModel,
};

const COLLECTION: &str = "availability";

#[derive(Clone)]
pub struct AvailabilityStore {
    store: Collection<Availability>,
}

impl AvailabilityStore {
    pub(crate) async fn new(db: &Database) -> Result<Self> {
        let store: Collection<Availability> = db.collection(COLLECTION);
        store
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "trainer": 1, "start_at": 1 })
                    .build(),
            )
            .await?;
        Ok(AvailabilityStore { store })
    }

    pub async fn get_by_id(
        &self,
        session: &mut Session,
        id: ObjectId,
    ) -> Result<Option<Availability>> {
        Ok(self
            .store
            .find_one(doc! { "_id": id })
            .session(&mut *session)
            .await?)
    }

    /// Intervals of the trainer touching `[from, to)`, optionally narrowed
    /// to one center.
    pub async fn find_touching(
        &self,
        session: &mut Session,
        trainer: ObjectId,
        center: Option<ObjectId>,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Availability>> {
        let mut filter = doc! {
            "trainer": trainer,
            "start_at": { "$lt": to },
            "end_at": { "$gt": from },
        };
        if let Some(center) = center {
            filter.insert("center", center);
        }
        let mut cursor = self.store.find(filter).session(&mut *session).await?;
        Ok(cursor.stream(&mut *session).try_collect().await?)
    }

    /// One interval of the trainer at the center fully covering `[from, to)`.
    pub async fn find_covering(
        &self,
        session: &mut Session,
        trainer: ObjectId,
        center: ObjectId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Option<Availability>> {
        Ok(self
            .store
            .find_one(doc! {
                "trainer": trainer,
                "center": center,
                "start_at": { "$lte": from },
                "end_at": { "$gte": to },
            })
            .session(&mut *session)
            .await?)
    }

    pub async fn insert(&self, session: &mut Session, availability: &Availability) -> Result<()> {
        info!("Inserting availability: {:?}", availability);
        let result = self
            .store
            .update_one(
                doc! { "_id": availability.id },
                doc! { "$setOnInsert": to_document(availability)? },
            )
            .session(&mut *session)
            .with_options(UpdateOptions::builder().upsert(true).build())
            .await?;
        if result.upserted_id.is_none() {
            return Err(Error::msg("Availability already exists"));
        }
        Ok(())
    }

    pub async fn insert_many(
        &self,
        session: &mut Session,
        records: &[Availability],
    ) -> Result<()> {
        info!("Inserting {} availability records", records.len());
        self.store
            .insert_many(records)
            .session(&mut *session)
            .await?;
        Ok(())
    }

    pub async fn delete(
        &self,
        session: &mut Session,
        id: ObjectId,
    ) -> Result<Option<Availability>> {
        info!("Deleting availability: {}", id);
        Ok(self
            .store
            .find_one_and_delete(doc! { "_id": id })
            .session(&mut *session)
            .await?)
    }
}
