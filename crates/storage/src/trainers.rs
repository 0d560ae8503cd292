use bson::to_document;
use eyre::{eyre, Error, Result};
use futures_util::TryStreamExt as _;
use log::info;
use model::{decimal::Decimal, session::Session, trainer::Trainer};
use mongodb::{
    bson::{doc, oid::ObjectId},
    options::UpdateOptions,
    Collection, Database,
};

const COLLECTION: &str = "trainers";

#[derive(Clone)]
pub struct TrainerStore {
    store: Collection<Trainer>,
}

impl TrainerStore {
    pub(crate) fn new(db: &Database) -> Self {
        TrainerStore {
            store: db.collection(COLLECTION),
        }
    }

    pub async fn get_by_id(&self, session: &mut Session, id: ObjectId) -> Result<Option<Trainer>> {
        Ok(self
            .store
            .find_one(doc! { "_id": id })
            .session(&mut *session)
            .await?)
    }

    pub async fn get_by_center(
        &self,
        session: &mut Session,
        center: ObjectId,
    ) -> Result<Vec<Trainer>> {
        let mut cursor = self
            .store
            .find(doc! { "center": center })
            .session(&mut *session)
            .await?;
        Ok(cursor.stream(&mut *session).try_collect().await?)
    }

    pub async fn insert(&self, session: &mut Session, trainer: &Trainer) -> Result<()> {
        info!("Inserting trainer: {:?}", trainer);
        let result = self
            .store
            .update_one(
                doc! { "_id": trainer.id },
                doc! { "$setOnInsert": to_document(trainer)? },
            )
            .session(&mut *session)
            .with_options(UpdateOptions::builder().upsert(true).build())
            .await?;
        if result.upserted_id.is_none() {
            return Err(Error::msg("Trainer already exists"));
        }
        Ok(())
    }

    pub async fn set_surcharges(
        &self,
        session: &mut Session,
        id: ObjectId,
        individual: Decimal,
        split: Decimal,
        group: Decimal,
    ) -> Result<()> {
        info!("Setting trainer {} surcharges", id);
        let result = self
            .store
            .update_one(
                doc! { "_id": id },
                doc! {
                    "$set": {
                        "surcharge_individual": individual.inner(),
                        "surcharge_split": split.inner(),
                        "surcharge_group": group.inner(),
                    },
                    "$inc": { "version": 1 },
                },
            )
            .session(&mut *session)
            .await?;
        if result.modified_count == 0 {
            return Err(eyre!("Trainer not found: {}", id));
        }
        Ok(())
    }

    pub async fn set_monthly_hours(
        &self,
        session: &mut Session,
        id: ObjectId,
        hours: f64,
    ) -> Result<()> {
        info!("Setting trainer {} monthly hours: {}", id, hours);
        let result = self
            .store
            .update_one(
                doc! { "_id": id },
                doc! { "$set": { "monthly_hours": hours }, "$inc": { "version": 1 } },
            )
            .session(&mut *session)
            .await?;
        if result.modified_count == 0 {
            return Err(eyre!("Trainer not found: {}", id));
        }
        Ok(())
    }
}
