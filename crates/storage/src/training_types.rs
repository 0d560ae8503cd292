use bson::to_document;
use eyre::{Error, Result};
use futures_util::TryStreamExt as _;
use log::info;
use model::{session::Session, training_type::TrainingType};
use mongodb::{
    bson::{doc, oid::ObjectId},
    options::UpdateOptions,
    Collection, Database,
};

const COLLECTION: &str = "training_types";

#[derive(Clone)]
pub struct TrainingTypeStore {
    store: Collection<TrainingType>,
}

impl TrainingTypeStore {
    pub(crate) fn new(db: &Database) -> Self {
        TrainingTypeStore {
            store: db.collection(COLLECTION),
        }
    }

    pub async fn get_by_id(
        &self,
        session: &mut Session,
        id: ObjectId,
    ) -> Result<Option<TrainingType>> {
        Ok(self
            .store
            .find_one(doc! { "_id": id })
            .session(&mut *session)
            .await?)
    }

    pub async fn get_all(&self, session: &mut Session, only_active: bool) -> Result<Vec<TrainingType>> {
        let filter = if only_active {
            doc! { "active": true }
        } else {
            doc! {}
        };
        let mut cursor = self.store.find(filter).session(&mut *session).await?;
        Ok(cursor.stream(&mut *session).try_collect().await?)
    }

    pub async fn insert(&self, session: &mut Session, proto: &TrainingType) -> Result<()> {
        proto.validate()?;
        info!("Inserting training type: {:?}", proto);
        let result = self
            .store
            .update_one(
                doc! { "code": proto.code.clone() },
                doc! { "$setOnInsert": to_document(proto)? },
            )
            .session(&mut *session)
            .with_options(UpdateOptions::builder().upsert(true).build())
            .await?;
        if result.upserted_id.is_none() {
            return Err(Error::msg("Training type code is already taken"));
        }
        Ok(())
    }

    pub async fn set_active(
        &self,
        session: &mut Session,
        id: ObjectId,
        active: bool,
    ) -> Result<()> {
        self.store
            .update_one(
                doc! { "_id": id },
                doc! { "$set": { "active": active }, "$inc": { "version": 1 } },
            )
            .session(&mut *session)
            .await?;
        Ok(())
    }
}
