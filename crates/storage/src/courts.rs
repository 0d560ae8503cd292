use bson::to_document;
use eyre::{eyre, Error, Result};
use futures_util::TryStreamExt as _;
use log::info;
use model::{
    court::{Court, CourtState},
    session::Session,
};
use mongodb::{
    bson::{doc, oid::ObjectId},
    options::{IndexOptions, UpdateOptions},
    Collection, Database, IndexModel,
};

const COLLECTION: &str = "courts";

#[derive(Clone)]
pub struct CourtStore {
    store: Collection<Court>,
}

impl CourtStore {
    pub(crate) async fn new(db: &Database) -> Result<Self> {
        let store: Collection<Court> = db.collection(COLLECTION);
        store
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "center": 1, "number": 1 })
                    .options(IndexOptions::builder().unique(true).build())
                    .build(),
            )
            .await?;
        Ok(CourtStore { store })
    }

    pub async fn get_by_id(&self, session: &mut Session, id: ObjectId) -> Result<Option<Court>> {
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
    ) -> Result<Vec<Court>> {
        let mut cursor = self
            .store
            .find(doc! { "center": center, "active": true })
            .session(&mut *session)
            .await?;
        Ok(cursor.stream(&mut *session).try_collect().await?)
    }

    pub async fn insert(&self, session: &mut Session, court: &Court) -> Result<()> {
        info!("Inserting court: {:?}", court);
        let result = self
            .store
            .update_one(
                doc! { "center": court.center, "number": court.number },
                doc! { "$setOnInsert": to_document(court)? },
            )
            .session(&mut *session)
            .with_options(UpdateOptions::builder().upsert(true).build())
            .await?;
        if result.upserted_id.is_none() {
            return Err(Error::msg("Court number is already taken in this center"));
        }
        Ok(())
    }

    pub async fn set_state(
        &self,
        session: &mut Session,
        id: ObjectId,
        state: CourtState,
    ) -> Result<()> {
        info!("Setting court {} state: {}", id, state);
        let result = self
            .store
            .update_one(
                doc! { "_id": id },
                doc! { "$set": { "state": bson::to_bson(&state)? }, "$inc": { "version": 1 } },
            )
            .session(&mut *session)
            .await?;
        if result.modified_count == 0 {
            return Err(eyre!("Court not found: {}", id));
        }
        Ok(())
    }
}
