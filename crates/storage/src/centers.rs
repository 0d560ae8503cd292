use bson::to_document;
use eyre::{Error, Result};
use futures_util::TryStreamExt as _;
use log::info;
use model::{center::Center, session::Session};
use mongodb::{
    bson::{doc, oid::ObjectId},
    options::UpdateOptions,
    Collection, Database,
};

const COLLECTION: &str = "centers";

#[derive(Clone)]
pub struct CenterStore {
    store: Collection<Center>,
}

impl CenterStore {
    pub(crate) fn new(db: &Database) -> Self {
        CenterStore {
            store: db.collection(COLLECTION),
        }
    }

    pub async fn get_by_id(&self, session: &mut Session, id: ObjectId) -> Result<Option<Center>> {
        Ok(self
            .store
            .find_one(doc! { "_id": id })
            .session(&mut *session)
            .await?)
    }

    pub async fn get_all(&self, session: &mut Session) -> Result<Vec<Center>> {
        let mut cursor = self.store.find(doc! {}).session(&mut *session).await?;
        Ok(cursor.stream(&mut *session).try_collect().await?)
    }

    pub async fn insert(&self, session: &mut Session, center: &Center) -> Result<()> {
        info!("Inserting center: {:?}", center);
        let result = self
            .store
            .update_one(
                doc! { "name": center.name.clone() },
                doc! { "$setOnInsert": to_document(center)? },
            )
            .session(&mut *session)
            .with_options(UpdateOptions::builder().upsert(true).build())
            .await?;
        if result.upserted_id.is_none() {
            return Err(Error::msg("Center already exists"));
        }
        Ok(())
    }
}
