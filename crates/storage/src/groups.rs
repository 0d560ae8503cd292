use bson::to_document;
use eyre::{eyre, Error, Result};
use futures_util::TryStreamExt as _;
use log::info;
use model::{group::TrainingGroup, session::Session};
use mongodb::{
    bson::{doc, oid::ObjectId},
    options::UpdateOptions,
    Collection, Database,
};

const COLLECTION: &str = "groups";

#[derive(Clone)]
pub struct GroupStore {
    store: Collection<TrainingGroup>,
}

impl GroupStore {
    pub(crate) fn new(db: &Database) -> Self {
        GroupStore {
            store: db.collection(COLLECTION),
        }
    }

    pub async fn get_by_id(
        &self,
        session: &mut Session,
        id: ObjectId,
    ) -> Result<Option<TrainingGroup>> {
        Ok(self
            .store
            .find_one(doc! { "_id": id })
            .session(&mut *session)
            .await?)
    }

    pub async fn get_all(&self, session: &mut Session) -> Result<Vec<TrainingGroup>> {
        let mut cursor = self.store.find(doc! {}).session(&mut *session).await?;
        Ok(cursor.stream(&mut *session).try_collect().await?)
    }

    pub async fn insert(&self, session: &mut Session, group: &TrainingGroup) -> Result<()> {
        info!("Inserting group: {:?}", group);
        let result = self
            .store
            .update_one(
                doc! { "name": group.name.clone() },
                doc! { "$setOnInsert": to_document(group)? },
            )
            .session(&mut *session)
            .with_options(UpdateOptions::builder().upsert(true).build())
            .await?;
        if result.upserted_id.is_none() {
            return Err(Error::msg("Group already exists"));
        }
        Ok(())
    }

    /// Replaces the roster wholesale; bounds are checked by the model before
    /// the write.
    pub async fn set_members(
        &self,
        session: &mut Session,
        id: ObjectId,
        members: &[ObjectId],
    ) -> Result<()> {
        info!("Setting group {} members: {} total", id, members.len());
        let result = self
            .store
            .update_one(
                doc! { "_id": id },
                doc! { "$set": { "members": members.to_vec() }, "$inc": { "version": 1 } },
            )
            .session(&mut *session)
            .await?;
        if result.modified_count == 0 {
            return Err(eyre!("Group not found: {}", id));
        }
        Ok(())
    }
}
