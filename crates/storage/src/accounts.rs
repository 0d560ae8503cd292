use bson::to_document;
use eyre::{eyre, Error, Result};
use futures_util::TryStreamExt as _;
use log::info;
use model::{account::Account, decimal::Decimal, session::Session};
use mongodb::{
    bson::{doc, oid::ObjectId},
    options::UpdateOptions,
    Collection, Database,
};

const COLLECTION: &str = "accounts";

#[derive(Clone)]
pub struct AccountStore {
    store: Collection<Account>,
}

impl AccountStore {
    pub(crate) fn new(db: &Database) -> Self {
        AccountStore {
            store: db.collection(COLLECTION),
        }
    }

    pub async fn get_by_id(&self, session: &mut Session, id: ObjectId) -> Result<Option<Account>> {
        Ok(self
            .store
            .find_one(doc! { "_id": id })
            .session(&mut *session)
            .await?)
    }

    pub async fn get_many(
        &self,
        session: &mut Session,
        ids: &[ObjectId],
    ) -> Result<Vec<Account>> {
        let mut cursor = self
            .store
            .find(doc! { "_id": { "$in": ids.to_vec() } })
            .session(&mut *session)
            .await?;
        Ok(cursor.stream(&mut *session).try_collect().await?)
    }

    pub async fn insert(&self, session: &mut Session, account: &Account) -> Result<()> {
        info!("Inserting account: {:?}", account);
        let result = self
            .store
            .update_one(
                doc! { "_id": account.id },
                doc! { "$setOnInsert": to_document(account)? },
            )
            .session(&mut *session)
            .with_options(UpdateOptions::builder().upsert(true).build())
            .await?;
        if result.upserted_id.is_none() {
            return Err(Error::msg("Account already exists"));
        }
        Ok(())
    }

    /// Applies a signed balance delta. The caller owns the notification
    /// side-effect; this only moves the money.
    pub async fn change_balance(
        &self,
        session: &mut Session,
        id: ObjectId,
        delta: Decimal,
    ) -> Result<()> {
        info!("Changing balance of {}: {}", id, delta);
        let result = self
            .store
            .update_one(
                doc! { "_id": id },
                doc! { "$inc": { "balance": delta.inner(), "version": 1 } },
            )
            .session(&mut *session)
            .await?;
        if result.modified_count == 0 {
            return Err(eyre!("Account not found: {}", id));
        }
        Ok(())
    }
}
