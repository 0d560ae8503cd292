use bson::to_document;
use eyre::{eyre, Error, Result};
use log::info;
use model::{center::CenterPrice, decimal::Decimal, session::Session};
use mongodb::{
    bson::{doc, oid::ObjectId},
    options::{IndexOptions, UpdateOptions},
    Collection, Database, IndexModel,
};

const COLLECTION: &str = "center_prices";

/// Price-per-hour overrides, unique per (center, training type).
#[derive(Clone)]
pub struct PriceStore {
    store: Collection<CenterPrice>,
}

impl PriceStore {
    pub(crate) async fn new(db: &Database) -> Result<Self> {
        let store: Collection<CenterPrice> = db.collection(COLLECTION);
        store
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "center": 1, "training_type": 1 })
                    .options(IndexOptions::builder().unique(true).build())
                    .build(),
            )
            .await?;
        Ok(PriceStore { store })
    }

    pub async fn get(
        &self,
        session: &mut Session,
        center: ObjectId,
        training_type: ObjectId,
    ) -> Result<Option<CenterPrice>> {
        Ok(self
            .store
            .find_one(doc! { "center": center, "training_type": training_type })
            .session(&mut *session)
            .await?)
    }

    pub async fn insert(&self, session: &mut Session, price: &CenterPrice) -> Result<()> {
        if price.price_per_hour.is_negative() {
            return Err(eyre!("Price must not be negative"));
        }
        info!("Inserting price: {:?}", price);
        let result = self
            .store
            .update_one(
                doc! { "center": price.center, "training_type": price.training_type },
                doc! { "$setOnInsert": to_document(price)? },
            )
            .session(&mut *session)
            .with_options(UpdateOptions::builder().upsert(true).build())
            .await?;
        if result.upserted_id.is_none() {
            return Err(Error::msg("Price for this center and type already exists"));
        }
        Ok(())
    }

    pub async fn update_price(
        &self,
        session: &mut Session,
        id: ObjectId,
        price_per_hour: Decimal,
    ) -> Result<()> {
        if price_per_hour.is_negative() {
            return Err(eyre!("Price must not be negative"));
        }
        info!("Updating price {}: {}", id, price_per_hour);
        self.store
            .update_one(
                doc! { "_id": id },
                doc! { "$set": { "price_per_hour": price_per_hour.inner() } },
            )
            .session(&mut *session)
            .await?;
        Ok(())
    }

    pub async fn delete(&self, session: &mut Session, id: ObjectId) -> Result<()> {
        self.store
            .delete_one(doc! { "_id": id })
            .session(&mut *session)
            .await?;
        Ok(())
    }
}
