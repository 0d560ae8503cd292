use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::decimal::Decimal;

/// A client with a ledger balance. The balance is mutated only by the
/// settlement engine.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Account {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    #[serde(default)]
    pub balance: Decimal,
    #[serde(default)]
    pub version: u64,
}

impl Account {
    pub fn new(name: String) -> Account {
        Account {
            id: ObjectId::new(),
            name,
            balance: Decimal::zero(),
            version: 0,
        }
    }

    pub fn can_afford(&self, amount: Decimal) -> bool {
        self.balance >= amount
    }
}
