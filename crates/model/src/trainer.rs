use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::{decimal::Decimal, training_type::Participation};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Trainer {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    pub center: ObjectId,
    #[serde(default)]
    pub surcharge_individual: Decimal,
    #[serde(default)]
    pub surcharge_split: Decimal,
    #[serde(default)]
    pub surcharge_group: Decimal,
    /// Derived metric, refreshed whenever availability changes.
    #[serde(default)]
    pub monthly_hours: f64,
    #[serde(default)]
    pub version: u64,
}

impl Trainer {
    pub fn new(name: String, center: ObjectId) -> Trainer {
        Trainer {
            id: ObjectId::new(),
            name,
            center,
            surcharge_individual: Decimal::zero(),
            surcharge_split: Decimal::zero(),
            surcharge_group: Decimal::zero(),
            monthly_hours: 0.0,
            version: 0,
        }
    }

    pub fn surcharge_for(&self, participation: Participation) -> Decimal {
        match participation {
            Participation::Individual => self.surcharge_individual,
            Participation::Split => self.surcharge_split,
            Participation::Group => self.surcharge_group,
            Participation::Unspecified => Decimal::zero(),
        }
    }
}
