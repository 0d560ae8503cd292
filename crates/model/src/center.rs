use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::decimal::Decimal;

/// A venue. Courts inherit the open-hour window `[work_start, work_end)`
/// (fractional hours) from their center.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Center {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    pub work_start: f64,
    pub work_end: f64,
    #[serde(default)]
    pub version: u64,
}

impl Center {
    pub fn new(name: String, work_start: f64, work_end: f64) -> Center {
        Center {
            id: ObjectId::new(),
            name,
            work_start,
            work_end,
            version: 0,
        }
    }
}

/// Price-per-hour override for a (center, training type) pair; unique per
/// pair, falls back to the type's own price when absent.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CenterPrice {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub center: ObjectId,
    pub training_type: ObjectId,
    pub price_per_hour: Decimal,
}

impl CenterPrice {
    pub fn new(center: ObjectId, training_type: ObjectId, price_per_hour: Decimal) -> CenterPrice {
        CenterPrice {
            id: ObjectId::new(),
            center,
            training_type,
            price_per_hour,
        }
    }
}
