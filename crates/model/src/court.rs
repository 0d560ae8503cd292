use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use strum::Display;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Court {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    pub center: ObjectId,
    pub number: u32,
    #[serde(default)]
    pub surface: Surface,
    #[serde(default)]
    pub state: CourtState,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub version: u64,
}

impl Court {
    pub fn new(name: String, center: ObjectId, number: u32) -> Court {
        Court {
            id: ObjectId::new(),
            name,
            center,
            number,
            surface: Surface::Hard,
            state: CourtState::Available,
            active: true,
            version: 0,
        }
    }

    pub fn is_bookable(&self) -> bool {
        self.active && matches!(self.state, CourtState::Available)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default, Display)]
#[serde(rename_all = "snake_case")]
pub enum CourtState {
    #[default]
    Available,
    Maintenance,
    Closed,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default, Display)]
#[serde(rename_all = "snake_case")]
pub enum Surface {
    #[default]
    Hard,
    Clay,
    Grass,
    Synthetic,
}

fn default_true() -> bool {
    true
}
