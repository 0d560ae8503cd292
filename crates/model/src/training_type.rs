use bson::oid::ObjectId;
use eyre::{bail, Error};
use serde::{Deserialize, Serialize};
use strum::Display;

use crate::decimal::Decimal;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TrainingType {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub participation: Participation,
    pub min_participants: u32,
    pub max_participants: u32,
    pub duration_hours: f64,
    pub price_per_hour: Decimal,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub version: u64,
}

impl TrainingType {
    pub fn new(
        name: String,
        code: String,
        participation: Participation,
        min_participants: u32,
        max_participants: u32,
        duration_hours: f64,
        price_per_hour: Decimal,
    ) -> TrainingType {
        TrainingType {
            id: ObjectId::new(),
            name,
            code,
            participation,
            min_participants,
            max_participants,
            duration_hours,
            price_per_hour,
            active: true,
            version: 0,
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.min_participants == 0 || self.max_participants == 0 {
            bail!("Participant bounds must be at least 1");
        }
        if self.min_participants > self.max_participants {
            bail!(
                "Min participants {} exceeds max {}",
                self.min_participants,
                self.max_participants
            );
        }
        if self.duration_hours <= 0.0 {
            bail!("Duration must be positive");
        }
        if self.price_per_hour.is_negative() {
            bail!("Price must not be negative");
        }
        Ok(())
    }

    /// Participation shape, falling back to the legacy token heuristic for
    /// rows imported without an explicit value.
    pub fn participation_resolved(&self) -> Participation {
        match self.participation {
            Participation::Unspecified => Participation::infer(&self.code, &self.name),
            explicit => explicit,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default, Display)]
#[serde(rename_all = "snake_case")]
pub enum Participation {
    Individual,
    Split,
    Group,
    #[default]
    Unspecified,
}

impl Participation {
    /// Best-effort guess from free-text code/name tokens. Migration shim for
    /// legacy rows only; new rows carry an explicit participation.
    pub fn infer(code: &str, name: &str) -> Participation {
        let haystack = format!("{} {}", code, name).to_lowercase();
        if haystack.contains("ind") || haystack.contains("инд") {
            Participation::Individual
        } else if haystack.contains("split") || haystack.contains("сплит") {
            Participation::Split
        } else if haystack.contains("group") || haystack.contains("групп") {
            Participation::Group
        } else {
            Participation::Unspecified
        }
    }
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn training_type(min: u32, max: u32, duration: f64, price: Decimal) -> TrainingType {
        TrainingType::new(
            "Adult group".to_string(),
            "GRP-A".to_string(),
            Participation::Group,
            min,
            max,
            duration,
            price,
        )
    }

    #[test]
    fn test_validate_bounds() {
        assert!(training_type(1, 4, 1.0, Decimal::int(1000)).validate().is_ok());
        assert!(training_type(0, 4, 1.0, Decimal::int(1000)).validate().is_err());
        assert!(training_type(2, 0, 1.0, Decimal::int(1000)).validate().is_err());
        assert!(training_type(5, 4, 1.0, Decimal::int(1000)).validate().is_err());
        assert!(training_type(1, 4, 0.0, Decimal::int(1000)).validate().is_err());
        assert!(training_type(1, 4, 1.0, Decimal::int(-1)).validate().is_err());
    }

    #[test]
    fn test_infer_participation() {
        assert_eq!(
            Participation::Individual,
            Participation::infer("IND-01", "Morning session")
        );
        assert_eq!(
            Participation::Split,
            Participation::infer("T2", "Split for two")
        );
        assert_eq!(
            Participation::Group,
            Participation::infer("G", "Групповая тренировка")
        );
        assert_eq!(
            Participation::Unspecified,
            Participation::infer("X", "Morning session")
        );
    }

    #[test]
    fn test_resolved_prefers_explicit() {
        let mut ty = training_type(3, 6, 1.0, Decimal::int(1000));
        assert_eq!(Participation::Group, ty.participation_resolved());

        // explicit value wins over tokens
        ty.participation = Participation::Split;
        assert_eq!(Participation::Split, ty.participation_resolved());

        ty.participation = Participation::Unspecified;
        ty.code = "IND".to_string();
        assert_eq!(Participation::Individual, ty.participation_resolved());
    }
}
