use bson::oid::ObjectId;
use eyre::{bail, Error};
use serde::{Deserialize, Serialize};

use crate::training_type::{Participation, TrainingType};

/// Fixed roster for group sessions. Member bounds are seeded from the
/// training type but may be tightened per group; every write keeps the
/// roster inside `[min_members, max_members]`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TrainingGroup {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    pub training_type: ObjectId,
    pub min_members: u32,
    pub max_members: u32,
    pub members: Vec<ObjectId>,
    #[serde(default)]
    pub version: u64,
}

impl TrainingGroup {
    pub fn with_type(name: String, training_type: &TrainingType) -> Result<TrainingGroup, Error> {
        if training_type.participation_resolved() != Participation::Group {
            bail!("Group requires a group training type: {}", training_type.name);
        }
        Ok(TrainingGroup {
            id: ObjectId::new(),
            name,
            training_type: training_type.id,
            min_members: training_type.min_participants,
            max_members: training_type.max_participants,
            members: Vec::new(),
            version: 0,
        })
    }

    pub fn contains(&self, account: ObjectId) -> bool {
        self.members.contains(&account)
    }

    pub fn add_member(&mut self, account: ObjectId) -> Result<(), Error> {
        if self.contains(account) {
            bail!("Account is already a member");
        }
        if self.members.len() as u32 >= self.max_members {
            bail!("Group is full: {} members", self.members.len());
        }
        self.members.push(account);
        Ok(())
    }

    pub fn remove_member(&mut self, account: ObjectId) -> Result<(), Error> {
        if !self.contains(account) {
            bail!("Account is not a member");
        }
        if self.members.len() as u32 <= self.min_members {
            bail!("Group is at its minimum size: {}", self.members.len());
        }
        self.members.retain(|m| *m != account);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::Decimal;

    fn group_type() -> TrainingType {
        TrainingType::new(
            "Adult group".to_string(),
            "GRP-A".to_string(),
            Participation::Group,
            1,
            3,
            1.0,
            Decimal::int(1000),
        )
    }

    #[test]
    fn test_requires_group_type() {
        let mut ty = group_type();
        ty.participation = Participation::Individual;
        assert!(TrainingGroup::with_type("A".to_string(), &ty).is_err());
        assert!(TrainingGroup::with_type("A".to_string(), &group_type()).is_ok());
    }

    #[test]
    fn test_roster_bounds() {
        let mut group = TrainingGroup::with_type("A".to_string(), &group_type()).unwrap();
        let a = ObjectId::new();
        let b = ObjectId::new();
        let c = ObjectId::new();

        group.add_member(a).unwrap();
        group.add_member(b).unwrap();
        group.add_member(c).unwrap();
        assert!(group.add_member(ObjectId::new()).is_err());
        assert!(group.add_member(a).is_err());

        group.remove_member(b).unwrap();
        group.remove_member(c).unwrap();
        // min_members is 1, the last member cannot leave
        assert!(group.remove_member(a).is_err());
        assert!(group.remove_member(b).is_err());
    }
}
