use std::sync::Arc;

use eyre::eyre;
use model::{group::TrainingGroup, session::Session};
use mongodb::bson::oid::ObjectId;
use storage::{accounts::AccountStore, groups::GroupStore, training_types::TrainingTypeStore};
use thiserror::Error;
use tx_macro::tx;

use super::notification::{send_best_effort, Notifier};

#[derive(Clone)]
pub struct Groups {
    accounts: AccountStore,
    groups: GroupStore,
    training_types: TrainingTypeStore,
    notifier: Arc<dyn Notifier>,
}

impl Groups {
    pub fn new(
        accounts: AccountStore,
        groups: GroupStore,
        training_types: TrainingTypeStore,
        notifier: Arc<dyn Notifier>,
    ) -> Groups {
        Groups {
            accounts,
            groups,
            training_types,
            notifier,
        }
    }

    #[tx]
    pub async fn create(
        &self,
        session: &mut Session,
        name: String,
        training_type: ObjectId,
    ) -> Result<TrainingGroup, GroupError> {
        let training_type = self
            .training_types
            .get_by_id(session, training_type)
            .await?
            .ok_or(GroupError::TypeNotFound)?;
        let group = TrainingGroup::with_type(name, &training_type)
            .map_err(|err| GroupError::Validation(err.to_string()))?;
        self.groups.insert(session, &group).await?;
        Ok(group)
    }

    #[tx]
    pub async fn add_member(
        &self,
        session: &mut Session,
        group_id: ObjectId,
        account: ObjectId,
    ) -> Result<(), GroupError> {
        let mut group = self
            .groups
            .get_by_id(session, group_id)
            .await?
            .ok_or(GroupError::GroupNotFound)?;
        let member = self
            .accounts
            .get_by_id(session, account)
            .await?
            .ok_or(GroupError::AccountNotFound)?;

        group
            .add_member(account)
            .map_err(|err| GroupError::Validation(err.to_string()))?;
        self.groups
            .set_members(session, group_id, &group.members)
            .await?;

        send_best_effort(
            self.notifier.as_ref(),
            member.id,
            &format!("You were added to the group {}", group.name),
        )
        .await;
        Ok(())
    }

    #[tx]
    pub async fn remove_member(
        &self,
        session: &mut Session,
        group_id: ObjectId,
        account: ObjectId,
    ) -> Result<(), GroupError> {
        let mut group = self
            .groups
            .get_by_id(session, group_id)
            .await?
            .ok_or(GroupError::GroupNotFound)?;
        group
            .remove_member(account)
            .map_err(|err| GroupError::Validation(err.to_string()))?;
        self.groups
            .set_members(session, group_id, &group.members)
            .await?;
        Ok(())
    }

    pub async fn get(
        &self,
        session: &mut Session,
        id: ObjectId,
    ) -> Result<TrainingGroup, GroupError> {
        self.groups
            .get_by_id(session, id)
            .await?
            .ok_or_else(|| eyre!("Group not found: {}", id).into())
    }
}

#[derive(Debug, Error)]
pub enum GroupError {
    #[error("Training type not found")]
    TypeNotFound,
    #[error("Group not found")]
    GroupNotFound,
    #[error("Account not found")]
    AccountNotFound,
    #[error("{0}")]
    Validation(String),
    #[error("{0:?}")]
    Common(#[from] eyre::Error),
}

impl From<mongodb::error::Error> for GroupError {
    fn from(value: mongodb::error::Error) -> Self {
        GroupError::Common(value.into())
    }
}
