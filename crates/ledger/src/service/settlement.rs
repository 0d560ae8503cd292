use eyre::{eyre, Error};
use model::{
    account::Account,
    booking::{Booking, Charge},
    decimal::Decimal,
    session::Session,
    training_type::{Participation, TrainingType},
};
use mongodb::bson::oid::ObjectId;
use storage::{
    accounts::AccountStore, groups::GroupStore, prices::PriceStore, trainers::TrainerStore,
    training_types::TrainingTypeStore,
};

/// Resolves prices and builds/applies settlement plans. The money policy by
/// participation shape:
/// - group: every member owes the full total;
/// - split with more than one participant: the total divided evenly;
/// - otherwise the single primary customer owes the full total.
#[derive(Clone)]
pub struct Settlement {
    accounts: AccountStore,
    groups: GroupStore,
    prices: PriceStore,
    trainers: TrainerStore,
    training_types: TrainingTypeStore,
}

impl Settlement {
    pub fn new(
        accounts: AccountStore,
        groups: GroupStore,
        prices: PriceStore,
        trainers: TrainerStore,
        training_types: TrainingTypeStore,
    ) -> Settlement {
        Settlement {
            accounts,
            groups,
            prices,
            trainers,
            training_types,
        }
    }

    pub async fn training_type(
        &self,
        session: &mut Session,
        booking: &Booking,
    ) -> Result<TrainingType, Error> {
        self.training_types
            .get_by_id(session, booking.training_type)
            .await?
            .ok_or_else(|| eyre!("Training type not found: {}", booking.training_type))
    }

    /// Total price: (center override or type fallback, plus the trainer's
    /// per-participation surcharge) times the duration.
    pub async fn total_price(
        &self,
        session: &mut Session,
        booking: &Booking,
        training_type: &TrainingType,
    ) -> Result<Decimal, Error> {
        let price = self
            .prices
            .get(session, booking.center, booking.training_type)
            .await?
            .map(|p| p.price_per_hour)
            .unwrap_or(training_type.price_per_hour);

        let trainer = self
            .trainers
            .get_by_id(session, booking.trainer)
            .await?
            .ok_or_else(|| eyre!("Trainer not found: {}", booking.trainer))?;
        let surcharge = trainer.surcharge_for(training_type.participation_resolved());

        Ok(total_price(price, surcharge, booking.duration_hours()))
    }

    /// Everyone who takes part: the group roster for group sessions, the
    /// primary customer plus additional participants otherwise.
    pub async fn roster(
        &self,
        session: &mut Session,
        booking: &Booking,
    ) -> Result<Vec<ObjectId>, Error> {
        if let Some(group) = booking.group {
            let group = self
                .groups
                .get_by_id(session, group)
                .await?
                .ok_or_else(|| eyre!("Group not found: {}", group))?;
            return Ok(group.members);
        }
        let customer = booking
            .customer
            .ok_or_else(|| eyre!("Booking #{} has no customer", booking.number))?;
        let mut roster = vec![customer];
        roster.extend(booking.participants.iter().copied());
        Ok(roster)
    }

    pub async fn load_accounts(
        &self,
        session: &mut Session,
        ids: &[ObjectId],
    ) -> Result<Vec<Account>, Error> {
        let accounts = self.accounts.get_many(session, ids).await?;
        if accounts.len() != ids.len() {
            return Err(eyre!(
                "Missing accounts: expected {}, found {}",
                ids.len(),
                accounts.len()
            ));
        }
        Ok(accounts)
    }

    /// Applies every charge as a debit (or credit when `refund` is set).
    pub async fn apply(
        &self,
        session: &mut Session,
        charges: &[Charge],
        refund: bool,
    ) -> Result<(), Error> {
        for charge in charges {
            let delta = if refund {
                charge.amount
            } else {
                Decimal::zero() - charge.amount
            };
            self.accounts
                .change_balance(session, charge.account, delta)
                .await?;
        }
        Ok(())
    }
}

pub fn total_price(price_per_hour: Decimal, surcharge_per_hour: Decimal, duration: f64) -> Decimal {
    (price_per_hour + surcharge_per_hour) * Decimal::from(duration)
}

/// Builds the charge list for the roster under the participation policy.
pub fn settlement_plan(
    participation: Participation,
    total: Decimal,
    roster: &[ObjectId],
) -> Vec<Charge> {
    match participation {
        Participation::Group => roster
            .iter()
            .map(|account| Charge {
                account: *account,
                amount: total,
            })
            .collect(),
        Participation::Split if roster.len() > 1 => {
            let share = total.split(roster.len() as u32);
            roster
                .iter()
                .map(|account| Charge {
                    account: *account,
                    amount: share,
                })
                .collect()
        }
        _ => roster
            .first()
            .map(|account| Charge {
                account: *account,
                amount: total,
            })
            .into_iter()
            .collect(),
    }
}

/// Accounts whose balance cannot cover their share.
pub fn short_accounts(accounts: &[Account], plan: &[Charge]) -> Vec<ObjectId> {
    plan.iter()
        .filter(|charge| {
            accounts
                .iter()
                .find(|a| a.id == charge.account)
                .map(|a| !a.can_afford(charge.amount))
                .unwrap_or(true)
        })
        .map(|charge| charge.account)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(id: ObjectId, balance: i64) -> Account {
        Account {
            id,
            name: "client".to_string(),
            balance: Decimal::int(balance),
            version: 0,
        }
    }

    #[test]
    fn test_total_price() {
        assert_eq!(
            Decimal::int(1000),
            total_price(Decimal::int(1000), Decimal::zero(), 1.0)
        );
        assert_eq!(
            Decimal::int(1875),
            total_price(Decimal::int(1000), Decimal::int(250), 1.5)
        );
    }

    #[test]
    fn test_group_pays_full_price_each() {
        let roster = vec![ObjectId::new(), ObjectId::new(), ObjectId::new()];
        let plan = settlement_plan(Participation::Group, Decimal::int(1000), &roster);
        assert_eq!(3, plan.len());
        for charge in &plan {
            assert_eq!(Decimal::int(1000), charge.amount);
        }
    }

    #[test]
    fn test_split_divides_evenly() {
        let roster = vec![ObjectId::new(), ObjectId::new()];
        let plan = settlement_plan(Participation::Split, Decimal::int(2000), &roster);
        assert_eq!(2, plan.len());
        for charge in &plan {
            assert_eq!(Decimal::int(1000), charge.amount);
        }
        let sum: Decimal = plan.iter().map(|c| c.amount).sum();
        assert_eq!(Decimal::int(2000), sum);
    }

    #[test]
    fn test_split_with_one_participant_charges_primary_in_full() {
        let customer = ObjectId::new();
        let plan = settlement_plan(Participation::Split, Decimal::int(2000), &[customer]);
        assert_eq!(1, plan.len());
        assert_eq!(customer, plan[0].account);
        assert_eq!(Decimal::int(2000), plan[0].amount);
    }

    #[test]
    fn test_individual_charges_primary_only() {
        let customer = ObjectId::new();
        let plan = settlement_plan(Participation::Individual, Decimal::int(1500), &[customer]);
        assert_eq!(vec![customer], plan.iter().map(|c| c.account).collect::<Vec<_>>());
        assert_eq!(Decimal::int(1500), plan[0].amount);
    }

    #[test]
    fn test_group_confirm_scenario() {
        // price 1000/hr, 1h, three members with 1500 each
        let roster = vec![ObjectId::new(), ObjectId::new(), ObjectId::new()];
        let total = total_price(Decimal::int(1000), Decimal::zero(), 1.0);
        let plan = settlement_plan(Participation::Group, total, &roster);
        let accounts: Vec<Account> = roster.iter().map(|id| account(*id, 1500)).collect();
        assert!(short_accounts(&accounts, &plan).is_empty());

        let mut balances = accounts.clone();
        for charge in &plan {
            let entry = balances.iter_mut().find(|a| a.id == charge.account).unwrap();
            entry.balance -= charge.amount;
        }
        for entry in balances {
            assert_eq!(Decimal::int(500), entry.balance);
        }
    }

    #[test]
    fn test_split_shortfall_names_the_poor_account() {
        let rich = ObjectId::new();
        let poor = ObjectId::new();
        let plan = settlement_plan(Participation::Split, Decimal::int(2000), &[rich, poor]);
        let accounts = vec![account(rich, 5000), account(poor, 900)];
        assert_eq!(vec![poor], short_accounts(&accounts, &plan));
    }

    #[test]
    fn test_missing_account_counts_as_short() {
        let known = ObjectId::new();
        let unknown = ObjectId::new();
        let plan = settlement_plan(Participation::Group, Decimal::int(100), &[known, unknown]);
        let accounts = vec![account(known, 1000)];
        assert_eq!(vec![unknown], short_accounts(&accounts, &plan));
    }
}
