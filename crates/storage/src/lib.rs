pub mod accounts;
pub mod availability;
pub mod bookings;
pub mod centers;
pub mod courts;
pub mod groups;
pub mod prices;
pub mod session;
pub mod trainers;
pub mod training_types;

use accounts::AccountStore;
use availability::AvailabilityStore;
use bookings::BookingStore;
use centers::CenterStore;
use courts::CourtStore;
use eyre::Result;
use groups::GroupStore;
use prices::PriceStore;
use session::Db;
use trainers::TrainerStore;
use training_types::TrainingTypeStore;

const DB_NAME: &str = "court_ledger_db";

#[derive(Clone)]
pub struct Storage {
    pub db: Db,
    pub accounts: AccountStore,
    pub availability: AvailabilityStore,
    pub bookings: BookingStore,
    pub centers: CenterStore,
    pub courts: CourtStore,
    pub groups: GroupStore,
    pub prices: PriceStore,
    pub trainers: TrainerStore,
    pub training_types: TrainingTypeStore,
}

impl Storage {
    pub async fn new(uri: &str) -> Result<Self> {
        let db = Db::new(uri, DB_NAME).await?;
        let accounts = AccountStore::new(&db);
        let availability = AvailabilityStore::new(&db).await?;
        let bookings = BookingStore::new(&db).await?;
        let centers = CenterStore::new(&db);
        let courts = CourtStore::new(&db).await?;
        let groups = GroupStore::new(&db);
        let prices = PriceStore::new(&db).await?;
        let trainers = TrainerStore::new(&db);
        let training_types = TrainingTypeStore::new(&db);

        Ok(Storage {
            db,
            accounts,
            availability,
            bookings,
            centers,
            courts,
            groups,
            prices,
            trainers,
            training_types,
        })
    }
}
