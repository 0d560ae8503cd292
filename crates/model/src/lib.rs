pub mod account;
pub mod availability;
pub mod booking;
pub mod center;
pub mod court;
pub mod decimal;
pub mod group;
pub mod hours;
pub mod ids;
pub mod session;
pub mod trainer;
pub mod training_type;
