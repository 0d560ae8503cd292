pub mod availability;
pub mod groups;
pub mod guard;
pub mod notification;
pub mod recurrence;
pub mod settlement;
