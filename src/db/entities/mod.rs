//! SeaORM entities for the rental tables.

pub mod billboard;
pub mod rental_contract;
pub mod rental_reminder;
