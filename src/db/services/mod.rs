//! Data access for rental contracts.
//!
//! The sweep and the web layer only see the [`ContractStore`] trait. The concrete
//! store is picked once at start up from configuration: Postgres through SeaORM,
//! or the in-memory store.

pub mod contract_store;
pub mod memory_store;

pub use contract_store::{ContractStore, SeaOrmContractStore, StoreError};
pub use memory_store::InMemoryContractStore;
