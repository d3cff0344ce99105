use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::contract_store::{ContractStore, StoreError};
use crate::db::enums::ContractStatus;
use crate::db::models::{RentalContract, SentReminder};
use crate::reminders::tag::ReminderTag;

/// Process-local store. Selected with `store_backend = "memory"` and used by tests.
#[derive(Debug, Default)]
pub struct InMemoryContractStore {
    contracts: RwLock<Vec<RentalContract>>,
}

impl InMemoryContractStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, contract: RentalContract) -> Result<(), StoreError> {
        contract.validate()?;
        let mut contracts = self.contracts.write().await;
        match contracts.iter_mut().find(|c| c.id == contract.id) {
            Some(existing) => *existing = contract,
            None => contracts.push(contract),
        }
        Ok(())
    }

    pub async fn set_status(&self, contract_id: Uuid, status: ContractStatus) -> Result<(), StoreError> {
        let mut contracts = self.contracts.write().await;
        let contract = contracts
            .iter_mut()
            .find(|c| c.id == contract_id)
            .ok_or(StoreError::NotFound(contract_id))?;
        contract.status = status;
        Ok(())
    }

    pub async fn len(&self) -> usize {
        self.contracts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.contracts.read().await.is_empty()
    }
}

#[async_trait]
impl ContractStore for InMemoryContractStore {
    async fn list_active_contracts(&self) -> Result<Vec<RentalContract>, StoreError> {
        let contracts = self.contracts.read().await;
        Ok(contracts
            .iter()
            .filter(|c| c.status == ContractStatus::Active)
            .cloned()
            .collect())
    }

    async fn append_reminder_sent(
        &self,
        contract_id: Uuid,
        tag: ReminderTag,
        sent_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut contracts = self.contracts.write().await;
        let contract = contracts
            .iter_mut()
            .find(|c| c.id == contract_id)
            .ok_or(StoreError::NotFound(contract_id))?;
        contract.reminders_sent.push(SentReminder {
            reminder_type: tag.as_str().to_string(),
            sent_at,
        });
        Ok(())
    }

    async fn get_contract(&self, contract_id: Uuid) -> Result<Option<RentalContract>, StoreError> {
        let contracts = self.contracts.read().await;
        Ok(contracts.iter().find(|c| c.id == contract_id).cloned())
    }
}
