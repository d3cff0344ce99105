use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectOptions, ConnectionTrait, Database, DatabaseConnection,
    DbErr, EntityTrait, NotSet, QueryFilter, QueryOrder, Schema, Set, TransactionTrait,
};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::db::entities::{billboard, rental_contract, rental_reminder};
use crate::db::enums::ContractStatus;
use crate::db::models::{RentalContract, ValidationError};
use crate::reminders::tag::ReminderTag;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
    #[error("Rental contract not found: {0}")]
    NotFound(Uuid),
    #[error("Invalid rental contract: {0}")]
    Invalid(#[from] ValidationError),
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Persistence of rental contracts as seen by the reminder sweep.
#[async_trait]
pub trait ContractStore: Send + Sync {
    /// All contracts whose status is `active`, each with its reminder history.
    async fn list_active_contracts(&self) -> Result<Vec<RentalContract>, StoreError>;

    /// Appends one entry to a contract's reminder history.
    /// Called only after the reminder has been dispatched.
    async fn append_reminder_sent(
        &self,
        contract_id: Uuid,
        tag: ReminderTag,
        sent_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    async fn get_contract(&self, contract_id: Uuid) -> Result<Option<RentalContract>, StoreError>;
}

/// Postgres-backed store.
pub struct SeaOrmContractStore {
    db: DatabaseConnection,
}

impl SeaOrmContractStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let mut opt = ConnectOptions::new(database_url.to_owned());
        opt.max_connections(max_connections).sqlx_logging(false);

        let db = Database::connect(opt).await?;
        info!(max_connections, "Connected to rental database.");
        Ok(Self { db })
    }

    /// Creates the rental tables if they do not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        let backend = self.db.get_database_backend();
        let schema = Schema::new(backend);
        let mut statements = [
            schema.create_table_from_entity(billboard::Entity),
            schema.create_table_from_entity(rental_contract::Entity),
            schema.create_table_from_entity(rental_reminder::Entity),
        ];
        for statement in statements.iter_mut() {
            statement.if_not_exists();
            self.db.execute(backend.build(&*statement)).await?;
        }
        debug!("Rental schema is in place.");
        Ok(())
    }

    pub async fn close(&self) -> Result<(), StoreError> {
        self.db.clone().close().await?;
        info!("Closed rental database connection.");
        Ok(())
    }

    async fn load_reminders(
        &self,
        contract_ids: Vec<Uuid>,
    ) -> Result<HashMap<Uuid, Vec<rental_reminder::Model>>, DbErr> {
        let mut by_contract: HashMap<Uuid, Vec<rental_reminder::Model>> = HashMap::new();
        if contract_ids.is_empty() {
            return Ok(by_contract);
        }

        let rows = rental_reminder::Entity::find()
            .filter(rental_reminder::Column::ContractId.is_in(contract_ids))
            .order_by_asc(rental_reminder::Column::SentAt)
            .order_by_asc(rental_reminder::Column::Id)
            .all(&self.db)
            .await?;
        for row in rows {
            by_contract.entry(row.contract_id).or_default().push(row);
        }
        Ok(by_contract)
    }
}

#[async_trait]
impl ContractStore for SeaOrmContractStore {
    async fn list_active_contracts(&self) -> Result<Vec<RentalContract>, StoreError> {
        let rows = rental_contract::Entity::find()
            .filter(rental_contract::Column::Status.eq(ContractStatus::Active))
            .order_by_asc(rental_contract::Column::EndDate)
            .find_also_related(billboard::Entity)
            .all(&self.db)
            .await?;

        let ids = rows.iter().map(|(contract, _)| contract.id).collect();
        let mut reminders = self.load_reminders(ids).await?;

        Ok(rows
            .into_iter()
            .map(|(contract, billboard)| {
                let history = reminders.remove(&contract.id).unwrap_or_default();
                RentalContract::from_parts(contract, billboard, history)
            })
            .collect())
    }

    async fn append_reminder_sent(
        &self,
        contract_id: Uuid,
        tag: ReminderTag,
        sent_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let txn = self.db.begin().await?;

        let contract = rental_contract::Entity::find_by_id(contract_id)
            .one(&txn)
            .await?
            .ok_or(StoreError::NotFound(contract_id))?;

        rental_reminder::ActiveModel {
            id: NotSet,
            contract_id: Set(contract_id),
            reminder_type: Set(tag.as_str().to_string()),
            sent_at: Set(sent_at),
        }
        .insert(&txn)
        .await?;

        let mut active_contract: rental_contract::ActiveModel = contract.into();
        active_contract.updated_at = Set(Utc::now());
        active_contract.update(&txn).await?;

        txn.commit().await?;
        Ok(())
    }

    async fn get_contract(&self, contract_id: Uuid) -> Result<Option<RentalContract>, StoreError> {
        let Some((contract, billboard)) = rental_contract::Entity::find_by_id(contract_id)
            .find_also_related(billboard::Entity)
            .one(&self.db)
            .await?
        else {
            return Ok(None);
        };

        let mut reminders = self.load_reminders(vec![contract.id]).await?;
        let history = reminders.remove(&contract.id).unwrap_or_default();
        Ok(Some(RentalContract::from_parts(contract, billboard, history)))
    }
}
