use std::fs;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::clock::{Clock, SystemClock};
use crate::db::models::RentalContract;
use crate::db::services::{ContractStore, InMemoryContractStore, SeaOrmContractStore, StoreError};
use crate::notifications::{build_sender, SenderConfig, SenderError};
use crate::reminders::sweep::ReminderSweep;
use crate::server::config::{ConfigError, ServerConfig, StoreBackend};

#[derive(Error, Debug)]
pub enum StartupError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("Sender error: {0}")]
    Sender(#[from] SenderError),
    #[error("Failed to read seed file {path}: {reason}")]
    Seed { path: String, reason: String },
}

/// The concrete store chosen at start up, kept so it can be closed on shutdown.
pub enum StoreHandle {
    Postgres(Arc<SeaOrmContractStore>),
    Memory(Arc<InMemoryContractStore>),
}

impl StoreHandle {
    pub fn as_store(&self) -> Arc<dyn ContractStore> {
        match self {
            StoreHandle::Postgres(store) => store.clone(),
            StoreHandle::Memory(store) => store.clone(),
        }
    }

    pub async fn close(&self) -> Result<(), StoreError> {
        match self {
            StoreHandle::Postgres(store) => store.close().await,
            StoreHandle::Memory(_) => Ok(()),
        }
    }
}

/// Everything the binaries share: the store and the sweep wired to it.
pub struct CoreServices {
    pub store: StoreHandle,
    pub sweep: Arc<ReminderSweep>,
}

impl CoreServices {
    pub async fn build(config: &ServerConfig) -> Result<Self, StartupError> {
        Self::build_with_clock(config, Arc::new(SystemClock)).await
    }

    pub async fn build_with_clock(
        config: &ServerConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, StartupError> {
        let store = match config.store_backend {
            StoreBackend::Postgres => {
                let url = config
                    .database_url
                    .as_deref()
                    .ok_or(ConfigError::Missing("DATABASE_URL"))?;
                let store = SeaOrmContractStore::connect(url, config.database_max_connections).await?;
                store.ensure_schema().await?;
                StoreHandle::Postgres(Arc::new(store))
            }
            StoreBackend::Memory => {
                let store = InMemoryContractStore::new();
                if let Some(path) = &config.seed_file {
                    for contract in read_seed_file(path)? {
                        store.insert(contract).await?;
                    }
                    info!(path = %path, count = store.len().await, "Seeded in-memory contract store.");
                }
                StoreHandle::Memory(Arc::new(store))
            }
        };

        let sender_config = config.sender_config()?;
        let sender = build_sender(&sender_config)?;
        if sender_config == SenderConfig::Unconfigured {
            warn!("EMAIL_TRANSPORT is not set; due reminders will fail until a transport is configured.");
        }
        info!(
            store = ?config.store_backend,
            transport = sender_config.kind(),
            recipient = %config.contact_email,
            "Reminder services ready."
        );

        let sweep = Arc::new(ReminderSweep::new(
            store.as_store(),
            sender,
            clock,
            config.contact_email.clone(),
            config.dispatch_timeout(),
        ));

        Ok(Self { store, sweep })
    }

    pub async fn shutdown(&self) -> Result<(), StoreError> {
        self.store.close().await
    }
}

fn read_seed_file(path: &str) -> Result<Vec<RentalContract>, StartupError> {
    let seed_error = |reason: String| StartupError::Seed {
        path: path.to_string(),
        reason,
    };
    let contents = fs::read_to_string(path).map_err(|e| seed_error(e.to_string()))?;
    serde_json::from_str(&contents).map_err(|e| seed_error(e.to_string()))
}
