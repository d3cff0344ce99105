use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::db::entities::{billboard, rental_contract, rental_reminder};
use crate::db::enums::ContractStatus;
use crate::reminders::policy::{self, DueReminder, TimeRemaining};

/// The identifying details of a billboard quoted in reminder emails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillboardSummary {
    pub id: Uuid,
    pub name: String,
    pub address: String,
    pub size: Option<String>,
    pub kind: Option<String>,
}

impl From<billboard::Model> for BillboardSummary {
    fn from(model: billboard::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            address: model.address,
            size: model.size,
            kind: model.billboard_type,
        }
    }
}

/// An entry in a contract's reminder history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentReminder {
    pub reminder_type: String,
    pub sent_at: DateTime<Utc>,
}

impl From<rental_reminder::Model> for SentReminder {
    fn from(model: rental_reminder::Model) -> Self {
        Self {
            reminder_type: model.reminder_type,
            sent_at: model.sent_at,
        }
    }
}

/// One lease of one billboard to one client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RentalContract {
    pub id: Uuid,
    pub billboard_id: Uuid,
    /// Filled in by the store when the billboard row is available.
    pub billboard: Option<BillboardSummary>,
    pub client_name: String,
    pub client_email: String,
    pub client_phone: Option<String>,
    pub client_company: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub contract_duration_months: i32,
    pub monthly_rate: f64,
    pub total_amount: f64,
    #[serde(default)]
    pub status: ContractStatus,
    #[serde(default)]
    pub reminders_sent: Vec<SentReminder>,
    pub notes: Option<String>,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
    #[error("End date {end} must be after start date {start}")]
    EndBeforeStart {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    #[error("{0} must not be negative")]
    NegativeAmount(&'static str),
}

impl RentalContract {
    /// Builds the domain record from its row, the joined billboard and the reminder rows.
    pub fn from_parts(
        model: rental_contract::Model,
        billboard: Option<billboard::Model>,
        reminders: Vec<rental_reminder::Model>,
    ) -> Self {
        Self {
            id: model.id,
            billboard_id: model.billboard_id,
            billboard: billboard.map(BillboardSummary::from),
            client_name: model.client_name,
            client_email: model.client_email,
            client_phone: model.client_phone,
            client_company: model.client_company,
            start_date: model.start_date,
            end_date: model.end_date,
            contract_duration_months: model.contract_duration_months,
            monthly_rate: model.monthly_rate,
            total_amount: model.total_amount,
            status: model.status,
            reminders_sent: reminders.into_iter().map(SentReminder::from).collect(),
            notes: model.notes,
        }
    }

    /// Rejects records the reminder policy must never see.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.client_name.trim().is_empty() {
            return Err(ValidationError::MissingField("client_name"));
        }
        if self.client_email.trim().is_empty() {
            return Err(ValidationError::MissingField("client_email"));
        }
        if self.end_date <= self.start_date {
            return Err(ValidationError::EndBeforeStart {
                start: self.start_date,
                end: self.end_date,
            });
        }
        if self.monthly_rate < 0.0 {
            return Err(ValidationError::NegativeAmount("monthly_rate"));
        }
        if self.total_amount < 0.0 {
            return Err(ValidationError::NegativeAmount("total_amount"));
        }
        Ok(())
    }

    pub fn time_remaining(&self, now: DateTime<Utc>) -> TimeRemaining {
        TimeRemaining::between(self.end_date, now)
    }

    pub fn has_sent(&self, reminder_type: &str) -> bool {
        self.reminders_sent.iter().any(|r| r.reminder_type == reminder_type)
    }

    /// Reminders due for this contract at `now`, skipping anything already sent.
    pub fn pending_reminders(&self, now: DateTime<Utc>) -> Vec<DueReminder> {
        policy::pending_reminders(
            self.contract_duration_months,
            self.time_remaining(now),
            self.reminders_sent.iter().map(|r| r.reminder_type.as_str()),
        )
    }

    pub fn billboard_name(&self) -> Option<&str> {
        self.billboard.as_ref().map(|b| b.name.as_str())
    }
}
