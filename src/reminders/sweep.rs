use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::clock::Clock;
use crate::db::models::{RentalContract, SentReminder};
use crate::db::services::{ContractStore, StoreError};
use crate::notifications::{NotificationSender, SenderError};
use crate::reminders::message::render_reminder;
use crate::reminders::policy::{ContractTier, DueReminder, TimeRemaining};
use crate::reminders::tag::ReminderTag;

#[derive(Debug, Error)]
pub enum SweepError {
    #[error("Failed to load active contracts: {0}")]
    Store(#[from] StoreError),
    #[error("A reminder sweep is already running")]
    AlreadyRunning,
}

/// A reminder that went out.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SentReport {
    pub contract_id: Uuid,
    pub client_name: String,
    pub billboard_name: Option<String>,
    pub reminder_type: ReminderTag,
    pub days_left: i64,
    /// `false` when the email went out but the history write failed, so the
    /// next sweep will send it again.
    pub recorded: bool,
}

/// A reminder that was due but could not be delivered. It stays unrecorded
/// and is retried by the next sweep.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedReport {
    pub contract_id: Uuid,
    pub client_name: String,
    pub billboard_name: Option<String>,
    pub reminder_type: ReminderTag,
    pub days_left: i64,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SweepResults {
    pub sent: Vec<SentReport>,
    pub errors: Vec<FailedReport>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepSummary {
    pub contracts_checked: usize,
    pub contracts_skipped: usize,
    pub total_sent: usize,
    pub total_errors: usize,
    pub results: SweepResults,
}

/// Read-only view of what the next sweep would do for one contract.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractPreview {
    pub contract_id: Uuid,
    pub contract_duration_months: i32,
    pub supported_tier: bool,
    pub time_remaining: TimeRemaining,
    pub pending: Vec<DueReminder>,
    pub reminders_sent: Vec<SentReminder>,
}

/// Finds due reminders across all active contracts and dispatches them.
///
/// Contracts are handled one after another. A reminder is appended to the
/// contract's history only after the sender accepted it.
pub struct ReminderSweep {
    store: Arc<dyn ContractStore>,
    sender: Arc<dyn NotificationSender>,
    clock: Arc<dyn Clock>,
    recipient: String,
    dispatch_timeout: Duration,
    running: Mutex<()>,
}

impl ReminderSweep {
    pub fn new(
        store: Arc<dyn ContractStore>,
        sender: Arc<dyn NotificationSender>,
        clock: Arc<dyn Clock>,
        recipient: impl Into<String>,
        dispatch_timeout: Duration,
    ) -> Self {
        Self {
            store,
            sender,
            clock,
            recipient: recipient.into(),
            dispatch_timeout,
            running: Mutex::new(()),
        }
    }

    /// Runs sweeps back to back every `period`. A tick that comes due while a
    /// sweep is still running is delayed, never run alongside it.
    pub async fn start_periodic(self: Arc<Self>, period: Duration) {
        info!(?period, "Periodic reminder sweep started.");
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match self.run().await {
                Ok(summary) => debug!(
                    sent = summary.total_sent,
                    errors = summary.total_errors,
                    "Periodic reminder sweep cycle done."
                ),
                Err(SweepError::AlreadyRunning) => {
                    warn!("Skipping periodic reminder sweep: another sweep is in progress.")
                }
                Err(e) => error!(error = %e, "Periodic reminder sweep failed."),
            }
        }
    }

    /// One pass over all active contracts.
    ///
    /// Only a failure to list contracts (or an overlapping run) is an error.
    /// Per-reminder problems end up in the summary.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<SweepSummary, SweepError> {
        let _guard = self.running.try_lock().map_err(|_| SweepError::AlreadyRunning)?;

        let now = self.clock.now();
        let contracts = self.store.list_active_contracts().await?;
        info!(count = contracts.len(), "Checking active rental contracts for due reminders.");

        let mut summary = SweepSummary {
            contracts_checked: contracts.len(),
            ..SweepSummary::default()
        };

        for contract in &contracts {
            if let Err(e) = contract.validate() {
                warn!(contract_id = %contract.id, error = %e, "Skipping malformed rental contract.");
                summary.contracts_skipped += 1;
                continue;
            }
            if ContractTier::from_months(contract.contract_duration_months).is_none() {
                debug!(
                    contract_id = %contract.id,
                    duration_months = contract.contract_duration_months,
                    "Contract duration has no reminder cadence."
                );
                continue;
            }

            for due in contract.pending_reminders(now) {
                self.dispatch(contract, due, &mut summary).await;
            }
        }

        summary.total_sent = summary.results.sent.len();
        summary.total_errors = summary.results.errors.len();
        info!(
            sent = summary.total_sent,
            errors = summary.total_errors,
            skipped = summary.contracts_skipped,
            "Reminder sweep finished."
        );
        Ok(summary)
    }

    async fn dispatch(&self, contract: &RentalContract, due: DueReminder, summary: &mut SweepSummary) {
        let fail = |summary: &mut SweepSummary, error: String| {
            summary.results.errors.push(FailedReport {
                contract_id: contract.id,
                client_name: contract.client_name.clone(),
                billboard_name: contract.billboard_name().map(str::to_string),
                reminder_type: due.tag,
                days_left: due.days_left,
                error,
            });
        };

        let message = match render_reminder(contract, due.tag, due.days_left) {
            Ok(message) => message,
            Err(e) => {
                error!(contract_id = %contract.id, reminder = %due.tag, error = %e, "Could not render reminder email.");
                fail(summary, e.to_string());
                return;
            }
        };

        let outcome = tokio::time::timeout(
            self.dispatch_timeout,
            self.sender.send(&self.recipient, &message.subject, &message.body),
        )
        .await
        .unwrap_or_else(|_| Err(SenderError::Timeout(self.dispatch_timeout)));

        if let Err(e) = outcome {
            warn!(contract_id = %contract.id, reminder = %due.tag, error = %e, "Failed to send rental reminder.");
            fail(summary, e.to_string());
            return;
        }

        let recorded = match self
            .store
            .append_reminder_sent(contract.id, due.tag, self.clock.now())
            .await
        {
            Ok(()) => true,
            Err(e) => {
                error!(
                    contract_id = %contract.id,
                    reminder = %due.tag,
                    error = %e,
                    "Reminder sent but not recorded; it will be sent again on the next sweep."
                );
                false
            }
        };

        info!(
            contract_id = %contract.id,
            client = %contract.client_name,
            reminder = %due.tag,
            days_left = due.days_left,
            "Rental reminder sent."
        );
        summary.results.sent.push(SentReport {
            contract_id: contract.id,
            client_name: contract.client_name.clone(),
            billboard_name: contract.billboard_name().map(str::to_string),
            reminder_type: due.tag,
            days_left: due.days_left,
            recorded,
        });
    }

    /// What the sweep would send for one contract right now, without sending it.
    pub async fn preview(&self, contract_id: Uuid) -> Result<Option<ContractPreview>, StoreError> {
        let Some(contract) = self.store.get_contract(contract_id).await? else {
            return Ok(None);
        };
        let now = self.clock.now();
        Ok(Some(ContractPreview {
            contract_id: contract.id,
            contract_duration_months: contract.contract_duration_months,
            supported_tier: ContractTier::from_months(contract.contract_duration_months).is_some(),
            time_remaining: contract.time_remaining(now),
            pending: contract.pending_reminders(now),
            reminders_sent: contract.reminders_sent,
        }))
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;

    /// Records every send; fails any message whose body contains `fail_marker`.
    #[derive(Default)]
    pub struct RecordingSender {
        pub sent: StdMutex<Vec<(String, String)>>,
        pub fail_marker: Option<String>,
    }

    impl RecordingSender {
        pub fn failing_on(marker: &str) -> Self {
            Self {
                sent: StdMutex::new(Vec::new()),
                fail_marker: Some(marker.to_string()),
            }
        }

        pub fn subjects(&self) -> Vec<String> {
            self.sent.lock().unwrap().iter().map(|(_, s)| s.clone()).collect()
        }
    }

    #[async_trait]
    impl NotificationSender for RecordingSender {
        async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), SenderError> {
            if let Some(marker) = &self.fail_marker {
                if body.contains(marker.as_str()) {
                    return Err(SenderError::SendFailed("relay rejected message".to_string()));
                }
            }
            self.sent
                .lock()
                .unwrap()
                .push((recipient.to_string(), subject.to_string()));
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::RecordingSender;
    use super::*;
    use crate::clock::FixedClock;
    use crate::db::enums::ContractStatus;
    use crate::db::models::fixtures::contract;
    use crate::db::services::InMemoryContractStore;
    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};
    use tokio::sync::Notify;

    const RECIPIENT: &str = "ops@billboards.test";

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 1, 7, 0, 0).unwrap()
    }

    fn sweep_with(
        store: Arc<dyn ContractStore>,
        sender: Arc<dyn NotificationSender>,
        timeout: Duration,
    ) -> ReminderSweep {
        ReminderSweep::new(store, sender, Arc::new(FixedClock::new(now())), RECIPIENT, timeout)
    }

    fn named(mut c: RentalContract, client: &str) -> RentalContract {
        c.client_name = client.to_string();
        c
    }

    /// Store whose history writes always fail.
    struct ReadOnlyStore(InMemoryContractStore);

    #[async_trait]
    impl ContractStore for ReadOnlyStore {
        async fn list_active_contracts(&self) -> Result<Vec<RentalContract>, StoreError> {
            self.0.list_active_contracts().await
        }
        async fn append_reminder_sent(
            &self,
            _contract_id: Uuid,
            _tag: ReminderTag,
            _sent_at: DateTime<Utc>,
        ) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("write refused".to_string()))
        }
        async fn get_contract(&self, contract_id: Uuid) -> Result<Option<RentalContract>, StoreError> {
            self.0.get_contract(contract_id).await
        }
    }

    struct DownStore;

    #[async_trait]
    impl ContractStore for DownStore {
        async fn list_active_contracts(&self) -> Result<Vec<RentalContract>, StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }
        async fn append_reminder_sent(&self, id: Uuid, _: ReminderTag, _: DateTime<Utc>) -> Result<(), StoreError> {
            Err(StoreError::NotFound(id))
        }
        async fn get_contract(&self, _: Uuid) -> Result<Option<RentalContract>, StoreError> {
            Ok(None)
        }
    }

    struct HangingSender;

    #[async_trait]
    impl NotificationSender for HangingSender {
        async fn send(&self, _: &str, _: &str, _: &str) -> Result<(), SenderError> {
            std::future::pending::<()>().await;
            Ok(())
        }
    }

    #[derive(Default)]
    struct GateSender {
        entered: Notify,
        release: Notify,
    }

    #[async_trait]
    impl NotificationSender for GateSender {
        async fn send(&self, _: &str, _: &str, _: &str) -> Result<(), SenderError> {
            self.entered.notify_one();
            self.release.notified().await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_sends_due_reminders_and_records_them() {
        let store = Arc::new(InMemoryContractStore::new());
        let week = contract(1, now(), 5);
        let half_year = contract(12, now(), 180);
        let not_due = contract(12, now(), 200);
        for c in [&week, &half_year, &not_due] {
            store.insert(c.clone()).await.unwrap();
        }
        let sender = Arc::new(RecordingSender::default());
        let sweep = sweep_with(store.clone(), sender.clone(), Duration::from_secs(5));

        let summary = sweep.run().await.unwrap();

        assert_eq!(summary.contracts_checked, 3);
        assert_eq!(summary.total_sent, 2);
        assert_eq!(summary.total_errors, 0);
        let types: Vec<_> = summary.results.sent.iter().map(|s| s.reminder_type).collect();
        assert_eq!(types, vec![ReminderTag::OneWeek, ReminderTag::SixMonths]);
        assert!(summary.results.sent.iter().all(|s| s.recorded));

        let recipients: Vec<_> = sender.sent.lock().unwrap().iter().map(|(r, _)| r.clone()).collect();
        assert_eq!(recipients, vec![RECIPIENT, RECIPIENT]);

        let stored = store.get_contract(week.id).await.unwrap().unwrap();
        assert!(stored.has_sent("1_week"));
        let stored = store.get_contract(not_due.id).await.unwrap().unwrap();
        assert!(stored.reminders_sent.is_empty());
    }

    #[tokio::test]
    async fn test_second_sweep_sends_nothing_new() {
        let store = Arc::new(InMemoryContractStore::new());
        store.insert(contract(3, now(), 6)).await.unwrap();
        let sender = Arc::new(RecordingSender::default());
        let sweep = sweep_with(store.clone(), sender.clone(), Duration::from_secs(5));

        let first = sweep.run().await.unwrap();
        assert_eq!(first.total_sent, 2);
        let second = sweep.run().await.unwrap();
        assert_eq!(second.total_sent, 0);
        assert_eq!(second.total_errors, 0);
        assert_eq!(sender.subjects().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_dispatch_is_isolated_and_not_recorded() {
        let store = Arc::new(InMemoryContractStore::new());
        let failing = named(contract(1, now(), 4), "Bounce Media");
        let healthy = named(contract(1, now(), 4), "Steady Signs");
        store.insert(failing.clone()).await.unwrap();
        store.insert(healthy.clone()).await.unwrap();
        let sender = Arc::new(RecordingSender::failing_on("Bounce Media"));
        let sweep = sweep_with(store.clone(), sender.clone(), Duration::from_secs(5));

        let summary = sweep.run().await.unwrap();

        assert_eq!(summary.total_sent, 1);
        assert_eq!(summary.total_errors, 1);
        let failure = &summary.results.errors[0];
        assert_eq!(failure.contract_id, failing.id);
        assert_eq!(failure.reminder_type, ReminderTag::OneWeek);
        assert!(failure.error.contains("relay rejected message"));

        assert!(!store.get_contract(failing.id).await.unwrap().unwrap().has_sent("1_week"));
        assert!(store.get_contract(healthy.id).await.unwrap().unwrap().has_sent("1_week"));

        // Still eligible next time.
        let retry = sweep.run().await.unwrap();
        assert_eq!(retry.total_sent, 0);
        assert_eq!(retry.total_errors, 1);
        assert_eq!(retry.results.errors[0].contract_id, failing.id);
    }

    #[tokio::test]
    async fn test_stuck_dispatch_times_out() {
        let store = Arc::new(InMemoryContractStore::new());
        let c = contract(1, now(), 2);
        store.insert(c.clone()).await.unwrap();
        let sweep = sweep_with(store.clone(), Arc::new(HangingSender), Duration::from_millis(50));

        let summary = sweep.run().await.unwrap();

        assert_eq!(summary.total_sent, 0);
        assert_eq!(summary.total_errors, 1);
        assert!(summary.results.errors[0].error.contains("timed out"));
        assert!(store.get_contract(c.id).await.unwrap().unwrap().reminders_sent.is_empty());
    }

    #[tokio::test]
    async fn test_unrecorded_reminder_is_sent_again() {
        let inner = InMemoryContractStore::new();
        inner.insert(contract(1, now(), 3)).await.unwrap();
        let store = Arc::new(ReadOnlyStore(inner));
        let sender = Arc::new(RecordingSender::default());
        let sweep = sweep_with(store, sender.clone(), Duration::from_secs(5));

        let first = sweep.run().await.unwrap();
        assert_eq!(first.total_sent, 1);
        assert!(!first.results.sent[0].recorded);

        let second = sweep.run().await.unwrap();
        assert_eq!(second.total_sent, 1);
        assert_eq!(sender.subjects().len(), 2);
    }

    #[tokio::test]
    async fn test_listing_failure_is_an_error() {
        let sweep = sweep_with(Arc::new(DownStore), Arc::new(RecordingSender::default()), Duration::from_secs(1));
        assert!(matches!(sweep.run().await, Err(SweepError::Store(_))));
    }

    #[tokio::test]
    async fn test_inactive_and_unsupported_contracts_are_quiet() {
        let store = Arc::new(InMemoryContractStore::new());
        let expired = contract(1, now(), 5);
        store.insert(expired.clone()).await.unwrap();
        store.set_status(expired.id, ContractStatus::Expired).await.unwrap();
        store.insert(contract(2, now(), 5)).await.unwrap();
        store.insert(contract(9, now(), 60)).await.unwrap();
        let sender = Arc::new(RecordingSender::default());
        let sweep = sweep_with(store, sender.clone(), Duration::from_secs(5));

        let summary = sweep.run().await.unwrap();

        assert_eq!(summary.contracts_checked, 2);
        assert_eq!(summary.total_sent, 0);
        assert!(sender.subjects().is_empty());
    }

    #[tokio::test]
    async fn test_overlapping_run_is_refused() {
        let store = Arc::new(InMemoryContractStore::new());
        store.insert(contract(1, now(), 5)).await.unwrap();
        let gate = Arc::new(GateSender::default());
        let sweep = Arc::new(sweep_with(store, gate.clone(), Duration::from_secs(10)));

        let background = {
            let sweep = sweep.clone();
            tokio::spawn(async move { sweep.run().await })
        };
        gate.entered.notified().await;

        assert!(matches!(sweep.run().await, Err(SweepError::AlreadyRunning)));

        gate.release.notify_one();
        let summary = background.await.unwrap().unwrap();
        assert_eq!(summary.total_sent, 1);
    }

    #[tokio::test]
    async fn test_preview_does_not_send_or_record() {
        let store = Arc::new(InMemoryContractStore::new());
        let c = contract(6, now(), 85);
        store.insert(c.clone()).await.unwrap();
        let sender = Arc::new(RecordingSender::default());
        let sweep = sweep_with(store.clone(), sender.clone(), Duration::from_secs(5));

        let preview = sweep.preview(c.id).await.unwrap().unwrap();
        assert!(preview.supported_tier);
        assert_eq!(preview.time_remaining, TimeRemaining { days: 85, months: 3 });
        assert_eq!(preview.pending, vec![DueReminder { tag: ReminderTag::ThreeMonths, days_left: 85 }]);

        assert!(sender.subjects().is_empty());
        assert!(store.get_contract(c.id).await.unwrap().unwrap().reminders_sent.is_empty());
        assert!(sweep.preview(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_summary_json_shape() {
        let store = Arc::new(InMemoryContractStore::new());
        store.insert(contract(1, now(), 5)).await.unwrap();
        let sweep = sweep_with(store, Arc::new(RecordingSender::default()), Duration::from_secs(5));

        let json = serde_json::to_value(sweep.run().await.unwrap()).unwrap();
        assert_eq!(json["totalSent"], 1);
        assert_eq!(json["totalErrors"], 0);
        assert_eq!(json["results"]["sent"][0]["reminderType"], "1_week");
        assert_eq!(json["results"]["sent"][0]["daysLeft"], 5);
        assert_eq!(json["results"]["sent"][0]["clientName"], "Acme Outdoor");
        assert!(json["results"]["errors"].as_array().unwrap().is_empty());
    }
}
