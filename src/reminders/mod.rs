//! Expiry reminders for rental contracts: which checkpoints apply to a
//! contract, what the email says, and the sweep that sends them.

pub mod message;
pub mod policy;
pub mod sweep;
pub mod tag;

pub use policy::{ContractTier, DueReminder, TimeRemaining, pending_reminders};
pub use sweep::{ReminderSweep, SweepError, SweepSummary};
pub use tag::ReminderTag;
