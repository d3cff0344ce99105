//! Reminder cadence rules.
//!
//! Every supported contract length ("tier") owns a fixed set of checkpoints.
//! A tier's set is its own longer-horizon checkpoints followed by the full set
//! of the next shorter tier, so a 12 month contract gets the 6 month contract's
//! reminders plus `6_months`.
//!
//! Nothing here touches storage or the network. Recording a reminder as sent
//! is the caller's job, after the notification actually went out.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;

use super::tag::ReminderTag;

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;
const DAYS_PER_MONTH: i64 = 30;

/// Contract lengths that have a reminder cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContractTier {
    OneMonth,
    ThreeMonths,
    SixMonths,
    OneYear,
    TwoYears,
    FiveYears,
}

impl ContractTier {
    pub const ALL: [ContractTier; 6] = [
        ContractTier::OneMonth,
        ContractTier::ThreeMonths,
        ContractTier::SixMonths,
        ContractTier::OneYear,
        ContractTier::TwoYears,
        ContractTier::FiveYears,
    ];

    /// Maps a contract duration to its tier. Durations that are not sold as a
    /// contract length (2, 9, ...) have no tier and therefore no reminders.
    pub fn from_months(months: i32) -> Option<Self> {
        match months {
            1 => Some(ContractTier::OneMonth),
            3 => Some(ContractTier::ThreeMonths),
            6 => Some(ContractTier::SixMonths),
            12 => Some(ContractTier::OneYear),
            24 => Some(ContractTier::TwoYears),
            60 => Some(ContractTier::FiveYears),
            _ => None,
        }
    }

    pub fn months(&self) -> i32 {
        match self {
            ContractTier::OneMonth => 1,
            ContractTier::ThreeMonths => 3,
            ContractTier::SixMonths => 6,
            ContractTier::OneYear => 12,
            ContractTier::TwoYears => 24,
            ContractTier::FiveYears => 60,
        }
    }

    /// The next shorter tier whose checkpoints this tier inherits.
    pub fn next_lower(&self) -> Option<ContractTier> {
        match self {
            ContractTier::OneMonth => None,
            ContractTier::ThreeMonths => Some(ContractTier::OneMonth),
            ContractTier::SixMonths => Some(ContractTier::ThreeMonths),
            ContractTier::OneYear => Some(ContractTier::SixMonths),
            ContractTier::TwoYears => Some(ContractTier::OneYear),
            ContractTier::FiveYears => Some(ContractTier::TwoYears),
        }
    }

    /// Checkpoints this tier adds on top of the tier below it.
    fn own_checkpoints(&self) -> &'static [ReminderTag] {
        match self {
            ContractTier::OneMonth => &[ReminderTag::OneWeek],
            ContractTier::ThreeMonths => &[ReminderTag::TwoMonths, ReminderTag::OneMonth],
            ContractTier::SixMonths => &[ReminderTag::ThreeMonths],
            ContractTier::OneYear => &[ReminderTag::SixMonths],
            ContractTier::TwoYears => &[ReminderTag::TwelveMonths],
            ContractTier::FiveYears => &[
                ReminderTag::FortyEightMonths,
                ReminderTag::ThirtySixMonths,
                ReminderTag::TwentyFourMonths,
            ],
        }
    }

    /// All checkpoints for the tier, longest horizon first.
    pub fn checkpoints(&self) -> Vec<ReminderTag> {
        let mut tags = self.own_checkpoints().to_vec();
        if let Some(lower) = self.next_lower() {
            tags.extend(lower.checkpoints());
        }
        tags
    }
}

/// Time left on a contract at one evaluation instant.
///
/// `months` is `ceil(days / 30)`, a calendar approximation rather than exact
/// month boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeRemaining {
    pub days: i64,
    pub months: i64,
}

impl TimeRemaining {
    pub fn between(end: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        let days = div_ceil((end - now).num_milliseconds(), MILLIS_PER_DAY);
        Self::from_days(days)
    }

    pub fn from_days(days: i64) -> Self {
        Self {
            days,
            months: div_ceil(days, DAYS_PER_MONTH),
        }
    }
}

/// Ceiling division for a positive divisor, correct for negative dividends.
fn div_ceil(value: i64, divisor: i64) -> i64 {
    -((-value).div_euclid(divisor))
}

/// One reminder that should go out now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DueReminder {
    #[serde(rename = "type")]
    pub tag: ReminderTag,
    pub days_left: i64,
}

fn checkpoint_reached(tag: ReminderTag, remaining: TimeRemaining) -> bool {
    match tag.months_remaining() {
        Some(months) => remaining.months == months,
        None => remaining.days > 0 && remaining.days <= 7,
    }
}

/// Returns the reminders newly due for a contract, in cadence order.
///
/// `sent` holds the tags already recorded for the contract; any tag found
/// there is never returned again. Unsupported durations yield nothing.
pub fn pending_reminders<I, S>(
    contract_duration_months: i32,
    remaining: TimeRemaining,
    sent: I,
) -> Vec<DueReminder>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let Some(tier) = ContractTier::from_months(contract_duration_months) else {
        return Vec::new();
    };
    let sent: HashSet<String> = sent.into_iter().map(|s| s.as_ref().to_string()).collect();

    tier.checkpoints()
        .into_iter()
        .filter(|tag| !sent.contains(tag.as_str()))
        .filter(|tag| checkpoint_reached(*tag, remaining))
        .map(|tag| DueReminder {
            tag,
            days_left: remaining.days,
        })
        .collect()
}
