use serde::{Deserialize, Serialize};
use std::fmt;

/// A named milestone before a contract ends.
///
/// The string forms (`48_months` ... `1_month`, `1_week`) are what gets
/// persisted in a contract's sent-reminder history, so they must stay stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ReminderTag {
    #[serde(rename = "48_months")]
    FortyEightMonths,
    #[serde(rename = "36_months")]
    ThirtySixMonths,
    #[serde(rename = "24_months")]
    TwentyFourMonths,
    #[serde(rename = "12_months")]
    TwelveMonths,
    #[serde(rename = "6_months")]
    SixMonths,
    #[serde(rename = "3_months")]
    ThreeMonths,
    #[serde(rename = "2_months")]
    TwoMonths,
    #[serde(rename = "1_month")]
    OneMonth,
    #[serde(rename = "1_week")]
    OneWeek,
}

impl ReminderTag {
    pub const ALL: [ReminderTag; 9] = [
        ReminderTag::FortyEightMonths,
        ReminderTag::ThirtySixMonths,
        ReminderTag::TwentyFourMonths,
        ReminderTag::TwelveMonths,
        ReminderTag::SixMonths,
        ReminderTag::ThreeMonths,
        ReminderTag::TwoMonths,
        ReminderTag::OneMonth,
        ReminderTag::OneWeek,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReminderTag::FortyEightMonths => "48_months",
            ReminderTag::ThirtySixMonths => "36_months",
            ReminderTag::TwentyFourMonths => "24_months",
            ReminderTag::TwelveMonths => "12_months",
            ReminderTag::SixMonths => "6_months",
            ReminderTag::ThreeMonths => "3_months",
            ReminderTag::TwoMonths => "2_months",
            ReminderTag::OneMonth => "1_month",
            ReminderTag::OneWeek => "1_week",
        }
    }

    /// The `months_remaining` value this checkpoint fires on.
    /// `None` for `1_week`, which is day based.
    pub fn months_remaining(&self) -> Option<i64> {
        match self {
            ReminderTag::FortyEightMonths => Some(48),
            ReminderTag::ThirtySixMonths => Some(36),
            ReminderTag::TwentyFourMonths => Some(24),
            ReminderTag::TwelveMonths => Some(12),
            ReminderTag::SixMonths => Some(6),
            ReminderTag::ThreeMonths => Some(3),
            ReminderTag::TwoMonths => Some(2),
            ReminderTag::OneMonth => Some(1),
            ReminderTag::OneWeek => None,
        }
    }

    /// Human wording used in email subjects, e.g. `6 months left`.
    pub fn display_text(&self) -> String {
        match self.months_remaining() {
            Some(1) => "1 month left".to_string(),
            Some(n) => format!("{n} months left"),
            None => "1 week left".to_string(),
        }
    }
}

impl fmt::Display for ReminderTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
