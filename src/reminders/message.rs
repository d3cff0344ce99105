use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, prelude::FromPrimitive};
use rusty_money::{Money, iso};
use tera::{Context, Tera};
use thiserror::Error;

use crate::db::models::RentalContract;
use crate::reminders::tag::ReminderTag;

#[derive(Error, Debug)]
#[error("Failed to render reminder email: {0}")]
pub struct RenderError(#[from] tera::Error);

/// Subject and HTML body of one expiry reminder email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderMessage {
    pub subject: String,
    pub body: String,
}

const BODY_TEMPLATE: &str = r#"<h2>Rental Contract Expiration Reminder</h2>
<p><strong>Alert:</strong> {{ display | upper }}</p>
<hr>
<h3>Billboard Details:</h3>
<p><strong>Name:</strong> {{ billboard_name }}</p>
<p><strong>Location:</strong> {{ billboard_address }}</p>
<p><strong>Size:</strong> {{ billboard_size }}</p>
<p><strong>Type:</strong> {{ billboard_kind }}</p>

<h3>Client Information:</h3>
<p><strong>Name:</strong> {{ client_name }}</p>
<p><strong>Email:</strong> {{ client_email }}</p>
{% if client_phone %}<p><strong>Phone:</strong> {{ client_phone }}</p>
{% endif %}{% if client_company %}<p><strong>Company:</strong> {{ client_company }}</p>
{% endif %}
<h3>Contract Details:</h3>
<p><strong>Start Date:</strong> {{ start_date }}</p>
<p><strong>End Date:</strong> {{ end_date }}</p>
<p><strong>Duration:</strong> {{ duration_months }} months</p>
<p><strong>Days Remaining:</strong> <span style="color: {% if days_left <= 7 %}red{% else %}orange{% endif %}; font-weight: bold;">{{ days_left }} days</span></p>
<p><strong>Monthly Rate:</strong> {{ monthly_rate }}</p>
<p><strong>Total Amount:</strong> {{ total_amount }}</p>
{% if notes %}
<h3>Notes:</h3>
<p>{{ notes | escape | linebreaksbr | safe }}</p>
{% endif %}
<hr>
<p style="color: #666; font-size: 12px;">
  This is an automated reminder. Please contact the client to discuss contract renewal.
</p>
"#;

/// Rand amount as shown in the email, e.g. `R15,000.00`.
fn format_rand(amount: f64) -> String {
    match Decimal::from_f64(amount) {
        Some(value) => Money::from_decimal(value.round_dp(2), iso::ZAR).to_string(),
        None => "N/A".to_string(),
    }
}

fn format_date(date: DateTime<Utc>) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Renders the operator email for `tag` firing on `contract` with `days_left` to go.
pub fn render_reminder(
    contract: &RentalContract,
    tag: ReminderTag,
    days_left: i64,
) -> Result<ReminderMessage, RenderError> {
    let display = tag.display_text();
    let billboard = contract.billboard.as_ref();
    let or_na = |value: Option<&str>| value.unwrap_or("N/A").to_string();

    let subject = format!(
        "Rental Expiring: {} - {}",
        contract.billboard_name().unwrap_or("Billboard"),
        display
    );

    let mut context = Context::new();
    context.insert("display", &display);
    context.insert("billboard_name", &or_na(billboard.map(|b| b.name.as_str())));
    context.insert("billboard_address", &or_na(billboard.map(|b| b.address.as_str())));
    context.insert("billboard_size", &or_na(billboard.and_then(|b| b.size.as_deref())));
    context.insert("billboard_kind", &or_na(billboard.and_then(|b| b.kind.as_deref())));
    context.insert("client_name", &contract.client_name);
    context.insert("client_email", &contract.client_email);
    context.insert("client_phone", &contract.client_phone);
    context.insert("client_company", &contract.client_company);
    context.insert("start_date", &format_date(contract.start_date));
    context.insert("end_date", &format_date(contract.end_date));
    context.insert("duration_months", &contract.contract_duration_months);
    context.insert("days_left", &days_left);
    context.insert("monthly_rate", &format_rand(contract.monthly_rate));
    context.insert("total_amount", &format_rand(contract.total_amount));
    context.insert("notes", &contract.notes);

    let body = Tera::one_off(BODY_TEMPLATE, &context, true)?;
    Ok(ReminderMessage { subject, body })
}
