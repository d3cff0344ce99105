pub mod models;
pub mod senders;

pub use models::SenderConfig;
pub use senders::{build_sender, NotificationSender, SenderError};
