pub mod clock;
pub mod db;
pub mod notifications;
pub mod reminders;
pub mod server;
pub mod version;
pub mod web;
