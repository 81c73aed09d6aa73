//! Stationcast Channel: production implementations of `DeliveryChannel`.

pub mod error;
pub mod log;
pub mod telegram;

pub use error::TelegramError;
pub use log::LogChannel;
pub use telegram::{TelegramChannel, TelegramConfig};
