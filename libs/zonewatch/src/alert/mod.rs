mod types;
pub use types::{Ack, AlertConfig, DeliveryError, Recipient, DEFAULT_SMTP_PORT};

mod utils;
pub use utils::{alert_message, dispatch_alerts};

mod log_alert;
pub use log_alert::LogAlert;

mod webhook;
pub use webhook::WebhookAlert;

mod telegram;
pub use telegram::TelegramAlert;

mod email;
pub use email::EmailAlert;

use crate::common::EncodedImage;

/// Delivery channel for change alerts. Implementations own their transport
/// and credentials; detection never sees either.
pub trait AlertTrigger: Send + Sync {
    fn channel(&self) -> &'static str;

    fn notify(&self, metric: f64, artifact: &EncodedImage, recipient: &Recipient) -> Result<Ack, DeliveryError>;
}
