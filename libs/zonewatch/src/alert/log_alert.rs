use super::{alert_message, Ack, AlertTrigger, DeliveryError, Recipient};
use crate::common::{get_current_timestamp_str, EncodedImage};

/// Writes the alert to the log. Useful as a default channel and in dry runs.
pub struct LogAlert;

impl AlertTrigger for LogAlert {
    fn channel(&self) -> &'static str {
        "log"
    }

    fn notify(&self, metric: f64, artifact: &EncodedImage, recipient: &Recipient) -> Result<Ack, DeliveryError> {
        log::warn!(
            "{} [{}x{} artifact, {} bytes]",
            alert_message(metric),
            artifact.width,
            artifact.height,
            artifact.bytes.len()
        );
        Ok(Ack {
            channel: self.channel().to_string(),
            recipient: recipient.address.clone(),
            delivered_at: get_current_timestamp_str(),
        })
    }
}
