use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};

use super::{alert_message, Ack, AlertTrigger, DeliveryError, Recipient};
use crate::common::{format_percentage, get_current_timestamp_str, EncodedImage};

/// Mails the alert text with the PNG artifact attached, over SMTP with
/// STARTTLS. The recipient address is the destination mailbox.
pub struct EmailAlert {
    host: String,
    port: u16,
    credentials: Credentials,
    from: String,
}

impl EmailAlert {
    pub fn new(host: String, port: u16, user: String, password: String, from: String) -> Self {
        Self {
            host,
            port,
            credentials: Credentials::new(user, password),
            from,
        }
    }

    pub(crate) fn build_message(
        &self,
        metric: f64,
        artifact: &EncodedImage,
        recipient: &Recipient,
    ) -> Result<Message, DeliveryError> {
        let from: Mailbox = self
            .from
            .parse()
            .map_err(|e| DeliveryError::InvalidMessage(format!("sender {}: {}", self.from, e)))?;
        let to: Mailbox = recipient
            .address
            .parse()
            .map_err(|e| DeliveryError::InvalidMessage(format!("recipient {}: {}", recipient.address, e)))?;

        let text = SinglePart::plain(alert_message(metric));
        let body = if artifact.bytes.is_empty() {
            MultiPart::mixed().singlepart(text)
        } else {
            let content_type = ContentType::parse(artifact.mime_type())
                .map_err(|e| DeliveryError::InvalidMessage(e.to_string()))?;
            MultiPart::mixed()
                .singlepart(text)
                .singlepart(Attachment::new("detection.png".to_string()).body(artifact.bytes.clone(), content_type))
        };

        Message::builder()
            .from(from)
            .to(to)
            .subject(format!("Alert: zone change detected ({})", format_percentage(metric)))
            .multipart(body)
            .map_err(|e| DeliveryError::InvalidMessage(e.to_string()))
    }
}

impl AlertTrigger for EmailAlert {
    fn channel(&self) -> &'static str {
        "email"
    }

    fn notify(&self, metric: f64, artifact: &EncodedImage, recipient: &Recipient) -> Result<Ack, DeliveryError> {
        let message = self.build_message(metric, artifact, recipient)?;

        let mailer = SmtpTransport::starttls_relay(&self.host)?
            .port(self.port)
            .credentials(self.credentials.clone())
            .build();
        mailer.send(&message)?;

        Ok(Ack {
            channel: self.channel().to_string(),
            recipient: recipient.address.clone(),
            delivered_at: get_current_timestamp_str(),
        })
    }
}
