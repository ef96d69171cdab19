use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::{Client, Response};

use super::{alert_message, Ack, AlertTrigger, DeliveryError, Recipient};
use crate::common::{get_current_timestamp_str, EncodedImage};

const TELEGRAM_API: &str = "https://api.telegram.org";

/// Sends the alert to a Telegram chat through the Bot API: the artifact as a
/// photo with the alert as caption, or a plain message when there is no
/// artifact. The recipient address is the chat id.
pub struct TelegramAlert {
    client: Client,
    bot_token: String,
    api_base: String,
}

impl TelegramAlert {
    pub fn new(bot_token: String) -> Self {
        Self::with_api_base(bot_token, TELEGRAM_API)
    }

    pub fn with_api_base(bot_token: String, api_base: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            bot_token,
            api_base: api_base.into(),
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base.trim_end_matches('/'), self.bot_token, method)
    }

    fn send_message(&self, text: String, recipient: &Recipient) -> Result<Response, DeliveryError> {
        Ok(self
            .client
            .post(self.method_url("sendMessage"))
            .json(&serde_json::json!({
                "chat_id": recipient.address,
                "text": text,
            }))
            .send()?)
    }

    fn send_photo(&self, text: String, artifact: &EncodedImage, recipient: &Recipient) -> Result<Response, DeliveryError> {
        let photo = Part::bytes(artifact.bytes.clone())
            .file_name("detection.png")
            .mime_str(artifact.mime_type())?;
        let form = Form::new()
            .text("chat_id", recipient.address.clone())
            .text("caption", text)
            .part("photo", photo);
        Ok(self
            .client
            .post(self.method_url("sendPhoto"))
            .multipart(form)
            .send()?)
    }
}

impl AlertTrigger for TelegramAlert {
    fn channel(&self) -> &'static str {
        "telegram"
    }

    fn notify(&self, metric: f64, artifact: &EncodedImage, recipient: &Recipient) -> Result<Ack, DeliveryError> {
        if self.bot_token.is_empty() {
            return Err(DeliveryError::MissingCredential("telegram bot token"));
        }

        let text = format!("ALERT: {}", alert_message(metric));
        let response = if artifact.bytes.is_empty() {
            self.send_message(text, recipient)?
        } else {
            self.send_photo(text, artifact, recipient)?
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default().replace(&self.bot_token, "<redacted>");
            return Err(DeliveryError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        Ok(Ack {
            channel: self.channel().to_string(),
            recipient: recipient.address.clone(),
            delivered_at: get_current_timestamp_str(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_url() {
        let alert = TelegramAlert::with_api_base("123:abc".into(), "http://localhost:8081/");
        assert_eq!(alert.method_url("sendMessage"), "http://localhost:8081/bot123:abc/sendMessage");
        assert_eq!(alert.method_url("sendPhoto"), "http://localhost:8081/bot123:abc/sendPhoto");
    }

    #[test]
    fn test_empty_token_is_missing_credential() {
        let alert = TelegramAlert::new(String::new());
        let artifact = EncodedImage { bytes: Vec::new(), width: 1, height: 1 };
        let err = alert.notify(10.0, &artifact, &Recipient::new("42")).unwrap_err();
        assert!(matches!(err, DeliveryError::MissingCredential(_)));
    }

    #[test]
    fn test_transport_error_hides_bot_token() {
        // nothing listens on the discard port
        let alert = TelegramAlert::with_api_base("SECRET-BOT-TOKEN".into(), "http://127.0.0.1:9");
        let artifact = EncodedImage { bytes: vec![1, 2, 3], width: 1, height: 1 };
        let err = alert.notify(10.0, &artifact, &Recipient::new("42")).unwrap_err();
        assert!(matches!(err, DeliveryError::Transport(_)));
        assert!(!err.to_string().contains("SECRET-BOT-TOKEN"));
        assert!(!format!("{:?}", err).contains("SECRET-BOT-TOKEN"));
    }
}
