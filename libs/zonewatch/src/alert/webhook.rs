use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};

use super::{alert_message, Ack, AlertTrigger, DeliveryError, Recipient};
use crate::common::{get_current_timestamp_str, EncodedImage};

/// POSTs the metric, message and PNG artifact as JSON to the recipient URL.
pub struct WebhookAlert {
    client: Client,
    token: Option<String>,
}

impl WebhookAlert {
    pub fn new(token: Option<String>) -> Self {
        Self {
            client: Client::new(),
            token,
        }
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(token) = &self.token {
            match HeaderValue::from_str(&format!("Bearer {}", token)) {
                Ok(value) => {
                    headers.insert(AUTHORIZATION, value);
                }
                Err(_) => log::warn!("Webhook token contains invalid header characters, sending without it"),
            }
        }
        headers
    }
}

// Webhook URLs often embed a secret in the path or query; only the host is
// reported back.
fn endpoint_label(url: &str) -> String {
    match reqwest::Url::parse(url) {
        Ok(url) => url.host_str().unwrap_or("webhook").to_string(),
        Err(_) => "webhook".to_string(),
    }
}

pub(crate) fn webhook_payload(metric: f64, artifact: &EncodedImage) -> serde_json::Value {
    serde_json::json!({
        "message": alert_message(metric),
        "change_percentage": (metric * 100.0).round() / 100.0,
        "sent_at": get_current_timestamp_str(),
        "artifact": {
            "mime_type": artifact.mime_type(),
            "width": artifact.width,
            "height": artifact.height,
            "base64": artifact.to_base64(),
        }
    })
}

impl AlertTrigger for WebhookAlert {
    fn channel(&self) -> &'static str {
        "webhook"
    }

    fn notify(&self, metric: f64, artifact: &EncodedImage, recipient: &Recipient) -> Result<Ack, DeliveryError> {
        let response = self
            .client
            .post(&recipient.address)
            .headers(self.headers())
            .json(&webhook_payload(metric, artifact))
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(DeliveryError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        Ok(Ack {
            channel: self.channel().to_string(),
            recipient: endpoint_label(&recipient.address),
            delivered_at: get_current_timestamp_str(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_carries_metric_and_artifact() {
        let artifact = EncodedImage { bytes: vec![1, 2, 3], width: 4, height: 5 };
        let payload = webhook_payload(6.789, &artifact);
        assert_eq!(payload["change_percentage"], 6.79);
        assert_eq!(payload["artifact"]["base64"], "AQID");
        assert_eq!(payload["artifact"]["mime_type"], "image/png");
        assert!(payload["message"].as_str().unwrap().contains("6.79%"));
    }

    #[test]
    fn test_endpoint_label_drops_path() {
        assert_eq!(endpoint_label("https://hooks.example.com/services/T0/SECRET"), "hooks.example.com");
        assert_eq!(endpoint_label("not a url"), "webhook");
    }

    #[test]
    fn test_transport_error_hides_url() {
        let artifact = EncodedImage { bytes: vec![1], width: 1, height: 1 };
        let err = WebhookAlert::new(None)
            .notify(10.0, &artifact, &Recipient::new("http://127.0.0.1:9/hook/SECRET-PATH"))
            .unwrap_err();
        assert!(matches!(err, DeliveryError::Transport(_)));
        assert!(!err.to_string().contains("SECRET-PATH"));
    }

    #[test]
    fn test_bearer_header_only_with_token() {
        assert!(WebhookAlert::new(None).headers().get(AUTHORIZATION).is_none());
        let headers = WebhookAlert::new(Some("secret".into())).headers();
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer secret");
    }
}
