use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{AlertTrigger, EmailAlert, LogAlert, TelegramAlert, WebhookAlert};

pub const DEFAULT_SMTP_PORT: u16 = 587;

#[derive(Debug, Error)]
pub enum DeliveryError {
    /// Never carries the request URL, which may embed a credential.
    #[error("transport error: {0}")]
    Transport(reqwest::Error),

    #[error("rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("missing credential: {0}")]
    MissingCredential(&'static str),

    #[error("invalid message: {0}")]
    InvalidMessage(String),

    #[error("smtp error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

impl From<reqwest::Error> for DeliveryError {
    fn from(err: reqwest::Error) -> Self {
        DeliveryError::Transport(err.without_url())
    }
}

/// Channel-specific address: a webhook URL, a Telegram chat id, an e-mail
/// address, a log label.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub address: String,
}

impl Recipient {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Ack {
    pub channel: String,
    pub recipient: String,
    pub delivered_at: String,
}

/// Alert endpoints and credentials, supplied at call time.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    pub webhook_url: Option<String>,
    pub webhook_token: Option<String>,
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,
    /// Bot API server, the public Telegram endpoint when unset.
    pub telegram_api_base: Option<String>,
    pub smtp_host: Option<String>,
    pub smtp_port: Option<u16>,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
    /// Sender address, the SMTP user when unset.
    pub smtp_from: Option<String>,
    pub smtp_to: Option<String>,
    /// Always log alerts, in addition to any configured channel.
    pub log: bool,
}

impl std::fmt::Debug for AlertConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redacted = |secret: &Option<String>| secret.as_ref().map(|_| "<redacted>");
        f.debug_struct("AlertConfig")
            .field("webhook_url", &redacted(&self.webhook_url))
            .field("webhook_token", &redacted(&self.webhook_token))
            .field("telegram_bot_token", &redacted(&self.telegram_bot_token))
            .field("telegram_chat_id", &self.telegram_chat_id)
            .field("telegram_api_base", &self.telegram_api_base)
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_user", &self.smtp_user)
            .field("smtp_password", &redacted(&self.smtp_password))
            .field("smtp_from", &self.smtp_from)
            .field("smtp_to", &self.smtp_to)
            .field("log", &self.log)
            .finish()
    }
}

impl AlertConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the `ZONEWATCH_*` alert settings through `lookup`. Blank values
    /// count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let smtp_port = var("ZONEWATCH_SMTP_PORT").and_then(|port| match port.trim().parse() {
            Ok(port) => Some(port),
            Err(_) => {
                log::warn!("Ignoring invalid ZONEWATCH_SMTP_PORT {:?}", port);
                None
            }
        });
        Self {
            webhook_url: var("ZONEWATCH_WEBHOOK_URL"),
            webhook_token: var("ZONEWATCH_WEBHOOK_TOKEN"),
            telegram_bot_token: var("ZONEWATCH_TELEGRAM_BOT_TOKEN"),
            telegram_chat_id: var("ZONEWATCH_TELEGRAM_CHAT_ID"),
            telegram_api_base: var("ZONEWATCH_TELEGRAM_API_BASE"),
            smtp_host: var("ZONEWATCH_SMTP_HOST"),
            smtp_port,
            smtp_user: var("ZONEWATCH_SMTP_USER"),
            smtp_password: var("ZONEWATCH_SMTP_PASSWORD"),
            smtp_from: var("ZONEWATCH_SMTP_FROM"),
            smtp_to: var("ZONEWATCH_SMTP_TO"),
            log: true,
        }
    }

    fn email_trigger(&self) -> Option<(Box<dyn AlertTrigger>, Recipient)> {
        let host = self.smtp_host.as_ref()?;
        match (&self.smtp_user, &self.smtp_password, &self.smtp_to) {
            (Some(user), Some(password), Some(to)) => {
                let from = self.smtp_from.clone().unwrap_or_else(|| user.clone());
                let alert = EmailAlert::new(
                    host.clone(),
                    self.smtp_port.unwrap_or(DEFAULT_SMTP_PORT),
                    user.clone(),
                    password.clone(),
                    from,
                );
                Some((Box::new(alert), Recipient::new(to.clone())))
            }
            _ => {
                log::warn!("E-mail alerts need an SMTP user, password and recipient, skipping");
                None
            }
        }
    }

    /// One trigger per configured channel, paired with its recipient.
    pub fn triggers(&self) -> Vec<(Box<dyn AlertTrigger>, Recipient)> {
        let mut triggers: Vec<(Box<dyn AlertTrigger>, Recipient)> = Vec::new();

        if self.log {
            triggers.push((Box::new(LogAlert), Recipient::new("log")));
        }
        if let Some(email) = self.email_trigger() {
            triggers.push(email);
        }
        if let Some(url) = &self.webhook_url {
            triggers.push((
                Box::new(WebhookAlert::new(self.webhook_token.clone())),
                Recipient::new(url.clone()),
            ));
        }
        match (&self.telegram_bot_token, &self.telegram_chat_id) {
            (Some(token), Some(chat_id)) => {
                let alert = match &self.telegram_api_base {
                    Some(base) => TelegramAlert::with_api_base(token.clone(), base.clone()),
                    None => TelegramAlert::new(token.clone()),
                };
                triggers.push((Box::new(alert), Recipient::new(chat_id.clone())));
            }
            (Some(_), None) | (None, Some(_)) => {
                log::warn!("Telegram alerts need both a bot token and a chat id, skipping");
            }
            (None, None) => {}
        }

        triggers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |name| vars.get(name).cloned()
    }

    fn channels(config: &AlertConfig) -> Vec<&'static str> {
        config.triggers().iter().map(|(t, _)| t.channel()).collect()
    }

    #[test]
    fn test_triggers_follow_configuration() {
        assert!(AlertConfig::default().triggers().is_empty());

        let config = AlertConfig {
            webhook_url: Some("http://localhost:9/hook".into()),
            telegram_bot_token: Some("token".into()),
            telegram_chat_id: Some("42".into()),
            smtp_host: Some("smtp.example.com".into()),
            smtp_user: Some("watch@example.com".into()),
            smtp_password: Some("app-password".into()),
            smtp_to: Some("ops@example.com".into()),
            log: true,
            ..Default::default()
        };
        assert_eq!(channels(&config), vec!["log", "email", "webhook", "telegram"]);
    }

    #[test]
    fn test_telegram_needs_both_fields() {
        let config = AlertConfig {
            telegram_bot_token: Some("token".into()),
            ..Default::default()
        };
        assert!(config.triggers().is_empty());
    }

    #[test]
    fn test_email_from_environment() {
        let config = AlertConfig::from_lookup(lookup(&[
            ("ZONEWATCH_SMTP_HOST", "smtp.example.com"),
            ("ZONEWATCH_SMTP_PORT", "2525"),
            ("ZONEWATCH_SMTP_USER", "watch@example.com"),
            ("ZONEWATCH_SMTP_PASSWORD", "app-password"),
            ("ZONEWATCH_SMTP_TO", "ops@example.com"),
            ("ZONEWATCH_WEBHOOK_URL", "  "),
        ]));
        assert_eq!(config.smtp_port, Some(2525));
        assert_eq!(config.webhook_url, None);
        assert!(config.log);

        let triggers = config.triggers();
        let (email, recipient) = &triggers[1];
        assert_eq!(email.channel(), "email");
        assert_eq!(recipient.address, "ops@example.com");
    }

    #[test]
    fn test_email_needs_credentials_and_recipient() {
        let config = AlertConfig::from_lookup(lookup(&[
            ("ZONEWATCH_SMTP_HOST", "smtp.example.com"),
            ("ZONEWATCH_SMTP_USER", "watch@example.com"),
            ("ZONEWATCH_SMTP_TO", "ops@example.com"),
        ]));
        assert_eq!(channels(&config), vec!["log"]);
    }

    #[test]
    fn test_invalid_smtp_port_falls_back() {
        let config = AlertConfig::from_lookup(lookup(&[("ZONEWATCH_SMTP_PORT", "smtp")]));
        assert_eq!(config.smtp_port, None);
    }

    #[test]
    fn test_debug_hides_secrets() {
        let config = AlertConfig {
            webhook_url: Some("https://hooks.example.com/T000/SECRET".into()),
            telegram_bot_token: Some("123:SECRET".into()),
            smtp_password: Some("SECRET-PASSWORD".into()),
            ..Default::default()
        };
        let printed = format!("{:?}", config);
        assert!(!printed.contains("SECRET"));
        assert!(printed.contains("<redacted>"));
    }
}
