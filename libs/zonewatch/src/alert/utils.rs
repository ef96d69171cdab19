use super::{Ack, AlertTrigger, DeliveryError, Recipient};
use crate::common::format_percentage;
use crate::detect::DetectionResult;

pub fn alert_message(metric: f64) -> String {
    format!(
        "Unauthorized change detected in the protected zone! Change detected: {}",
        format_percentage(metric)
    )
}

/// Sends the result through every trigger when it exceeds the alert
/// threshold. Each outcome is returned; failures are logged, never retried.
pub fn dispatch_alerts(
    result: &DetectionResult,
    triggers: &[(Box<dyn AlertTrigger>, Recipient)],
) -> Vec<Result<Ack, DeliveryError>> {
    if !result.exceeds_threshold {
        log::debug!(
            "Change {} is within threshold, no alert sent",
            result.display_percentage()
        );
        return Vec::new();
    }

    triggers
        .iter()
        .map(|(trigger, recipient)| {
            let outcome = trigger.notify(result.change_percentage, &result.artifact, recipient);
            match &outcome {
                Ok(ack) => log::info!("Alert delivered via {} to {}", ack.channel, ack.recipient),
                Err(e) => log::warn!("Alert via {} failed: {}", trigger.channel(), e),
            }
            outcome
        })
        .collect()
}
