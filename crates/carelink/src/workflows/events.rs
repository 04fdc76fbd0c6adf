use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Outbound hook towards the notification channel and operator paging.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: MarketplaceEvent) -> Result<(), EventError>;
}

/// Event payload so routes/tests can assert integration boundaries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketplaceEvent {
    pub template: String,
    pub subject: String,
    pub details: BTreeMap<String, String>,
}

impl MarketplaceEvent {
    pub fn new(template: &str, subject: impl ToString) -> Self {
        Self {
            template: template.to_string(),
            subject: subject.to_string(),
            details: BTreeMap::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl ToString) -> Self {
        self.details.insert(key.to_string(), value.to_string());
        self
    }

    /// Operator alerts flag states that need a human, e.g. a charge against a cancelled booking.
    pub fn is_operator_alert(&self) -> bool {
        self.template.starts_with("operator_")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error("event transport unavailable: {0}")]
    Transport(String),
}

/// Publish after a committed transition; a failed notification never rolls the transition back.
pub(crate) fn publish_committed(events: &dyn EventPublisher, event: MarketplaceEvent) {
    let template = event.template.clone();
    let subject = event.subject.clone();
    if let Err(error) = events.publish(event) {
        tracing::warn!(%template, %subject, %error, "event publication failed");
    }
}

/// Writes every event to the log. Stands in for the notification channel when none is wired.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingEventPublisher;

impl EventPublisher for LoggingEventPublisher {
    fn publish(&self, event: MarketplaceEvent) -> Result<(), EventError> {
        if event.is_operator_alert() {
            tracing::error!(template = %event.template, subject = %event.subject, details = ?event.details, "operator alert");
        } else {
            tracing::info!(template = %event.template, subject = %event.subject, details = ?event.details, "marketplace event");
        }
        Ok(())
    }
}
