//! Post-commit publication of domain events to NATS.

use crate::domain::events::DomainEvent;

const SUBJECT_PREFIX: &str = "commerce";

#[derive(Clone, Debug, Default)]
pub struct EventBus {
    nats: Option<async_nats::Client>,
}

impl EventBus {
    pub fn new(nats: Option<async_nats::Client>) -> Self { Self { nats } }

    pub fn disabled() -> Self { Self::default() }

    pub async fn connect(url: Option<&str>) -> Self {
        let Some(url) = url else { return Self::disabled() };
        match async_nats::connect(url).await {
            Ok(client) => {
                tracing::info!(url, "Connected to NATS");
                Self::new(Some(client))
            }
            Err(e) => {
                tracing::warn!(url, error = %e, "NATS unavailable, events will not be published");
                Self::disabled()
            }
        }
    }

    pub fn subject_for(event: &DomainEvent) -> String { format!("{SUBJECT_PREFIX}.{}", event.subject()) }

    /// Never fails the caller: the state change is already committed.
    pub async fn publish(&self, event: DomainEvent) {
        let subject = Self::subject_for(&event);
        let Some(client) = &self.nats else {
            tracing::debug!(subject, ?event, "Event bus disabled");
            return;
        };
        let payload = match serde_json::to_vec(&event) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(subject, error = %e, "Failed to encode event");
                return;
            }
        };
        if let Err(e) = client.publish(subject.clone(), payload.into()).await {
            tracing::warn!(subject, error = %e, "Failed to publish event");
        }
    }
}
