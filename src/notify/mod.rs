//! Merchant notifications. Best effort: dispatch never blocks or fails the
//! operation that raised the events.

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::events::OrderEvent;

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Failed to encode notification: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Failed to publish notification: {0}")]
    Publish(String),
}

#[async_trait]
pub trait MerchantNotifier: Send + Sync {
    async fn notify_merchant(&self, merchant_id: Uuid, event: &OrderEvent) -> Result<(), NotifyError>;
}

/// Publishes JSON events to `<prefix>.<merchant_id>`.
pub struct NatsNotifier {
    client: async_nats::Client,
    subject_prefix: String,
}

impl NatsNotifier {
    pub fn new(client: async_nats::Client, subject_prefix: impl Into<String>) -> Self {
        Self { client, subject_prefix: subject_prefix.into() }
    }

    pub async fn connect(url: &str, subject_prefix: impl Into<String>) -> Result<Self, NotifyError> {
        let client = async_nats::connect(url)
            .await
            .map_err(|e| NotifyError::Publish(e.to_string()))?;
        Ok(Self::new(client, subject_prefix))
    }

    fn subject(&self, merchant_id: Uuid) -> String { format!("{}.{}", self.subject_prefix, merchant_id) }
}

#[async_trait]
impl MerchantNotifier for NatsNotifier {
    async fn notify_merchant(&self, merchant_id: Uuid, event: &OrderEvent) -> Result<(), NotifyError> {
        let payload = serde_json::to_vec(event)?;
        self.client
            .publish(self.subject(merchant_id), payload.into())
            .await
            .map_err(|e| NotifyError::Publish(e.to_string()))?;
        tracing::debug!(merchant_id = %merchant_id, event = event.kind(), "Published merchant notification");
        Ok(())
    }
}

/// Writes notifications to the log only.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl MerchantNotifier for LogNotifier {
    async fn notify_merchant(&self, merchant_id: Uuid, event: &OrderEvent) -> Result<(), NotifyError> {
        tracing::info!(
            merchant_id = %merchant_id,
            order_id = %event.order_id(),
            event = event.kind(),
            "Merchant notification"
        );
        Ok(())
    }
}

/// Sends `events` on a background task; failures are logged and dropped.
pub fn dispatch(notifier: Arc<dyn MerchantNotifier>, events: Vec<OrderEvent>) {
    if events.is_empty() {
        return;
    }
    tokio::spawn(async move {
        for event in events {
            let merchant_id = event.merchant_id();
            if let Err(e) = notifier.notify_merchant(merchant_id, &event).await {
                tracing::warn!(
                    merchant_id = %merchant_id,
                    order_id = %event.order_id(),
                    event = event.kind(),
                    error = %e,
                    "Merchant notification failed"
                );
            }
        }
    });
}
