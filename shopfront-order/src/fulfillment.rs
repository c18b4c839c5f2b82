use shopfront_core::Notifier;
use shopfront_shared::models::events::{OrderFulfilledEvent, OrderRejectedEvent};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("notification failed: {0}")]
    Failed(String),

    #[error("notification timed out after {0:?}")]
    TimedOut(Duration),
}

/// Delivers customer notifications off the request path.
///
/// Failures are logged and never reach the caller.
#[derive(Clone)]
pub struct FulfillmentNotifier {
    notifier: Arc<dyn Notifier>,
    timeout: Duration,
}

impl FulfillmentNotifier {
    pub fn new(notifier: Arc<dyn Notifier>, timeout: Duration) -> Self {
        Self { notifier, timeout }
    }

    pub async fn deliver_fulfillment(&self, event: &OrderFulfilledEvent) -> Result<(), NotificationError> {
        tokio::time::timeout(self.timeout, self.notifier.notify_fulfillment(event))
            .await
            .map_err(|_| NotificationError::TimedOut(self.timeout))?
            .map_err(|e| NotificationError::Failed(e.to_string()))
    }

    pub async fn deliver_rejection(&self, event: &OrderRejectedEvent) -> Result<(), NotificationError> {
        tokio::time::timeout(self.timeout, self.notifier.notify_rejection(event))
            .await
            .map_err(|_| NotificationError::TimedOut(self.timeout))?
            .map_err(|e| NotificationError::Failed(e.to_string()))
    }

    pub fn dispatch_fulfillment(&self, event: OrderFulfilledEvent) -> JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move {
            match this.deliver_fulfillment(&event).await {
                Ok(()) => tracing::debug!("Fulfillment notice sent for order {}", event.order_id),
                Err(e) => tracing::warn!(
                    "Fulfillment notice for order {} ({}) not delivered: {}",
                    event.order_id,
                    event.email,
                    e
                ),
            }
        })
    }

    pub fn dispatch_rejection(&self, event: OrderRejectedEvent) -> JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move {
            if let Err(e) = this.deliver_rejection(&event).await {
                tracing::warn!("Rejection notice for order {} not delivered: {}", event.order_id, e);
            }
        })
    }
}
