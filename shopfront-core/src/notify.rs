use async_trait::async_trait;
use shopfront_shared::models::events::{OrderFulfilledEvent, OrderRejectedEvent};

use crate::BoxError;

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Tell the customer their account is ready
    async fn notify_fulfillment(&self, event: &OrderFulfilledEvent) -> Result<(), BoxError>;

    /// Tell the customer their order was turned down
    async fn notify_rejection(&self, event: &OrderRejectedEvent) -> Result<(), BoxError>;
}
