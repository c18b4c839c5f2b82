pub mod fulfillment;
pub mod locks;
pub mod manager;
pub mod orchestrator;
pub mod receipts;

pub use fulfillment::{FulfillmentNotifier, NotificationError};
pub use locks::OrderLocks;
pub use manager::{OrderError, OrderManager, OrderRequest};
pub use orchestrator::{ProvisionError, ProvisioningOrchestrator};
pub use receipts::{ReceiptError, ReceiptVault};
