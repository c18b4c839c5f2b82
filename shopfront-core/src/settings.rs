use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::CoreResult;

/// Bounds on custom orders. `None` (or a non-positive value) means no limit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLimits {
    pub min_gb: Option<i64>,
    pub max_gb: Option<i64>,
    pub min_days: Option<i64>,
    pub max_days: Option<i64>,
}

impl OrderLimits {
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Treats zero and negative bounds as unset
    pub fn normalized(self) -> Self {
        fn bound(value: Option<i64>) -> Option<i64> {
            value.filter(|v| *v > 0)
        }
        Self {
            min_gb: bound(self.min_gb),
            max_gb: bound(self.max_gb),
            min_days: bound(self.min_days),
            max_days: bound(self.max_days),
        }
    }
}

/// Read-only access to the operator-managed shop settings
#[async_trait]
pub trait ShopSettings: Send + Sync {
    async fn order_limits(&self) -> CoreResult<OrderLimits>;

    /// `None` when no rate has been configured
    async fn price_per_gb(&self) -> CoreResult<Option<i64>>;
}
