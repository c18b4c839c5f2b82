use async_trait::async_trait;
use shopfront_core::{CoreError, CoreResult, OrderLimits, ShopSettings};

use crate::app_config::ShopRules;
use crate::database::DbClient;

/// Shop settings fixed at startup
pub struct StaticSettings {
    rules: ShopRules,
}

impl StaticSettings {
    pub fn new(rules: ShopRules) -> Self {
        Self { rules }
    }
}

#[async_trait]
impl ShopSettings for StaticSettings {
    async fn order_limits(&self) -> CoreResult<OrderLimits> {
        Ok(self.rules.limits())
    }

    async fn price_per_gb(&self) -> CoreResult<Option<i64>> {
        Ok(self.rules.price_per_gb)
    }
}

/// Shop settings read from the database on every call, over file defaults
pub struct DbSettings {
    db: DbClient,
    defaults: ShopRules,
}

impl DbSettings {
    pub fn new(db: DbClient, defaults: ShopRules) -> Self {
        Self { db, defaults }
    }

    async fn current(&self) -> CoreResult<ShopRules> {
        self.db
            .fetch_shop_rules(self.defaults)
            .await
            .map_err(|e| CoreError::ConfigUnavailable(e.to_string()))
    }
}

#[async_trait]
impl ShopSettings for DbSettings {
    async fn order_limits(&self) -> CoreResult<OrderLimits> {
        Ok(self.current().await?.limits())
    }

    async fn price_per_gb(&self) -> CoreResult<Option<i64>> {
        Ok(self.current().await?.price_per_gb)
    }
}
