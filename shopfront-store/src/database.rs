use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use std::time::Duration;
use tracing::{info, warn};

use crate::app_config::ShopRules;

#[derive(Clone)]
pub struct DbClient {
    pub pool: Pool<Postgres>,
}

impl DbClient {
    pub async fn new(connection_string: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(connection_string)
            .await?;

        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        info!("Running database migrations...");
        sqlx::migrate!("../migrations")
            .run(&self.pool)
            .await?;
        info!("Migrations completed successfully.");
        Ok(())
    }

    /// Overlay the operator-managed `settings` rows on the file defaults
    pub async fn fetch_shop_rules(&self, defaults: ShopRules) -> Result<ShopRules, sqlx::Error> {
        #[derive(sqlx::FromRow)]
        struct SettingRow {
            key: String,
            value: String,
        }

        let rows = sqlx::query_as::<_, SettingRow>(
            "SELECT key, value FROM settings WHERE key LIKE 'shop%'",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut rules = defaults;
        for row in rows {
            apply_setting(&mut rules, &row.key, &row.value);
        }

        Ok(rules)
    }
}

/// Unknown keys are ignored; unparseable values keep the previous value
pub(crate) fn apply_setting(rules: &mut ShopRules, key: &str, value: &str) {
    let slot = match key {
        "shopMinGB" => &mut rules.min_gb,
        "shopMaxGB" => &mut rules.max_gb,
        "shopMinDays" => &mut rules.min_days,
        "shopMaxDays" => &mut rules.max_days,
        "shopPricePerGB" => &mut rules.price_per_gb,
        _ => return,
    };

    let value = value.trim();
    if value.is_empty() {
        *slot = None;
        return;
    }

    match value.parse::<i64>() {
        Ok(parsed) => *slot = Some(parsed),
        Err(_) => warn!("Ignoring non-numeric setting {}={:?}", key, value),
    }
}
