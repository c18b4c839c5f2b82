use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shopfront_core::{RepoResult, ShopInboundRepository};
use shopfront_shared::ShopInbound;
use sqlx::PgPool;

pub struct StoreShopInboundRepository {
    pool: PgPool,
}

impl StoreShopInboundRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ShopInboundRow {
    id: i64,
    inbound_id: i64,
    enabled: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ShopInboundRow> for ShopInbound {
    fn from(row: ShopInboundRow) -> Self {
        ShopInbound {
            id: row.id,
            inbound_id: row.inbound_id,
            enabled: row.enabled,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl ShopInboundRepository for StoreShopInboundRepository {
    async fn list_overrides(&self) -> RepoResult<Vec<ShopInbound>> {
        let rows = sqlx::query_as::<_, ShopInboundRow>(
            "SELECT id, inbound_id, enabled, created_at, updated_at FROM shop_inbounds ORDER BY inbound_id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(ShopInbound::from).collect())
    }

    async fn upsert_override(&self, inbound_id: i64, enabled: bool) -> RepoResult<ShopInbound> {
        let row = sqlx::query_as::<_, ShopInboundRow>(
            r#"
            INSERT INTO shop_inbounds (inbound_id, enabled)
            VALUES ($1, $2)
            ON CONFLICT (inbound_id) DO UPDATE SET enabled = EXCLUDED.enabled, updated_at = NOW()
            RETURNING id, inbound_id, enabled, created_at, updated_at
            "#,
        )
        .bind(inbound_id)
        .bind(enabled)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }
}
