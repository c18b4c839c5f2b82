use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shopfront_core::{OrderRepository, RepoResult};
use shopfront_shared::models::order::UnknownStatus;
use shopfront_shared::{NewOrder, Order, OrderStatus, ProvisionedAccount, Receipt};
use sqlx::PgPool;

pub struct StoreOrderRepository {
    pool: PgPool,
}

impl StoreOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Internal struct for type-safe querying
#[derive(sqlx::FromRow)]
struct OrderRow {
    id: i64,
    telegram_id: i64,
    package_id: Option<i64>,
    data_gb: i64,
    days: i64,
    price: i64,
    status: String,
    receipt_path: String,
    receipt_file_id: String,
    client_email: String,
    client_id: String,
    client_sub_id: String,
    review_note: Option<String>,
    provisioning_started_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = UnknownStatus;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let status = row.status.parse::<OrderStatus>()?;

        // Empty columns mean the value was never set
        let receipt = if row.receipt_path.is_empty() {
            None
        } else {
            Some(Receipt { path: row.receipt_path, file_id: row.receipt_file_id })
        };
        let account = if row.client_email.is_empty() {
            None
        } else {
            Some(ProvisionedAccount {
                email: row.client_email,
                client_id: row.client_id,
                sub_id: row.client_sub_id,
            })
        };

        Ok(Order {
            id: row.id,
            customer_id: row.telegram_id,
            package_id: row.package_id,
            data_gb: row.data_gb,
            days: row.days,
            price: row.price,
            status,
            receipt,
            account,
            review_note: row.review_note,
            provisioning_started_at: row.provisioning_started_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const ORDER_COLUMNS: &str = "id, telegram_id, package_id, data_gb, days, price, status, \
    receipt_path, receipt_file_id, client_email, client_id, client_sub_id, review_note, \
    provisioning_started_at, created_at, updated_at";

fn into_orders(rows: Vec<OrderRow>) -> RepoResult<Vec<Order>> {
    rows.into_iter()
        .map(|row| Order::try_from(row).map_err(Into::into))
        .collect()
}

#[async_trait]
impl OrderRepository for StoreOrderRepository {
    async fn create_order(&self, order: &NewOrder) -> RepoResult<Order> {
        let sql = format!(
            "INSERT INTO shop_orders (telegram_id, package_id, data_gb, days, price, status) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
            ORDER_COLUMNS
        );

        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(order.customer_id)
            .bind(order.package_id)
            .bind(order.data_gb)
            .bind(order.days)
            .bind(order.price)
            .bind(OrderStatus::PendingReceipt.as_str())
            .fetch_one(&self.pool)
            .await?;

        Ok(Order::try_from(row)?)
    }

    async fn get_order(&self, id: i64) -> RepoResult<Option<Order>> {
        let sql = format!("SELECT {} FROM shop_orders WHERE id = $1", ORDER_COLUMNS);

        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(Order::try_from(row)?)),
            None => Ok(None),
        }
    }

    async fn list_orders(&self) -> RepoResult<Vec<Order>> {
        let sql = format!("SELECT {} FROM shop_orders ORDER BY id DESC", ORDER_COLUMNS);

        let rows = sqlx::query_as::<_, OrderRow>(&sql)
            .fetch_all(&self.pool)
            .await?;

        into_orders(rows)
    }

    async fn list_orders_for_customer(&self, customer_id: i64) -> RepoResult<Vec<Order>> {
        let sql = format!(
            "SELECT {} FROM shop_orders WHERE telegram_id = $1 ORDER BY id DESC",
            ORDER_COLUMNS
        );

        let rows = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(customer_id)
            .fetch_all(&self.pool)
            .await?;

        into_orders(rows)
    }

    async fn attach_receipt(&self, id: i64, receipt: &Receipt) -> RepoResult<bool> {
        let result = sqlx::query(
            "UPDATE shop_orders \
             SET receipt_path = $2, receipt_file_id = $3, status = 'PENDING_REVIEW', updated_at = NOW() \
             WHERE id = $1 AND status = 'PENDING_RECEIPT'",
        )
        .bind(id)
        .bind(&receipt.path)
        .bind(&receipt.file_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn claim_provisioning(&self, id: i64) -> RepoResult<bool> {
        let result = sqlx::query(
            "UPDATE shop_orders SET provisioning_started_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND status = 'PENDING_REVIEW' AND provisioning_started_at IS NULL",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn release_provisioning_claim(&self, id: i64) -> RepoResult<bool> {
        let result = sqlx::query(
            "UPDATE shop_orders SET provisioning_started_at = NULL, updated_at = NOW() \
             WHERE id = $1 AND status = 'PENDING_REVIEW' AND provisioning_started_at IS NOT NULL",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn mark_provisioned(&self, id: i64, account: &ProvisionedAccount) -> RepoResult<bool> {
        let result = sqlx::query(
            "UPDATE shop_orders \
             SET client_email = $2, client_id = $3, client_sub_id = $4, status = 'APPROVED', updated_at = NOW() \
             WHERE id = $1 AND status = 'PENDING_REVIEW' AND provisioning_started_at IS NOT NULL",
        )
        .bind(id)
        .bind(&account.email)
        .bind(&account.client_id)
        .bind(&account.sub_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn mark_rejected(
        &self,
        id: i64,
        from: &[OrderStatus],
        note: Option<&str>,
    ) -> RepoResult<bool> {
        let from: Vec<String> = from.iter().map(|s| s.as_str().to_string()).collect();

        let result = sqlx::query(
            "UPDATE shop_orders SET status = 'REJECTED', review_note = $3, updated_at = NOW() \
             WHERE id = $1 AND status = ANY($2) AND provisioning_started_at IS NULL",
        )
        .bind(id)
        .bind(from)
        .bind(note)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
