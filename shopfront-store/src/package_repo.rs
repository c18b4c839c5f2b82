use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shopfront_core::{PackageRepository, RepoResult};
use shopfront_shared::{Package, PackageDraft};
use sqlx::PgPool;

pub struct StorePackageRepository {
    pool: PgPool,
}

impl StorePackageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Internal struct for type-safe querying
#[derive(sqlx::FromRow)]
struct PackageRow {
    id: i64,
    name: String,
    data_gb: i64,
    days: i64,
    price: i64,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<PackageRow> for Package {
    fn from(row: PackageRow) -> Self {
        Package {
            id: row.id,
            name: row.name,
            data_gb: row.data_gb,
            days: row.days,
            price: row.price,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const PACKAGE_COLUMNS: &str = "id, name, data_gb, days, price, is_active, created_at, updated_at";

#[async_trait]
impl PackageRepository for StorePackageRepository {
    async fn create_package(&self, draft: &PackageDraft) -> RepoResult<Package> {
        let sql = format!(
            "INSERT INTO shop_packages (name, data_gb, days, price, is_active) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            PACKAGE_COLUMNS
        );

        let row = sqlx::query_as::<_, PackageRow>(&sql)
            .bind(&draft.name)
            .bind(draft.data_gb)
            .bind(draft.days)
            .bind(draft.price)
            .bind(draft.is_active)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.into())
    }

    async fn get_package(&self, id: i64) -> RepoResult<Option<Package>> {
        let sql = format!("SELECT {} FROM shop_packages WHERE id = $1", PACKAGE_COLUMNS);

        let row = sqlx::query_as::<_, PackageRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Package::from))
    }

    async fn list_packages(&self, active_only: bool) -> RepoResult<Vec<Package>> {
        let sql = format!(
            "SELECT {} FROM shop_packages WHERE ($1 = FALSE OR is_active) ORDER BY id DESC",
            PACKAGE_COLUMNS
        );

        let rows = sqlx::query_as::<_, PackageRow>(&sql)
            .bind(active_only)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Package::from).collect())
    }

    async fn update_package(&self, id: i64, draft: &PackageDraft) -> RepoResult<Option<Package>> {
        let sql = format!(
            "UPDATE shop_packages \
             SET name = $2, data_gb = $3, days = $4, price = $5, is_active = $6, updated_at = NOW() \
             WHERE id = $1 RETURNING {}",
            PACKAGE_COLUMNS
        );

        let row = sqlx::query_as::<_, PackageRow>(&sql)
            .bind(id)
            .bind(&draft.name)
            .bind(draft.data_gb)
            .bind(draft.days)
            .bind(draft.price)
            .bind(draft.is_active)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Package::from))
    }

    async fn delete_package(&self, id: i64) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM shop_packages WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
