//! In-memory adapters for the repository and collaborator traits.
//!
//! Nothing here survives a restart. They back the test suites and local runs
//! without a database, and follow the same conditional-update rules as the
//! PostgreSQL repositories.

use async_trait::async_trait;
use chrono::Utc;
use shopfront_core::{
    InboundSource, OrderRepository, PackageRepository, RepoResult, ShopInboundRepository,
};
use shopfront_shared::{
    Inbound, NewOrder, Order, OrderStatus, Package, PackageDraft, ProvisionedAccount, Receipt,
    ShopInbound,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Rows keyed by id, with a store-assigned increasing id sequence
struct Table<T> {
    rows: BTreeMap<i64, T>,
    last_id: i64,
}

impl<T> Table<T> {
    fn new() -> Self {
        Self { rows: BTreeMap::new(), last_id: 0 }
    }

    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    /// Newest first
    fn newest_first<'a>(&'a self, keep: impl Fn(&T) -> bool + 'a) -> impl Iterator<Item = &'a T> + 'a {
        self.rows.values().rev().filter(move |row| keep(*row))
    }
}

pub struct MemoryPackageRepository {
    store: Arc<RwLock<Table<Package>>>,
}

impl MemoryPackageRepository {
    pub fn new() -> Self {
        Self { store: Arc::new(RwLock::new(Table::new())) }
    }
}

impl Default for MemoryPackageRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PackageRepository for MemoryPackageRepository {
    async fn create_package(&self, draft: &PackageDraft) -> RepoResult<Package> {
        let mut store = self.store.write().await;
        let now = Utc::now();
        let package = Package {
            id: store.next_id(),
            name: draft.name.clone(),
            data_gb: draft.data_gb,
            days: draft.days,
            price: draft.price,
            is_active: draft.is_active,
            created_at: now,
            updated_at: now,
        };
        store.rows.insert(package.id, package.clone());
        Ok(package)
    }

    async fn get_package(&self, id: i64) -> RepoResult<Option<Package>> {
        let store = self.store.read().await;
        Ok(store.rows.get(&id).cloned())
    }

    async fn list_packages(&self, active_only: bool) -> RepoResult<Vec<Package>> {
        let store = self.store.read().await;
        Ok(store
            .newest_first(move |p: &Package| !active_only || p.is_active)
            .cloned()
            .collect())
    }

    async fn update_package(&self, id: i64, draft: &PackageDraft) -> RepoResult<Option<Package>> {
        let mut store = self.store.write().await;
        let Some(package) = store.rows.get_mut(&id) else {
            return Ok(None);
        };

        package.name = draft.name.clone();
        package.data_gb = draft.data_gb;
        package.days = draft.days;
        package.price = draft.price;
        package.is_active = draft.is_active;
        package.updated_at = Utc::now();
        Ok(Some(package.clone()))
    }

    async fn delete_package(&self, id: i64) -> RepoResult<bool> {
        let mut store = self.store.write().await;
        Ok(store.rows.remove(&id).is_some())
    }
}

pub struct MemoryOrderRepository {
    store: Arc<RwLock<Table<Order>>>,
}

impl MemoryOrderRepository {
    pub fn new() -> Self {
        Self { store: Arc::new(RwLock::new(Table::new())) }
    }

    /// Put an order in place as-is; later inserts get ids above it
    pub async fn insert(&self, order: Order) {
        let mut store = self.store.write().await;
        store.last_id = store.last_id.max(order.id);
        store.rows.insert(order.id, order);
    }

    /// Apply `change` if the order exists and `guard` holds
    async fn transition(
        &self,
        id: i64,
        guard: impl FnOnce(&Order) -> bool,
        change: impl FnOnce(&mut Order),
    ) -> bool {
        let mut store = self.store.write().await;
        let Some(order) = store.rows.get_mut(&id) else {
            return false;
        };
        if !guard(order) {
            return false;
        }

        change(order);
        order.updated_at = Utc::now();
        true
    }
}

impl Default for MemoryOrderRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OrderRepository for MemoryOrderRepository {
    async fn create_order(&self, order: &NewOrder) -> RepoResult<Order> {
        let mut store = self.store.write().await;
        let now = Utc::now();
        let order = Order {
            id: store.next_id(),
            customer_id: order.customer_id,
            package_id: order.package_id,
            data_gb: order.data_gb,
            days: order.days,
            price: order.price,
            status: OrderStatus::PendingReceipt,
            receipt: None,
            account: None,
            review_note: None,
            provisioning_started_at: None,
            created_at: now,
            updated_at: now,
        };
        store.rows.insert(order.id, order.clone());
        Ok(order)
    }

    async fn get_order(&self, id: i64) -> RepoResult<Option<Order>> {
        let store = self.store.read().await;
        Ok(store.rows.get(&id).cloned())
    }

    async fn list_orders(&self) -> RepoResult<Vec<Order>> {
        let store = self.store.read().await;
        Ok(store.newest_first(|_: &Order| true).cloned().collect())
    }

    async fn list_orders_for_customer(&self, customer_id: i64) -> RepoResult<Vec<Order>> {
        let store = self.store.read().await;
        Ok(store
            .newest_first(move |o: &Order| o.customer_id == customer_id)
            .cloned()
            .collect())
    }

    async fn attach_receipt(&self, id: i64, receipt: &Receipt) -> RepoResult<bool> {
        Ok(self
            .transition(
                id,
                |o| o.status == OrderStatus::PendingReceipt,
                |o| {
                    o.receipt = Some(receipt.clone());
                    o.status = OrderStatus::PendingReview;
                },
            )
            .await)
    }

    async fn claim_provisioning(&self, id: i64) -> RepoResult<bool> {
        Ok(self
            .transition(
                id,
                |o| o.status == OrderStatus::PendingReview && !o.is_claimed(),
                |o| o.provisioning_started_at = Some(Utc::now()),
            )
            .await)
    }

    async fn release_provisioning_claim(&self, id: i64) -> RepoResult<bool> {
        Ok(self
            .transition(
                id,
                |o| o.status == OrderStatus::PendingReview && o.is_claimed(),
                |o| o.provisioning_started_at = None,
            )
            .await)
    }

    async fn mark_provisioned(&self, id: i64, account: &ProvisionedAccount) -> RepoResult<bool> {
        Ok(self
            .transition(
                id,
                |o| o.status == OrderStatus::PendingReview && o.is_claimed(),
                |o| {
                    o.account = Some(account.clone());
                    o.status = OrderStatus::Approved;
                },
            )
            .await)
    }

    async fn mark_rejected(
        &self,
        id: i64,
        from: &[OrderStatus],
        note: Option<&str>,
    ) -> RepoResult<bool> {
        Ok(self
            .transition(
                id,
                |o| from.contains(&o.status) && !o.is_claimed(),
                |o| {
                    o.status = OrderStatus::Rejected;
                    o.review_note = note.map(str::to_string);
                },
            )
            .await)
    }
}

pub struct MemoryShopInboundRepository {
    store: Arc<RwLock<Table<ShopInbound>>>,
}

impl MemoryShopInboundRepository {
    pub fn new() -> Self {
        Self { store: Arc::new(RwLock::new(Table::new())) }
    }
}

impl Default for MemoryShopInboundRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ShopInboundRepository for MemoryShopInboundRepository {
    async fn list_overrides(&self) -> RepoResult<Vec<ShopInbound>> {
        let store = self.store.read().await;
        let mut rows: Vec<ShopInbound> = store.rows.values().cloned().collect();
        rows.sort_by_key(|row| row.inbound_id);
        Ok(rows)
    }

    async fn upsert_override(&self, inbound_id: i64, enabled: bool) -> RepoResult<ShopInbound> {
        let mut store = self.store.write().await;
        let now = Utc::now();

        if let Some(row) = store.rows.values_mut().find(|row| row.inbound_id == inbound_id) {
            row.enabled = enabled;
            row.updated_at = now;
            return Ok(row.clone());
        }

        let row = ShopInbound {
            id: store.next_id(),
            inbound_id,
            enabled,
            created_at: now,
            updated_at: now,
        };
        store.rows.insert(row.id, row.clone());
        Ok(row)
    }
}

/// Fixed list of panel inbounds
pub struct StaticInboundSource {
    inbounds: Vec<Inbound>,
}

impl StaticInboundSource {
    pub fn new(inbounds: Vec<Inbound>) -> Self {
        Self { inbounds }
    }
}

#[async_trait]
impl InboundSource for StaticInboundSource {
    async fn list_inbounds(&self) -> RepoResult<Vec<Inbound>> {
        Ok(self.inbounds.clone())
    }
}
