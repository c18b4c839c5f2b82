use chrono::Utc;
use serde::Deserialize;
use shopfront_catalog::{CatalogError, InboundVisibility, LimitViolation, PricingEngine};
use shopfront_core::{OrderRepository, PackageRepository};
use shopfront_shared::models::events::{OrderFulfilledEvent, OrderRejectedEvent};
use shopfront_shared::pii::Masked;
use shopfront_shared::{NewOrder, Order, OrderStatus, ProvisionedAccount, Receipt};
use std::sync::Arc;

use crate::fulfillment::FulfillmentNotifier;
use crate::locks::OrderLocks;
use crate::orchestrator::ProvisioningOrchestrator;

/// What the customer is buying
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum OrderRequest {
    Package { package_id: i64 },
    Custom { data_gb: i64, days: i64 },
}

/// Manages order lifecycle and state transitions.
///
/// Only this type moves an order across a review boundary. Every transition
/// runs under the order's lock and is persisted as a conditional update.
pub struct OrderManager {
    orders: Arc<dyn OrderRepository>,
    packages: Arc<dyn PackageRepository>,
    pricing: Arc<PricingEngine>,
    visibility: Arc<InboundVisibility>,
    provisioning: ProvisioningOrchestrator,
    notifications: FulfillmentNotifier,
    locks: OrderLocks,
}

impl OrderManager {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        packages: Arc<dyn PackageRepository>,
        pricing: Arc<PricingEngine>,
        visibility: Arc<InboundVisibility>,
        provisioning: ProvisioningOrchestrator,
        notifications: FulfillmentNotifier,
    ) -> Self {
        Self {
            orders,
            packages,
            pricing,
            visibility,
            provisioning,
            notifications,
            locks: OrderLocks::new(),
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub async fn get_order(&self, order_id: i64) -> Result<Order, OrderError> {
        self.load(order_id).await
    }

    /// `NotFound` unless the order belongs to `customer_id`
    pub async fn get_order_for_customer(&self, customer_id: i64, order_id: i64) -> Result<Order, OrderError> {
        let order = self.load(order_id).await?;
        if order.customer_id != customer_id {
            return Err(OrderError::NotFound("Order", order_id));
        }
        Ok(order)
    }

    /// Newest first
    pub async fn list_orders(&self) -> Result<Vec<Order>, OrderError> {
        self.orders.list_orders().await.map_err(persistence)
    }

    /// Newest first
    pub async fn list_orders_for_customer(&self, customer_id: i64) -> Result<Vec<Order>, OrderError> {
        self.orders
            .list_orders_for_customer(customer_id)
            .await
            .map_err(persistence)
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    /// Record a new order in `PENDING_RECEIPT` with a snapshot of what was bought
    pub async fn create_order(&self, customer_id: i64, request: OrderRequest) -> Result<Order, OrderError> {
        let new_order = match request {
            OrderRequest::Package { package_id } => {
                let package = self
                    .packages
                    .get_package(package_id)
                    .await
                    .map_err(persistence)?
                    .filter(|p| p.is_active)
                    .ok_or(OrderError::NotFound("Package", package_id))?;

                NewOrder {
                    customer_id,
                    package_id: Some(package.id),
                    data_gb: package.data_gb,
                    days: package.days,
                    price: package.price,
                }
            }
            OrderRequest::Custom { data_gb, days } => {
                let quote = self.pricing.quote(data_gb, days).await?;
                NewOrder {
                    customer_id,
                    package_id: None,
                    data_gb: quote.data_gb,
                    days: quote.days,
                    price: quote.price,
                }
            }
        };

        let order = self.orders.create_order(&new_order).await.map_err(persistence)?;
        tracing::info!(
            "Order {} created for customer {} ({} GB / {} days, price {})",
            order.id,
            customer_id,
            order.data_gb,
            order.days,
            order.price
        );
        Ok(order)
    }

    /// `PENDING_RECEIPT` -> `PENDING_REVIEW`
    pub async fn submit_receipt(&self, order_id: i64, receipt: Receipt) -> Result<Order, OrderError> {
        let _guard = self.locks.acquire(order_id).await;

        let order = self.load(order_id).await?;
        if order.status != OrderStatus::PendingReceipt {
            return Err(illegal(order.status, OrderStatus::PendingReview));
        }

        let attached = self
            .orders
            .attach_receipt(order_id, &receipt)
            .await
            .map_err(persistence)?;
        if !attached {
            // Moved by another process since we read it
            let current = self.load(order_id).await?;
            return Err(illegal(current.status, OrderStatus::PendingReview));
        }

        tracing::info!("Receipt attached to order {}", order_id);
        self.load(order_id).await
    }

    /// `PENDING_REVIEW` -> `APPROVED`, creating the proxy account.
    ///
    /// The durable claim is taken before the provisioner is called, so at most
    /// one account is ever created per order. If the account exists but cannot
    /// be recorded, `PersistenceInconsistent` carries it to the operator and the
    /// claim stays until the order is reconciled.
    pub async fn approve(&self, order_id: i64) -> Result<Order, OrderError> {
        // 1. One approval per order at a time in this process
        let _guard = self.locks.acquire(order_id).await;

        // 2. Check state
        let order = self.load(order_id).await?;
        if order.status != OrderStatus::PendingReview {
            return Err(illegal(order.status, OrderStatus::Approved));
        }
        if order.is_claimed() {
            return Err(OrderError::ProvisioningClaimed(order_id));
        }

        // 3. Where the account goes
        let inbound_ids = self
            .visibility
            .enabled_inbound_ids()
            .await
            .map_err(|e| OrderError::ProvisioningFailed(format!("cannot resolve inbounds: {}", e)))?;
        if inbound_ids.is_empty() {
            return Err(OrderError::ProvisioningFailed("no storefront inbound is enabled".to_string()));
        }

        // 4. Durable claim, the guard across processes
        let claimed = self.orders.claim_provisioning(order_id).await.map_err(persistence)?;
        if !claimed {
            let current = self.load(order_id).await?;
            if current.status == OrderStatus::PendingReview {
                return Err(OrderError::ProvisioningClaimed(order_id));
            }
            return Err(illegal(current.status, OrderStatus::Approved));
        }

        // 5. Provision
        let account = match self.provisioning.provision(&order, &inbound_ids).await {
            Ok(account) => account,
            Err(e) if e.is_ambiguous() => {
                tracing::warn!(
                    "Provisioning outcome for order {} unknown, keeping claim for reconciliation: {}",
                    order_id,
                    e
                );
                return Err(OrderError::ProvisioningFailed(e.to_string()));
            }
            Err(e) => {
                self.release_claim_after_failure(order_id).await;
                tracing::warn!("Provisioning failed for order {}: {}", order_id, e);
                return Err(OrderError::ProvisioningFailed(e.to_string()));
            }
        };

        // 6. Record the account
        match self.orders.mark_provisioned(order_id, &account).await {
            Ok(true) => {}
            Ok(false) => return Err(self.inconsistent(order_id, account, "order changed during provisioning")),
            Err(e) => return Err(self.inconsistent(order_id, account, &e.to_string())),
        }

        tracing::info!("Order {} approved as {}", order_id, Masked(account.email.as_str()));

        // 7. Tell the customer, without waiting
        self.notify_fulfilled(&order, &account);

        Ok(approved(order, account))
    }

    /// `PENDING_RECEIPT` | `PENDING_REVIEW` -> `REJECTED`
    pub async fn reject(&self, order_id: i64, note: Option<String>) -> Result<Order, OrderError> {
        let _guard = self.locks.acquire(order_id).await;

        let order = self.load(order_id).await?;
        if order.status.is_terminal() {
            return Err(illegal(order.status, OrderStatus::Rejected));
        }
        if order.is_claimed() {
            return Err(OrderError::ProvisioningClaimed(order_id));
        }

        let note = note.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());
        let rejected = self
            .orders
            .mark_rejected(
                order_id,
                &[OrderStatus::PendingReceipt, OrderStatus::PendingReview],
                note.as_deref(),
            )
            .await
            .map_err(persistence)?;
        if !rejected {
            let current = self.load(order_id).await?;
            if current.is_claimed() && !current.status.is_terminal() {
                return Err(OrderError::ProvisioningClaimed(order_id));
            }
            return Err(illegal(current.status, OrderStatus::Rejected));
        }

        tracing::info!("Order {} rejected", order_id);
        self.notifications.dispatch_rejection(OrderRejectedEvent {
            order_id,
            customer_id: order.customer_id,
            note: note.clone(),
            timestamp: Utc::now().timestamp(),
        });

        self.load(order_id).await
    }

    // ========================================================================
    // Operator repair of claimed orders
    // ========================================================================

    /// Record an account that was created but never persisted
    pub async fn reconcile_provisioned(
        &self,
        order_id: i64,
        account: ProvisionedAccount,
    ) -> Result<Order, OrderError> {
        if !account.is_complete() {
            return Err(OrderError::Invalid("email, client_id and sub_id are required".to_string()));
        }

        let _guard = self.locks.acquire(order_id).await;

        let order = self.claimed_order(order_id, OrderStatus::Approved).await?;
        let recorded = self
            .orders
            .mark_provisioned(order_id, &account)
            .await
            .map_err(persistence)?;
        if !recorded {
            return Err(OrderError::Persistence(format!("order {} changed during reconciliation", order_id)));
        }

        tracing::info!("Order {} reconciled as {}", order_id, Masked(account.email.as_str()));
        self.notify_fulfilled(&order, &account);

        Ok(approved(order, account))
    }

    /// Drop the claim once the operator has confirmed no account exists
    pub async fn release_provisioning_claim(&self, order_id: i64) -> Result<Order, OrderError> {
        let _guard = self.locks.acquire(order_id).await;

        self.claimed_order(order_id, OrderStatus::PendingReview).await?;
        let released = self
            .orders
            .release_provisioning_claim(order_id)
            .await
            .map_err(persistence)?;
        if !released {
            return Err(OrderError::NotClaimed(order_id));
        }

        tracing::warn!("Provisioning claim on order {} released by operator", order_id);
        self.load(order_id).await
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    async fn load(&self, order_id: i64) -> Result<Order, OrderError> {
        self.orders
            .get_order(order_id)
            .await
            .map_err(persistence)?
            .ok_or(OrderError::NotFound("Order", order_id))
    }

    /// A `PENDING_REVIEW` order holding a provisioning claim
    async fn claimed_order(&self, order_id: i64, to: OrderStatus) -> Result<Order, OrderError> {
        let order = self.load(order_id).await?;
        if order.status != OrderStatus::PendingReview {
            return Err(illegal(order.status, to));
        }
        if !order.is_claimed() {
            return Err(OrderError::NotClaimed(order_id));
        }
        Ok(order)
    }

    async fn release_claim_after_failure(&self, order_id: i64) {
        match self.orders.release_provisioning_claim(order_id).await {
            Ok(true) => {}
            Ok(false) => tracing::warn!("Provisioning claim on order {} was already gone", order_id),
            Err(e) => tracing::error!(
                "Could not release provisioning claim on order {}; release it once verified: {}",
                order_id,
                e
            ),
        }
    }

    fn inconsistent(&self, order_id: i64, account: ProvisionedAccount, cause: &str) -> OrderError {
        tracing::warn!(
            "Order {} was provisioned as {} (client {}, sub {}) but could not be marked approved: {}",
            order_id,
            Masked(account.email.as_str()),
            account.client_id,
            account.sub_id,
            cause
        );
        OrderError::PersistenceInconsistent { order_id, account }
    }

    fn notify_fulfilled(&self, order: &Order, account: &ProvisionedAccount) {
        self.notifications.dispatch_fulfillment(OrderFulfilledEvent {
            order_id: order.id,
            customer_id: order.customer_id,
            email: Masked(account.email.clone()),
            sub_id: account.sub_id.clone(),
            data_gb: order.data_gb,
            days: order.days,
            timestamp: Utc::now().timestamp(),
        });
    }
}

fn illegal(from: OrderStatus, to: OrderStatus) -> OrderError {
    OrderError::IllegalTransition { from, to }
}

fn persistence(e: shopfront_core::BoxError) -> OrderError {
    tracing::error!("Order store failed: {}", e);
    OrderError::Persistence(e.to_string())
}

fn approved(mut order: Order, account: ProvisionedAccount) -> Order {
    order.status = OrderStatus::Approved;
    order.account = Some(account);
    order.updated_at = Utc::now();
    order
}

#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("{0} not found: {1}")]
    NotFound(&'static str, i64),

    #[error("Invalid state transition from {from} to {to}")]
    IllegalTransition { from: OrderStatus, to: OrderStatus },

    #[error(transparent)]
    OutOfRange(LimitViolation),

    #[error("Configuration unavailable: {0}")]
    ConfigUnavailable(String),

    #[error("Invalid request: {0}")]
    Invalid(String),

    #[error("Provisioning failed: {0}")]
    ProvisioningFailed(String),

    #[error("Order {0} has a provisioning attempt in progress or awaiting reconciliation")]
    ProvisioningClaimed(i64),

    #[error("Order {0} has no provisioning claim")]
    NotClaimed(i64),

    #[error("Order {order_id} was provisioned but not recorded; reconcile required")]
    PersistenceInconsistent { order_id: i64, account: ProvisionedAccount },

    #[error("Persistence failed: {0}")]
    Persistence(String),
}

impl From<CatalogError> for OrderError {
    fn from(e: CatalogError) -> Self {
        match e {
            CatalogError::NotFound(what, id) => OrderError::NotFound(what, id),
            CatalogError::Invalid(msg) => OrderError::Invalid(msg),
            CatalogError::OutOfRange(violation) => OrderError::OutOfRange(violation),
            CatalogError::ConfigUnavailable(msg) => OrderError::ConfigUnavailable(msg),
            CatalogError::Source(msg) | CatalogError::Persistence(msg) => OrderError::Persistence(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use shopfront_core::{
        BoxError, Notifier, Provisioner, ProvisioningFault, RepoResult, ShopInboundRepository,
    };
    use shopfront_shared::{Inbound, PackageDraft};
    use shopfront_store::app_config::ShopRules;
    use shopfront_store::memory::{
        MemoryOrderRepository, MemoryPackageRepository, MemoryShopInboundRepository, StaticInboundSource,
    };
    use shopfront_store::StaticSettings;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    struct CountingProvisioner {
        calls: AtomicUsize,
        fail: AtomicBool,
        delay: Duration,
    }

    impl CountingProvisioner {
        fn new(delay: Duration) -> Self {
            Self { calls: AtomicUsize::new(0), fail: AtomicBool::new(false), delay }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Provisioner for CountingProvisioner {
        async fn provision(
            &self,
            order: &Order,
            inbound_ids: &[i64],
        ) -> Result<ProvisionedAccount, ProvisioningFault> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            if self.fail.load(Ordering::SeqCst) {
                return Err(ProvisioningFault::refused(format!(
                    "inbound {:?} rejected the client",
                    inbound_ids
                )));
            }
            Ok(ProvisionedAccount {
                email: format!("user{}@x", order.id),
                client_id: "cid-1".to_string(),
                sub_id: "sub-1".to_string(),
            })
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        fulfilled: Mutex<Vec<i64>>,
        rejected: Mutex<Vec<(i64, Option<String>)>>,
        fail: bool,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn notify_fulfillment(&self, event: &OrderFulfilledEvent) -> Result<(), BoxError> {
            if self.fail {
                return Err("bot blocked by user".into());
            }
            self.fulfilled.lock().unwrap().push(event.order_id);
            Ok(())
        }

        async fn notify_rejection(&self, event: &OrderRejectedEvent) -> Result<(), BoxError> {
            self.rejected.lock().unwrap().push((event.order_id, event.note.clone()));
            Ok(())
        }
    }

    /// Order store whose `mark_provisioned` can be made to fail
    struct FlakyOrders {
        inner: MemoryOrderRepository,
        fail_mark: AtomicBool,
    }

    #[async_trait]
    impl OrderRepository for FlakyOrders {
        async fn create_order(&self, order: &NewOrder) -> RepoResult<Order> {
            self.inner.create_order(order).await
        }
        async fn get_order(&self, id: i64) -> RepoResult<Option<Order>> {
            self.inner.get_order(id).await
        }
        async fn list_orders(&self) -> RepoResult<Vec<Order>> {
            self.inner.list_orders().await
        }
        async fn list_orders_for_customer(&self, customer_id: i64) -> RepoResult<Vec<Order>> {
            self.inner.list_orders_for_customer(customer_id).await
        }
        async fn attach_receipt(&self, id: i64, receipt: &Receipt) -> RepoResult<bool> {
            self.inner.attach_receipt(id, receipt).await
        }
        async fn claim_provisioning(&self, id: i64) -> RepoResult<bool> {
            self.inner.claim_provisioning(id).await
        }
        async fn release_provisioning_claim(&self, id: i64) -> RepoResult<bool> {
            self.inner.release_provisioning_claim(id).await
        }
        async fn mark_provisioned(&self, id: i64, account: &ProvisionedAccount) -> RepoResult<bool> {
            if self.fail_mark.load(Ordering::SeqCst) {
                return Err("connection reset".into());
            }
            self.inner.mark_provisioned(id, account).await
        }
        async fn mark_rejected(&self, id: i64, from: &[OrderStatus], note: Option<&str>) -> RepoResult<bool> {
            self.inner.mark_rejected(id, from, note).await
        }
    }

    struct Harness {
        manager: Arc<OrderManager>,
        orders: Arc<FlakyOrders>,
        packages: Arc<MemoryPackageRepository>,
        provisioner: Arc<CountingProvisioner>,
        notifier: Arc<RecordingNotifier>,
        overrides: Arc<MemoryShopInboundRepository>,
    }

    fn harness_with(delay: Duration, timeout: Duration, notifier: RecordingNotifier) -> Harness {
        let orders = Arc::new(FlakyOrders {
            inner: MemoryOrderRepository::new(),
            fail_mark: AtomicBool::new(false),
        });
        let packages = Arc::new(MemoryPackageRepository::new());
        let provisioner = Arc::new(CountingProvisioner::new(delay));
        let notifier = Arc::new(notifier);
        let overrides = Arc::new(MemoryShopInboundRepository::new());

        let settings = Arc::new(StaticSettings::new(ShopRules {
            min_gb: Some(10),
            max_gb: Some(100),
            min_days: Some(7),
            max_days: Some(365),
            price_per_gb: Some(2_500),
        }));
        let source = Arc::new(StaticInboundSource::new(vec![
            Inbound { id: 1, remark: "fr-1".to_string(), protocol: "vless".to_string(), port: 443 },
            Inbound { id: 3, remark: "de-1".to_string(), protocol: "vmess".to_string(), port: 8443 },
        ]));

        let manager = OrderManager::new(
            orders.clone(),
            packages.clone(),
            Arc::new(PricingEngine::new(settings)),
            Arc::new(InboundVisibility::new(source, overrides.clone())),
            ProvisioningOrchestrator::new(provisioner.clone(), timeout),
            FulfillmentNotifier::new(notifier.clone(), Duration::from_secs(1)),
        );

        Harness { manager: Arc::new(manager), orders, packages, provisioner, notifier, overrides }
    }

    fn harness() -> Harness {
        harness_with(Duration::ZERO, Duration::from_secs(5), RecordingNotifier::default())
    }

    impl Harness {
        /// Order 7, receipt attached, waiting for review
        async fn seed_pending_review(&self) -> i64 {
            let now = Utc::now();
            self.orders
                .inner
                .insert(Order {
                    id: 7,
                    customer_id: 4242,
                    package_id: None,
                    data_gb: 50,
                    days: 30,
                    price: 125_000,
                    status: OrderStatus::PendingReview,
                    receipt: Some(Receipt { path: "r/order-7.png".to_string(), file_id: "tg-1".to_string() }),
                    account: None,
                    review_note: None,
                    provisioning_started_at: None,
                    created_at: now,
                    updated_at: now,
                })
                .await;
            7
        }

        async fn stored(&self, order_id: i64) -> Order {
            self.orders.get_order(order_id).await.unwrap().unwrap()
        }
    }

    async fn eventually(check: impl Fn() -> bool) -> bool {
        for _ in 0..100 {
            if check() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }

    fn receipt() -> Receipt {
        Receipt { path: "data/receipts/order-1-a.jpg".to_string(), file_id: "tg-file-1".to_string() }
    }

    #[tokio::test]
    async fn test_approve_provisions_and_records_identity() {
        let h = harness();
        let id = h.seed_pending_review().await;

        let order = h.manager.approve(id).await.unwrap();
        assert_eq!(order.status, OrderStatus::Approved);

        let stored = h.stored(id).await;
        assert_eq!(stored.status, OrderStatus::Approved);
        assert_eq!(
            stored.account,
            Some(ProvisionedAccount {
                email: "user7@x".to_string(),
                client_id: "cid-1".to_string(),
                sub_id: "sub-1".to_string(),
            })
        );
        assert!(stored.is_consistent());

        let second = h.manager.approve(id).await.unwrap_err();
        assert!(matches!(
            second,
            OrderError::IllegalTransition { from: OrderStatus::Approved, to: OrderStatus::Approved }
        ));
        assert_eq!(h.provisioner.calls(), 1);

        assert!(eventually(|| h.notifier.fulfilled.lock().unwrap().as_slice() == [7]).await);
    }

    #[tokio::test]
    async fn test_approve_requires_pending_review() {
        let h = harness();
        let order = h
            .manager
            .create_order(4242, OrderRequest::Custom { data_gb: 20, days: 30 })
            .await
            .unwrap();

        let err = h.manager.approve(order.id).await.unwrap_err();
        assert!(matches!(
            err,
            OrderError::IllegalTransition { from: OrderStatus::PendingReceipt, .. }
        ));
        assert_eq!(h.provisioner.calls(), 0);

        assert!(matches!(h.manager.approve(999).await, Err(OrderError::NotFound("Order", 999))));
    }

    #[tokio::test]
    async fn test_concurrent_approvals_provision_once() {
        let h = harness_with(Duration::from_millis(50), Duration::from_secs(5), RecordingNotifier::default());
        let id = h.seed_pending_review().await;

        let (a, b) = tokio::join!(h.manager.approve(id), h.manager.approve(id));

        assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);
        let loser = if a.is_ok() { b } else { a };
        assert!(matches!(loser, Err(OrderError::IllegalTransition { .. })));
        assert_eq!(h.provisioner.calls(), 1);
        assert_eq!(h.stored(id).await.status, OrderStatus::Approved);
    }

    #[tokio::test]
    async fn test_provisioner_error_releases_claim() {
        let h = harness();
        let id = h.seed_pending_review().await;
        h.provisioner.fail.store(true, Ordering::SeqCst);

        let err = h.manager.approve(id).await.unwrap_err();
        assert!(matches!(err, OrderError::ProvisioningFailed(_)));

        let stored = h.stored(id).await;
        assert_eq!(stored.status, OrderStatus::PendingReview);
        assert!(!stored.is_claimed());

        // can be retried
        h.provisioner.fail.store(false, Ordering::SeqCst);
        h.manager.approve(id).await.unwrap();
        assert_eq!(h.provisioner.calls(), 2);
    }

    #[tokio::test]
    async fn test_provisioner_timeout_keeps_claim() {
        let h = harness_with(Duration::from_secs(30), Duration::from_millis(50), RecordingNotifier::default());
        let id = h.seed_pending_review().await;

        let err = h.manager.approve(id).await.unwrap_err();
        assert!(matches!(err, OrderError::ProvisioningFailed(_)));
        assert!(h.stored(id).await.is_claimed());

        assert!(matches!(h.manager.approve(id).await, Err(OrderError::ProvisioningClaimed(7))));
        assert_eq!(h.provisioner.calls(), 1);
    }

    #[tokio::test]
    async fn test_lost_write_is_reported_then_reconciled() {
        let h = harness();
        let id = h.seed_pending_review().await;
        h.orders.fail_mark.store(true, Ordering::SeqCst);

        let account = match h.manager.approve(id).await {
            Err(OrderError::PersistenceInconsistent { order_id, account }) => {
                assert_eq!(order_id, id);
                account
            }
            other => panic!("expected PersistenceInconsistent, got {:?}", other),
        };
        assert_eq!(account.email, "user7@x");

        let stored = h.stored(id).await;
        assert_eq!(stored.status, OrderStatus::PendingReview);
        assert!(stored.is_claimed());
        assert!(stored.account.is_none());

        // a retry must not provision a second account
        assert!(matches!(h.manager.approve(id).await, Err(OrderError::ProvisioningClaimed(_))));
        assert!(matches!(h.manager.reject(id, None).await, Err(OrderError::ProvisioningClaimed(_))));
        assert_eq!(h.provisioner.calls(), 1);

        h.orders.fail_mark.store(false, Ordering::SeqCst);
        let reconciled = h.manager.reconcile_provisioned(id, account.clone()).await.unwrap();
        assert_eq!(reconciled.status, OrderStatus::Approved);
        assert_eq!(h.stored(id).await.account, Some(account));
    }

    #[tokio::test]
    async fn test_release_claim_clears_marker() {
        let h = harness_with(Duration::from_secs(30), Duration::from_millis(20), RecordingNotifier::default());
        let id = h.seed_pending_review().await;
        h.manager.approve(id).await.unwrap_err();

        let released = h.manager.release_provisioning_claim(id).await.unwrap();
        assert!(!released.is_claimed());
        assert!(matches!(
            h.manager.release_provisioning_claim(id).await,
            Err(OrderError::NotClaimed(_))
        ));
        assert!(matches!(
            h.manager
                .reconcile_provisioned(
                    id,
                    ProvisionedAccount {
                        email: "user7@x".to_string(),
                        client_id: "cid-1".to_string(),
                        sub_id: "sub-1".to_string(),
                    }
                )
                .await,
            Err(OrderError::NotClaimed(_))
        ));
    }

    #[tokio::test]
    async fn test_notifier_failure_does_not_fail_approval() {
        let notifier = RecordingNotifier { fail: true, ..Default::default() };
        let h = harness_with(Duration::ZERO, Duration::from_secs(5), notifier);
        let id = h.seed_pending_review().await;

        let order = h.manager.approve(id).await.unwrap();
        assert_eq!(order.status, OrderStatus::Approved);
    }

    #[tokio::test]
    async fn test_no_enabled_inbound_fails_without_claim() {
        let h = harness();
        let id = h.seed_pending_review().await;
        h.overrides.upsert_override(1, false).await.unwrap();

        let err = h.manager.approve(id).await.unwrap_err();
        assert!(matches!(err, OrderError::ProvisioningFailed(_)));
        assert!(!h.stored(id).await.is_claimed());
        assert_eq!(h.provisioner.calls(), 0);
    }

    #[tokio::test]
    async fn test_receipt_moves_order_to_review_once() {
        let h = harness();
        let order = h
            .manager
            .create_order(4242, OrderRequest::Custom { data_gb: 20, days: 30 })
            .await
            .unwrap();

        let reviewed = h.manager.submit_receipt(order.id, receipt()).await.unwrap();
        assert_eq!(reviewed.status, OrderStatus::PendingReview);
        assert_eq!(reviewed.receipt, Some(receipt()));

        let err = h.manager.submit_receipt(order.id, receipt()).await.unwrap_err();
        assert!(matches!(
            err,
            OrderError::IllegalTransition { from: OrderStatus::PendingReview, to: OrderStatus::PendingReview }
        ));
    }

    #[tokio::test]
    async fn test_reject_from_open_states_only() {
        let h = harness();
        let order = h
            .manager
            .create_order(4242, OrderRequest::Custom { data_gb: 20, days: 30 })
            .await
            .unwrap();

        let rejected = h
            .manager
            .reject(order.id, Some("  receipt unreadable ".to_string()))
            .await
            .unwrap();
        assert_eq!(rejected.status, OrderStatus::Rejected);
        assert_eq!(rejected.review_note.as_deref(), Some("receipt unreadable"));
        assert!(rejected.is_consistent());

        let again = h.manager.reject(order.id, None).await.unwrap_err();
        assert!(matches!(
            again,
            OrderError::IllegalTransition { from: OrderStatus::Rejected, to: OrderStatus::Rejected }
        ));
        assert!(matches!(
            h.manager.submit_receipt(order.id, receipt()).await,
            Err(OrderError::IllegalTransition { .. })
        ));

        assert!(eventually(|| {
            h.notifier.rejected.lock().unwrap().as_slice()
                == [(order.id, Some("receipt unreadable".to_string()))]
        })
        .await);
    }

    #[tokio::test]
    async fn test_package_order_snapshots_package() {
        let h = harness();
        let package = h
            .packages
            .create_package(&PackageDraft {
                name: "Monthly 30".to_string(),
                data_gb: 30,
                days: 30,
                price: 90_000,
                is_active: true,
            })
            .await
            .unwrap();
        let hidden = h
            .packages
            .create_package(&PackageDraft {
                name: "Retired".to_string(),
                data_gb: 5,
                days: 7,
                price: 10_000,
                is_active: false,
            })
            .await
            .unwrap();

        let order = h
            .manager
            .create_order(4242, OrderRequest::Package { package_id: package.id })
            .await
            .unwrap();
        assert_eq!(order.package_id, Some(package.id));
        assert_eq!((order.data_gb, order.days, order.price), (30, 30, 90_000));
        assert_eq!(order.status, OrderStatus::PendingReceipt);

        assert!(matches!(
            h.manager.create_order(4242, OrderRequest::Package { package_id: hidden.id }).await,
            Err(OrderError::NotFound("Package", _))
        ));
        assert!(matches!(
            h.manager.create_order(4242, OrderRequest::Package { package_id: 404 }).await,
            Err(OrderError::NotFound("Package", 404))
        ));
    }

    #[tokio::test]
    async fn test_custom_order_is_validated_and_priced() {
        let h = harness();

        let order = h
            .manager
            .create_order(4242, OrderRequest::Custom { data_gb: 50, days: 30 })
            .await
            .unwrap();
        assert!(order.is_custom());
        assert_eq!(order.price, 125_000);

        let err = h
            .manager
            .create_order(4242, OrderRequest::Custom { data_gb: 50, days: 400 })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OrderError::OutOfRange(LimitViolation::DaysAboveMaximum { max: 365 })
        ));
    }

    #[tokio::test]
    async fn test_customers_only_see_their_orders() {
        let h = harness();
        let mine = h
            .manager
            .create_order(1, OrderRequest::Custom { data_gb: 20, days: 30 })
            .await
            .unwrap();
        h.manager
            .create_order(2, OrderRequest::Custom { data_gb: 20, days: 30 })
            .await
            .unwrap();

        assert_eq!(h.manager.list_orders_for_customer(1).await.unwrap().len(), 1);
        assert_eq!(h.manager.list_orders().await.unwrap().len(), 2);
        assert!(h.manager.get_order_for_customer(1, mine.id).await.is_ok());
        assert!(matches!(
            h.manager.get_order_for_customer(2, mine.id).await,
            Err(OrderError::NotFound("Order", _))
        ));
    }

    #[test]
    fn test_order_request_shapes() {
        let package: OrderRequest = serde_json::from_str(r#"{"package_id": 3}"#).unwrap();
        assert_eq!(package, OrderRequest::Package { package_id: 3 });

        let custom: OrderRequest = serde_json::from_str(r#"{"data_gb": 50, "days": 30}"#).unwrap();
        assert_eq!(custom, OrderRequest::Custom { data_gb: 50, days: 30 });
    }
}
