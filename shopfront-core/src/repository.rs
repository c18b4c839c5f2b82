use async_trait::async_trait;
use shopfront_shared::{
    NewOrder, Order, OrderStatus, Package, PackageDraft, ProvisionedAccount, Receipt, ShopInbound,
};

use crate::RepoResult;

/// Repository trait for package data access
#[async_trait]
pub trait PackageRepository: Send + Sync {
    async fn create_package(&self, draft: &PackageDraft) -> RepoResult<Package>;

    async fn get_package(&self, id: i64) -> RepoResult<Option<Package>>;

    /// Newest first
    async fn list_packages(&self, active_only: bool) -> RepoResult<Vec<Package>>;

    /// Returns the updated package, or `None` if the id does not resolve
    async fn update_package(&self, id: i64, draft: &PackageDraft) -> RepoResult<Option<Package>>;

    /// Returns false if the id does not resolve
    async fn delete_package(&self, id: i64) -> RepoResult<bool>;
}

/// Repository trait for order data access.
///
/// The transition methods are conditional updates: each one only touches the
/// row when it is still in the expected state and reports whether it did.
/// They are private to the lifecycle controller; nothing else should call them.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Inserts the order in `PENDING_RECEIPT`
    async fn create_order(&self, order: &NewOrder) -> RepoResult<Order>;

    async fn get_order(&self, id: i64) -> RepoResult<Option<Order>>;

    /// Newest first
    async fn list_orders(&self) -> RepoResult<Vec<Order>>;

    /// Newest first
    async fn list_orders_for_customer(&self, customer_id: i64) -> RepoResult<Vec<Order>>;

    /// `PENDING_RECEIPT` -> `PENDING_REVIEW`, storing the receipt
    async fn attach_receipt(&self, id: i64, receipt: &Receipt) -> RepoResult<bool>;

    /// Sets the provisioning marker if the order is `PENDING_REVIEW` and unclaimed
    async fn claim_provisioning(&self, id: i64) -> RepoResult<bool>;

    /// Clears the provisioning marker of a `PENDING_REVIEW` order
    async fn release_provisioning_claim(&self, id: i64) -> RepoResult<bool>;

    /// Claimed `PENDING_REVIEW` -> `APPROVED`, storing the account identity
    async fn mark_provisioned(&self, id: i64, account: &ProvisionedAccount) -> RepoResult<bool>;

    /// Unclaimed order in one of `from` -> `REJECTED`
    async fn mark_rejected(
        &self,
        id: i64,
        from: &[OrderStatus],
        note: Option<&str>,
    ) -> RepoResult<bool>;
}

/// Repository trait for the storefront inbound override table
#[async_trait]
pub trait ShopInboundRepository: Send + Sync {
    async fn list_overrides(&self) -> RepoResult<Vec<ShopInbound>>;

    /// Updates the row for `inbound_id`, or inserts one with fresh timestamps
    async fn upsert_override(&self, inbound_id: i64, enabled: bool) -> RepoResult<ShopInbound>;
}
