use shopfront_catalog::{InboundVisibility, PackageService, PricingEngine};
use shopfront_core::{
    InboundSource, Notifier, OrderRepository, PackageRepository, Provisioner, ShopInboundRepository,
    ShopSettings,
};
use shopfront_order::{FulfillmentNotifier, OrderManager, ProvisioningOrchestrator, ReceiptVault};
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
}

/// Storage and external systems the service runs against
pub struct Backends {
    pub packages: Arc<dyn PackageRepository>,
    pub orders: Arc<dyn OrderRepository>,
    pub inbound_overrides: Arc<dyn ShopInboundRepository>,
    pub inbound_source: Arc<dyn InboundSource>,
    pub settings: Arc<dyn ShopSettings>,
    pub provisioner: Arc<dyn Provisioner>,
    pub notifier: Arc<dyn Notifier>,
}

#[derive(Debug, Clone, Copy)]
pub struct Timeouts {
    pub provisioning: Duration,
    pub notifications: Duration,
}

#[derive(Clone)]
pub struct AppState {
    pub packages: Arc<PackageService>,
    pub pricing: Arc<PricingEngine>,
    pub inbounds: Arc<InboundVisibility>,
    pub orders: Arc<OrderManager>,
    pub receipts: Arc<ReceiptVault>,
    pub auth: AuthConfig,
}

impl AppState {
    pub fn build(backends: Backends, timeouts: Timeouts, receipts: ReceiptVault, auth: AuthConfig) -> Self {
        let pricing = Arc::new(PricingEngine::new(backends.settings));
        let inbounds = Arc::new(InboundVisibility::new(
            backends.inbound_source,
            backends.inbound_overrides,
        ));

        let orders = OrderManager::new(
            backends.orders,
            backends.packages.clone(),
            pricing.clone(),
            inbounds.clone(),
            ProvisioningOrchestrator::new(backends.provisioner, timeouts.provisioning),
            FulfillmentNotifier::new(backends.notifier, timeouts.notifications),
        );

        Self {
            packages: Arc::new(PackageService::new(backends.packages)),
            pricing,
            inbounds,
            orders: Arc::new(orders),
            receipts: Arc::new(receipts),
            auth,
        }
    }
}
