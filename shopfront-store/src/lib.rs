pub mod app_config;
pub mod database;
pub mod inbound_repo;
pub mod memory;
pub mod order_repo;
pub mod package_repo;
pub mod panel;
pub mod settings;
pub mod telegram;

pub use database::DbClient;
pub use inbound_repo::StoreShopInboundRepository;
pub use order_repo::StoreOrderRepository;
pub use package_repo::StorePackageRepository;
pub use panel::PanelClient;
pub use settings::{DbSettings, StaticSettings};
pub use telegram::{LogNotifier, TelegramNotifier};
