pub mod inbound;
pub mod notify;
pub mod provisioning;
pub mod repository;
pub mod settings;

pub use inbound::InboundSource;
pub use notify::Notifier;
pub use provisioning::{Provisioner, ProvisioningFault};
pub use repository::{OrderRepository, PackageRepository, ShopInboundRepository};
pub use settings::{OrderLimits, ShopSettings};

/// Opaque error returned by collaborators (stores, HTTP clients)
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub type RepoResult<T> = Result<T, BoxError>;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Configuration unavailable: {0}")]
    ConfigUnavailable(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
