pub mod package;
pub mod pricing;
pub mod visibility;

pub use package::PackageService;
pub use pricing::{LimitViolation, PricingEngine, Quote};
pub use visibility::{InboundListing, InboundOption, InboundVisibility, VisibilityMode};

/// Catalog-related errors
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("{0} not found: {1}")]
    NotFound(&'static str, i64),

    #[error("Invalid request: {0}")]
    Invalid(String),

    #[error(transparent)]
    OutOfRange(#[from] LimitViolation),

    #[error("Configuration unavailable: {0}")]
    ConfigUnavailable(String),

    #[error("Inbound source failed: {0}")]
    Source(String),

    #[error("Persistence failed: {0}")]
    Persistence(String),
}
