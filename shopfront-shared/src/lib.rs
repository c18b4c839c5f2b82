pub mod models;
pub mod pii;

pub use models::{
    Inbound, NewOrder, Order, OrderStatus, Package, PackageDraft, ProvisionedAccount, Receipt,
    ShopInbound,
};
