pub mod events;
pub mod inbound;
pub mod order;
pub mod package;

pub use inbound::{Inbound, ShopInbound};
pub use order::{NewOrder, Order, OrderStatus, ProvisionedAccount, Receipt};
pub use package::{Package, PackageDraft};
