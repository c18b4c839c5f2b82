use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Order status in the review lifecycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    PendingReceipt,
    PendingReview,
    Approved,
    Rejected,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::PendingReceipt => "PENDING_RECEIPT",
            OrderStatus::PendingReview => "PENDING_REVIEW",
            OrderStatus::Approved => "APPROVED",
            OrderStatus::Rejected => "REJECTED",
        }
    }

    /// No transitions are defined out of a terminal status
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Approved | OrderStatus::Rejected)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown order status: {}", self.0)
    }
}

impl std::error::Error for UnknownStatus {}

impl FromStr for OrderStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING_RECEIPT" => Ok(OrderStatus::PendingReceipt),
            "PENDING_REVIEW" => Ok(OrderStatus::PendingReview),
            "APPROVED" => Ok(OrderStatus::Approved),
            "REJECTED" => Ok(OrderStatus::Rejected),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// Payment proof uploaded by the customer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Receipt {
    pub path: String,
    /// Identifier of the file on the messaging platform it was sent from
    pub file_id: String,
}

/// Identity of the proxy account created for an approved order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProvisionedAccount {
    pub email: String,
    pub client_id: String,
    pub sub_id: String,
}

impl ProvisionedAccount {
    pub fn is_complete(&self) -> bool {
        !self.email.is_empty() && !self.client_id.is_empty() && !self.sub_id.is_empty()
    }
}

/// A customer's request for a package or a custom allotment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub customer_id: i64,
    /// `None` for custom orders
    pub package_id: Option<i64>,
    pub data_gb: i64,
    pub days: i64,
    pub price: i64,
    pub status: OrderStatus,
    pub receipt: Option<Receipt>,
    pub account: Option<ProvisionedAccount>,
    pub review_note: Option<String>,
    /// Set when an approval has started talking to the provisioner
    pub provisioning_started_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn is_custom(&self) -> bool {
        self.package_id.is_none()
    }

    pub fn is_claimed(&self) -> bool {
        self.provisioning_started_at.is_some()
    }

    /// Checks the coupling between status and provisioned identity
    pub fn is_consistent(&self) -> bool {
        match (&self.status, &self.account) {
            (OrderStatus::Approved, Some(account)) => account.is_complete(),
            (OrderStatus::Approved, None) => false,
            (_, Some(_)) => false,
            (_, None) => true,
        }
    }
}

/// Fields supplied when an order is first recorded
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewOrder {
    pub customer_id: i64,
    pub package_id: Option<i64>,
    pub data_gb: i64,
    pub days: i64,
    pub price: i64,
}
