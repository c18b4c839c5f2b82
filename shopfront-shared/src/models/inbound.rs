use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A network entry point configured on the proxy panel
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Inbound {
    pub id: i64,
    pub remark: String,
    pub protocol: String,
    pub port: i64,
}

/// Storefront visibility override for one inbound
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShopInbound {
    pub id: i64,
    pub inbound_id: i64,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
