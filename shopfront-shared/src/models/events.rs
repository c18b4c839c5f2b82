use crate::pii::Masked;

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct OrderFulfilledEvent {
    pub order_id: i64,
    pub customer_id: i64,
    pub email: Masked<String>,
    pub sub_id: String,
    pub data_gb: i64,
    pub days: i64,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct OrderRejectedEvent {
    pub order_id: i64,
    pub customer_id: i64,
    pub note: Option<String>,
    pub timestamp: i64,
}
