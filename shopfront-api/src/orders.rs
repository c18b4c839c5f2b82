use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shopfront_order::OrderRequest;
use shopfront_shared::{Order, OrderStatus, Package, ProvisionedAccount};

use crate::{error::AppError, middleware::CustomerId, state::AppState};

#[derive(Debug, Serialize)]
pub struct OrderBoard {
    pub orders: Vec<Order>,
    pub packages: Vec<Package>,
}

/// An order as its customer sees it; storage paths and review internals stay server-side
#[derive(Debug, Serialize)]
pub struct CustomerOrder {
    pub id: i64,
    pub customer_id: i64,
    pub package_id: Option<i64>,
    pub data_gb: i64,
    pub days: i64,
    pub price: i64,
    pub status: OrderStatus,
    pub receipt_submitted: bool,
    pub account: Option<ProvisionedAccount>,
    pub review_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Order> for CustomerOrder {
    fn from(order: Order) -> Self {
        Self {
            id: order.id,
            customer_id: order.customer_id,
            package_id: order.package_id,
            data_gb: order.data_gb,
            days: order.days,
            price: order.price,
            status: order.status,
            receipt_submitted: order.receipt.is_some(),
            account: order.account,
            review_note: order.review_note,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RejectRequest {
    #[serde(default)]
    pub note: Option<String>,
}

// ============================================================================
// Storefront
// ============================================================================

/// POST /v1/shop/orders
pub async fn create_order(
    State(state): State<AppState>,
    Extension(CustomerId(customer_id)): Extension<CustomerId>,
    Json(request): Json<OrderRequest>,
) -> Result<(StatusCode, Json<CustomerOrder>), AppError> {
    let order = state
        .orders
        .create_order(customer_id, request)
        .await
        .map_err(AppError::Order)?;
    Ok((StatusCode::CREATED, Json(order.into())))
}

/// GET /v1/shop/orders
pub async fn list_my_orders(
    State(state): State<AppState>,
    Extension(CustomerId(customer_id)): Extension<CustomerId>,
) -> Result<Json<Vec<CustomerOrder>>, AppError> {
    let orders = state
        .orders
        .list_orders_for_customer(customer_id)
        .await
        .map_err(AppError::Order)?;
    Ok(Json(orders.into_iter().map(CustomerOrder::from).collect()))
}

/// GET /v1/shop/orders/{id}
pub async fn get_my_order(
    State(state): State<AppState>,
    Extension(CustomerId(customer_id)): Extension<CustomerId>,
    Path(order_id): Path<i64>,
) -> Result<Json<CustomerOrder>, AppError> {
    let order = state
        .orders
        .get_order_for_customer(customer_id, order_id)
        .await
        .map_err(AppError::Order)?;
    Ok(Json(order.into()))
}

// ============================================================================
// Operator
// ============================================================================

/// GET /v1/admin/shop/orders
pub async fn list_orders(State(state): State<AppState>) -> Result<Json<OrderBoard>, AppError> {
    let orders = state.orders.list_orders().await.map_err(AppError::Order)?;
    let packages = state.packages.list_packages(false).await.map_err(AppError::Catalog)?;
    Ok(Json(OrderBoard { orders, packages }))
}

/// POST /v1/admin/shop/orders/{id}/approve
pub async fn approve_order(
    State(state): State<AppState>,
    Path(order_id): Path<i64>,
) -> Result<Json<Order>, AppError> {
    let order = state.orders.approve(order_id).await.map_err(AppError::Order)?;
    Ok(Json(order))
}

/// POST /v1/admin/shop/orders/{id}/reject
pub async fn reject_order(
    State(state): State<AppState>,
    Path(order_id): Path<i64>,
    Json(req): Json<RejectRequest>,
) -> Result<Json<Order>, AppError> {
    let order = state
        .orders
        .reject(order_id, req.note)
        .await
        .map_err(AppError::Order)?;
    Ok(Json(order))
}

/// POST /v1/admin/shop/orders/{id}/reconcile
pub async fn reconcile_order(
    State(state): State<AppState>,
    Path(order_id): Path<i64>,
    Json(account): Json<ProvisionedAccount>,
) -> Result<Json<Order>, AppError> {
    let order = state
        .orders
        .reconcile_provisioned(order_id, account)
        .await
        .map_err(AppError::Order)?;
    Ok(Json(order))
}

/// POST /v1/admin/shop/orders/{id}/release-claim
pub async fn release_claim(
    State(state): State<AppState>,
    Path(order_id): Path<i64>,
) -> Result<Json<Order>, AppError> {
    let order = state
        .orders
        .release_provisioning_claim(order_id)
        .await
        .map_err(AppError::Order)?;
    Ok(Json(order))
}
