use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
    Extension, Json,
};
use serde::Deserialize;
use shopfront_order::{receipts::content_type, OrderError, ReceiptError};
use shopfront_shared::{OrderStatus, Receipt};

use crate::{error::AppError, middleware::CustomerId, orders::CustomerOrder, state::AppState};

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    pub file_id: String,
    pub ext: String,
}

/// POST /v1/shop/orders/{id}/receipt?file_id=..&ext=..
pub async fn upload_receipt(
    State(state): State<AppState>,
    Extension(CustomerId(customer_id)): Extension<CustomerId>,
    Path(order_id): Path<i64>,
    Query(query): Query<UploadQuery>,
    body: Bytes,
) -> Result<Json<CustomerOrder>, AppError> {
    // 1. Ownership and state, before anything touches the disk
    let order = state
        .orders
        .get_order_for_customer(customer_id, order_id)
        .await
        .map_err(AppError::Order)?;
    if order.status != OrderStatus::PendingReceipt {
        return Err(AppError::Order(OrderError::IllegalTransition {
            from: order.status,
            to: OrderStatus::PendingReview,
        }));
    }
    if query.file_id.trim().is_empty() {
        return Err(AppError::ValidationError("file_id is required".to_string()));
    }

    // 2. Persist the file
    let path = state
        .receipts
        .store(order_id, &query.ext, &body)
        .await
        .map_err(AppError::Receipt)?;

    // 3. Attach it, cleaning up if the order moved meanwhile
    let receipt = Receipt { path: path.clone(), file_id: query.file_id };
    match state.orders.submit_receipt(order_id, receipt).await {
        Ok(order) => Ok(Json(order.into())),
        Err(e) => {
            state.receipts.discard(&path).await;
            Err(AppError::Order(e))
        }
    }
}

/// GET /v1/admin/shop/receipts/{id}
pub async fn get_receipt(
    State(state): State<AppState>,
    Path(order_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let order = state.orders.get_order(order_id).await.map_err(AppError::Order)?;
    let receipt = order.receipt.ok_or(AppError::Receipt(ReceiptError::Missing))?;

    let bytes = state.receipts.read(&receipt.path).await.map_err(AppError::Receipt)?;
    Ok(([(header::CONTENT_TYPE, content_type(&receipt.path))], bytes))
}
