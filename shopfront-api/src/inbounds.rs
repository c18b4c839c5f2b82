use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use shopfront_catalog::InboundListing;
use shopfront_shared::ShopInbound;

use crate::{error::AppError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct SetInboundRequest {
    pub enabled: bool,
}

/// GET /v1/admin/shop/inbounds
pub async fn list_inbounds(State(state): State<AppState>) -> Result<Json<InboundListing>, AppError> {
    let listing = state.inbounds.listing().await.map_err(AppError::Catalog)?;
    Ok(Json(listing))
}

/// POST /v1/admin/shop/inbounds/{id}
pub async fn set_inbound_enabled(
    State(state): State<AppState>,
    Path(inbound_id): Path<i64>,
    Json(req): Json<SetInboundRequest>,
) -> Result<Json<ShopInbound>, AppError> {
    let row = state
        .inbounds
        .set_inbound_enabled(inbound_id, req.enabled)
        .await
        .map_err(AppError::Catalog)?;
    Ok(Json(row))
}
