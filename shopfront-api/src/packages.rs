use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use shopfront_catalog::Quote;
use shopfront_shared::{Package, PackageDraft};

use crate::{error::AppError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct QuoteQuery {
    pub data_gb: i64,
    pub days: i64,
}

// ============================================================================
// Operator
// ============================================================================

/// GET /v1/admin/shop/packages
pub async fn list_packages(State(state): State<AppState>) -> Result<Json<Vec<Package>>, AppError> {
    let packages = state.packages.list_packages(false).await.map_err(AppError::Catalog)?;
    Ok(Json(packages))
}

/// POST /v1/admin/shop/packages
pub async fn create_package(
    State(state): State<AppState>,
    Json(draft): Json<PackageDraft>,
) -> Result<(StatusCode, Json<Package>), AppError> {
    let package = state.packages.create_package(&draft).await.map_err(AppError::Catalog)?;
    Ok((StatusCode::CREATED, Json(package)))
}

/// PUT /v1/admin/shop/packages/{id}
pub async fn update_package(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(draft): Json<PackageDraft>,
) -> Result<Json<Package>, AppError> {
    let package = state.packages.update_package(id, &draft).await.map_err(AppError::Catalog)?;
    Ok(Json(package))
}

/// DELETE /v1/admin/shop/packages/{id}
pub async fn delete_package(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state.packages.delete_package(id).await.map_err(AppError::Catalog)?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Storefront
// ============================================================================

/// GET /v1/shop/packages
pub async fn list_active_packages(State(state): State<AppState>) -> Result<Json<Vec<Package>>, AppError> {
    let packages = state.packages.list_packages(true).await.map_err(AppError::Catalog)?;
    Ok(Json(packages))
}

/// GET /v1/shop/quote?data_gb=..&days=..
pub async fn quote(
    State(state): State<AppState>,
    Query(query): Query<QuoteQuery>,
) -> Result<Json<Quote>, AppError> {
    let quote = state
        .pricing
        .quote(query.data_gb, query.days)
        .await
        .map_err(AppError::Catalog)?;
    Ok(Json(quote))
}
