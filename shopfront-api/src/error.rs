use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use shopfront_catalog::{CatalogError, LimitViolation};
use shopfront_order::{OrderError, ReceiptError};

#[derive(Debug)]
pub enum AppError {
    ValidationError(String),
    Order(OrderError),
    Catalog(CatalogError),
    Receipt(ReceiptError),
}

fn out_of_range(violation: &LimitViolation) -> (StatusCode, Value) {
    let mut body = json!({ "error": violation.to_string() });
    if let (Some(fields), Ok(Value::Object(details))) = (body.as_object_mut(), serde_json::to_value(violation)) {
        fields.extend(details);
    }
    (StatusCode::BAD_REQUEST, body)
}

fn internal(msg: impl std::fmt::Display) -> (StatusCode, Value) {
    tracing::error!("Internal Server Error: {}", msg);
    (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": "Internal Server Error" }))
}

fn plain(status: StatusCode, msg: impl std::fmt::Display) -> (StatusCode, Value) {
    (status, json!({ "error": msg.to_string() }))
}

impl AppError {
    fn status_and_body(self) -> (StatusCode, Value) {
        match self {
            AppError::ValidationError(msg) => plain(StatusCode::BAD_REQUEST, msg),
            AppError::Order(err) => match err {
                OrderError::NotFound(..) => plain(StatusCode::NOT_FOUND, err),
                OrderError::IllegalTransition { from, to } => (
                    StatusCode::CONFLICT,
                    json!({ "error": err.to_string(), "from": from, "to": to }),
                ),
                OrderError::OutOfRange(violation) => out_of_range(&violation),
                OrderError::Invalid(_) => plain(StatusCode::BAD_REQUEST, err),
                OrderError::ConfigUnavailable(_) => plain(StatusCode::SERVICE_UNAVAILABLE, err),
                OrderError::ProvisioningFailed(_) => plain(StatusCode::BAD_GATEWAY, err),
                OrderError::ProvisioningClaimed(_) | OrderError::NotClaimed(_) => {
                    plain(StatusCode::CONFLICT, err)
                }
                OrderError::PersistenceInconsistent { order_id, ref account } => {
                    tracing::error!("Order {} needs reconciliation: {}", order_id, err);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        json!({
                            "error": err.to_string(),
                            "reconcile_required": true,
                            "order_id": order_id,
                            "account": account,
                        }),
                    )
                }
                OrderError::Persistence(msg) => internal(msg),
            },
            AppError::Catalog(err) => match err {
                CatalogError::NotFound(..) => plain(StatusCode::NOT_FOUND, err),
                CatalogError::Invalid(_) => plain(StatusCode::BAD_REQUEST, err),
                CatalogError::OutOfRange(violation) => out_of_range(&violation),
                CatalogError::ConfigUnavailable(_) => plain(StatusCode::SERVICE_UNAVAILABLE, err),
                CatalogError::Source(_) => plain(StatusCode::BAD_GATEWAY, err),
                CatalogError::Persistence(msg) => internal(msg),
            },
            AppError::Receipt(err) => match err {
                ReceiptError::UnsupportedType(_) | ReceiptError::Empty => {
                    plain(StatusCode::BAD_REQUEST, err)
                }
                ReceiptError::TooLarge { .. } => plain(StatusCode::PAYLOAD_TOO_LARGE, err),
                ReceiptError::OutsideRoot => plain(StatusCode::FORBIDDEN, err),
                ReceiptError::Missing => plain(StatusCode::NOT_FOUND, err),
                ReceiptError::Io(e) => internal(e),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        (status, Json(body)).into_response()
    }
}
