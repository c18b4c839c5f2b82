use axum::{
    extract::DefaultBodyLimit,
    http::Method,
    routing::{get, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod error;
pub mod inbounds;
pub mod middleware;
pub mod orders;
pub mod packages;
pub mod receipts;
pub mod state;

pub use state::AppState;

pub fn app(state: AppState) -> Router {
    // CORS Middleware
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::USER_AGENT,
        ]);

    Router::new()
        .route("/health", get(health))
        .nest("/v1/admin/shop", admin_routes(state.clone()))
        .nest("/v1/shop", customer_routes(state.clone()))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn admin_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/packages", get(packages::list_packages).post(packages::create_package))
        .route("/packages/{id}", put(packages::update_package).delete(packages::delete_package))
        .route("/orders", get(orders::list_orders))
        .route("/orders/{id}/approve", post(orders::approve_order))
        .route("/orders/{id}/reject", post(orders::reject_order))
        .route("/orders/{id}/reconcile", post(orders::reconcile_order))
        .route("/orders/{id}/release-claim", post(orders::release_claim))
        .route("/receipts/{id}", get(receipts::get_receipt))
        .route("/inbounds", get(inbounds::list_inbounds))
        .route("/inbounds/{id}", post(inbounds::set_inbound_enabled))
        .route_layer(axum::middleware::from_fn_with_state(
            state,
            middleware::admin_auth_middleware,
        ))
}

fn customer_routes(state: AppState) -> Router<AppState> {
    // Receipts are raw file bodies, not JSON
    let upload_limit = DefaultBodyLimit::max(state.receipts.max_bytes());

    Router::new()
        .route("/packages", get(packages::list_active_packages))
        .route("/quote", get(packages::quote))
        .route("/orders", get(orders::list_my_orders).post(orders::create_order))
        .route("/orders/{id}", get(orders::get_my_order))
        .route(
            "/orders/{id}/receipt",
            post(receipts::upload_receipt).layer(upload_limit),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            state,
            middleware::customer_auth_middleware,
        ))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
