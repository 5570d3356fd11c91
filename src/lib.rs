pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod ports;
pub mod services;
pub mod validation;

use std::sync::Arc;

use axum::{
    Json, Router,
    http::Method,
    routing::{get, post},
};
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;

use crate::ports::PaymentGateway;
use crate::services::{NotificationService, PaymentService};

#[derive(Clone)]
pub struct AppState {
    pub payments: Arc<PaymentService>,
    pub notifications: Arc<NotificationService>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub web_shop_id: String,
    pub widget_enabled: bool,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::operations::widget_enabled,
        handlers::operations::health_check,
    ),
    components(schemas(
        handlers::operations::WidgetStatus,
        handlers::operations::HealthStatus,
    ))
)]
pub struct ApiDoc;

pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
        .allow_origin(Any);

    Router::new()
        .route("/payments/payment-method", get(handlers::payments::payment_method))
        .route("/payments", post(handlers::payments::create_payment))
        .route(
            "/payments/:payment_id/capture",
            post(handlers::payments::capture_payment),
        )
        .route(
            "/payments/:payment_id/refund",
            post(handlers::payments::refund_payment),
        )
        .route(
            "/payments/:payment_id/status",
            get(handlers::payments::payment_status),
        )
        .route(
            "/webhook/:payment_id/authorize",
            post(handlers::webhook::authorize),
        )
        .route(
            "/webhook/:payment_id/cancel",
            get(handlers::webhook::cancel).post(handlers::webhook::cancel),
        )
        .route(
            "/easycredit-notification",
            get(handlers::notification::transaction_notification),
        )
        .route(
            "/operations/widget-enabled",
            get(handlers::operations::widget_enabled),
        )
        .route(
            "/operations/health-check",
            get(handlers::operations::health_check),
        )
        .route(
            "/api-docs/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        )
        .layer(axum::middleware::from_fn(
            middleware::request_logger::request_logger_middleware,
        ))
        .layer(cors)
        .with_state(state)
}
