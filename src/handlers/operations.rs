//! Operational endpoints for deploy checks and the shop widget.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use utoipa::ToSchema;

use crate::AppState;

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WidgetStatus {
    pub is_enabled: bool,
    pub web_shop_id: String,
}

#[derive(Serialize, ToSchema)]
pub struct HealthStatus {
    pub message: String,
}

/// Tells the shop frontend whether to render the installment widget.
#[utoipa::path(
    get,
    path = "/operations/widget-enabled",
    responses((status = 200, description = "Widget availability", body = WidgetStatus))
)]
pub async fn widget_enabled(State(state): State<AppState>) -> Json<WidgetStatus> {
    Json(WidgetStatus {
        is_enabled: state.widget_enabled,
        web_shop_id: state.web_shop_id.clone(),
    })
}

/// Verifies the provider credentials end to end. Degrades to 503 instead of
/// failing the deploy check hard.
#[utoipa::path(
    get,
    path = "/operations/health-check",
    responses(
        (status = 200, description = "Provider integration reachable", body = HealthStatus),
        (status = 503, description = "Provider integration unavailable", body = HealthStatus)
    )
)]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.gateway.integration_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthStatus {
                message: "provider integration is reachable".to_string(),
            }),
        ),
        Err(error) => {
            tracing::warn!(error = %error, "provider integration check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthStatus {
                    message: "provider integration is unavailable".to_string(),
                }),
            )
        }
    }
}
