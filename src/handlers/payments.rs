//! Shop-facing payment endpoints.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;

use crate::AppState;
use crate::error::AppError;
use crate::services::payments::CreatePaymentRequest;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMethodQuery {
    pub cart_id: String,
}

/// Eligibility probe for the checkout's payment-method list. The shop widget
/// needs the web shop id in both the positive answer and in every violation,
/// so errors are enveloped here instead of going through the default
/// [`AppError`] response.
pub async fn payment_method(
    State(state): State<AppState>,
    Query(query): Query<PaymentMethodQuery>,
) -> Response {
    match state.payments.validate_cart_for_checkout(&query.cart_id).await {
        Ok(()) => Json(json!({ "webShopId": state.web_shop_id })).into_response(),
        Err(error) => payment_method_error(&state.web_shop_id, error),
    }
}

fn payment_method_error(web_shop_id: &str, error: AppError) -> Response {
    let status = error.status_code();
    let errors: Vec<serde_json::Value> = error
        .error_entries()
        .into_iter()
        .map(|mut entry| {
            if let Some(object) = entry.as_object_mut() {
                object.insert("webShopId".to_string(), json!(web_shop_id));
            }
            entry
        })
        .collect();

    (
        status,
        Json(json!({
            "statusCode": status.as_u16(),
            "message": error.to_string(),
            "errors": errors,
        })),
    )
        .into_response()
}

pub async fn create_payment(
    State(state): State<AppState>,
    Json(request): Json<CreatePaymentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = state.payments.create_payment(request).await?;
    Ok(Json(outcome))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureBody {
    pub order_id: Option<String>,
}

pub async fn capture_payment(
    State(state): State<AppState>,
    Path(payment_id): Path<String>,
    body: Option<Json<CaptureBody>>,
) -> Result<impl IntoResponse, AppError> {
    let order_id = body.and_then(|Json(body)| body.order_id);
    state.payments.capture_payment(&payment_id, order_id).await?;
    Ok(Json(json!({ "paymentId": payment_id })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundBody {
    pub cent_amount: i64,
}

pub async fn refund_payment(
    State(state): State<AppState>,
    Path(payment_id): Path<String>,
    Json(body): Json<RefundBody>,
) -> Result<impl IntoResponse, AppError> {
    if body.cent_amount <= 0 {
        return Err(AppError::validation(
            "InvalidAmount",
            "refund amount must be positive",
        ));
    }
    let transaction_id = state
        .payments
        .refund_payment(&payment_id, body.cent_amount)
        .await?;
    Ok(Json(json!({
        "paymentId": payment_id,
        "transactionId": transaction_id,
    })))
}

pub async fn payment_status(
    State(state): State<AppState>,
    Path(payment_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let view = state.payments.payment_status(&payment_id).await?;
    Ok((StatusCode::OK, Json(view)))
}
