//! Browser-facing callback legs of the provider checkout. The provider sends
//! the customer here after the hosted installment flow; bookkeeping happens
//! first, then the customer is forwarded to the shop's original target.

use axum::{
    Json,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use serde_json::json;

use crate::AppState;
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedirectQuery {
    pub redirect_url: Option<String>,
}

/// Success leg: the customer completed the provider flow, confirm the
/// pending authorization. Redirects onward when the shop supplied a target.
pub async fn authorize(
    State(state): State<AppState>,
    Path(payment_id): Path<String>,
    Query(query): Query<RedirectQuery>,
) -> Result<Response, AppError> {
    state.payments.authorize_payment(&payment_id).await?;

    Ok(match query.redirect_url {
        Some(url) => Redirect::temporary(&url).into_response(),
        None => Json(json!({ "paymentId": payment_id })).into_response(),
    })
}

/// Cancellation and denial leg. The provider calls this with the customer's
/// browser, so the answer must be a redirect; a missing target is a
/// misconfigured checkout.
pub async fn cancel(
    State(state): State<AppState>,
    Path(payment_id): Path<String>,
    Query(query): Query<RedirectQuery>,
) -> Result<Response, AppError> {
    let redirect_url = query.redirect_url.ok_or_else(|| {
        AppError::validation("MissingRedirectUrl", "redirectUrl query parameter is required")
    })?;

    state.payments.cancel_payment(&payment_id).await?;

    Ok(Redirect::temporary(&redirect_url).into_response())
}
