//! Server-to-server notification endpoint the provider calls whenever a
//! transaction's booking ledger changes.

use axum::{
    extract::{Query, State},
    http::StatusCode,
};
use serde::Deserialize;

use crate::AppState;
use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct NotificationQuery {
    pub vorgangskennung: String,
}

pub async fn transaction_notification(
    State(state): State<AppState>,
    Query(query): Query<NotificationQuery>,
) -> Result<StatusCode, AppError> {
    state
        .notifications
        .handle_notification(&query.vorgangskennung)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
