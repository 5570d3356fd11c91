use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::ports::{GatewayError, StoreError};

/// A single business-rule violation. Validation errors are accumulated and
/// surfaced together, never fail-fast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl Violation {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation failed: {}", format_violations(.0))]
    Validation(Vec<Violation>),

    #[error("Upstream error ({status}): {message}")]
    Upstream {
        status: u16,
        code: String,
        message: String,
        fields: Vec<String>,
    },

    #[error("Version conflict: {0}")]
    Conflict(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

fn format_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| format!("{}: {}", v.code, v.message))
        .collect::<Vec<_>>()
        .join("; ")
}

impl AppError {
    /// Shorthand for a validation error carrying a single violation.
    pub fn validation(code: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Validation(vec![Violation::new(code, message)])
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub(crate) fn error_entries(&self) -> Vec<serde_json::Value> {
        match self {
            AppError::Validation(violations) => violations
                .iter()
                .map(|v| serde_json::to_value(v).unwrap_or_else(|_| json!({})))
                .collect(),
            AppError::Upstream {
                code,
                message,
                fields,
                ..
            } => vec![json!({
                "code": code,
                "message": message,
                "fields": fields,
            })],
            other => vec![json!({
                "code": error_code(other),
                "message": other.to_string(),
            })],
        }
    }
}

fn error_code(error: &AppError) -> &'static str {
    match error {
        AppError::NotFound(_) => "NotFound",
        AppError::Validation(_) => "ValidationFailed",
        AppError::Upstream { .. } => "UpstreamError",
        AppError::Conflict(_) => "Conflict",
        AppError::Config(_) => "ConfigurationError",
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({
            "statusCode": status.as_u16(),
            "message": self.to_string(),
            "errors": self.error_entries(),
        }));

        (status, body).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { resource, id } => {
                AppError::NotFound(format!("{} {} not found", resource, id))
            }
            StoreError::Conflict { resource, id } => {
                AppError::Conflict(format!("stale version updating {} {}", resource, id))
            }
            StoreError::Api { status, message } => AppError::Upstream {
                status,
                code: "CommercePlatformError".to_string(),
                message,
                fields: Vec::new(),
            },
            StoreError::Transport(e) => AppError::Upstream {
                status: 502,
                code: "CommercePlatformUnreachable".to_string(),
                message: e.to_string(),
                fields: Vec::new(),
            },
            StoreError::InvalidResponse(message) => AppError::Upstream {
                status: 502,
                code: "CommercePlatformInvalidResponse".to_string(),
                message,
                fields: Vec::new(),
            },
        }
    }
}

impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Api {
                status,
                title,
                violations,
            } => AppError::Upstream {
                status,
                code: title.clone(),
                message: title,
                fields: violations,
            },
            GatewayError::Transport(e) => AppError::Upstream {
                status: 502,
                code: "PaymentProviderUnreachable".to_string(),
                message: e.to_string(),
                fields: Vec::new(),
            },
            GatewayError::CircuitOpen => AppError::Upstream {
                status: 503,
                code: "PaymentProviderUnavailable".to_string(),
                message: "payment provider circuit breaker is open".to_string(),
                fields: Vec::new(),
            },
            GatewayError::InvalidResponse(message) => AppError::Upstream {
                status: 502,
                code: "PaymentProviderInvalidResponse".to_string(),
                message,
                fields: Vec::new(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_404() {
        let error = AppError::NotFound("cart abc".to_string());
        assert_eq!(error.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn validation_maps_to_400() {
        let error = AppError::validation("InvalidCurrency", "currency must be EUR");
        assert_eq!(error.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn conflict_maps_to_409() {
        let error = AppError::Conflict("stale version".to_string());
        assert_eq!(error.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn upstream_propagates_status() {
        let error = AppError::Upstream {
            status: 422,
            code: "INVALID_REQUEST".to_string(),
            message: "INVALID_REQUEST".to_string(),
            fields: vec!["orderValue".to_string()],
        };
        assert_eq!(error.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn upstream_with_bogus_status_falls_back_to_502() {
        let error = AppError::Upstream {
            status: 42,
            code: "X".to_string(),
            message: "X".to_string(),
            fields: Vec::new(),
        };
        assert_eq!(error.status_code(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn validation_envelope_lists_every_violation() {
        let error = AppError::Validation(vec![
            Violation::new("InvalidCurrency", "currency must be EUR"),
            Violation::new("InvalidAmount", "out of bounds").with_context("totalPrice"),
        ]);
        let entries = error.error_entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["code"], "InvalidCurrency");
        assert_eq!(entries[1]["context"], "totalPrice");
    }

    #[tokio::test]
    async fn validation_error_response_is_400_envelope() {
        let error = AppError::validation("InvalidCountry", "country must be DE");
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn store_conflict_converts_to_conflict() {
        let error: AppError = StoreError::Conflict {
            resource: "payment",
            id: "p1".to_string(),
        }
        .into();
        assert!(matches!(error, AppError::Conflict(_)));
    }

    #[test]
    fn gateway_api_error_keeps_title_and_violations() {
        let error: AppError = GatewayError::Api {
            status: 400,
            title: "INVALID_ORDER_VALUE".to_string(),
            violations: vec!["orderValue: must be positive".to_string()],
        }
        .into();
        match error {
            AppError::Upstream {
                status,
                code,
                fields,
                ..
            } => {
                assert_eq!(status, 400);
                assert_eq!(code, "INVALID_ORDER_VALUE");
                assert_eq!(fields.len(), 1);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
