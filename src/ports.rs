//! Ports consumed by the services. The commerce platform and the payment
//! provider are reached exclusively through these traits; the HTTP
//! implementations live in `adapters`.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{
    Cart, CartUpdateAction, CaptureRequest, MerchantTransaction, Payment, PaymentDraft,
    PaymentUpdateAction, RefundRequest, RemotePaymentRequest, RemotePaymentResponse,
};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{resource} {id} not found")]
    NotFound { resource: &'static str, id: String },

    #[error("version conflict updating {resource} {id}")]
    Conflict { resource: &'static str, id: String },

    #[error("commerce platform returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("invalid response from commerce platform: {0}")]
    InvalidResponse(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("provider returned {status}: {title}")]
    Api {
        status: u16,
        title: String,
        violations: Vec<String>,
    },

    #[error("provider circuit breaker is open")]
    CircuitOpen,

    #[error("invalid response from provider: {0}")]
    InvalidResponse(String),
}

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Cart/payment/custom-object operations on the commerce platform. Every
/// update takes the version last observed by the caller; the platform rejects
/// stale versions with a conflict, which is propagated, never retried here.
#[async_trait]
pub trait CommerceStore: Send + Sync {
    async fn cart_by_id(&self, id: &str) -> StoreResult<Option<Cart>>;

    async fn update_cart(
        &self,
        id: &str,
        version: u64,
        actions: Vec<CartUpdateAction>,
    ) -> StoreResult<Cart>;

    /// Cart whose payment info references the given payment, if any.
    async fn cart_by_payment_id(&self, payment_id: &str) -> StoreResult<Option<Cart>>;

    async fn payment_by_id(&self, id: &str) -> StoreResult<Option<Payment>>;

    async fn create_payment(&self, draft: PaymentDraft) -> StoreResult<Payment>;

    async fn update_payment(
        &self,
        id: &str,
        version: u64,
        actions: Vec<PaymentUpdateAction>,
    ) -> StoreResult<Payment>;

    /// Payments holding a transaction with the given id (reverse lookup used
    /// by notification reconciliation).
    async fn payments_by_transaction_id(&self, transaction_id: &str) -> StoreResult<Vec<Payment>>;

    async fn custom_object(&self, container: &str, key: &str)
        -> StoreResult<Option<serde_json::Value>>;

    async fn upsert_custom_object(
        &self,
        container: &str,
        key: &str,
        value: serde_json::Value,
    ) -> StoreResult<()>;
}

/// Signed calls against the installment-payment provider.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn integration_check(&self) -> GatewayResult<()>;

    async fn create_payment(
        &self,
        request: &RemotePaymentRequest,
    ) -> GatewayResult<RemotePaymentResponse>;

    async fn authorize_payment(&self, technical_transaction_id: &str) -> GatewayResult<()>;

    async fn capture_payment(
        &self,
        technical_transaction_id: &str,
        request: &CaptureRequest,
    ) -> GatewayResult<()>;

    async fn payment_by_id(
        &self,
        technical_transaction_id: &str,
    ) -> GatewayResult<RemotePaymentResponse>;

    async fn refund_payment(
        &self,
        technical_transaction_id: &str,
        request: &RefundRequest,
    ) -> GatewayResult<()>;

    /// Full remote transaction including its booking ledger.
    async fn merchant_transaction(
        &self,
        transaction_id: &str,
    ) -> GatewayResult<MerchantTransaction>;
}
