//! HTTP client for the easyCredit payment API.
//!
//! Requests are signed with Basic auth over `webShopId:apiPassword`. Non-2xx
//! responses carry a `{title, violations}` payload which is normalized into
//! [`GatewayError::Api`].

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use failsafe::futures::CircuitBreaker as FuturesCircuitBreaker;
use failsafe::{Config, Error as FailsafeError, StateMachine, backoff, failure_policy};
use reqwest::Client;
use reqwest::header::AUTHORIZATION;
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::domain::{
    CaptureRequest, MerchantTransaction, RefundRequest, RemotePaymentRequest,
    RemotePaymentResponse,
};
use crate::ports::{GatewayError, GatewayResult, PaymentGateway};

const PAYMENT_API: &str = "/api/payment/v3";
const MERCHANT_API: &str = "/api/merchant/v3";

/// HTTP client for the easyCredit payment and merchant APIs.
#[derive(Clone)]
pub struct EasyCreditClient {
    client: Client,
    base_url: String,
    auth_header: String,
    circuit_breaker: StateMachine<failure_policy::ConsecutiveFailures<backoff::EqualJittered>, ()>,
}

impl EasyCreditClient {
    pub fn new(base_url: String, web_shop_id: &str, api_password: &str) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        let backoff = backoff::equal_jittered(Duration::from_secs(60), Duration::from_secs(120));
        let policy = failure_policy::consecutive_failures(3, backoff);
        let circuit_breaker = Config::new().failure_policy(policy).build();

        EasyCreditClient {
            client,
            base_url,
            auth_header: basic_auth(web_shop_id, api_password),
            circuit_breaker,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn guard<T>(
        &self,
        call: impl Future<Output = Result<T, GatewayError>>,
    ) -> GatewayResult<T> {
        match self.circuit_breaker.call(call).await {
            Ok(value) => Ok(value),
            Err(FailsafeError::Rejected) => Err(GatewayError::CircuitOpen),
            Err(FailsafeError::Inner(e)) => Err(e),
        }
    }
}

fn basic_auth(web_shop_id: &str, api_password: &str) -> String {
    format!(
        "Basic {}",
        BASE64.encode(format!("{web_shop_id}:{api_password}"))
    )
}

async fn decode_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, GatewayError> {
    let status = response.status();
    if !status.is_success() {
        return Err(api_error(status.as_u16(), response).await);
    }
    response.json::<T>().await.map_err(GatewayError::from)
}

async fn expect_success(response: reqwest::Response) -> Result<(), GatewayError> {
    let status = response.status();
    if !status.is_success() {
        return Err(api_error(status.as_u16(), response).await);
    }
    Ok(())
}

/// Normalizes the provider's `{title, violations}` error payload. Violations
/// may be `{field, message}` objects or plain strings.
async fn api_error(status: u16, response: reqwest::Response) -> GatewayError {
    let body = response
        .json::<serde_json::Value>()
        .await
        .unwrap_or_else(|_| json!({}));

    let title = body["title"]
        .as_str()
        .unwrap_or("PaymentProviderError")
        .to_string();

    let violations = body["violations"]
        .as_array()
        .map(|entries| {
            entries
                .iter()
                .map(|entry| match (entry["field"].as_str(), entry["message"].as_str()) {
                    (Some(field), Some(message)) => format!("{field}: {message}"),
                    _ => entry.to_string(),
                })
                .collect()
        })
        .unwrap_or_default();

    GatewayError::Api {
        status,
        title,
        violations,
    }
}

#[async_trait]
impl PaymentGateway for EasyCreditClient {
    async fn integration_check(&self) -> GatewayResult<()> {
        let request = self
            .client
            .post(self.url(&format!("{PAYMENT_API}/webshop/integrationcheck")))
            .header(AUTHORIZATION, &self.auth_header)
            .json(&json!({ "message": "connector integration check" }));

        self.guard(async move {
            let response = request.send().await?;
            expect_success(response).await
        })
        .await
    }

    async fn create_payment(
        &self,
        payload: &RemotePaymentRequest,
    ) -> GatewayResult<RemotePaymentResponse> {
        let request = self
            .client
            .post(self.url(&format!("{PAYMENT_API}/transaction")))
            .header(AUTHORIZATION, &self.auth_header)
            .json(payload);

        self.guard(async move {
            let response = request.send().await?;
            decode_json(response).await
        })
        .await
    }

    async fn authorize_payment(&self, technical_transaction_id: &str) -> GatewayResult<()> {
        let request = self
            .client
            .post(self.url(&format!(
                "{PAYMENT_API}/transaction/{technical_transaction_id}/authorization"
            )))
            .header(AUTHORIZATION, &self.auth_header)
            .json(&json!({}));

        self.guard(async move {
            let response = request.send().await?;
            expect_success(response).await
        })
        .await
    }

    async fn capture_payment(
        &self,
        technical_transaction_id: &str,
        payload: &CaptureRequest,
    ) -> GatewayResult<()> {
        let request = self
            .client
            .post(self.url(&format!(
                "{MERCHANT_API}/transaction/{technical_transaction_id}/capture"
            )))
            .header(AUTHORIZATION, &self.auth_header)
            .json(payload);

        self.guard(async move {
            let response = request.send().await?;
            expect_success(response).await
        })
        .await
    }

    async fn payment_by_id(
        &self,
        technical_transaction_id: &str,
    ) -> GatewayResult<RemotePaymentResponse> {
        let request = self
            .client
            .get(self.url(&format!(
                "{PAYMENT_API}/transaction/{technical_transaction_id}"
            )))
            .header(AUTHORIZATION, &self.auth_header);

        self.guard(async move {
            let response = request.send().await?;
            decode_json(response).await
        })
        .await
    }

    async fn refund_payment(
        &self,
        technical_transaction_id: &str,
        payload: &RefundRequest,
    ) -> GatewayResult<()> {
        let request = self
            .client
            .post(self.url(&format!(
                "{MERCHANT_API}/transaction/{technical_transaction_id}/refund"
            )))
            .header(AUTHORIZATION, &self.auth_header)
            .json(payload);

        self.guard(async move {
            let response = request.send().await?;
            expect_success(response).await
        })
        .await
    }

    async fn merchant_transaction(
        &self,
        transaction_id: &str,
    ) -> GatewayResult<MerchantTransaction> {
        let request = self
            .client
            .get(self.url(&format!("{MERCHANT_API}/transaction/{transaction_id}")))
            .header(AUTHORIZATION, &self.auth_header);

        self.guard(async move {
            let response = request.send().await?;
            decode_json(response).await
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BookingStatus, DecisionOutcome};

    fn expected_auth() -> String {
        basic_auth("shop.1", "secret")
    }

    #[test]
    fn builds_basic_auth_header() {
        // base64("shop.1:secret")
        assert_eq!(expected_auth(), "Basic c2hvcC4xOnNlY3JldA==");
    }

    #[tokio::test]
    async fn merchant_transaction_parses_booking_ledger() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/merchant/v3/transaction/V-123")
            .match_header("authorization", expected_auth().as_str())
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "transactionId": "V-123",
                    "status": "SETTLED",
                    "bookings": [
                        {"bookingId": "t1", "type": "REFUND", "status": "DONE", "amount": "25.00"}
                    ]
                }"#,
            )
            .create_async()
            .await;

        let client = EasyCreditClient::new(server.url(), "shop.1", "secret");
        let tx = client.merchant_transaction("V-123").await.unwrap();

        assert_eq!(tx.transaction_id, "V-123");
        assert_eq!(tx.bookings.len(), 1);
        assert_eq!(tx.bookings[0].status, BookingStatus::Done);
    }

    #[tokio::test]
    async fn payment_by_id_parses_decision() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/payment/v3/transaction/TECH-1")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "technicalTransactionId": "TECH-1",
                    "decision": {"decisionOutcome": "POSITIVE"},
                    "redirectUrl": "https://provider.example/checkout"
                }"#,
            )
            .create_async()
            .await;

        let client = EasyCreditClient::new(server.url(), "shop.1", "secret");
        let payment = client.payment_by_id("TECH-1").await.unwrap();

        assert_eq!(payment.decision.decision_outcome, DecisionOutcome::Positive);
        assert_eq!(
            payment.redirect_url.as_deref(),
            Some("https://provider.example/checkout")
        );
    }

    #[tokio::test]
    async fn error_payload_normalizes_title_and_violations() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/payment/v3/transaction")
            .with_status(400)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "title": "INVALID_ORDER_VALUE",
                    "violations": [
                        {"field": "orderDetails.orderValue", "message": "must be positive"},
                        "unstructured violation"
                    ]
                }"#,
            )
            .create_async()
            .await;

        let client = EasyCreditClient::new(server.url(), "shop.1", "secret");
        let payload = sample_request();
        let error = client.create_payment(&payload).await.unwrap_err();

        match error {
            GatewayError::Api {
                status,
                title,
                violations,
            } => {
                assert_eq!(status, 400);
                assert_eq!(title, "INVALID_ORDER_VALUE");
                assert_eq!(violations[0], "orderDetails.orderValue: must be positive");
                assert_eq!(violations.len(), 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn authorize_accepts_empty_2xx_response() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/payment/v3/transaction/TECH-1/authorization")
            .with_status(202)
            .create_async()
            .await;

        let client = EasyCreditClient::new(server.url(), "shop.1", "secret");
        assert!(client.authorize_payment("TECH-1").await.is_ok());
    }

    #[tokio::test]
    async fn circuit_breaker_opens_after_consecutive_failures() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/payment/v3/webshop/integrationcheck")
            .with_status(500)
            .expect_at_least(3)
            .create_async()
            .await;

        let client = EasyCreditClient::new(server.url(), "shop.1", "secret");
        for _ in 0..3 {
            let _ = client.integration_check().await;
        }

        let result = client.integration_check().await;
        assert!(matches!(result, Err(GatewayError::CircuitOpen)));
    }

    fn sample_request() -> RemotePaymentRequest {
        use crate::domain::remote::{
            Customer, CustomerContact, OrderDetails, RedirectLinks, ShopSystem,
        };
        use bigdecimal::BigDecimal;

        RemotePaymentRequest {
            order_details: OrderDetails {
                order_value: BigDecimal::from(250),
                order_id: "cart-1".to_string(),
                number_of_products_in_shopping_cart: 1,
                invoice_address: Default::default(),
                shipping_address: Default::default(),
                shopping_cart_information: Vec::new(),
            },
            shopsystem: ShopSystem {
                shop_system_manufacturer: "commercetools".to_string(),
                shop_system_module_version: env!("CARGO_PKG_VERSION").to_string(),
            },
            customer: Customer {
                first_name: Some("Erika".to_string()),
                last_name: Some("Mustermann".to_string()),
                contact: CustomerContact {
                    email: None,
                    mobile_phone_number: None,
                },
            },
            customer_relationship: serde_json::json!({"customerStatus": "NEW_CUSTOMER"}),
            redirect_links: RedirectLinks {
                url_success: "https://shop.example/success".to_string(),
                url_cancellation: "https://shop.example/cancel".to_string(),
                url_denial: "https://shop.example/denied".to_string(),
                url_authorization_callback: None,
            },
        }
    }
}
