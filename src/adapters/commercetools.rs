//! HTTP implementation of [`CommerceStore`] against the commerce platform's
//! REST resources (carts, payments, custom objects).
//!
//! All updates are optimistic-concurrency aware: the platform answers 409 on
//! a stale version, surfaced as [`StoreError::Conflict`] and never retried
//! here.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;

use crate::domain::{Cart, CartUpdateAction, Payment, PaymentDraft, PaymentUpdateAction};
use crate::ports::{CommerceStore, StoreError, StoreResult};

#[derive(Clone)]
pub struct CommerceToolsClient {
    client: Client,
    base_url: String,
    auth_header: String,
}

#[derive(Debug, Deserialize)]
struct PagedQueryResponse<T> {
    results: Vec<T>,
}

impl CommerceToolsClient {
    pub fn new(api_url: String, project_key: &str, auth_token: &str) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        CommerceToolsClient {
            client,
            base_url: format!("{}/{}", api_url.trim_end_matches('/'), project_key),
            auth_header: format!("Bearer {auth_token}"),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .get(self.url(path))
            .header(reqwest::header::AUTHORIZATION, &self.auth_header)
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .post(self.url(path))
            .header(reqwest::header::AUTHORIZATION, &self.auth_header)
    }

    async fn first_match<T: DeserializeOwned>(
        &self,
        path: &str,
        where_clause: String,
    ) -> StoreResult<Vec<T>> {
        let response = self
            .get(path)
            .query(&[("where", where_clause)])
            .send()
            .await?;
        let page: PagedQueryResponse<T> = decode("query", "results", response).await?;
        Ok(page.results)
    }
}

async fn decode<T: DeserializeOwned>(
    resource: &'static str,
    id: &str,
    response: reqwest::Response,
) -> StoreResult<T> {
    match check(resource, id, response).await? {
        Some(response) => response.json::<T>().await.map_err(StoreError::from),
        None => Err(StoreError::NotFound {
            resource,
            id: id.to_string(),
        }),
    }
}

async fn decode_optional<T: DeserializeOwned>(
    resource: &'static str,
    id: &str,
    response: reqwest::Response,
) -> StoreResult<Option<T>> {
    match check(resource, id, response).await? {
        Some(response) => Ok(Some(response.json::<T>().await?)),
        None => Ok(None),
    }
}

/// Maps platform error statuses; `Ok(None)` means 404.
async fn check(
    resource: &'static str,
    id: &str,
    response: reqwest::Response,
) -> StoreResult<Option<reqwest::Response>> {
    let status = response.status();
    if status.is_success() {
        return Ok(Some(response));
    }
    if status == StatusCode::NOT_FOUND {
        return Ok(None);
    }
    if status == StatusCode::CONFLICT {
        return Err(StoreError::Conflict {
            resource,
            id: id.to_string(),
        });
    }

    let message = response
        .json::<serde_json::Value>()
        .await
        .ok()
        .and_then(|body| body["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| format!("{} request failed", resource));

    Err(StoreError::Api {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl CommerceStore for CommerceToolsClient {
    async fn cart_by_id(&self, id: &str) -> StoreResult<Option<Cart>> {
        let response = self.get(&format!("/carts/{id}")).send().await?;
        decode_optional("cart", id, response).await
    }

    async fn update_cart(
        &self,
        id: &str,
        version: u64,
        actions: Vec<CartUpdateAction>,
    ) -> StoreResult<Cart> {
        let response = self
            .post(&format!("/carts/{id}"))
            .json(&json!({ "version": version, "actions": actions }))
            .send()
            .await?;
        decode("cart", id, response).await
    }

    async fn cart_by_payment_id(&self, payment_id: &str) -> StoreResult<Option<Cart>> {
        let clause = format!("paymentInfo(payments(id=\"{payment_id}\"))");
        let mut carts: Vec<Cart> = self.first_match("/carts", clause).await?;
        Ok(if carts.is_empty() {
            None
        } else {
            Some(carts.remove(0))
        })
    }

    async fn payment_by_id(&self, id: &str) -> StoreResult<Option<Payment>> {
        let response = self.get(&format!("/payments/{id}")).send().await?;
        decode_optional("payment", id, response).await
    }

    async fn create_payment(&self, draft: PaymentDraft) -> StoreResult<Payment> {
        let response = self.post("/payments").json(&draft).send().await?;
        decode("payment", "new", response).await
    }

    async fn update_payment(
        &self,
        id: &str,
        version: u64,
        actions: Vec<PaymentUpdateAction>,
    ) -> StoreResult<Payment> {
        let response = self
            .post(&format!("/payments/{id}"))
            .json(&json!({ "version": version, "actions": actions }))
            .send()
            .await?;
        decode("payment", id, response).await
    }

    async fn payments_by_transaction_id(&self, transaction_id: &str) -> StoreResult<Vec<Payment>> {
        let clause = format!("transactions(id=\"{transaction_id}\")");
        self.first_match("/payments", clause).await
    }

    async fn custom_object(
        &self,
        container: &str,
        key: &str,
    ) -> StoreResult<Option<serde_json::Value>> {
        let response = self
            .get(&format!("/custom-objects/{container}/{key}"))
            .send()
            .await?;

        #[derive(Deserialize)]
        struct CustomObject {
            value: serde_json::Value,
        }

        Ok(decode_optional::<CustomObject>("custom object", key, response)
            .await?
            .map(|object| object.value))
    }

    async fn upsert_custom_object(
        &self,
        container: &str,
        key: &str,
        value: serde_json::Value,
    ) -> StoreResult<()> {
        let response = self
            .post("/custom-objects")
            .json(&json!({ "container": container, "key": key, "value": value }))
            .send()
            .await?;
        check("custom object", key, response).await?.ok_or_else(|| StoreError::NotFound {
            resource: "custom object",
            id: key.to_string(),
        })?;
        Ok(())
    }
}
