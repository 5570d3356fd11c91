//! Payment lifecycle orchestration: cart validation, cart freeze, local and
//! remote payment creation, authorization, cancellation, capture and refund
//! initiation.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::domain::payment::PAYMENT_INTERFACE;
use crate::domain::remote::{Customer, CustomerContact, OrderDetails, OrderItem, ShopSystem};
use crate::domain::{
    Cart, CartUpdateAction, CaptureRequest, CustomerRelationship, DecisionOutcome, Money, Payment,
    PaymentDraft, PaymentUpdateAction, RedirectLinks, RefundRequest, RemotePaymentRequest,
    RemotePaymentResponse, TransactionState, TransactionType,
};
use crate::error::AppError;
use crate::ports::{CommerceStore, PaymentGateway};
use crate::validation::{convert_cents_to_eur, validate_cart};

/// Custom-object coordinates of the connector configuration written at
/// deploy time.
pub const CONFIG_CONTAINER: &str = "easycredit-connector";
pub const CONFIG_KEY: &str = "connector-url";

const SHOP_SYSTEM_MANUFACTURER: &str = "commercetools";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentRequest {
    pub cart_id: String,
    pub redirect_links: RedirectLinks,
    #[serde(default)]
    pub customer_relationship: CustomerRelationship,
}

/// Provider create-payment response, enriched with the local payment id.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentOutcome {
    pub payment_id: String,
    #[serde(flatten)]
    pub response: RemotePaymentResponse,
}

pub struct PaymentService {
    store: Arc<dyn CommerceStore>,
    gateway: Arc<dyn PaymentGateway>,
}

impl PaymentService {
    pub fn new(store: Arc<dyn CommerceStore>, gateway: Arc<dyn PaymentGateway>) -> Self {
        Self { store, gateway }
    }

    /// Runs the eligibility rules for the payment-method discovery endpoint.
    /// No mutation happens here.
    pub async fn validate_cart_for_checkout(&self, cart_id: &str) -> Result<(), AppError> {
        let cart = self.cart(cart_id).await?;
        let violations = validate_cart(&cart);
        if violations.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(violations))
        }
    }

    /// Drives a full payment attempt: validate, freeze, create locally,
    /// create remotely, record the resulting transaction. Any error after
    /// the freeze triggers a best-effort unfreeze before propagating.
    pub async fn create_payment(
        &self,
        request: CreatePaymentRequest,
    ) -> Result<CreatePaymentOutcome, AppError> {
        let cart = self.cart(&request.cart_id).await?;

        let violations = validate_cart(&cart);
        if !violations.is_empty() {
            return Err(AppError::Validation(violations));
        }

        let cart = if cart.is_frozen() {
            cart
        } else {
            self.store
                .update_cart(&cart.id, cart.version, vec![CartUpdateAction::FreezeCart])
                .await?
        };

        match self.create_after_freeze(cart.clone(), &request).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                self.release_cart(&cart.id).await;
                Err(err)
            }
        }
    }

    async fn create_after_freeze(
        &self,
        cart: Cart,
        request: &CreatePaymentRequest,
    ) -> Result<CreatePaymentOutcome, AppError> {
        let payment = self.store.create_payment(PaymentDraft::for_cart(&cart)).await?;
        let cart = self
            .store
            .update_cart(
                &cart.id,
                cart.version,
                vec![CartUpdateAction::add_payment(payment.id.clone())],
            )
            .await?;

        let connector_base = self.connector_base_url().await?;
        let payload = build_remote_payment(&cart, &payment.id, request, &connector_base)?;

        let response = self.gateway.create_payment(&payload).await?;

        match response.decision.decision_outcome {
            DecisionOutcome::Positive => {
                self.store
                    .update_payment(
                        &payment.id,
                        payment.version,
                        vec![PaymentUpdateAction::add_transaction(
                            TransactionType::Authorization,
                            TransactionState::Pending,
                            Some(response.technical_transaction_id.clone()),
                            payment.amount_planned.clone(),
                        )],
                    )
                    .await?;
                tracing::info!(
                    payment_id = %payment.id,
                    technical_transaction_id = %response.technical_transaction_id,
                    "remote payment created, authorization pending"
                );
            }
            DecisionOutcome::Negative => {
                self.store
                    .update_payment(
                        &payment.id,
                        payment.version,
                        vec![PaymentUpdateAction::add_transaction(
                            TransactionType::Authorization,
                            TransactionState::Failure,
                            Some(response.technical_transaction_id.clone()),
                            payment.amount_planned.clone(),
                        )],
                    )
                    .await?;
                // A declined decision must not leave the cart frozen.
                self.store
                    .update_cart(&cart.id, cart.version, vec![CartUpdateAction::UnfreezeCart])
                    .await?;
                tracing::info!(
                    payment_id = %payment.id,
                    outcome_text = ?response.decision.decision_outcome_text,
                    "remote payment declined, cart released"
                );
            }
        }

        Ok(CreatePaymentOutcome {
            payment_id: payment.id,
            response,
        })
    }

    /// Transitions the pending authorization to Success after the provider
    /// confirmed the customer completed the installment flow.
    pub async fn authorize_payment(&self, payment_id: &str) -> Result<(), AppError> {
        let payment = self.payment(payment_id).await?;

        if !payment.is_easycredit() {
            return Err(AppError::validation(
                "InvalidPaymentMethod",
                format!("payment {payment_id} does not belong to interface {PAYMENT_INTERFACE}"),
            ));
        }

        let transaction = payment
            .pending_authorization()
            .ok_or_else(|| invalid_transaction(payment_id, "no pending authorization"))?;
        let interaction_id = transaction
            .interaction_id
            .clone()
            .ok_or_else(|| invalid_transaction(payment_id, "authorization has no interaction id"))?;

        self.gateway.authorize_payment(&interaction_id).await?;

        self.store
            .update_payment(
                &payment.id,
                payment.version,
                vec![PaymentUpdateAction::change_transaction_state(
                    transaction.id.clone(),
                    TransactionState::Success,
                )],
            )
            .await?;

        tracing::info!(payment_id, interaction_id, "authorization confirmed");
        Ok(())
    }

    /// Cancellation/denial bookkeeping: fail the outstanding authorization
    /// and release the cart freeze. Returns the payment id so the route can
    /// redirect onward.
    pub async fn cancel_payment(&self, payment_id: &str) -> Result<String, AppError> {
        let payment = self.payment(payment_id).await?;

        // Re-delivered cancel callbacks find no pending authorization; the
        // cart release below still runs.
        if let Some(transaction) = payment.pending_authorization() {
            self.store
                .update_payment(
                    &payment.id,
                    payment.version,
                    vec![PaymentUpdateAction::change_transaction_state(
                        transaction.id.clone(),
                        TransactionState::Failure,
                    )],
                )
                .await?;
        }

        let cart = self
            .store
            .cart_by_payment_id(payment_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("cart for payment {payment_id} not found")))?;

        if cart.is_frozen() {
            self.store
                .update_cart(&cart.id, cart.version, vec![CartUpdateAction::UnfreezeCart])
                .await?;
        }

        tracing::info!(payment_id, cart_id = %cart.id, "payment cancelled, cart released");
        Ok(payment.id)
    }

    /// Captures an authorized payment on delivery and records a Charge
    /// transaction.
    pub async fn capture_payment(
        &self,
        payment_id: &str,
        order_id: Option<String>,
    ) -> Result<(), AppError> {
        let payment = self.payment(payment_id).await?;

        let authorization = payment
            .successful_authorization()
            .ok_or_else(|| invalid_transaction(payment_id, "no confirmed authorization"))?;
        let interaction_id = authorization
            .interaction_id
            .clone()
            .ok_or_else(|| invalid_transaction(payment_id, "authorization has no interaction id"))?;

        self.gateway
            .capture_payment(&interaction_id, &CaptureRequest { order_id })
            .await?;

        self.store
            .update_payment(
                &payment.id,
                payment.version,
                vec![PaymentUpdateAction::add_transaction(
                    TransactionType::Charge,
                    TransactionState::Success,
                    Some(interaction_id.clone()),
                    payment.amount_planned.clone(),
                )],
            )
            .await?;

        tracing::info!(payment_id, interaction_id, "payment captured");
        Ok(())
    }

    /// Initiates a refund: records a Pending Refund transaction and books it
    /// with the provider under the transaction's id, which is the correlation
    /// key the notification reconciliation later resolves.
    pub async fn refund_payment(
        &self,
        payment_id: &str,
        cent_amount: i64,
    ) -> Result<String, AppError> {
        let payment = self.payment(payment_id).await?;

        let authorization = payment
            .successful_authorization()
            .ok_or_else(|| invalid_transaction(payment_id, "no confirmed authorization"))?;
        let interaction_id = authorization
            .interaction_id
            .clone()
            .ok_or_else(|| invalid_transaction(payment_id, "authorization has no interaction id"))?;

        let amount = Money {
            currency_code: payment.amount_planned.currency_code.clone(),
            cent_amount,
            fraction_digits: payment.amount_planned.fraction_digits,
        };
        let known_ids: Vec<String> = payment.transactions.iter().map(|t| t.id.clone()).collect();

        let updated = self
            .store
            .update_payment(
                &payment.id,
                payment.version,
                vec![PaymentUpdateAction::add_transaction(
                    TransactionType::Refund,
                    TransactionState::Pending,
                    None,
                    amount.clone(),
                )],
            )
            .await?;

        let transaction_id = updated
            .transactions
            .iter()
            .filter(|t| t.transaction_type == TransactionType::Refund)
            .find(|t| !known_ids.contains(&t.id))
            .map(|t| t.id.clone())
            .ok_or_else(|| AppError::Upstream {
                status: 502,
                code: "CommercePlatformInvalidResponse".to_string(),
                message: "refund transaction was not persisted".to_string(),
                fields: Vec::new(),
            })?;

        let booking = RefundRequest {
            value: convert_cents_to_eur(amount.cent_amount, amount.fraction_digits),
            booking_id: transaction_id.clone(),
        };

        if let Err(err) = self.gateway.refund_payment(&interaction_id, &booking).await {
            if let Err(update_err) = self
                .store
                .update_payment(
                    &updated.id,
                    updated.version,
                    vec![PaymentUpdateAction::change_transaction_state(
                        transaction_id.clone(),
                        TransactionState::Failure,
                    )],
                )
                .await
            {
                tracing::error!(
                    payment_id,
                    transaction_id,
                    error = %update_err,
                    "failed to mark refund transaction as failed"
                );
            }
            return Err(err.into());
        }

        tracing::info!(payment_id, transaction_id, "refund booked with provider");
        Ok(transaction_id)
    }

    /// Current provider-side view of the payment's transaction.
    pub async fn payment_status(
        &self,
        payment_id: &str,
    ) -> Result<RemotePaymentResponse, AppError> {
        let payment = self.payment(payment_id).await?;

        let interaction_id = payment
            .transactions
            .iter()
            .find(|t| {
                t.transaction_type == TransactionType::Authorization && t.interaction_id.is_some()
            })
            .and_then(|t| t.interaction_id.clone())
            .ok_or_else(|| invalid_transaction(payment_id, "no authorization with interaction id"))?;

        Ok(self.gateway.payment_by_id(&interaction_id).await?)
    }

    async fn cart(&self, cart_id: &str) -> Result<Cart, AppError> {
        self.store
            .cart_by_id(cart_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("cart {cart_id} not found")))
    }

    async fn payment(&self, payment_id: &str) -> Result<Payment, AppError> {
        self.store
            .payment_by_id(payment_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("payment {payment_id} not found")))
    }

    async fn connector_base_url(&self) -> Result<String, AppError> {
        let value = self
            .store
            .custom_object(CONFIG_CONTAINER, CONFIG_KEY)
            .await?
            .ok_or_else(|| {
                AppError::Config("connector callback URL is not configured".to_string())
            })?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| AppError::Config("connector callback URL must be a string".to_string()))
    }

    /// Best-effort compensating unfreeze. Its own failure is logged and never
    /// masks the error that triggered it.
    async fn release_cart(&self, cart_id: &str) {
        let result: Result<(), AppError> = async {
            let cart = self.cart(cart_id).await?;
            if cart.is_frozen() {
                self.store
                    .update_cart(&cart.id, cart.version, vec![CartUpdateAction::UnfreezeCart])
                    .await?;
            }
            Ok(())
        }
        .await;

        if let Err(err) = result {
            tracing::error!(cart_id, error = %err, "failed to release cart after payment error");
        }
    }
}

fn invalid_transaction(payment_id: &str, reason: &str) -> AppError {
    AppError::validation(
        "InvalidPaymentTransaction",
        format!("payment {payment_id}: {reason}"),
    )
}

/// Assembles the provider payload. Denial and cancellation URLs are rewritten
/// to this connector's cancel webhook (which performs the bookkeeping and then
/// redirects to the original target); the authorization callback always points
/// at this connector.
fn build_remote_payment(
    cart: &Cart,
    payment_id: &str,
    request: &CreatePaymentRequest,
    connector_base: &str,
) -> Result<RemotePaymentRequest, AppError> {
    let billing = cart.billing_address.clone().unwrap_or_default();
    let shipping = cart.shipping_address.clone().unwrap_or_default();

    let items = cart
        .line_items
        .iter()
        .map(|item| OrderItem {
            product_name: item.name.clone(),
            quantity: item.quantity,
            price: convert_cents_to_eur(
                item.unit_price.cent_amount,
                item.unit_price.fraction_digits,
            ),
            article_number: item.sku.clone(),
        })
        .collect();

    let redirect_links = RedirectLinks {
        url_success: request.redirect_links.url_success.clone(),
        url_cancellation: webhook_url(
            connector_base,
            payment_id,
            "cancel",
            &request.redirect_links.url_cancellation,
        )?,
        url_denial: webhook_url(
            connector_base,
            payment_id,
            "cancel",
            &request.redirect_links.url_denial,
        )?,
        url_authorization_callback: Some(webhook_url(
            connector_base,
            payment_id,
            "authorize",
            &request.redirect_links.url_success,
        )?),
    };

    Ok(RemotePaymentRequest {
        order_details: OrderDetails {
            order_value: convert_cents_to_eur(
                cart.total_price.cent_amount,
                cart.total_price.fraction_digits,
            ),
            order_id: cart.id.clone(),
            number_of_products_in_shopping_cart: cart.line_items.len(),
            invoice_address: billing.clone(),
            shipping_address: shipping,
            shopping_cart_information: items,
        },
        shopsystem: ShopSystem {
            shop_system_manufacturer: SHOP_SYSTEM_MANUFACTURER.to_string(),
            shop_system_module_version: env!("CARGO_PKG_VERSION").to_string(),
        },
        customer: Customer {
            first_name: billing.first_name.clone(),
            last_name: billing.last_name.clone(),
            contact: CustomerContact {
                email: billing.email.clone(),
                mobile_phone_number: billing.phone.clone(),
            },
        },
        customer_relationship: request.customer_relationship.clone(),
        redirect_links,
    })
}

fn webhook_url(
    connector_base: &str,
    payment_id: &str,
    leg: &str,
    redirect: &str,
) -> Result<String, AppError> {
    let raw = format!(
        "{}/webhook/{}/{}",
        connector_base.trim_end_matches('/'),
        payment_id,
        leg
    );
    let url = Url::parse_with_params(&raw, &[("redirectUrl", redirect)])
        .map_err(|e| AppError::Config(format!("invalid connector base URL: {e}")))?;
    Ok(url.to_string())
}
