//! Provider-side wire model (read-only to this system apart from the
//! payment-creation payload).

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::cart::Address;

/// Caller-supplied customer relationship block, forwarded verbatim to the
/// provider.
pub type CustomerRelationship = serde_json::Value;

/// Redirect targets supplied by the shop frontend. Denial and cancellation
/// are rewritten to this connector's own webhook before the payload goes out.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedirectLinks {
    pub url_success: String,
    pub url_cancellation: String,
    pub url_denial: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url_authorization_callback: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_name: String,
    pub quantity: i64,
    pub price: BigDecimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub article_number: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetails {
    pub order_value: BigDecimal,
    pub order_id: String,
    pub number_of_products_in_shopping_cart: usize,
    pub invoice_address: Address,
    pub shipping_address: Address,
    pub shopping_cart_information: Vec<OrderItem>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShopSystem {
    pub shop_system_manufacturer: String,
    pub shop_system_module_version: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerContact {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mobile_phone_number: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    pub contact: CustomerContact,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemotePaymentRequest {
    pub order_details: OrderDetails,
    pub shopsystem: ShopSystem,
    pub customer: Customer,
    pub customer_relationship: CustomerRelationship,
    pub redirect_links: RedirectLinks,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionOutcome {
    Positive,
    Negative,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    pub decision_outcome: DecisionOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision_outcome_text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemotePaymentResponse {
    pub technical_transaction_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    pub decision: Decision,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingType {
    Refund,
    Capture,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Pending,
    Done,
    Failed,
}

/// Ledger entry recording a financial event against a remote transaction.
/// `booking_id` correlates back to a local transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub booking_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booking_type: Option<String>,
    #[serde(rename = "type")]
    pub kind: BookingType,
    pub status: BookingStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<BigDecimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
}

impl Booking {
    pub fn is_refund(&self) -> bool {
        self.kind == BookingType::Refund
    }

    pub fn is_completed_refund(&self) -> bool {
        self.is_refund() && self.status == BookingStatus::Done
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MerchantTransaction {
    pub transaction_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default)]
    pub bookings: Vec<Booking>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundRequest {
    pub value: BigDecimal,
    pub booking_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decision_outcome_parses_screaming_case() {
        let decision: Decision = serde_json::from_str(
            r#"{"decisionOutcome": "NEGATIVE", "decisionOutcomeText": "declined"}"#,
        )
        .unwrap();
        assert_eq!(decision.decision_outcome, DecisionOutcome::Negative);
    }

    #[test]
    fn merchant_transaction_parses_booking_ledger() {
        let tx: MerchantTransaction = serde_json::from_str(
            r#"{
                "transactionId": "V123",
                "status": "SETTLED",
                "bookings": [
                    {"bookingId": "t1", "type": "REFUND", "status": "DONE", "amount": "25.00",
                     "created": "2024-03-01T09:30:00Z"},
                    {"bookingId": "b2", "type": "CAPTURE", "status": "DONE"},
                    {"bookingId": "t2", "type": "REFUND", "status": "PENDING"}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(tx.bookings.len(), 3);
        assert!(tx.bookings[0].is_completed_refund());
        assert!(!tx.bookings[1].is_refund());
        assert!(tx.bookings[2].is_refund());
        assert!(!tx.bookings[2].is_completed_refund());
    }

    #[test]
    fn unknown_booking_type_maps_to_other() {
        let booking: Booking = serde_json::from_str(
            r#"{"bookingId": "b9", "type": "INSTALLMENT_FEE", "status": "DONE"}"#,
        )
        .unwrap();
        assert_eq!(booking.kind, BookingType::Other);
    }
}
