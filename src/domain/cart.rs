//! Cart entities as exposed by the commerce platform.
//! Mutating operations carry the last observed version (optimistic concurrency).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Money {
    pub currency_code: String,
    pub cent_amount: i64,
    #[serde(default = "default_fraction_digits")]
    pub fraction_digits: u32,
}

fn default_fraction_digits() -> u32 {
    2
}

impl Money {
    pub fn eur(cent_amount: i64) -> Self {
        Self {
            currency_code: "EUR".to_string(),
            cent_amount,
            fraction_digits: 2,
        }
    }
}

/// Postal address. Equality is field-exact: any single differing field makes
/// two addresses unequal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub street_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub street_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    pub country: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub name: String,
    pub quantity: i64,
    pub unit_price: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CartState {
    Active,
    Frozen,
    Ordered,
    Merged,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub id: String,
    pub version: u64,
    pub total_price: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing_address: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping_address: Option<Address>,
    #[serde(default)]
    pub line_items: Vec<LineItem>,
    pub cart_state: CartState,
}

impl Cart {
    pub fn is_frozen(&self) -> bool {
        self.cart_state == CartState::Frozen
    }
}

/// Update actions accepted by the cart endpoint. Serialized with the
/// platform's `{"action": "..."}` tagging.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action")]
pub enum CartUpdateAction {
    #[serde(rename = "freezeCart")]
    FreezeCart,
    #[serde(rename = "unfreezeCart")]
    UnfreezeCart,
    #[serde(rename = "addPayment")]
    AddPayment { payment: PaymentReference },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentReference {
    #[serde(rename = "typeId")]
    pub type_id: &'static str,
    pub id: String,
}

impl CartUpdateAction {
    pub fn add_payment(payment_id: impl Into<String>) -> Self {
        CartUpdateAction::AddPayment {
            payment: PaymentReference {
                type_id: "payment",
                id: payment_id.into(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_equality_is_field_exact() {
        let base = Address {
            first_name: Some("Erika".to_string()),
            last_name: Some("Mustermann".to_string()),
            street_name: Some("Musterstr.".to_string()),
            street_number: Some("12".to_string()),
            postal_code: Some("10115".to_string()),
            city: Some("Berlin".to_string()),
            country: "DE".to_string(),
            phone: Some("+4930123456".to_string()),
            email: Some("erika@example.com".to_string()),
        };

        assert_eq!(base, base.clone());

        let mut differs = base.clone();
        differs.postal_code = Some("10117".to_string());
        assert_ne!(base, differs);

        let mut differs = base.clone();
        differs.phone = None;
        assert_ne!(base, differs);
    }

    #[test]
    fn cart_update_actions_serialize_with_action_tag() {
        let freeze = serde_json::to_value(CartUpdateAction::FreezeCart).unwrap();
        assert_eq!(freeze["action"], "freezeCart");

        let add = serde_json::to_value(CartUpdateAction::add_payment("pay-1")).unwrap();
        assert_eq!(add["action"], "addPayment");
        assert_eq!(add["payment"]["typeId"], "payment");
        assert_eq!(add["payment"]["id"], "pay-1");
    }

    #[test]
    fn cart_deserializes_from_platform_json() {
        let cart: Cart = serde_json::from_str(
            r#"{
                "id": "cart-1",
                "version": 3,
                "totalPrice": {"currencyCode": "EUR", "centAmount": 25000, "fractionDigits": 2},
                "lineItems": [
                    {"name": "Lamp", "quantity": 2, "unitPrice": {"currencyCode": "EUR", "centAmount": 12500}, "sku": "LMP-1"}
                ],
                "cartState": "Active"
            }"#,
        )
        .unwrap();

        assert_eq!(cart.version, 3);
        assert_eq!(cart.total_price.cent_amount, 25000);
        assert_eq!(cart.line_items[0].unit_price.fraction_digits, 2);
        assert!(cart.billing_address.is_none());
        assert!(!cart.is_frozen());
    }
}
