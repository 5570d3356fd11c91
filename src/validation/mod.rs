//! Cart eligibility rules for installment payments. Rules accumulate into a
//! single list so the caller sees every violation at once.

use bigdecimal::BigDecimal;

use crate::domain::{Address, Cart};
use crate::error::Violation;

pub const REQUIRED_COUNTRY: &str = "DE";
pub const REQUIRED_CURRENCY: &str = "EUR";
/// Financing bounds in major currency units (EUR), inclusive.
pub const MIN_CART_AMOUNT: i64 = 200;
pub const MAX_CART_AMOUNT: i64 = 10_000;

pub const CODE_MISSING_ADDRESS: &str = "MissingAddress";
pub const CODE_ADDRESSES_MISMATCH: &str = "AddressesMismatch";
pub const CODE_INVALID_COUNTRY: &str = "InvalidCountry";
pub const CODE_INVALID_CURRENCY: &str = "InvalidCurrency";
pub const CODE_INVALID_AMOUNT: &str = "InvalidAmount";

/// Converts a cent amount into major currency units, exactly.
pub fn convert_cents_to_eur(cent_amount: i64, fraction_digits: u32) -> BigDecimal {
    BigDecimal::from(cent_amount) / BigDecimal::from(10i64.pow(fraction_digits))
}

/// Checks every eligibility rule and returns the accumulated violations.
/// An empty result means the cart may proceed to payment creation.
pub fn validate_cart(cart: &Cart) -> Vec<Violation> {
    let mut violations = Vec::new();

    check_address_presence(cart.billing_address.as_ref(), "billingAddress", &mut violations);
    check_address_presence(cart.shipping_address.as_ref(), "shippingAddress", &mut violations);

    if let (Some(billing), Some(shipping)) =
        (cart.billing_address.as_ref(), cart.shipping_address.as_ref())
    {
        if billing != shipping {
            violations.push(Violation::new(
                CODE_ADDRESSES_MISMATCH,
                "billing and shipping address must match field by field",
            ));
        }
    }

    check_country(cart.billing_address.as_ref(), "billingAddress", &mut violations);
    check_country(cart.shipping_address.as_ref(), "shippingAddress", &mut violations);

    if cart.total_price.currency_code != REQUIRED_CURRENCY {
        violations.push(
            Violation::new(
                CODE_INVALID_CURRENCY,
                format!("cart currency must be {}", REQUIRED_CURRENCY),
            )
            .with_context("totalPrice"),
        );
    }

    let amount = convert_cents_to_eur(
        cart.total_price.cent_amount,
        cart.total_price.fraction_digits,
    );
    if amount < BigDecimal::from(MIN_CART_AMOUNT) || amount > BigDecimal::from(MAX_CART_AMOUNT) {
        violations.push(
            Violation::new(
                CODE_INVALID_AMOUNT,
                format!(
                    "cart total must be between {} and {} EUR",
                    MIN_CART_AMOUNT, MAX_CART_AMOUNT
                ),
            )
            .with_context("totalPrice"),
        );
    }

    violations
}

fn check_address_presence(
    address: Option<&Address>,
    context: &'static str,
    violations: &mut Vec<Violation>,
) {
    if address.is_none() {
        violations.push(
            Violation::new(CODE_MISSING_ADDRESS, format!("{} is required", context))
                .with_context(context),
        );
    }
}

fn check_country(
    address: Option<&Address>,
    context: &'static str,
    violations: &mut Vec<Violation>,
) {
    if let Some(address) = address {
        if address.country != REQUIRED_COUNTRY {
            violations.push(
                Violation::new(
                    CODE_INVALID_COUNTRY,
                    format!("{} country must be {}", context, REQUIRED_COUNTRY),
                )
                .with_context(context),
            );
        }
    }
}
