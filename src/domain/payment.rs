//! Local payment entity and its embedded transaction ledger.

use serde::{Deserialize, Serialize};

use super::cart::{Cart, Money};

/// Payment method interface identifying this connector on local payments.
pub const PAYMENT_INTERFACE: &str = "easycredit";
/// Payment method name for installment payments.
pub const PAYMENT_METHOD: &str = "easycredit-installment";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionType {
    Authorization,
    CancelAuthorization,
    Charge,
    Refund,
    Chargeback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionState {
    Initial,
    Pending,
    Success,
    Failure,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub state: TransactionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interaction_id: Option<String>,
    pub amount: Money,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMethodInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_interface: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: String,
    pub version: u64,
    pub amount_planned: Money,
    #[serde(default)]
    pub payment_method_info: PaymentMethodInfo,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
}

impl Payment {
    /// The single Authorization transaction still awaiting provider
    /// confirmation, if any.
    pub fn pending_authorization(&self) -> Option<&Transaction> {
        self.transactions.iter().find(|t| {
            t.transaction_type == TransactionType::Authorization
                && t.state == TransactionState::Pending
        })
    }

    pub fn successful_authorization(&self) -> Option<&Transaction> {
        self.transactions.iter().find(|t| {
            t.transaction_type == TransactionType::Authorization
                && t.state == TransactionState::Success
        })
    }

    pub fn pending_refunds(&self) -> Vec<&Transaction> {
        self.transactions
            .iter()
            .filter(|t| {
                t.transaction_type == TransactionType::Refund
                    && t.state == TransactionState::Pending
            })
            .collect()
    }

    pub fn is_easycredit(&self) -> bool {
        self.payment_method_info.payment_interface.as_deref() == Some(PAYMENT_INTERFACE)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDraft {
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub state: TransactionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interaction_id: Option<String>,
    pub amount: Money,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDraft {
    pub amount_planned: Money,
    pub payment_method_info: PaymentMethodInfo,
}

impl PaymentDraft {
    /// Draft for a new payment attempt against `cart`, method info fixed to
    /// this connector.
    pub fn for_cart(cart: &Cart) -> Self {
        Self {
            amount_planned: cart.total_price.clone(),
            payment_method_info: PaymentMethodInfo {
                payment_interface: Some(PAYMENT_INTERFACE.to_string()),
                method: Some(PAYMENT_METHOD.to_string()),
            },
        }
    }
}

/// Update actions accepted by the payment endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action")]
pub enum PaymentUpdateAction {
    #[serde(rename = "addTransaction")]
    AddTransaction { transaction: TransactionDraft },
    #[serde(rename = "changeTransactionState")]
    ChangeTransactionState {
        #[serde(rename = "transactionId")]
        transaction_id: String,
        state: TransactionState,
    },
}

impl PaymentUpdateAction {
    pub fn add_transaction(
        transaction_type: TransactionType,
        state: TransactionState,
        interaction_id: Option<String>,
        amount: Money,
    ) -> Self {
        PaymentUpdateAction::AddTransaction {
            transaction: TransactionDraft {
                transaction_type,
                state,
                interaction_id,
                amount,
            },
        }
    }

    pub fn change_transaction_state(transaction_id: impl Into<String>, state: TransactionState) -> Self {
        PaymentUpdateAction::ChangeTransactionState {
            transaction_id: transaction_id.into(),
            state,
        }
    }
}
