//! Reconciliation of provider booking ledgers with local refund
//! transactions. Triggered by the provider's transaction notification, keyed
//! by the provider transaction id (`vorgangskennung`).

use std::sync::Arc;

use crate::domain::{Booking, BookingStatus, PaymentUpdateAction, Transaction, TransactionState};
use crate::error::AppError;
use crate::ports::{CommerceStore, PaymentGateway};

pub struct NotificationService {
    store: Arc<dyn CommerceStore>,
    gateway: Arc<dyn PaymentGateway>,
}

impl NotificationService {
    pub fn new(store: Arc<dyn CommerceStore>, gateway: Arc<dyn PaymentGateway>) -> Self {
        Self { store, gateway }
    }

    /// Pulls the booking ledger for the notified provider transaction,
    /// resolves the single local payment it belongs to and settles every
    /// pending refund transaction the ledger has an answer for. All
    /// transitions land in one payment update. Re-delivered notifications
    /// find nothing pending and change nothing.
    ///
    /// A ledger without a completed (DONE) refund booking is answered with
    /// 404 so the provider keeps retrying until the refund settles.
    pub async fn handle_notification(&self, vorgangskennung: &str) -> Result<(), AppError> {
        let ledger = self.gateway.merchant_transaction(vorgangskennung).await?;

        let refunds: Vec<&Booking> = ledger.bookings.iter().filter(|b| b.is_refund()).collect();
        let completed = match refunds.iter().find(|b| b.is_completed_refund()) {
            Some(booking) => booking,
            None => {
                return Err(AppError::NotFound(format!(
                    "no completed refund booking on provider transaction {vorgangskennung}"
                )));
            }
        };

        let payment = self
            .payment_for_booking(vorgangskennung, &completed.booking_id)
            .await?;

        let pending = payment.pending_refunds();
        let actions = plan_refund_transitions(&pending, &refunds);
        if actions.is_empty() {
            tracing::info!(
                vorgangskennung,
                payment_id = %payment.id,
                "notification carried no new refund outcomes"
            );
            return Ok(());
        }

        let transitions = actions.len();
        self.store
            .update_payment(&payment.id, payment.version, actions)
            .await
            .map_err(|err| {
                tracing::error!(
                    vorgangskennung,
                    payment_id = %payment.id,
                    error = %err,
                    "failed to persist refund transitions"
                );
                err
            })?;

        tracing::info!(
            vorgangskennung,
            payment_id = %payment.id,
            transitions,
            "refund transactions reconciled"
        );
        Ok(())
    }

    /// The completed refund booking must resolve to exactly one local
    /// payment; anything else is a correlation fault.
    async fn payment_for_booking(
        &self,
        vorgangskennung: &str,
        booking_id: &str,
    ) -> Result<crate::domain::Payment, AppError> {
        let mut matches = self
            .store
            .payments_by_transaction_id(booking_id)
            .await?
            .into_iter();
        match (matches.next(), matches.next()) {
            (Some(payment), None) => Ok(payment),
            (None, _) => {
                tracing::warn!(vorgangskennung, "no local payment matches the refund bookings");
                Err(AppError::NotFound(format!(
                    "no payment found for provider transaction {vorgangskennung}"
                )))
            }
            (Some(_), Some(_)) => {
                tracing::warn!(
                    vorgangskennung,
                    "refund bookings resolve to multiple payments"
                );
                Err(AppError::NotFound(format!(
                    "ambiguous payment match for provider transaction {vorgangskennung}"
                )))
            }
        }
    }
}

/// Maps settled refund bookings onto the pending local transactions that
/// initiated them. DONE confirms, FAILED fails, a still-pending booking is
/// left for a later notification.
pub fn plan_refund_transitions(
    pending: &[&Transaction],
    refunds: &[&Booking],
) -> Vec<PaymentUpdateAction> {
    pending
        .iter()
        .filter_map(|transaction| {
            let booking = refunds.iter().find(|b| b.booking_id == transaction.id)?;
            let state = match booking.status {
                BookingStatus::Done => TransactionState::Success,
                BookingStatus::Failed => TransactionState::Failure,
                BookingStatus::Pending => return None,
            };
            Some(PaymentUpdateAction::change_transaction_state(
                transaction.id.clone(),
                state,
            ))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MerchantTransaction, TransactionType};
    use crate::services::testing::*;
    use std::sync::{Arc, Mutex};

    fn ledger(bookings: Vec<Booking>) -> MerchantTransaction {
        MerchantTransaction {
            transaction_id: "V-1".to_string(),
            status: Some("SETTLED".to_string()),
            bookings,
        }
    }

    fn service(store: MockStore, gateway: MockGateway) -> NotificationService {
        NotificationService::new(Arc::new(store), Arc::new(gateway))
    }

    fn pending_refund(id: &str) -> crate::domain::Transaction {
        transaction(id, TransactionType::Refund, TransactionState::Pending, None)
    }

    #[tokio::test]
    async fn settles_all_pending_refunds_in_one_update() {
        let log: SharedLog = Arc::new(Mutex::new(Vec::new()));
        let payment = payment_with_transactions(
            "pay-1",
            vec![pending_refund("r1"), pending_refund("r2"), pending_refund("r3")],
        );
        let store = MockStore::new(log.clone()).with_payment(payment);
        let gateway = MockGateway::new(log.clone()).with_merchant_transaction(ledger(vec![
            refund_booking("r1", BookingStatus::Done),
            refund_booking("r2", BookingStatus::Failed),
            refund_booking("r3", BookingStatus::Done),
        ]));
        let service = service(store, gateway);

        service.handle_notification("V-1").await.unwrap();

        let payment = service.store.payment_by_id("pay-1").await.unwrap().unwrap();
        let state_of = |id: &str| {
            payment
                .transactions
                .iter()
                .find(|t| t.id == id)
                .unwrap()
                .state
        };
        assert_eq!(state_of("r1"), TransactionState::Success);
        assert_eq!(state_of("r2"), TransactionState::Failure);
        assert_eq!(state_of("r3"), TransactionState::Success);

        let updates = log
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.starts_with("store.update_payment"))
            .count();
        assert_eq!(updates, 1);
    }

    #[tokio::test]
    async fn redelivered_notification_changes_nothing() {
        let log: SharedLog = Arc::new(Mutex::new(Vec::new()));
        let payment = payment_with_transactions(
            "pay-1",
            vec![transaction(
                "r1",
                TransactionType::Refund,
                TransactionState::Success,
                None,
            )],
        );
        let store = MockStore::new(log.clone()).with_payment(payment);
        let gateway = MockGateway::new(log.clone()).with_merchant_transaction(ledger(vec![
            refund_booking("r1", BookingStatus::Done),
        ]));
        let service = service(store, gateway);

        service.handle_notification("V-1").await.unwrap();

        assert!(log
            .lock()
            .unwrap()
            .iter()
            .all(|e| !e.starts_with("store.update_payment")));
    }

    #[tokio::test]
    async fn still_pending_booking_is_left_alone() {
        let log: SharedLog = Arc::new(Mutex::new(Vec::new()));
        let payment =
            payment_with_transactions("pay-1", vec![pending_refund("r1"), pending_refund("r2")]);
        let store = MockStore::new(log.clone()).with_payment(payment);
        let gateway = MockGateway::new(log.clone()).with_merchant_transaction(ledger(vec![
            refund_booking("r1", BookingStatus::Done),
            refund_booking("r2", BookingStatus::Pending),
        ]));
        let service = service(store, gateway);

        service.handle_notification("V-1").await.unwrap();

        let payment = service.store.payment_by_id("pay-1").await.unwrap().unwrap();
        assert_eq!(payment.transactions[0].state, TransactionState::Success);
        assert_eq!(payment.transactions[1].state, TransactionState::Pending);
    }

    #[tokio::test]
    async fn ledger_without_refund_bookings_is_not_found() {
        let log: SharedLog = Arc::new(Mutex::new(Vec::new()));
        let store = MockStore::new(log.clone());
        let gateway =
            MockGateway::new(log.clone()).with_merchant_transaction(ledger(Vec::new()));
        let service = service(store, gateway);

        let err = service.handle_notification("V-1").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn unmatched_booking_id_is_not_found() {
        let log: SharedLog = Arc::new(Mutex::new(Vec::new()));
        let store = MockStore::new(log.clone());
        let gateway = MockGateway::new(log.clone()).with_merchant_transaction(ledger(vec![
            refund_booking("stranger", BookingStatus::Done),
        ]));
        let service = service(store, gateway);

        let err = service.handle_notification("V-1").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn ambiguous_payment_match_is_rejected() {
        let log: SharedLog = Arc::new(Mutex::new(Vec::new()));
        let store = MockStore::new(log.clone())
            .with_payment(payment_with_transactions("pay-1", vec![pending_refund("r1")]))
            .with_payment(payment_with_transactions("pay-2", vec![pending_refund("r1")]));
        let gateway = MockGateway::new(log.clone()).with_merchant_transaction(ledger(vec![
            refund_booking("r1", BookingStatus::Done),
        ]));
        let service = service(store, gateway);

        let err = service.handle_notification("V-1").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn failed_only_ledger_is_not_found_and_changes_nothing() {
        let log: SharedLog = Arc::new(Mutex::new(Vec::new()));
        let payment = payment_with_transactions("pay-1", vec![pending_refund("r1")]);
        let store = MockStore::new(log.clone()).with_payment(payment);
        let gateway = MockGateway::new(log.clone()).with_merchant_transaction(ledger(vec![
            refund_booking("r1", BookingStatus::Failed),
        ]));
        let service = service(store, gateway);

        let err = service.handle_notification("V-1").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let payment = service.store.payment_by_id("pay-1").await.unwrap().unwrap();
        assert_eq!(payment.transactions[0].state, TransactionState::Pending);
        assert!(log
            .lock()
            .unwrap()
            .iter()
            .all(|e| !e.starts_with("store.update_payment")));
    }

    #[tokio::test]
    async fn pending_only_ledger_is_not_found() {
        let log: SharedLog = Arc::new(Mutex::new(Vec::new()));
        let payment = payment_with_transactions("pay-1", vec![pending_refund("r1")]);
        let store = MockStore::new(log.clone()).with_payment(payment);
        let gateway = MockGateway::new(log.clone()).with_merchant_transaction(ledger(vec![
            refund_booking("r1", BookingStatus::Pending),
        ]));
        let service = service(store, gateway);

        let err = service.handle_notification("V-1").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn unknown_provider_transaction_propagates_upstream_error() {
        let log: SharedLog = Arc::new(Mutex::new(Vec::new()));
        let service = service(MockStore::new(log.clone()), MockGateway::new(log));

        let err = service.handle_notification("V-404").await.unwrap_err();
        assert!(matches!(err, AppError::Upstream { status: 404, .. }));
    }

    #[test]
    fn plan_skips_transactions_without_a_booking() {
        let t1 = pending_refund("r1");
        let t2 = pending_refund("r2");
        let booking = refund_booking("r1", BookingStatus::Done);

        let actions = plan_refund_transitions(&[&t1, &t2], &[&booking]);
        assert_eq!(
            actions,
            vec![PaymentUpdateAction::change_transaction_state(
                "r1",
                TransactionState::Success
            )]
        );
    }
}
