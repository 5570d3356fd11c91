pub mod cart;
pub mod payment;
pub mod remote;

pub use cart::{Address, Cart, CartState, CartUpdateAction, LineItem, Money};
pub use payment::{
    Payment, PaymentDraft, PaymentMethodInfo, PaymentUpdateAction, Transaction, TransactionDraft,
    TransactionState, TransactionType,
};
pub use remote::{
    Booking, BookingStatus, BookingType, CaptureRequest, CustomerRelationship, Decision,
    DecisionOutcome, MerchantTransaction, RedirectLinks, RefundRequest, RemotePaymentRequest,
    RemotePaymentResponse,
};
