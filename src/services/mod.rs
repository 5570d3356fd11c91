pub mod notification;
pub mod payments;

pub use notification::NotificationService;
pub use payments::PaymentService;
