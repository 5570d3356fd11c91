pub mod notification;
pub mod operations;
pub mod payments;
pub mod webhook;
