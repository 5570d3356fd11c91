pub mod commercetools;
pub mod easycredit;

pub use commercetools::CommerceToolsClient;
pub use easycredit::EasyCreditClient;
