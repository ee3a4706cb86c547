pub mod credential;
pub mod invoice;

pub use credential::Credential;
pub use invoice::InvoiceLayout;
