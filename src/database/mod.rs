pub mod manager;
pub mod models;
pub mod products;
pub mod reports;
pub mod store;

pub use manager::{DatabaseError, DatabaseManager};
pub use products::ProductRepository;
pub use reports::ReportRepository;
pub use store::{CredentialStore, PgCredentialStore};
