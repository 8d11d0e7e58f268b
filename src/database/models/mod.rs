pub mod permission;
pub mod product;
pub mod report;
pub mod user;

pub use permission::{catalog, Permission};
pub use product::{NewProduct, Product, ProductChanges};
pub use report::{DailySales, DashboardStats, SalesSummary, TopCustomer, TopProduct};
pub use user::{NewUser, TokenHolder, UserCredentials, UserProfile, UserSummary};
