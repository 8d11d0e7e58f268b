use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Names seeded into `permisos` by the initial migration.
pub mod catalog {
    pub const EDIT_PRODUCTS: &str = "edit_products";
    pub const VIEW_REPORTS: &str = "view_reports";
    pub const VIEW_DASHBOARD: &str = "view_dashboard";
    pub const MANAGE_USERS: &str = "manage_users";
    pub const MANAGE_ORDERS: &str = "manage_orders";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Permission {
    pub id: i64,
    #[sqlx(rename = "nombre")]
    pub name: String,
    #[sqlx(rename = "descripcion")]
    pub description: Option<String>,
}
