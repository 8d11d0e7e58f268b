use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DailySales {
    pub day: NaiveDate,
    pub total_sales: Decimal,
    pub order_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesSummary {
    pub total_sales: Decimal,
    pub total_orders: i64,
    pub average_order_value: Decimal,
}

impl SalesSummary {
    pub fn from_days(days: &[DailySales]) -> Self {
        let total_sales: Decimal = days.iter().map(|d| d.total_sales).sum();
        let total_orders: i64 = days.iter().map(|d| d.order_count).sum();
        let average_order_value = if total_orders > 0 {
            (total_sales / Decimal::from(total_orders)).round_dp(2)
        } else {
            Decimal::ZERO
        };

        Self {
            total_sales,
            total_orders,
            average_order_value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TopProduct {
    pub id: i64,
    pub name: String,
    pub category: String,
    pub units_sold: i64,
    pub total_sales: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TopCustomer {
    pub id: i64,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub order_count: i64,
    pub total_spent: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub users: i64,
    pub products: i64,
    pub categories: i64,
    pub orders: i64,
    pub recent_sales: Decimal,
    pub server_time: DateTime<Utc>,
    pub server_ip: String,
}
