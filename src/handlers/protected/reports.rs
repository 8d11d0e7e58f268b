// handlers/protected/reports.rs - GET /api/reports/{sales,top-products,top-customers}

use axum::extract::{Query, State};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::app::AppState;
use crate::auth::Clock;
use crate::database::models::{DailySales, SalesSummary, TopCustomer, TopProduct};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};

const DEFAULT_LIMIT: i64 = 10;
const MAX_LIMIT: i64 = 100;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesReport {
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub daily_sales: Vec<DailySales>,
    pub summary: SalesSummary,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopProductsReport {
    pub top_products: Vec<TopProduct>,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopCustomersReport {
    pub top_customers: Vec<TopCustomer>,
    pub generated_at: DateTime<Utc>,
}

fn parse_date(raw: Option<String>, field: &str) -> Result<NaiveDate, ApiError> {
    let raw = raw
        .filter(|r| !r.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("startDate and endDate are required for the sales report"))?;
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| ApiError::bad_request(format!("{} must be a date formatted YYYY-MM-DD", field)))
}

/// Missing or unparsable values fall back to the default; the result is
/// clamped to `1..=MAX_LIMIT`.
fn parse_limit(raw: Option<String>) -> i64 {
    raw.and_then(|l| l.trim().parse::<i64>().ok())
        .unwrap_or(DEFAULT_LIMIT)
        .clamp(1, MAX_LIMIT)
}

pub async fn sales_get(State(state): State<AppState>, Query(query): Query<SalesQuery>) -> ApiResult<SalesReport> {
    let start = parse_date(query.start_date, "startDate")?;
    let end = parse_date(query.end_date, "endDate")?;
    if end < start {
        return Err(ApiError::bad_request("endDate must not be before startDate"));
    }

    let daily_sales = state.reports.daily_sales(start, end).await?;
    let summary = SalesSummary::from_days(&daily_sales);

    Ok(ApiResponse::success(SalesReport {
        period_start: start,
        period_end: end,
        daily_sales,
        summary,
    }))
}

pub async fn top_products_get(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> ApiResult<TopProductsReport> {
    let top_products = state.reports.top_products(parse_limit(query.limit)).await?;
    Ok(ApiResponse::success(TopProductsReport {
        top_products,
        generated_at: state.clock.now(),
    }))
}

pub async fn top_customers_get(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> ApiResult<TopCustomersReport> {
    let top_customers = state.reports.top_customers(parse_limit(query.limit)).await?;
    Ok(ApiResponse::success(TopCustomersReport {
        top_customers,
        generated_at: state.clock.now(),
    }))
}
