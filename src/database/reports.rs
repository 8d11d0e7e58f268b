use chrono::{DateTime, Days, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::database::manager::DatabaseError;
use crate::database::models::{DailySales, TopCustomer, TopProduct};

/// Aggregate queries over orders for the admin dashboard and reports.
#[derive(Debug, Clone)]
pub struct ReportRepository {
    pool: PgPool,
}

/// Table counts shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableCounts {
    pub users: i64,
    pub products: i64,
    pub categories: i64,
    pub orders: i64,
}

impl ReportRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn table_counts(&self) -> Result<TableCounts, DatabaseError> {
        let (users, products, categories, orders): (i64, i64, i64, i64) = sqlx::query_as(
            "SELECT \
                (SELECT COUNT(*) FROM usuarios), \
                (SELECT COUNT(*) FROM productos), \
                (SELECT COUNT(*) FROM categorias), \
                (SELECT COUNT(*) FROM pedidos)",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(TableCounts {
            users,
            products,
            categories,
            orders,
        })
    }

    /// Order totals placed after `since`.
    pub async fn sales_since(&self, since: DateTime<Utc>) -> Result<Decimal, DatabaseError> {
        let total: Decimal = sqlx::query_scalar("SELECT COALESCE(SUM(total), 0) FROM pedidos WHERE fecha > $1")
            .bind(since)
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }

    /// Per-day totals between `start` and `end`, both days inclusive.
    pub async fn daily_sales(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<DailySales>, DatabaseError> {
        let end_exclusive = end.checked_add_days(Days::new(1)).unwrap_or(end);
        let rows = sqlx::query_as::<_, DailySales>(
            "SELECT fecha::date AS day, SUM(total) AS total_sales, COUNT(*) AS order_count \
             FROM pedidos \
             WHERE fecha >= $1 AND fecha < $2 \
             GROUP BY fecha::date \
             ORDER BY day",
        )
        .bind(start)
        .bind(end_exclusive)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn top_products(&self, limit: i64) -> Result<Vec<TopProduct>, DatabaseError> {
        let rows = sqlx::query_as::<_, TopProduct>(
            "SELECT p.id, p.nombre AS name, p.categoria AS category, \
                    SUM(dp.cantidad)::BIGINT AS units_sold, \
                    SUM(dp.precio * dp.cantidad) AS total_sales \
             FROM detalles_pedido dp \
             JOIN productos p ON dp.producto_id = p.id \
             GROUP BY p.id, p.nombre, p.categoria \
             ORDER BY units_sold DESC \
             LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn top_customers(&self, limit: i64) -> Result<Vec<TopCustomer>, DatabaseError> {
        let rows = sqlx::query_as::<_, TopCustomer>(
            "SELECT u.id, u.nombre AS first_name, u.apellido AS last_name, \
                    COUNT(p.id) AS order_count, \
                    SUM(p.total) AS total_spent \
             FROM pedidos p \
             JOIN usuarios u ON p.usuario_id = u.id \
             GROUP BY u.id, u.nombre, u.apellido \
             ORDER BY total_spent DESC \
             LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
