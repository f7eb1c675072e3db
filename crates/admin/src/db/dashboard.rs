//! Sales overview for the dashboard.

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;

use super::RepositoryError;
use super::orders::{OrderSummary, SUMMARY_COLUMNS};

/// Orders shown in the "latest sales" table.
pub const LATEST_SALES_LIMIT: i64 = 6;

/// Sales for one calendar month, labelled `MM/YY`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MonthlySales {
    pub month: String,
    pub total_sales: Decimal,
}

/// Dashboard figures.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub orders_count: i64,
    pub products_count: i64,
    pub users_count: i64,
    pub total_sales: Decimal,
    pub sales_data: Vec<MonthlySales>,
    pub latest_sales: Vec<OrderSummary>,
}

#[derive(Debug, sqlx::FromRow)]
struct CountsRow {
    orders_count: i64,
    products_count: i64,
    users_count: i64,
    total_sales: Decimal,
}

pub struct DashboardRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> DashboardRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Counts, total and monthly sales, and the latest orders.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn summary(&self) -> Result<Summary, RepositoryError> {
        let counts = sqlx::query_as::<_, CountsRow>(
            "SELECT (SELECT COUNT(*) FROM orders) AS orders_count, \
                    (SELECT COUNT(*) FROM products) AS products_count, \
                    (SELECT COUNT(*) FROM users) AS users_count, \
                    (SELECT COALESCE(SUM(total_price), 0)::NUMERIC(12, 2) FROM orders) AS total_sales",
        )
        .fetch_one(self.pool)
        .await?;

        let sales_data = sqlx::query_as::<_, MonthlySales>(
            "SELECT to_char(date_trunc('month', created_at), 'MM/YY') AS month, \
                    SUM(total_price) AS total_sales \
             FROM orders GROUP BY date_trunc('month', created_at) \
             ORDER BY date_trunc('month', created_at)",
        )
        .fetch_all(self.pool)
        .await?;

        let latest_sales = sqlx::query_as::<_, OrderSummary>(&format!(
            "SELECT {SUMMARY_COLUMNS} FROM orders o JOIN users u ON u.id = o.user_id \
             ORDER BY o.created_at DESC LIMIT $1"
        ))
        .bind(LATEST_SALES_LIMIT)
        .fetch_all(self.pool)
        .await?;

        Ok(Summary {
            orders_count: counts.orders_count,
            products_count: counts.products_count,
            users_count: counts.users_count,
            total_sales: counts.total_sales,
            sales_data,
            latest_sales,
        })
    }
}
