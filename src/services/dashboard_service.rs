use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
};

use crate::{
    dto::dashboard::{DailyPoint, DashboardSummary, Period, StatBlock},
    entity::{
        customers::{Column as CustomerCol, Entity as Customers},
        products::{Column as ProductCol, Entity as Products},
        sales::{Column as SaleCol, Entity as Sales},
        subscribers::{Column as SubscriberCol, Entity as Subscribers},
    },
    error::AppResult,
    response::{ApiResponse, Meta},
    services::{customer_service, sale_service},
    state::AppState,
};

/// Summary for a reporting period, served from the TTL cache when fresh.
/// Counting and top-N selection run as range-filtered queries in the store,
/// not as in-memory full-table scans.
pub async fn summary(state: &AppState, period: Period) -> AppResult<ApiResponse<DashboardSummary>> {
    let cache_key = period.as_str().to_string();
    if let Some(cached) = state.dashboard_cache.get(&cache_key) {
        return Ok(ApiResponse::success("Dashboard", cached, Some(Meta::empty())));
    }

    let now = Utc::now();
    let window = Duration::days(period.lookback_days());
    let current_start = now - window;
    let previous_start = current_start - window;

    let customers = stat_block(
        count_customers(state, current_start, now).await?,
        count_customers(state, previous_start, current_start).await?,
    );
    let products = stat_block(
        count_products(state, current_start, now).await?,
        count_products(state, previous_start, current_start).await?,
    );
    let subscribers = stat_block(
        count_active_subscribers(state, current_start, now).await?,
        count_active_subscribers(state, previous_start, current_start).await?,
    );
    let sales = stat_block(
        count_sales(state, current_start, now).await?,
        count_sales(state, previous_start, current_start).await?,
    );

    let revenue = revenue_between(state, current_start, now).await?;
    let previous_revenue = revenue_between(state, previous_start, current_start).await?;

    let daily_revenue = daily_series(state, current_start, now).await?;

    let recent_customers = Customers::find()
        .order_by_desc(CustomerCol::CreatedAt)
        .limit(5)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(customer_service::customer_from_entity)
        .collect();

    let recent_sales = Sales::find()
        .order_by_desc(SaleCol::SaleDate)
        .limit(5)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(sale_service::sale_from_entity)
        .collect();

    let summary = DashboardSummary {
        period: period.as_str().to_string(),
        customers,
        products,
        subscribers,
        sales,
        revenue,
        previous_revenue,
        revenue_trend_percent: revenue_trend_percent(revenue, previous_revenue),
        daily_revenue,
        recent_customers,
        recent_sales,
    };

    state.dashboard_cache.set(cache_key, summary.clone());

    Ok(ApiResponse::success("Dashboard", summary, Some(Meta::empty())))
}

pub fn clear_cache(state: &AppState) -> ApiResponse<serde_json::Value> {
    state.dashboard_cache.clear();
    ApiResponse::success("Cache cleared", serde_json::json!({}), Some(Meta::empty()))
}

async fn count_customers(
    state: &AppState,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> AppResult<i64> {
    Ok(Customers::find()
        .filter(CustomerCol::CreatedAt.gte(from))
        .filter(CustomerCol::CreatedAt.lt(to))
        .count(&state.orm)
        .await? as i64)
}

async fn count_products(
    state: &AppState,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> AppResult<i64> {
    Ok(Products::find()
        .filter(ProductCol::CreatedAt.gte(from))
        .filter(ProductCol::CreatedAt.lt(to))
        .count(&state.orm)
        .await? as i64)
}

async fn count_active_subscribers(
    state: &AppState,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> AppResult<i64> {
    Ok(Subscribers::find()
        .filter(
            Condition::all()
                .add(SubscriberCol::Active.eq(true))
                .add(SubscriberCol::SubscriptionDate.gte(from))
                .add(SubscriberCol::SubscriptionDate.lt(to)),
        )
        .count(&state.orm)
        .await? as i64)
}

async fn count_sales(state: &AppState, from: DateTime<Utc>, to: DateTime<Utc>) -> AppResult<i64> {
    Ok(Sales::find()
        .filter(SaleCol::SaleDate.gte(from))
        .filter(SaleCol::SaleDate.lt(to))
        .count(&state.orm)
        .await? as i64)
}

async fn revenue_between(
    state: &AppState,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> AppResult<f64> {
    let total: Option<Option<f64>> = Sales::find()
        .select_only()
        .column_as(Expr::col(SaleCol::TotalAmount).sum(), "revenue")
        .filter(SaleCol::SaleDate.gte(from))
        .filter(SaleCol::SaleDate.lt(to))
        .into_tuple()
        .one(&state.orm)
        .await?;
    Ok(total.flatten().unwrap_or(0.0))
}

/// Current-window sales bucketed by calendar date, ascending.
async fn daily_series(
    state: &AppState,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> AppResult<Vec<DailyPoint>> {
    let rows: Vec<(DateTimeWithTimeZone, f64)> = Sales::find()
        .select_only()
        .column(SaleCol::SaleDate)
        .column(SaleCol::TotalAmount)
        .filter(SaleCol::SaleDate.gte(from))
        .filter(SaleCol::SaleDate.lt(to))
        .into_tuple()
        .all(&state.orm)
        .await?;

    let mut buckets: BTreeMap<chrono::NaiveDate, f64> = BTreeMap::new();
    for (sale_date, amount) in rows {
        *buckets
            .entry(sale_date.with_timezone(&Utc).date_naive())
            .or_insert(0.0) += amount;
    }

    Ok(buckets
        .into_iter()
        .map(|(date, total)| DailyPoint { date, total })
        .collect())
}

fn stat_block(current: i64, previous: i64) -> StatBlock {
    StatBlock {
        current,
        previous,
        trend_percent: trend_percent(current, previous),
    }
}

/// Relative change against the immediately preceding window. A window coming
/// from nothing reads as +100, two empty windows as 0.
fn trend_percent(current: i64, previous: i64) -> i64 {
    if previous == 0 {
        return if current > 0 { 100 } else { 0 };
    }
    (((current - previous) as f64 / previous as f64) * 100.0).round() as i64
}

fn revenue_trend_percent(current: f64, previous: f64) -> i64 {
    if previous == 0.0 {
        return if current > 0.0 { 100 } else { 0 };
    }
    (((current - previous) / previous) * 100.0).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn growth_from_empty_baseline_is_one_hundred() {
        assert_eq!(trend_percent(10, 0), 100);
    }

    #[test]
    fn two_empty_windows_are_flat() {
        assert_eq!(trend_percent(0, 0), 0);
    }

    #[test]
    fn doubling_reads_as_one_hundred() {
        assert_eq!(trend_percent(10, 5), 100);
    }

    #[test]
    fn decline_is_negative_and_rounded() {
        assert_eq!(trend_percent(5, 10), -50);
        assert_eq!(trend_percent(1, 3), -67);
    }

    #[test]
    fn revenue_trend_matches_count_trend_semantics() {
        assert_eq!(revenue_trend_percent(1500.0, 0.0), 100);
        assert_eq!(revenue_trend_percent(0.0, 0.0), 0);
        assert_eq!(revenue_trend_percent(150.0, 100.0), 50);
    }
}
