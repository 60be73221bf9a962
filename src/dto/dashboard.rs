use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{Customer, Sale};

#[derive(Debug, Clone, Copy, Default, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    Week,
    #[default]
    Month,
    Year,
}

impl Period {
    pub fn lookback_days(self) -> i64 {
        match self {
            Period::Week => 7,
            Period::Month => 30,
            Period::Year => 365,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Period::Week => "week",
            Period::Month => "month",
            Period::Year => "year",
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct DashboardQuery {
    pub period: Option<Period>,
}

/// Current vs. previous window count with the relative change.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StatBlock {
    pub current: i64,
    pub previous: i64,
    pub trend_percent: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DailyPoint {
    pub date: NaiveDate,
    pub total: f64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DashboardSummary {
    pub period: String,
    pub customers: StatBlock,
    pub products: StatBlock,
    pub subscribers: StatBlock,
    pub sales: StatBlock,
    pub revenue: f64,
    pub previous_revenue: f64,
    pub revenue_trend_percent: i64,
    pub daily_revenue: Vec<DailyPoint>,
    pub recent_customers: Vec<Customer>,
    pub recent_sales: Vec<Sale>,
}
