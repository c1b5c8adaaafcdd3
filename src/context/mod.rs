//! User context from the health-tracking API.
//!
//! Two independent reads, recent orders and the last week of food logs, both
//! authenticated with headers derived from the page parameters. The payloads
//! are opaque JSON that end up in the agent instructions.

mod client;

pub use client::ContextClient;

use async_trait::async_trait;
use chrono::{Days, NaiveDate};
use serde_json::Value;
use thiserror::Error;

use crate::identity::PageParams;

/// Page requested from the orders endpoint.
pub const ORDERS_PAGE_ID: &str = "1";
/// Days of food log folded into the instructions.
pub const FOOD_LOG_DAYS: u64 = 7;

#[derive(Debug, Error)]
pub enum ContextError {
    #[error("{endpoint} request failed: {message}")]
    Network { endpoint: &'static str, message: String },

    #[error("{endpoint} returned HTTP {status}: {body}")]
    Status {
        endpoint: &'static str,
        status: u16,
        body: String,
    },

    #[error("{endpoint} returned an unparseable body: {message}")]
    Parse { endpoint: &'static str, message: String },
}

/// Source of the remote user context.
#[async_trait]
pub trait ContextSource: Send + Sync {
    async fn fetch_orders(&self, params: &PageParams, page_id: &str)
        -> Result<Value, ContextError>;

    async fn fetch_food_log(
        &self,
        params: &PageParams,
        since: NaiveDate,
    ) -> Result<Value, ContextError>;
}

/// Context gathered for one connection attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct UserContext {
    pub orders: Value,
    pub food_log: Value,
}

/// First day of the food log window ending `today`.
pub fn food_log_start(today: NaiveDate) -> NaiveDate {
    today
        .checked_sub_days(Days::new(FOOD_LOG_DAYS))
        .unwrap_or(NaiveDate::MIN)
}

/// Date format the food log endpoint expects.
pub fn format_food_log_date(date: NaiveDate) -> String {
    date.format("%d-%m-%Y").to_string()
}

/// Fetch orders and the food log concurrently.
pub async fn fetch_user_context(
    source: &dyn ContextSource,
    params: &PageParams,
    today: NaiveDate,
) -> Result<UserContext, ContextError> {
    let (orders, food_log) = tokio::try_join!(
        source.fetch_orders(params, ORDERS_PAGE_ID),
        source.fetch_food_log(params, food_log_start(today)),
    )?;
    Ok(UserContext { orders, food_log })
}
