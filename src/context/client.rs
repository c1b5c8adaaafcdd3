//! reqwest-backed client for the health-tracking API.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::{json, Value};
use std::time::Duration;
use url::Url;

use super::{format_food_log_date, ContextError, ContextSource};
use crate::identity::PageParams;
use crate::util::build_http_client;

const ORDERS_PATH: &str = "store/fetch_my_orders_v2";
const FOOD_LOG_PATH: &str = "food/fetch_by_range";
const FOOD_LOG_DEPTH: &str = "10";

#[derive(Clone)]
pub struct ContextClient {
    base_url: Url,
    client: reqwest::Client,
}

impl ContextClient {
    pub fn new(base_url: Url, timeout: Duration) -> reqwest::Result<Self> {
        Ok(Self::with_client(base_url, build_http_client(timeout)?))
    }

    pub fn with_client(mut base_url: Url, client: reqwest::Client) -> Self {
        // Url::join drops the last path segment unless the base ends in '/'.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Self { base_url, client }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    async fn post(
        &self,
        endpoint: &'static str,
        path: &str,
        params: &PageParams,
        body: Value,
    ) -> Result<Value, ContextError> {
        let url = self.base_url.join(path).map_err(|e| ContextError::Network {
            endpoint,
            message: format!("invalid url: {}", e),
        })?;

        tracing::debug!(endpoint, %url, "Fetching user context");

        let resp = self
            .client
            .post(url)
            .headers(params.headers())
            .json(&body)
            .send()
            .await
            .map_err(|e| ContextError::Network {
                endpoint,
                message: e.to_string(),
            })?;

        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(ContextError::Status {
                endpoint,
                status: status.as_u16(),
                body: text,
            });
        }

        serde_json::from_str(&text).map_err(|e| ContextError::Parse {
            endpoint,
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl ContextSource for ContextClient {
    async fn fetch_orders(
        &self,
        params: &PageParams,
        page_id: &str,
    ) -> Result<Value, ContextError> {
        self.post("orders", ORDERS_PATH, params, json!({ "pageId": page_id }))
            .await
    }

    async fn fetch_food_log(
        &self,
        params: &PageParams,
        since: NaiveDate,
    ) -> Result<Value, ContextError> {
        let body = json!({
            "dataInDepth": FOOD_LOG_DEPTH,
            "date": format_food_log_date(since),
        });
        self.post("food_log", FOOD_LOG_PATH, params, body).await
    }
}
