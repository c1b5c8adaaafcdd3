//! In-memory stand-ins for the remote services, shared by the unit tests.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::connection::ConnectionDetails;
use crate::context::{ContextError, ContextSource};
use crate::identity::PageParams;
use crate::playground::PlaygroundState;
use crate::session::{AgentSession, RpcError, SessionConnector, SessionError};
use crate::token::{TokenError, TokenGrant, TokenIssuer};

#[derive(Default)]
pub(crate) struct MockContext {
    pub order_calls: AtomicUsize,
    pub food_calls: AtomicUsize,
    pub fail_orders: AtomicBool,
    pub delay: Option<Duration>,
}

impl MockContext {
    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl ContextSource for MockContext {
    async fn fetch_orders(&self, _: &PageParams, _: &str) -> Result<Value, ContextError> {
        self.order_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        if self.fail_orders.load(Ordering::SeqCst) {
            return Err(ContextError::Status {
                endpoint: "orders",
                status: 500,
                body: "boom".to_string(),
            });
        }
        Ok(json!({ "orders": ["band"] }))
    }

    async fn fetch_food_log(&self, _: &PageParams, _: NaiveDate) -> Result<Value, ContextError> {
        self.food_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        Ok(json!({ "meals": [] }))
    }
}

#[derive(Default)]
pub(crate) struct MockTokens {
    pub calls: AtomicUsize,
    pub fail: AtomicBool,
    pub last_state: Mutex<Option<PlaygroundState>>,
    pub delay: Option<Duration>,
}

#[async_trait]
impl TokenIssuer for MockTokens {
    async fn request_token(&self, state: &PlaygroundState) -> Result<TokenGrant, TokenError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        *self.last_state.lock().unwrap() = Some(state.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(TokenError::Status {
                status: 500,
                body: "unavailable".to_string(),
            });
        }
        Ok(TokenGrant {
            access_token: format!("tok-{n}"),
            url: format!("wss://rtc.example/{n}"),
        })
    }
}

/// Session whose agent applies every update it receives.
pub(crate) struct MockSession {
    pub agent: Mutex<Option<String>>,
    pub attributes: Mutex<BTreeMap<String, String>>,
    /// `(destination, method, payload)` per call.
    pub rpcs: Mutex<Vec<(String, String, String)>>,
    pub fail: AtomicBool,
    pub leaves: AtomicUsize,
}

impl Default for MockSession {
    fn default() -> Self {
        Self {
            agent: Mutex::new(Some("agent-1".to_string())),
            attributes: Mutex::new(BTreeMap::new()),
            rpcs: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
            leaves: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl AgentSession for MockSession {
    fn agent_identity(&self) -> Option<String> {
        self.agent.lock().unwrap().clone()
    }

    fn local_attributes(&self) -> BTreeMap<String, String> {
        self.attributes.lock().unwrap().clone()
    }

    async fn perform_rpc(
        &self,
        destination: &str,
        method: &str,
        payload: String,
    ) -> Result<String, RpcError> {
        self.rpcs.lock().unwrap().push((
            destination.to_string(),
            method.to_string(),
            payload.clone(),
        ));
        if self.fail.load(Ordering::SeqCst) {
            return Err(RpcError::Failed {
                method: method.to_string(),
                message: "agent unavailable".to_string(),
            });
        }
        let attrs: BTreeMap<String, String> =
            serde_json::from_str(&payload).map_err(|e| RpcError::Failed {
                method: method.to_string(),
                message: e.to_string(),
            })?;
        let changed = {
            let mut current = self.attributes.lock().unwrap();
            let changed = *current != attrs;
            *current = attrs;
            changed
        };
        Ok(json!({ "changed": changed }).to_string())
    }

    async fn leave(&self) {
        self.leaves.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub(crate) struct MockConnector {
    pub joins: AtomicUsize,
    pub fail: AtomicBool,
    pub session: Arc<MockSession>,
}

#[async_trait]
impl SessionConnector for MockConnector {
    async fn join(
        &self,
        details: &ConnectionDetails,
    ) -> Result<Arc<dyn AgentSession>, SessionError> {
        self.joins.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(SessionError::Join {
                url: details.url.clone(),
                message: "refused".to_string(),
            });
        }
        Ok(self.session.clone())
    }
}
