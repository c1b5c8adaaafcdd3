//! Realtime session seam.
//!
//! The media transport itself is provided by an external SDK. It plugs in
//! through [`SessionConnector`], which joins a session from published
//! [`ConnectionDetails`], and [`AgentSession`], which exposes the remote
//! agent's identity and an RPC channel to it.
//!
//! [`SessionBridge`] follows the controller: it joins when details become
//! connected, runs a [`LiveConfigSync`] for the lifetime of the session and
//! leaves when the controller disconnects.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::connection::{ConnectionDetails, SharedConnectionController};
use crate::sync::LiveConfigSync;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("rpc {method} failed: {message}")]
    Failed { method: String, message: String },

    #[error("rpc {method} timed out")]
    Timeout { method: String },
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to join session at {url}: {message}")]
    Join { url: String, message: String },
}

/// A joined realtime session.
#[async_trait]
pub trait AgentSession: Send + Sync {
    /// Identity of the agent participant, once it has joined.
    fn agent_identity(&self) -> Option<String>;

    /// Attributes currently applied to the local participant.
    fn local_attributes(&self) -> BTreeMap<String, String>;

    async fn perform_rpc(
        &self,
        destination: &str,
        method: &str,
        payload: String,
    ) -> Result<String, RpcError>;

    async fn leave(&self);
}

#[async_trait]
pub trait SessionConnector: Send + Sync {
    async fn join(&self, details: &ConnectionDetails)
        -> Result<Arc<dyn AgentSession>, SessionError>;
}

struct ActiveSession {
    id: Uuid,
    session: Arc<dyn AgentSession>,
    sync_cancel: CancellationToken,
    sync_task: JoinHandle<()>,
}

impl ActiveSession {
    async fn close(self) {
        self.sync_cancel.cancel();
        if let Err(e) = self.sync_task.await {
            warn!("Live config sync task ended abnormally: {}", e);
        }
        self.session.leave().await;
        info!(session = %self.id, "Left realtime session");
    }
}

/// Keeps a realtime session in step with the controller's connection details.
pub struct SessionBridge {
    controller: SharedConnectionController,
    connector: Arc<dyn SessionConnector>,
    debounce: Duration,
}

impl SessionBridge {
    pub fn new(
        controller: SharedConnectionController,
        connector: Arc<dyn SessionConnector>,
        debounce: Duration,
    ) -> Self {
        Self {
            controller,
            connector,
            debounce,
        }
    }

    /// Bridge using the configured live-sync debounce.
    pub fn from_config(
        config: &Config,
        controller: SharedConnectionController,
        connector: Arc<dyn SessionConnector>,
    ) -> Self {
        Self::new(controller, connector, config.config_debounce)
    }

    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    async fn run(self, shutdown: CancellationToken) {
        let mut details_rx = self.controller.subscribe();
        let mut active: Option<ActiveSession> = None;

        loop {
            let details = details_rx.borrow_and_update().clone();
            let stale = active
                .as_ref()
                .map(|a| !details.connected || a.id != details.id)
                .unwrap_or(false);
            if stale {
                if let Some(session) = active.take() {
                    session.close().await;
                }
            }

            if details.connected && active.is_none() {
                match self.connector.join(&details).await {
                    Ok(session) => {
                        info!(session = %details.id, url = %details.url, "Joined realtime session");
                        let sync = LiveConfigSync::new(
                            Arc::clone(self.controller.store()),
                            Arc::clone(&session),
                            details.context_section.clone(),
                            self.debounce,
                        );
                        let sync_cancel = shutdown.child_token();
                        let sync_task = tokio::spawn(sync.run(sync_cancel.clone()));
                        active = Some(ActiveSession {
                            id: details.id,
                            session,
                            sync_cancel,
                            sync_task,
                        });
                    }
                    Err(e) => {
                        warn!("{}", e);
                        self.controller.disconnect();
                    }
                }
            }

            tokio::select! {
                _ = shutdown.cancelled() => break,
                changed = details_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        if let Some(session) = active.take() {
            session.close().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{ConnectionController, ConnectionPhase};
    use crate::identity::PageParams;
    use crate::playground::{PlaygroundState, PlaygroundStore};
    use crate::testing::{MockConnector, MockContext, MockTokens};
    use std::sync::atomic::Ordering;
    use url::Url;

    fn controller() -> SharedConnectionController {
        let url = Url::parse("https://play.example/?apiKey=k").unwrap();
        Arc::new(ConnectionController::new(
            Arc::new(PlaygroundStore::new(PlaygroundState::default())),
            PageParams::from_url(&url),
            Arc::new(MockContext::default()),
            Arc::new(MockTokens::default()),
        ))
    }

    async fn wait_until(cond: impl Fn() -> bool) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !cond() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("condition reached in time");
    }

    #[tokio::test]
    async fn joins_on_connect_and_leaves_on_disconnect() {
        let controller = controller();
        let connector = Arc::new(MockConnector::default());
        let shutdown = CancellationToken::new();
        let bridge = SessionBridge::new(
            Arc::clone(&controller),
            connector.clone(),
            Duration::from_millis(10),
        )
        .spawn(shutdown.clone());

        controller.connect().await.unwrap();
        wait_until(|| connector.joins.load(Ordering::SeqCst) == 1).await;
        assert_eq!(connector.session.leaves.load(Ordering::SeqCst), 0);

        controller.disconnect();
        wait_until(|| connector.session.leaves.load(Ordering::SeqCst) == 1).await;

        controller.connect().await.unwrap();
        wait_until(|| connector.joins.load(Ordering::SeqCst) == 2).await;

        shutdown.cancel();
        bridge.await.unwrap();
        assert_eq!(connector.session.leaves.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn from_config_uses_the_configured_debounce() {
        let mut config = Config::new(Url::parse("https://play.example/?apiKey=k").unwrap());
        config.config_debounce = Duration::from_millis(750);
        let bridge = SessionBridge::from_config(
            &config,
            controller(),
            Arc::new(MockConnector::default()),
        );
        assert_eq!(bridge.debounce, Duration::from_millis(750));
    }

    #[tokio::test]
    async fn failed_join_disconnects() {
        let controller = controller();
        let connector = Arc::new(MockConnector::default());
        connector.fail.store(true, Ordering::SeqCst);
        let shutdown = CancellationToken::new();
        let bridge = SessionBridge::new(
            Arc::clone(&controller),
            connector.clone(),
            Duration::from_millis(10),
        )
        .spawn(shutdown.clone());

        controller.connect().await.unwrap();
        wait_until(|| !controller.details().connected).await;
        assert_eq!(controller.phase(), ConnectionPhase::Idle);
        assert_eq!(connector.joins.load(Ordering::SeqCst), 1);

        shutdown.cancel();
        bridge.await.unwrap();
    }
}
