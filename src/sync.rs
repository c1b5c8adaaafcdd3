//! Push configuration edits to the agent of a live session.
//!
//! Edits are debounced, flattened into a string attribute map and sent as a
//! `pg.updateConfig` RPC. Voice changes alone are never pushed; they need a
//! reconnect.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::playground::{PlaygroundState, SharedPlaygroundStore};
use crate::session::AgentSession;

pub const UPDATE_CONFIG_METHOD: &str = "pg.updateConfig";

pub const ATTR_API_KEY: &str = "gemini_api_key";
/// Legacy key, always sent empty.
pub const ATTR_LEGACY_API_KEY: &str = "api_key";
pub const ATTR_INSTRUCTIONS: &str = "instructions";
pub const ATTR_VOICE: &str = "voice";
pub const ATTR_MODALITIES: &str = "modalities";
pub const ATTR_TEMPERATURE: &str = "temperature";
pub const ATTR_MAX_OUTPUT_TOKENS: &str = "max_output_tokens";

pub type SessionAttributes = BTreeMap<String, String>;

#[derive(Debug, Deserialize)]
struct UpdateConfigResponse {
    changed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// No agent has joined the session yet.
    NoAgent,
    /// Nothing but the voice differs from what was last applied.
    Suppressed,
    Applied { changed: bool },
    Failed,
}

/// Flatten `state` into the attribute map the agent understands.
pub fn session_attributes(state: &PlaygroundState, context_section: &str) -> SessionAttributes {
    let config = &state.session_config;
    let mut attrs = SessionAttributes::new();
    attrs.insert(
        ATTR_API_KEY.to_string(),
        state.credential.as_deref().unwrap_or_default().to_string(),
    );
    attrs.insert(
        ATTR_INSTRUCTIONS.to_string(),
        format!("{}{}", state.instructions, context_section),
    );
    attrs.insert(ATTR_VOICE.to_string(), config.voice.as_str().to_string());
    attrs.insert(
        ATTR_MODALITIES.to_string(),
        config.modalities.as_str().to_string(),
    );
    attrs.insert(ATTR_TEMPERATURE.to_string(), config.temperature.to_string());
    attrs.insert(
        ATTR_MAX_OUTPUT_TOKENS.to_string(),
        config
            .max_output_tokens
            .map(|n| n.to_string())
            .unwrap_or_default(),
    );
    attrs.insert(ATTR_LEGACY_API_KEY.to_string(), String::new());
    attrs
}

/// True unless `previous` is non-empty and every key of `next` other than the
/// voice already has the same value there. Keys only `previous` carries are
/// ignored.
pub fn should_push(next: &SessionAttributes, previous: &SessionAttributes) -> bool {
    if previous.is_empty() {
        return true;
    }
    next.iter()
        .filter(|(k, _)| k.as_str() != ATTR_VOICE)
        .any(|(k, v)| previous.get(k) != Some(v))
}

pub struct LiveConfigSync {
    store: SharedPlaygroundStore,
    session: Arc<dyn AgentSession>,
    context_section: String,
    debounce: Duration,
    last_applied: SessionAttributes,
}

impl LiveConfigSync {
    pub fn new(
        store: SharedPlaygroundStore,
        session: Arc<dyn AgentSession>,
        context_section: String,
        debounce: Duration,
    ) -> Self {
        let last_applied = session.local_attributes();
        Self {
            store,
            session,
            context_section,
            debounce,
            last_applied,
        }
    }

    pub fn last_applied(&self) -> &SessionAttributes {
        &self.last_applied
    }

    /// Send `state` to the agent unless suppressed. RPC failures are logged only.
    pub async fn push(&mut self, state: &PlaygroundState) -> PushOutcome {
        let Some(agent) = self.session.agent_identity() else {
            debug!("No agent in session, skipping config push");
            return PushOutcome::NoAgent;
        };

        let attrs = session_attributes(state, &self.context_section);
        if !should_push(&attrs, &self.last_applied) {
            debug!("Only the voice changed, reconnect required to apply it");
            return PushOutcome::Suppressed;
        }

        let payload = match serde_json::to_string(&attrs) {
            Ok(p) => p,
            Err(e) => {
                warn!("Failed to serialize session attributes: {}", e);
                return PushOutcome::Failed;
            }
        };

        let response = match self
            .session
            .perform_rpc(&agent, UPDATE_CONFIG_METHOD, payload)
            .await
        {
            Ok(r) => r,
            Err(e) => {
                warn!(agent = %agent, "Config update failed: {}", e);
                return PushOutcome::Failed;
            }
        };

        match serde_json::from_str::<UpdateConfigResponse>(&response) {
            Ok(UpdateConfigResponse { changed }) => {
                info!(agent = %agent, changed, "Config update applied");
                self.last_applied = attrs;
                PushOutcome::Applied { changed }
            }
            Err(e) => {
                warn!(agent = %agent, "Unparseable config update response: {}, body: {}", e, response);
                PushOutcome::Failed
            }
        }
    }

    /// Debounce store changes and push each settled state until `shutdown`.
    /// The state at start-up is pushed once the first debounce expires.
    pub async fn run(mut self, shutdown: CancellationToken) {
        let mut rx = self.store.subscribe();
        rx.borrow_and_update();
        let mut deadline = Some(Instant::now() + self.debounce);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                changed = rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    rx.borrow_and_update();
                    deadline = Some(Instant::now() + self.debounce);
                }
                _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    deadline = None;
                    let state = self.store.snapshot();
                    self.push(&state).await;
                }
            }
        }
        debug!("Live config sync stopped");
    }
}
