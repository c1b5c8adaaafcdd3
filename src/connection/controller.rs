use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::{ConnectError, ConnectOutcome, ConnectionDetails, ConnectionPhase};
use crate::context::{fetch_user_context, ContextSource};
use crate::identity::PageParams;
use crate::instructions::{compose_instructions, context_section_for};
use crate::playground::{Credential, PlaygroundAction, SharedPlaygroundStore};
use crate::token::TokenIssuer;
use crate::util::fingerprint;

pub type SharedConnectionController = Arc<ConnectionController>;

struct Attempt {
    id: u64,
    cancel: CancellationToken,
}

struct Inner {
    phase: ConnectionPhase,
    attempt: Option<Attempt>,
    next_attempt: u64,
}

/// Owns the connection phase and the published [`ConnectionDetails`].
pub struct ConnectionController {
    store: SharedPlaygroundStore,
    params: PageParams,
    context: Arc<dyn ContextSource>,
    tokens: Arc<dyn TokenIssuer>,
    inner: Mutex<Inner>,
    details: watch::Sender<ConnectionDetails>,
    auto_connected: AtomicBool,
}

/// Returns the phase to `Idle` when an attempt ends without committing.
struct ConnectingGuard<'a> {
    controller: &'a ConnectionController,
    attempt_id: u64,
}

impl Drop for ConnectingGuard<'_> {
    fn drop(&mut self) {
        let mut inner = self.controller.lock();
        let current = inner.attempt.as_ref().map(|a| a.id);
        if inner.phase == ConnectionPhase::Connecting && current == Some(self.attempt_id) {
            inner.phase = ConnectionPhase::Idle;
            inner.attempt = None;
            debug!(attempt = self.attempt_id, "Connection attempt released");
        }
    }
}

impl ConnectionController {
    pub fn new(
        store: SharedPlaygroundStore,
        params: PageParams,
        context: Arc<dyn ContextSource>,
        tokens: Arc<dyn TokenIssuer>,
    ) -> Self {
        let (details, _) = watch::channel(ConnectionDetails::default());
        Self {
            store,
            params,
            context,
            tokens,
            inner: Mutex::new(Inner {
                phase: ConnectionPhase::Idle,
                attempt: None,
                next_attempt: 0,
            }),
            details,
            auto_connected: AtomicBool::new(false),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn phase(&self) -> ConnectionPhase {
        self.lock().phase
    }

    pub fn details(&self) -> ConnectionDetails {
        self.details.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionDetails> {
        self.details.subscribe()
    }

    pub fn store(&self) -> &SharedPlaygroundStore {
        &self.store
    }

    /// Run the connect pipeline unless an attempt is already in flight or a
    /// session is already established.
    pub async fn connect(&self) -> Result<ConnectOutcome, ConnectError> {
        let (attempt_id, cancel, credential) = {
            let mut inner = self.lock();
            match inner.phase {
                ConnectionPhase::Connecting => {
                    debug!("Connect requested while an attempt is in flight");
                    return Ok(ConnectOutcome::AlreadyConnecting);
                }
                ConnectionPhase::Connected => return Ok(ConnectOutcome::AlreadyConnected),
                ConnectionPhase::Idle => {}
            }

            let Some(credential) = self.params.credential_blob() else {
                warn!("Refusing to connect: page parameters carry no credential");
                return Err(ConnectError::MissingCredential);
            };

            inner.next_attempt += 1;
            let attempt_id = inner.next_attempt;
            let cancel = CancellationToken::new();
            inner.phase = ConnectionPhase::Connecting;
            inner.attempt = Some(Attempt {
                id: attempt_id,
                cancel: cancel.clone(),
            });
            (attempt_id, cancel, credential)
        };
        let _guard = ConnectingGuard {
            controller: self,
            attempt_id,
        };

        info!(
            attempt = attempt_id,
            user = %self.params.goqii_user_id,
            key = %fingerprint(&self.params.api_key),
            "Connecting"
        );
        if let Err(e) = self
            .store
            .dispatch(PlaygroundAction::SetCredential(Credential::Present(credential)))
        {
            warn!("Failed to store credential: {}", e);
        }

        let result = tokio::select! {
            _ = cancel.cancelled() => Err(ConnectError::Cancelled),
            res = self.run_pipeline() => res,
        };

        match result {
            Ok(details) => {
                if self.commit(attempt_id, &details) {
                    info!(attempt = attempt_id, url = %details.url, voice = %details.voice, "Connected");
                    Ok(ConnectOutcome::Connected(details))
                } else {
                    info!(attempt = attempt_id, "Connection attempt superseded by disconnect or revocation");
                    Err(ConnectError::Cancelled)
                }
            }
            Err(ConnectError::Cancelled) => {
                info!(attempt = attempt_id, "Connection attempt cancelled");
                Err(ConnectError::Cancelled)
            }
            Err(e @ ConnectError::Token(_)) => {
                error!(attempt = attempt_id, "Connection failed: {}", e);
                Err(e)
            }
            Err(e) => {
                warn!(attempt = attempt_id, "Connection failed: {}", e);
                Err(e)
            }
        }
    }

    async fn run_pipeline(&self) -> Result<ConnectionDetails, ConnectError> {
        let today = chrono::Local::now().date_naive();
        let context = fetch_user_context(self.context.as_ref(), &self.params, today).await?;

        let mut state = self.store.snapshot();
        match state.credential {
            Credential::Present(_) => {}
            Credential::Revoked => {
                info!("Credential revoked during connect");
                return Err(ConnectError::Cancelled);
            }
            Credential::Unset => return Err(ConnectError::MissingCredential),
        }
        let context_section = context_section_for(&context);
        state.instructions =
            compose_instructions(&state.instructions, &context.orders, &context.food_log);
        debug!(chars = state.instructions.len(), "Composed session instructions");

        let grant = self.tokens.request_token(&state).await?;

        Ok(ConnectionDetails {
            id: Uuid::new_v4(),
            url: grant.url,
            token: grant.access_token,
            connected: true,
            voice: state.session_config.voice,
            context_section,
        })
    }

    /// Publish `details` if `attempt_id` is still the live attempt and the
    /// credential has not been revoked in the meantime.
    fn commit(&self, attempt_id: u64, details: &ConnectionDetails) -> bool {
        let mut inner = self.lock();
        let live = match &inner.attempt {
            Some(attempt) => attempt.id == attempt_id && !attempt.cancel.is_cancelled(),
            None => false,
        };
        if !live || inner.phase != ConnectionPhase::Connecting {
            return false;
        }
        if !matches!(self.store.credential(), Credential::Present(_)) {
            return false;
        }
        inner.phase = ConnectionPhase::Connected;
        self.details.send_replace(details.clone());
        true
    }

    /// Cancel any in-flight attempt and mark the session disconnected.
    pub fn disconnect(&self) {
        let previous = {
            let mut inner = self.lock();
            if let Some(attempt) = inner.attempt.take() {
                attempt.cancel.cancel();
            }
            // Phase and details change together under the lock, as in `commit`.
            self.details.send_if_modified(|details| {
                let was_connected = details.connected;
                details.connected = false;
                was_connected
            });
            std::mem::replace(&mut inner.phase, ConnectionPhase::Idle)
        };

        if previous != ConnectionPhase::Idle {
            info!(from = ?previous, "Disconnected");
        }
    }

    /// Connect once per controller lifetime. Later calls return `None`.
    pub async fn auto_connect(&self) -> Option<Result<ConnectOutcome, ConnectError>> {
        if self.auto_connected.swap(true, Ordering::SeqCst) {
            return None;
        }
        Some(self.connect().await)
    }

    /// Whether the configured voice differs from the one the live session uses.
    pub fn needs_reconnect(&self) -> bool {
        if self.phase() != ConnectionPhase::Connected {
            return false;
        }
        let details = self.details.borrow();
        details.connected && details.voice != self.store.session_config().voice
    }

    pub async fn reconnect(&self) -> Result<ConnectOutcome, ConnectError> {
        self.disconnect();
        self.connect().await
    }

    /// Disconnect whenever the stored credential is revoked while connected.
    /// Reacts to both credential changes and sessions coming up.
    pub fn watch_credential(self: &Arc<Self>, shutdown: CancellationToken) -> JoinHandle<()> {
        let controller = Arc::clone(self);
        let mut state_rx = controller.store.subscribe();
        let mut details_rx = controller.details.subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    changed = state_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        state_rx.borrow_and_update();
                    }
                    changed = details_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        details_rx.borrow_and_update();
                    }
                }
                let revoked = matches!(controller.store.credential(), Credential::Revoked);
                let connected = controller.details.borrow().connected;
                if revoked && connected {
                    info!("Credential revoked, tearing down session");
                    controller.disconnect();
                }
            }
        })
    }
}
