//! Connection lifecycle: fetch context, compose instructions, obtain a token
//! and publish the details a realtime transport needs to join the session.
//!
//! ## Flow
//! ```text
//! page params ─► credential blob ─┬─► orders ───┐
//!                                 └─► food log ─┴─► instructions ─► token ─► ConnectionDetails
//! ```
//!
//! States move `Idle → Connecting → Connected` and back to `Idle` on
//! failure, cancellation, `disconnect()` or credential revocation.

mod controller;

pub use controller::{ConnectionController, SharedConnectionController};

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::context::ContextError;
use crate::playground::VoiceId;
use crate::token::TokenError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionPhase {
    Idle,
    Connecting,
    Connected,
}

/// Transport endpoint and credentials for one realtime session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectionDetails {
    /// Fresh for every successful connect.
    pub id: Uuid,
    pub url: String,
    #[serde(skip_serializing)]
    pub token: String,
    pub connected: bool,
    /// Voice the session was opened with.
    pub voice: VoiceId,
    /// Fetched user context appended to the base instructions.
    #[serde(skip_serializing)]
    pub context_section: String,
}

impl Default for ConnectionDetails {
    fn default() -> Self {
        Self {
            id: Uuid::nil(),
            url: String::new(),
            token: String::new(),
            connected: false,
            voice: VoiceId::default(),
            context_section: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConnectOutcome {
    Connected(ConnectionDetails),
    /// Another attempt is in flight; nothing was sent.
    AlreadyConnecting,
    AlreadyConnected,
}

#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("no credential in the page parameters")]
    MissingCredential,

    #[error("failed to fetch user context: {0}")]
    Context(#[from] ContextError),

    #[error("failed to obtain access token: {0}")]
    Token(#[from] TokenError),

    #[error("connection attempt was cancelled")]
    Cancelled,
}
