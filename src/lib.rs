//! # Voice Playground
//!
//! Connection lifecycle and live configuration for a realtime voice-agent
//! playground.
//!
//! This library provides:
//! - A playground store holding the session configuration, base instructions
//!   and credential material
//! - A connection controller that fetches user context, composes agent
//!   instructions and obtains a session token
//! - Live configuration sync that pushes debounced edits to the running agent
//! - A small HTTP control API
//!
//! ## Architecture
//!
//! ```text
//!   page URL ─► PageParams ─┐
//!                           ▼
//!  PlaygroundStore ◄── ConnectionController ──► ContextSource (orders, food log)
//!        │                  │                 └► TokenIssuer
//!        │                  ▼
//!        │          ConnectionDetails (watch)
//!        │                  │
//!        │                  ▼
//!        └────────► SessionBridge ──► LiveConfigSync ──► AgentSession RPC
//! ```
//!
//! ## Modules
//! - `playground`: state, presets and the store
//! - `connection`: connect/disconnect lifecycle
//! - `context`, `token`: remote services
//! - `sync`, `session`: live session plumbing
//! - `api`: control API

pub mod api;
pub mod config;
pub mod connection;
pub mod context;
pub mod identity;
pub mod instructions;
pub mod playground;
pub mod session;
pub mod sync;
pub mod token;
pub mod util;

#[cfg(test)]
pub(crate) mod testing;

pub use config::Config;
pub use connection::{ConnectionController, SharedConnectionController};
pub use playground::{PlaygroundState, PlaygroundStore, SharedPlaygroundStore};
