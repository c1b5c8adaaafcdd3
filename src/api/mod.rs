//! Control API for the playground.
//!
//! ## Endpoints
//!
//! - `GET /api/health` - Health check
//! - `GET /api/connection` - Connection phase and details
//! - `POST /api/connect` - Open a session
//! - `POST /api/disconnect` - Close the session
//! - `POST /api/reconnect` - Close and reopen with the current configuration
//! - `GET /api/config` - Current session configuration
//! - `PUT /api/config` - Replace the session configuration
//! - `PUT /api/instructions` - Replace the base instructions
//! - `DELETE /api/credential` - Revoke the stored credential
//! - `GET /api/presets` - List presets
//! - `POST /api/presets/:id/select` - Apply a preset

mod routes;
pub mod types;

pub use routes::{router, serve, AppState};
pub use types::*;
