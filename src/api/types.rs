//! API request and response types. JSON field names are camelCase throughout,
//! matching the playground state.

use serde::{Deserialize, Serialize};

use crate::connection::{ConnectOutcome, ConnectionDetails, ConnectionPhase};
use crate::playground::Preset;

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Current connection state. The access token is never included.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionResponse {
    pub phase: ConnectionPhase,
    pub details: ConnectionDetails,
    /// The configured voice differs from the live session's voice
    pub needs_reconnect: bool,
}

/// Result of a connect or reconnect request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectResponse {
    /// `connected`, `already_connecting` or `already_connected`
    pub outcome: String,
    pub connection: ConnectionResponse,
}

impl ConnectResponse {
    pub fn outcome_name(outcome: &ConnectOutcome) -> &'static str {
        match outcome {
            ConnectOutcome::Connected(_) => "connected",
            ConnectOutcome::AlreadyConnecting => "already_connecting",
            ConnectOutcome::AlreadyConnected => "already_connected",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateInstructionsRequest {
    pub instructions: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstructionsResponse {
    pub instructions: String,
    pub changed: bool,
}

/// Built-in and user presets, plus the current selection.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresetsResponse {
    pub selected_preset_id: Option<String>,
    pub presets: Vec<Preset>,
}
