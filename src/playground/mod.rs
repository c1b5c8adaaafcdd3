//! Playground state: session configuration, instructions and credential material.
//!
//! The state is owned by a [`PlaygroundStore`] that is created once and handed
//! to every component that needs it. Mutation happens only through
//! [`PlaygroundAction`]s.

mod presets;
mod store;

pub use presets::{default_presets, DEFAULT_INSTRUCTIONS, DEFAULT_PRESET_ID};
pub use store::{PlaygroundAction, PlaygroundStore, SharedPlaygroundStore};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Lowest accepted sampling temperature.
pub const MIN_TEMPERATURE: f64 = 0.6;
/// Highest accepted sampling temperature.
pub const MAX_TEMPERATURE: f64 = 1.2;

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("temperature {0} is outside [0.6, 1.2]")]
    TemperatureOutOfRange(f64),

    #[error("max output tokens must be greater than zero")]
    ZeroMaxOutputTokens,

    #[error("unknown voice: {0}")]
    UnknownVoice(String),

    #[error("unknown preset: {0}")]
    UnknownPreset(String),
}

/// Voices the agent can speak with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum VoiceId {
    Aoede,
    Kore,
    #[default]
    Puck,
    Charon,
    Fenrir,
}

impl VoiceId {
    pub const ALL: [VoiceId; 5] = [
        VoiceId::Aoede,
        VoiceId::Kore,
        VoiceId::Puck,
        VoiceId::Charon,
        VoiceId::Fenrir,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VoiceId::Aoede => "Aoede",
            VoiceId::Kore => "Kore",
            VoiceId::Puck => "Puck",
            VoiceId::Charon => "Charon",
            VoiceId::Fenrir => "Fenrir",
        }
    }
}

impl fmt::Display for VoiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VoiceId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VoiceId::ALL
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ValidationError::UnknownVoice(s.to_string()))
    }
}

/// Realtime model identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ModelId {
    #[default]
    #[serde(rename = "gemini-2.0-flash-exp")]
    Gemini20FlashExp,
    #[serde(rename = "gemini-2.0-flash-live-001")]
    Gemini20FlashLive,
}

impl ModelId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelId::Gemini20FlashExp => "gemini-2.0-flash-exp",
            ModelId::Gemini20FlashLive => "gemini-2.0-flash-live-001",
        }
    }
}

/// Output modalities requested from the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModalitiesId {
    TextAndAudio,
    #[default]
    AudioOnly,
    TextOnly,
}

impl ModalitiesId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModalitiesId::TextAndAudio => "text_and_audio",
            ModalitiesId::AudioOnly => "audio_only",
            ModalitiesId::TextOnly => "text_only",
        }
    }
}

/// User-editable parameters for the agent's voice and model behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    pub model: ModelId,
    pub modalities: ModalitiesId,
    pub voice: VoiceId,
    pub temperature: f64,
    pub max_output_tokens: Option<u32>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            model: ModelId::default(),
            modalities: ModalitiesId::default(),
            voice: VoiceId::default(),
            temperature: 0.8,
            max_output_tokens: None,
        }
    }
}

impl SessionConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(MIN_TEMPERATURE..=MAX_TEMPERATURE).contains(&self.temperature) {
            return Err(ValidationError::TemperatureOutOfRange(self.temperature));
        }
        if self.max_output_tokens == Some(0) {
            return Err(ValidationError::ZeroMaxOutputTokens);
        }
        Ok(())
    }
}

/// Credential material forwarded to the token endpoint and the running agent.
///
/// `Unset` is the initial state, `Revoked` means it was explicitly cleared.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Credential {
    #[default]
    Unset,
    Revoked,
    Present(String),
}

impl Credential {
    pub fn is_unset(&self) -> bool {
        matches!(self, Credential::Unset)
    }

    pub fn as_deref(&self) -> Option<&str> {
        match self {
            Credential::Present(value) => Some(value.as_str()),
            _ => None,
        }
    }
}

impl Serialize for Credential {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Credential::Present(value) => serializer.serialize_str(value),
            Credential::Unset | Credential::Revoked => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for Credential {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Option::<String>::deserialize(deserializer)? {
            Some(value) => Credential::Present(value),
            None => Credential::Revoked,
        })
    }
}

/// Named bundle of instructions and session configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preset {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub instructions: String,
    pub session_config: SessionConfig,
}

/// Everything the token endpoint needs to open a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaygroundState {
    pub session_config: SessionConfig,
    #[serde(default)]
    pub user_presets: Vec<Preset>,
    pub selected_preset_id: Option<String>,
    #[serde(
        rename = "geminiAPIKey",
        default,
        skip_serializing_if = "Credential::is_unset"
    )]
    pub credential: Credential,
    pub instructions: String,
}

impl Default for PlaygroundState {
    fn default() -> Self {
        Self {
            session_config: SessionConfig::default(),
            user_presets: Vec::new(),
            selected_preset_id: Some(DEFAULT_PRESET_ID.to_string()),
            credential: Credential::Unset,
            instructions: DEFAULT_INSTRUCTIONS.to_string(),
        }
    }
}

impl PlaygroundState {
    /// Default state with the base instructions replaced.
    pub fn with_instructions(instructions: impl Into<String>) -> Self {
        Self {
            instructions: instructions.into(),
            ..Self::default()
        }
    }

    /// Look up a preset by id among the built-in and user presets.
    pub fn find_preset(&self, id: &str) -> Option<Preset> {
        self.user_presets
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .or_else(|| default_presets().into_iter().find(|p| p.id == id))
    }
}
