//! Built-in presets and the default base instructions.

use super::{ModalitiesId, Preset, SessionConfig, VoiceId};

pub const DEFAULT_PRESET_ID: &str = "helpful-ai";

/// Base instructions for the health assistant.
///
/// `{AIAgentGender}` is left for the agent host to fill in.
pub const DEFAULT_INSTRUCTIONS: &str = include_str!("base_instructions.txt");

pub fn default_presets() -> Vec<Preset> {
    vec![
        Preset {
            id: DEFAULT_PRESET_ID.to_string(),
            name: "Health Assistant".to_string(),
            description: Some("Logs health events and answers order questions.".to_string()),
            instructions: DEFAULT_INSTRUCTIONS.to_string(),
            session_config: SessionConfig::default(),
        },
        Preset {
            id: "nutrition-coach".to_string(),
            name: "Nutrition Coach".to_string(),
            description: Some("Focuses on the last week of food logs.".to_string()),
            instructions: "You are an experienced, non-judgmental nutrition coach. \
When asked, turn the user's food log into clear averages and one actionable tip at a time, \
then ask an open-ended question."
                .to_string(),
            session_config: SessionConfig {
                voice: VoiceId::Kore,
                modalities: ModalitiesId::AudioOnly,
                temperature: 0.7,
                ..SessionConfig::default()
            },
        },
    ]
}
