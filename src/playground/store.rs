use std::sync::Arc;
use tokio::sync::watch;

use super::{Credential, PlaygroundState, Preset, SessionConfig, ValidationError};

/// State transitions accepted by [`PlaygroundStore::dispatch`].
#[derive(Debug, Clone)]
pub enum PlaygroundAction {
    SetSessionConfig(SessionConfig),
    SetInstructions(String),
    SetCredential(Credential),
    SetUserPresets(Vec<Preset>),
    /// Apply a preset's instructions and session config.
    SelectPreset(String),
}

/// Single owner of the playground state.
///
/// Readers take snapshots or subscribe to change notifications.
#[derive(Debug)]
pub struct PlaygroundStore {
    state: watch::Sender<PlaygroundState>,
}

pub type SharedPlaygroundStore = Arc<PlaygroundStore>;

impl PlaygroundStore {
    pub fn new(initial: PlaygroundState) -> Self {
        let (state, _) = watch::channel(initial);
        Self { state }
    }

    /// Get a clone of the current state.
    pub fn snapshot(&self) -> PlaygroundState {
        self.state.borrow().clone()
    }

    pub fn session_config(&self) -> SessionConfig {
        self.state.borrow().session_config.clone()
    }

    pub fn credential(&self) -> Credential {
        self.state.borrow().credential.clone()
    }

    /// Receiver notified after every state change.
    pub fn subscribe(&self) -> watch::Receiver<PlaygroundState> {
        self.state.subscribe()
    }

    /// Apply an action. Returns whether the state changed.
    pub fn dispatch(&self, action: PlaygroundAction) -> Result<bool, ValidationError> {
        let action = match action {
            PlaygroundAction::SetSessionConfig(config) => {
                config.validate()?;
                PlaygroundAction::SetSessionConfig(config)
            }
            PlaygroundAction::SelectPreset(id) => {
                if self.state.borrow().find_preset(&id).is_none() {
                    return Err(ValidationError::UnknownPreset(id));
                }
                PlaygroundAction::SelectPreset(id)
            }
            other => other,
        };

        let changed = self.state.send_if_modified(|state| reduce(state, action));
        if changed {
            tracing::debug!("Playground state updated");
        }
        Ok(changed)
    }
}

fn reduce(state: &mut PlaygroundState, action: PlaygroundAction) -> bool {
    match action {
        PlaygroundAction::SetSessionConfig(config) => {
            replace_if_different(&mut state.session_config, config)
        }
        PlaygroundAction::SetInstructions(instructions) => {
            replace_if_different(&mut state.instructions, instructions)
        }
        PlaygroundAction::SetCredential(credential) => {
            replace_if_different(&mut state.credential, credential)
        }
        PlaygroundAction::SetUserPresets(presets) => {
            replace_if_different(&mut state.user_presets, presets)
        }
        PlaygroundAction::SelectPreset(id) => {
            let Some(preset) = state.find_preset(&id) else {
                return false;
            };
            let mut changed = replace_if_different(&mut state.selected_preset_id, Some(id));
            changed |= replace_if_different(&mut state.instructions, preset.instructions);
            changed |= replace_if_different(&mut state.session_config, preset.session_config);
            changed
        }
    }
}

fn replace_if_different<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        false
    } else {
        *slot = value;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playground::VoiceId;

    #[test]
    fn dispatch_reports_changes() {
        let store = PlaygroundStore::new(PlaygroundState::default());
        let mut config = store.session_config();
        assert!(!store
            .dispatch(PlaygroundAction::SetSessionConfig(config.clone()))
            .unwrap());

        config.voice = VoiceId::Fenrir;
        assert!(store
            .dispatch(PlaygroundAction::SetSessionConfig(config))
            .unwrap());
        assert_eq!(store.session_config().voice, VoiceId::Fenrir);
    }

    #[test]
    fn invalid_config_is_rejected_without_change() {
        let store = PlaygroundStore::new(PlaygroundState::default());
        let config = SessionConfig {
            temperature: 2.0,
            ..SessionConfig::default()
        };
        assert!(store
            .dispatch(PlaygroundAction::SetSessionConfig(config))
            .is_err());
        assert_eq!(store.session_config().temperature, 0.8);
    }

    #[test]
    fn select_preset_applies_instructions_and_config() {
        let store = PlaygroundStore::new(PlaygroundState::with_instructions("base"));
        assert!(store
            .dispatch(PlaygroundAction::SelectPreset("nutrition-coach".to_string()))
            .unwrap());
        let state = store.snapshot();
        assert_eq!(state.selected_preset_id.as_deref(), Some("nutrition-coach"));
        assert_eq!(state.session_config.voice, VoiceId::Kore);
        assert!(state.instructions.contains("nutrition coach"));

        assert_eq!(
            store.dispatch(PlaygroundAction::SelectPreset("nope".to_string())),
            Err(ValidationError::UnknownPreset("nope".to_string()))
        );
    }

    #[tokio::test]
    async fn subscribers_see_changes_only() {
        let store = PlaygroundStore::new(PlaygroundState::default());
        let mut rx = store.subscribe();

        store
            .dispatch(PlaygroundAction::SetInstructions(
                store.snapshot().instructions,
            ))
            .unwrap();
        assert!(!rx.has_changed().unwrap());

        store
            .dispatch(PlaygroundAction::SetCredential(Credential::Revoked))
            .unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().credential, Credential::Revoked);
    }
}
