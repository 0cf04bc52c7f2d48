use crate::session::CoordinatorSettings;
use crate::speech::{RecognizerSettings, SynthesisSettings};
use anyhow::Result;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub assistant: AssistantConfig,
    #[serde(default)]
    pub recognition: RecognitionConfig,
    #[serde(default)]
    pub synthesis: SynthesisConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssistantConfig {
    /// Display name the assistant introduces itself with
    pub name: String,
    /// Pause before a reply is generated, in milliseconds
    pub reply_delay_ms: u64,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            name: "Nova".to_string(),
            reply_delay_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecognitionConfig {
    /// Recognition locale (e.g. "en-US")
    pub language: String,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            language: "en-US".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SynthesisConfig {
    /// Voice-name substrings to prefer, in order
    pub preferred_voices: Vec<String>,
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        let defaults = SynthesisSettings::default();
        Self {
            preferred_voices: defaults.preferred_voices,
            rate: defaults.rate,
            pitch: defaults.pitch,
            volume: defaults.volume,
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Settings for the recognition session
    pub fn recognizer_settings(&self) -> RecognizerSettings {
        RecognizerSettings {
            language: self.recognition.language.clone(),
            ..RecognizerSettings::default()
        }
    }

    /// Settings for the synthesis session
    pub fn synthesis_settings(&self) -> SynthesisSettings {
        SynthesisSettings {
            preferred_voices: self.synthesis.preferred_voices.clone(),
            rate: self.synthesis.rate,
            pitch: self.synthesis.pitch,
            volume: self.synthesis.volume,
        }
    }

    /// Settings for the session coordinator
    pub fn coordinator_settings(&self) -> CoordinatorSettings {
        CoordinatorSettings {
            reply_delay: Duration::from_millis(self.assistant.reply_delay_ms),
        }
    }
}
