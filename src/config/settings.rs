//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across tasks.
//! The API key is deliberately absent: it is supplied per session by the
//! front end and validated by [`Credential`](crate::credential::Credential).

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;
use crate::conversation::DEFAULT_SYSTEM_PROMPT;
use crate::llm::ModelChoice;

// ---------------------------------------------------------------------------
// ChatConfig
// ---------------------------------------------------------------------------

/// Settings for the chat-completion service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Base URL of an OpenAI-compatible API (`/v1/chat/completions` is
    /// appended).
    pub base_url: String,
    /// Model selection as shown to the user; mapped to a concrete service
    /// model id by [`ModelChoice::service_model_id`].
    pub model: ModelChoice,
    /// Behavioural instruction seeded as the first history message.
    pub system_prompt: String,
    /// Maximum seconds to wait for a reply before the call fails.
    pub timeout_secs: u64,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".into(),
            model: ModelChoice::default(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.into(),
            timeout_secs: 60,
        }
    }
}

// ---------------------------------------------------------------------------
// SttConfig
// ---------------------------------------------------------------------------

/// Settings for the speech-to-text service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SttConfig {
    /// Base URL of an OpenAI-compatible API (`/v1/audio/transcriptions` is
    /// appended).
    pub base_url: String,
    /// Transcription model id.
    pub model: String,
    /// Spoken language as an ISO-639-1 code.
    pub language: String,
    pub timeout_secs: u64,
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".into(),
            model: "whisper-1".into(),
            language: "ko".into(),
            timeout_secs: 60,
        }
    }
}

// ---------------------------------------------------------------------------
// TtsConfig
// ---------------------------------------------------------------------------

/// Which text-to-speech backend voices the replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TtsProvider {
    /// Google Translate's public `translate_tts` endpoint; no key required.
    GoogleTranslate,
    /// OpenAI `/v1/audio/speech`; uses the session API key.
    OpenAi,
}

impl Default for TtsProvider {
    fn default() -> Self {
        Self::GoogleTranslate
    }
}

/// Settings for speech synthesis.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TtsConfig {
    pub provider: TtsProvider,
    /// Language of the spoken reply (Google Translate only).
    pub language: String,
    /// Base URL for the OpenAI provider.
    pub base_url: String,
    /// Model id for the OpenAI provider.
    pub model: String,
    /// Voice name for the OpenAI provider.
    pub voice: String,
    pub timeout_secs: u64,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            provider: TtsProvider::default(),
            language: "ko".into(),
            base_url: "https://api.openai.com".into(),
            model: "tts-1".into(),
            voice: "alloy".into(),
            timeout_secs: 30,
        }
    }
}

// ---------------------------------------------------------------------------
// AudioConfig
// ---------------------------------------------------------------------------

/// Settings for recording and transient audio files.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Directory for transient `input-*.wav` / `output-*.mp3` artifacts.
    /// `None` means the system temp directory.
    pub scratch_dir: Option<PathBuf>,
    /// Recording stops accumulating samples after this many seconds.
    pub max_recording_secs: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            scratch_dir: None,
            max_recording_secs: 120.0,
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// ```rust,no_run
/// use voice_assistant::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub chat: ChatConfig,
    pub stt: SttConfig,
    pub tts: TtsConfig,
    pub audio: AudioConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn round_trip_toml() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("settings.toml");

        let original = AppConfig::default();
        original.save_to(&path).expect("save");

        let loaded = AppConfig::load_from(&path).expect("load");

        assert_eq!(original.chat.base_url, loaded.chat.base_url);
        assert_eq!(original.chat.model, loaded.chat.model);
        assert_eq!(original.chat.system_prompt, loaded.chat.system_prompt);
        assert_eq!(original.stt.model, loaded.stt.model);
        assert_eq!(original.stt.language, loaded.stt.language);
        assert_eq!(original.tts.provider, loaded.tts.provider);
        assert_eq!(original.audio.scratch_dir, loaded.audio.scratch_dir);
    }

    /// `load_from` on a non-existent path must return `Default` without error.
    #[test]
    fn load_missing_returns_default() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nonexistent.toml");

        let config = AppConfig::load_from(&path).expect("should not error");
        assert_eq!(config.chat.model, ModelChoice::default());
        assert_eq!(config.stt.language, "ko");
    }

    #[test]
    fn default_values() {
        let cfg = AppConfig::default();

        assert_eq!(cfg.chat.base_url, "https://api.openai.com");
        assert_eq!(cfg.chat.model, ModelChoice::Gpt4);
        assert_eq!(cfg.chat.system_prompt, DEFAULT_SYSTEM_PROMPT);
        assert_eq!(cfg.stt.model, "whisper-1");
        assert_eq!(cfg.stt.language, "ko");
        assert_eq!(cfg.tts.provider, TtsProvider::GoogleTranslate);
        assert_eq!(cfg.tts.language, "ko");
        assert!(cfg.audio.scratch_dir.is_none());
    }

    /// Sections missing from the file fall back to their defaults.
    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("partial.toml");
        std::fs::write(&path, "[chat]\nmodel = \"gpt-3.5-turbo\"\n").unwrap();

        let cfg = AppConfig::load_from(&path).expect("load");
        assert_eq!(cfg.chat.model, ModelChoice::Gpt35Turbo);
        assert_eq!(cfg.chat.base_url, "https://api.openai.com");
        assert_eq!(cfg.stt.model, "whisper-1");
    }

    #[test]
    fn round_trip_modified_values() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("modified.toml");

        let mut cfg = AppConfig::default();
        cfg.chat.model = ModelChoice::Gpt35Turbo;
        cfg.chat.system_prompt = "Answer in English".into();
        cfg.stt.language = "en".into();
        cfg.tts.provider = TtsProvider::OpenAi;
        cfg.tts.voice = "nova".into();
        cfg.audio.scratch_dir = Some(dir.path().to_path_buf());

        cfg.save_to(&path).expect("save");
        let loaded = AppConfig::load_from(&path).expect("load");

        assert_eq!(loaded.chat.model, ModelChoice::Gpt35Turbo);
        assert_eq!(loaded.chat.system_prompt, "Answer in English");
        assert_eq!(loaded.stt.language, "en");
        assert_eq!(loaded.tts.provider, TtsProvider::OpenAi);
        assert_eq!(loaded.tts.voice, "nova");
        assert_eq!(loaded.audio.scratch_dir, Some(dir.path().to_path_buf()));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[chat\nmodel = ").unwrap();

        assert!(AppConfig::load_from(&path).is_err());
    }
}
