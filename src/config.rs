use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

use crate::speech::SpeechOptions;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub gemini_api_key: String,
    #[serde(default = "default_gemini_model")]
    pub gemini_model: String,
    #[serde(default = "default_gemini_base_url")]
    pub gemini_base_url: String,
    #[serde(default = "default_search_base_url")]
    pub search_base_url: String,
    #[serde(rename = "elevenlabs_api_key")]
    #[serde(default)]
    pub elevenlabs_key: String,
    #[serde(default = "default_voice_id")]
    pub eleven_voice_id: String,
    #[serde(default = "default_model_id")]
    pub eleven_model_id: String,
    #[serde(default = "default_elevenlabs_base_url")]
    pub elevenlabs_base_url: String,
    #[serde(default)]
    pub speech: SpeechOptions,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_gemini_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_search_base_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_voice_id() -> String {
    "JBFqnCBsd6RMkjVDRZzb".to_string()
}

fn default_model_id() -> String {
    "eleven_multilingual_v2".to_string()
}

fn default_elevenlabs_base_url() -> String {
    "https://api.elevenlabs.io".to_string()
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("studio_output")
}

impl Config {
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read config: {}", path.as_ref().display()))?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(content).context("config.json is not valid")?;

        if config.gemini_api_key.is_empty() {
            anyhow::bail!("config.json: gemini_api_key missing");
        }
        if config.request_timeout_secs == 0 {
            anyhow::bail!("config.json: request_timeout_secs must be positive");
        }

        Ok(config)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn speech_dir(&self) -> PathBuf {
        self.output_dir.join("speech")
    }

    pub fn downloads_dir(&self) -> PathBuf {
        self.output_dir.join("downloads")
    }

    pub fn playlists_dir(&self) -> PathBuf {
        self.output_dir.join("playlists")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_optional_fields() {
        let cfg = Config::from_json(r#"{"gemini_api_key":"g-key"}"#).unwrap();
        assert_eq!(cfg.search_base_url, "http://localhost:5000");
        assert_eq!(cfg.gemini_model, "gemini-1.5-flash");
        assert_eq!(cfg.request_timeout(), Duration::from_secs(60));
        assert!(cfg.elevenlabs_key.is_empty());
        assert_eq!(cfg.speech, SpeechOptions::default());
        assert_eq!(cfg.speech_dir(), PathBuf::from("studio_output/speech"));
    }

    #[test]
    fn speech_options_can_be_overridden() {
        let cfg = Config::from_json(
            r#"{"gemini_api_key":"g","speech":{"lang":"de-DE","split_sentences":false}}"#,
        )
        .unwrap();
        assert_eq!(cfg.speech.lang, "de-DE");
        assert!(!cfg.speech.split_sentences);
        assert_eq!(cfg.speech.volume, 1.0);
    }

    #[test]
    fn missing_gemini_key_is_rejected() {
        assert!(Config::from_json(r#"{"gemini_api_key":""}"#).is_err());
        assert!(Config::from_json(r#"{"search_base_url":"http://x"}"#).is_err());
    }

    #[test]
    fn zero_timeout_is_rejected() {
        assert!(Config::from_json(r#"{"gemini_api_key":"g","request_timeout_secs":0}"#).is_err());
    }
}
