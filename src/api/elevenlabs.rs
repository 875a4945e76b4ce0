use crate::config::Config;
use crate::error::{StudioError, StudioResult};
use crate::speech::{SpeechOptions, SpeechSynthesizer};
use crate::{logi, logw};
use anyhow::{Context, Result};
use reqwest::Client;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;

const SERVICE: &str = "speech synthesis";

/// Text to speech through ElevenLabs; each utterance lands as an mp3 in
/// `out_dir`.
pub struct ElevenLabsSpeech {
    client: Client,
    base_url: String,
    api_key: String,
    voice_id: String,
    model_id: String,
    out_dir: PathBuf,
    options: Mutex<Option<SpeechOptions>>,
    seq: AtomicU64,
}

impl ElevenLabsSpeech {
    pub fn new(cfg: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(300))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: cfg.elevenlabs_base_url.trim_end_matches('/').to_string(),
            api_key: cfg.elevenlabs_key.clone(),
            voice_id: cfg.eleven_voice_id.clone(),
            model_id: cfg.eleven_model_id.clone(),
            out_dir: cfg.speech_dir(),
            options: Mutex::new(None),
            seq: AtomicU64::new(0),
        })
    }

    fn speed(&self) -> f32 {
        let guard = self.options.lock().unwrap_or_else(|e| e.into_inner());
        guard.as_ref().map(|o| o.rate).unwrap_or(1.0).clamp(0.7, 1.2)
    }
}

#[async_trait::async_trait]
impl SpeechSynthesizer for ElevenLabsSpeech {
    async fn init(&self, options: &SpeechOptions) -> StudioResult<()> {
        if self.api_key.is_empty() {
            return Err(StudioError::collaborator(SERVICE, "elevenlabs_api_key missing"));
        }
        if options.volume != 1.0 || options.pitch != 1.0 {
            logw("ElevenLabs ignores volume and pitch; using voice defaults");
        }

        let url = format!("{}/v1/voices/{}", self.base_url, self.voice_id);
        let resp = self
            .client
            .get(url)
            .header("xi-api-key", &self.api_key)
            .timeout(std::time::Duration::from_secs(30))
            .send()
            .await
            .map_err(|e| StudioError::collaborator(SERVICE, e))?;

        if !resp.status().is_success() {
            return Err(StudioError::collaborator(
                SERVICE,
                format!("voice {} unavailable (HTTP {})", self.voice_id, resp.status().as_u16()),
            ));
        }

        fs::create_dir_all(&self.out_dir)
            .await
            .map_err(|e| StudioError::collaborator(SERVICE, e))?;
        *self.options.lock().unwrap_or_else(|e| e.into_inner()) = Some(options.clone());
        Ok(())
    }

    async fn speak(&self, text: &str) -> StudioResult<()> {
        let url = format!(
            "{}/v1/text-to-speech/{}?output_format=mp3_44100_128",
            self.base_url, self.voice_id
        );

        let body = serde_json::json!({
            "text": text,
            "model_id": self.model_id,
            "voice_settings": {"speed": self.speed()},
        });

        let resp = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .header("xi-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| StudioError::collaborator(SERVICE, e))?;

        if !resp.status().is_success() {
            logw(format!("ElevenLabs TTS failed HTTP {}", resp.status().as_u16()));
            return Err(StudioError::collaborator(
                SERVICE,
                format!("HTTP {}", resp.status().as_u16()),
            ));
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| StudioError::collaborator(SERVICE, e))?;
        let seq = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        let out_mp3 = self.out_dir.join(format!("speech_{:04}.mp3", seq));
        fs::write(&out_mp3, &bytes)
            .await
            .map_err(|e| StudioError::collaborator(SERVICE, e))?;

        logi(format!("Spoke {} chars -> {}", text.chars().count(), out_mp3.display()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer, out_dir: &std::path::Path, key: &str) -> Config {
        let mut cfg = Config::from_json(r#"{"gemini_api_key":"g"}"#).unwrap();
        cfg.elevenlabs_base_url = server.uri();
        cfg.elevenlabs_key = key.to_string();
        cfg.eleven_voice_id = "voice-1".to_string();
        cfg.output_dir = out_dir.to_path_buf();
        cfg
    }

    #[tokio::test]
    async fn init_without_key_fails() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let speech = ElevenLabsSpeech::new(&config_for(&server, dir.path(), "")).unwrap();
        let err = speech.init(&SpeechOptions::default()).await.unwrap_err();
        assert!(err.to_string().contains("elevenlabs_api_key missing"));
    }

    #[tokio::test]
    async fn init_checks_voice_then_speak_writes_mp3() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/voices/voice-1"))
            .and(header("xi-api-key", "xi"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/text-to-speech/voice-1"))
            .and(body_partial_json(serde_json::json!({"text": "Hello world."})))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ID3audio".to_vec()))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let speech = ElevenLabsSpeech::new(&config_for(&server, dir.path(), "xi")).unwrap();
        speech.init(&SpeechOptions::default()).await.unwrap();
        speech.speak("Hello world.").await.unwrap();

        let written = std::fs::read(dir.path().join("speech").join("speech_0001.mp3")).unwrap();
        assert_eq!(written, b"ID3audio");
    }

    #[tokio::test]
    async fn unknown_voice_fails_init() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let speech = ElevenLabsSpeech::new(&config_for(&server, dir.path(), "xi")).unwrap();
        let err = speech.init(&SpeechOptions::default()).await.unwrap_err();
        assert!(err.to_string().contains("HTTP 404"));
    }
}
