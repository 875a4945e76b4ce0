use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{StudioError, StudioResult};
use crate::{logi, logok, logw};

/// Voice settings handed to the synthesizer on `init`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechOptions {
    pub volume: f32,
    pub lang: String,
    pub rate: f32,
    pub pitch: f32,
    pub split_sentences: bool,
}

impl Default for SpeechOptions {
    fn default() -> Self {
        Self {
            volume: 1.0,
            lang: "en-US".to_string(),
            rate: 1.0,
            pitch: 1.0,
            split_sentences: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpeechState {
    #[default]
    Uninitialized,
    Initializing,
    Ready,
    InitFailed,
}

#[async_trait::async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn init(&self, options: &SpeechOptions) -> StudioResult<()>;
    async fn speak(&self, text: &str) -> StudioResult<()>;
}

/// Lifecycle wrapper around one shared synthesizer.
///
/// Utterances are queued: each `speak` waits for the previous one to finish
/// before its first sentence is synthesized. `init` and `shutdown` wait in
/// the same queue, so they never interleave with a running utterance.
pub struct SpeechEngine {
    synth: Arc<dyn SpeechSynthesizer>,
    options: SpeechOptions,
    state: Mutex<SpeechState>,
    queue: tokio::sync::Mutex<()>,
    timeout: Duration,
}

impl SpeechEngine {
    pub fn new(synth: Arc<dyn SpeechSynthesizer>, options: SpeechOptions) -> Self {
        Self {
            synth,
            options,
            state: Mutex::new(SpeechState::Uninitialized),
            queue: tokio::sync::Mutex::new(()),
            timeout: Duration::from_secs(60),
        }
    }

    /// Bounds each synthesizer call; an expired call counts as a failure.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn bounded<F>(&self, fut: F) -> StudioResult<()>
    where
        F: std::future::Future<Output = StudioResult<()>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(StudioError::collaborator(
                "speech synthesis",
                format!("timed out after {:?}", self.timeout),
            )),
        }
    }

    pub fn state(&self) -> SpeechState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_state(&self, next: SpeechState) {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = next;
    }

    pub fn options(&self) -> &SpeechOptions {
        &self.options
    }

    /// Brings the engine to `Ready`. A second call once ready is a no-op;
    /// a call after `InitFailed` makes a fresh attempt.
    pub async fn init(&self) -> StudioResult<()> {
        let _turn = self.queue.lock().await;
        if self.state() == SpeechState::Ready {
            return Ok(());
        }

        self.set_state(SpeechState::Initializing);
        logi(format!("Initializing speech synthesis ({})", self.options.lang));
        match self.bounded(self.synth.init(&self.options)).await {
            Ok(()) => {
                self.set_state(SpeechState::Ready);
                logok("Speech is ready");
                Ok(())
            }
            Err(err) => {
                self.set_state(SpeechState::InitFailed);
                logw(format!("Speech synthesis initialization error: {}", err));
                Err(err)
            }
        }
    }

    pub async fn shutdown(&self) {
        let _turn = self.queue.lock().await;
        self.set_state(SpeechState::Uninitialized);
    }

    /// Speaks `text`, returning how many utterances were synthesized.
    pub async fn speak(&self, text: &str) -> StudioResult<usize> {
        if text.trim().is_empty() {
            return Err(StudioError::validation("Please enter text to convert"));
        }
        if self.state() != SpeechState::Ready {
            return Err(StudioError::NotReady("speech synthesis"));
        }

        let _turn = self.queue.lock().await;
        if self.state() != SpeechState::Ready {
            return Err(StudioError::NotReady("speech synthesis"));
        }

        let chunks = if self.options.split_sentences {
            split_sentences(text)
        } else {
            vec![text.trim().to_string()]
        };
        for chunk in &chunks {
            self.bounded(self.synth.speak(chunk)).await?;
        }
        Ok(chunks.len())
    }
}

fn sentence_regex() -> Result<&'static Regex> {
    static SENTENCE_RE: OnceCell<Regex> = OnceCell::new();
    SENTENCE_RE.get_or_try_init(|| {
        Regex::new(r#"[^.!?]+(?:[.!?]+["')\]]*|$)"#).context("failed to compile sentence regex")
    })
}

/// Splits text on terminal punctuation, keeping the punctuation with its
/// sentence.
pub fn split_sentences(text: &str) -> Vec<String> {
    let sentences: Vec<String> = match sentence_regex() {
        Ok(re) => re
            .find_iter(text)
            .map(|m| m.as_str().trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        Err(err) => {
            logw(err.to_string());
            Vec::new()
        }
    };

    if sentences.is_empty() {
        vec![text.trim().to_string()]
    } else {
        sentences
    }
}
