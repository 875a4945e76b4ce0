use std::path::Path;

use serde::Deserialize;

use crate::error::{StudioError, StudioResult};
use crate::media::FoundClip;

pub mod elevenlabs;
pub mod gemini;
pub mod stock;

/// Raw answer of the script-generation backend.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct ScriptResponse {
    #[serde(default)]
    pub candidates: Vec<ScriptCandidate>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct ScriptCandidate {
    #[serde(default)]
    pub content: Option<CandidateContent>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<ContentPart>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct ContentPart {
    #[serde(default)]
    pub text: Option<String>,
}

impl ScriptResponse {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            candidates: vec![ScriptCandidate {
                content: Some(CandidateContent {
                    parts: vec![ContentPart {
                        text: Some(text.into()),
                    }],
                }),
            }],
        }
    }

    /// Text of the first candidate. A missing candidate, part or text is a
    /// failed generation, never an empty script.
    pub fn first_text(&self) -> StudioResult<String> {
        let candidate = self
            .candidates
            .first()
            .ok_or_else(|| {
                StudioError::collaborator("script generation", "no candidates returned")
            })?;
        candidate
            .content
            .as_ref()
            .and_then(|c| c.parts.first())
            .and_then(|p| p.text.as_deref())
            .filter(|t| !t.trim().is_empty())
            .map(str::to_string)
            .ok_or_else(|| {
                StudioError::collaborator("script generation", "first candidate has no text")
            })
    }
}

#[async_trait::async_trait]
pub trait ScriptGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> StudioResult<ScriptResponse>;
}

#[async_trait::async_trait]
pub trait VideoSearcher: Send + Sync {
    async fn search(&self, query: &str) -> StudioResult<Vec<FoundClip>>;
}

#[async_trait::async_trait]
pub trait ClipDownloader: Send + Sync {
    /// Stores the clip at `url` into `dest`, returning the bytes written.
    async fn download(&self, url: &str, dest: &Path) -> StudioResult<u64>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_text_reads_first_candidate() {
        let json = r#"{"candidates":[
            {"content":{"parts":[{"text":"Scene one."},{"text":"ignored"}]}},
            {"content":{"parts":[{"text":"Second candidate"}]}}
        ]}"#;
        let resp: ScriptResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.first_text().unwrap(), "Scene one.");
    }

    #[test]
    fn empty_candidate_list_is_a_failure() {
        let resp: ScriptResponse = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert!(matches!(
            resp.first_text(),
            Err(StudioError::Collaborator { .. })
        ));

        let resp: ScriptResponse = serde_json::from_str("{}").unwrap();
        assert!(resp.first_text().is_err());
    }

    #[test]
    fn candidate_without_parts_is_a_failure() {
        let resp: ScriptResponse =
            serde_json::from_str(r#"{"candidates":[{"content":{"parts":[]}}]}"#).unwrap();
        assert!(resp.first_text().is_err());

        let resp: ScriptResponse =
            serde_json::from_str(r#"{"candidates":[{"finishReason":"SAFETY"}]}"#).unwrap();
        assert!(resp.first_text().is_err());
    }
}
