use crate::api::{ScriptGenerator, ScriptResponse};
use crate::config::Config;
use crate::error::{StudioError, StudioResult};
use crate::logw;
use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::json;

const SERVICE: &str = "script generation";

fn gemini_error_message(raw: &str) -> Option<String> {
    let root: serde_json::Value = serde_json::from_str(raw).ok()?;
    let err = root.get("error")?;
    let msg = err.get("message").and_then(|v| v.as_str())?;
    match err.get("status").and_then(|v| v.as_str()) {
        Some(status) => Some(format!("{} ({})", msg, status)),
        None => Some(msg.to_string()),
    }
}

/// Script generation through the Gemini `generateContent` endpoint.
pub struct GeminiClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(cfg: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(cfg.request_timeout())
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self::with_client(client, cfg))
    }

    pub fn with_client(client: Client, cfg: &Config) -> Self {
        Self {
            client,
            base_url: cfg.gemini_base_url.trim_end_matches('/').to_string(),
            model: cfg.gemini_model.clone(),
            api_key: cfg.gemini_api_key.clone(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait::async_trait]
impl ScriptGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> StudioResult<ScriptResponse> {
        let body = json!({
            "contents": [
                {"parts": [{"text": prompt}]}
            ],
        });

        let resp = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| StudioError::collaborator(SERVICE, e.without_url()))?;

        let status = resp.status();
        let raw = resp
            .text()
            .await
            .map_err(|e| StudioError::collaborator(SERVICE, e.without_url()))?;

        if !status.is_success() {
            logw(format!("Gemini HTTP {}", status.as_u16()));
            let detail = gemini_error_message(&raw)
                .unwrap_or_else(|| raw.chars().take(300).collect::<String>());
            return Err(StudioError::collaborator(
                SERVICE,
                format!("HTTP {}: {}", status.as_u16(), detail),
            ));
        }

        serde_json::from_str::<ScriptResponse>(&raw).map_err(|e| {
            logw(format!(
                "Gemini raw body: {}",
                raw.chars().take(800).collect::<String>()
            ));
            StudioError::collaborator(SERVICE, format!("malformed response: {}", e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> Config {
        let mut cfg = Config::from_json(r#"{"gemini_api_key":"test-key"}"#).unwrap();
        cfg.gemini_base_url = server.uri();
        cfg
    }

    #[tokio::test]
    async fn posts_prompt_and_parses_candidates() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-1.5-flash:generateContent"))
            .and(header("x-goog-api-key", "test-key"))
            .and(body_partial_json(
                json!({"contents": [{"parts": [{"text": "ocean life"}]}]}),
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{"content": {"parts": [{"text": "Dive in."}], "role": "model"}}]
            })))
            .mount(&server)
            .await;

        let client = GeminiClient::new(&config_for(&server)).unwrap();
        let resp = client.generate("ocean life").await.unwrap();
        assert_eq!(resp.first_text().unwrap(), "Dive in.");
    }

    #[tokio::test]
    async fn non_success_status_reports_api_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {"code": 400, "message": "API key not valid", "status": "INVALID_ARGUMENT"}
            })))
            .mount(&server)
            .await;

        let client = GeminiClient::new(&config_for(&server)).unwrap();
        let err = client.generate("anything").await.unwrap_err();
        let text = err.to_string();
        assert!(text.contains("HTTP 400"), "{text}");
        assert!(text.contains("API key not valid"), "{text}");
    }

    #[tokio::test]
    async fn garbage_body_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy</html>"))
            .mount(&server)
            .await;

        let client = GeminiClient::new(&config_for(&server)).unwrap();
        let err = client.generate("anything").await.unwrap_err();
        assert!(err.to_string().contains("malformed response"));
    }

    #[tokio::test]
    async fn transport_error_does_not_leak_api_key() {
        let mut cfg = Config::from_json(r#"{"gemini_api_key":"SECRET-KEY-123"}"#).unwrap();
        cfg.gemini_base_url = "http://127.0.0.1:9".to_string();

        let client = GeminiClient::new(&cfg).unwrap();
        let err = client.generate("x").await.unwrap_err();
        let text = err.to_string();
        assert!(text.starts_with("script generation failed"), "{text}");
        assert!(!text.contains("SECRET-KEY-123"), "{text}");
    }
}
