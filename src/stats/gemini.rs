use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::provider::TextGenerator;

/// Text generator backed by the Gemini `generateContent` REST endpoint.
/// Docs: <https://ai.google.dev/api/generate-content>
#[derive(Clone)]
pub struct GeminiClient {
    http: Client,
    api_key: Option<String>,
    /// Base URL for overriding in tests
    api_url: String,
    model: String,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GeminiClient {
    pub fn new(
        api_key: Option<String>,
        api_url: &str,
        model: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(GeminiClient {
            http,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            api_url: api_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.api_url, self.model)
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    fn name(&self) -> &str {
        "Gemini"
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let api_key = self
            .api_key
            .as_deref()
            .context("GEMINI_API_KEY is not set")?;

        let url = self.endpoint();
        debug!("Requesting team stats from {}", url);

        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
        };

        let resp = self
            .http
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await
            .context("Gemini request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Gemini API error {}: {}", status, body);
        }

        let raw: GenerateResponse = resp
            .json()
            .await
            .context("Failed to parse Gemini response")?;

        extract_text(raw)
    }
}

fn extract_text(raw: GenerateResponse) -> Result<String> {
    let content = raw
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .context("Gemini response has no candidates")?;

    let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
    if text.trim().is_empty() {
        anyhow::bail!("Gemini response has no text");
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        http::{HeaderMap, StatusCode, Uri},
        Json, Router,
    };
    use serde_json::{json, Value};

    /// Serve `app` on an ephemeral local port and return its base URL.
    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn client(api_key: Option<&str>, url: &str) -> GeminiClient {
        GeminiClient::new(
            api_key.map(str::to_string),
            url,
            "gemini-1.5-flash",
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_extract_text_joins_parts() {
        let raw: GenerateResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": { "parts": [{ "text": "```json\n{" }, { "text": "}\n```" }] }
            }]
        }))
        .unwrap();
        assert_eq!(extract_text(raw).unwrap(), "```json\n{}\n```");
    }

    #[test]
    fn test_extract_text_no_candidates() {
        let raw: GenerateResponse = serde_json::from_value(json!({ "candidates": [] })).unwrap();
        assert!(extract_text(raw).is_err());

        let blocked: GenerateResponse =
            serde_json::from_value(json!({ "promptFeedback": { "blockReason": "SAFETY" } }))
                .unwrap();
        assert!(extract_text(blocked).is_err());
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let c = client(Some("k"), "https://example.test/v1beta/");
        assert_eq!(
            c.endpoint(),
            "https://example.test/v1beta/models/gemini-1.5-flash:generateContent"
        );
    }

    #[tokio::test]
    async fn test_missing_api_key_fails_without_request() {
        let c = client(None, "http://127.0.0.1:9");
        assert!(!c.has_api_key());
        let err = c.generate("hi").await.unwrap_err();
        assert!(err.to_string().contains("GEMINI_API_KEY"));

        let blank = client(Some("  "), "http://127.0.0.1:9");
        assert!(!blank.has_api_key());
    }

    #[tokio::test]
    async fn test_generate_sends_prompt_and_key() {
        let app = Router::new().fallback(
            |uri: Uri, headers: HeaderMap, Json(body): Json<Value>| async move {
                assert_eq!(uri.path(), "/models/gemini-1.5-flash:generateContent");
                assert_eq!(headers["x-goog-api-key"], "secret");
                let prompt = body["contents"][0]["parts"][0]["text"]
                    .as_str()
                    .unwrap_or_default()
                    .to_string();
                Json(json!({
                    "candidates": [{ "content": { "parts": [{ "text": format!("echo: {prompt}") }] } }]
                }))
            },
        );
        let url = serve(app).await;

        let text = client(Some("secret"), &url).generate("stats for CSK").await.unwrap();
        assert_eq!(text, "echo: stats for CSK");
    }

    #[tokio::test]
    async fn test_generate_non_success_status_is_error() {
        let app = Router::new()
            .fallback(|| async { (StatusCode::FORBIDDEN, "API key not valid") });
        let url = serve(app).await;

        let err = client(Some("bad"), &url).generate("x").await.unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("403"), "unexpected error: {msg}");
        assert!(msg.contains("API key not valid"));
    }
}
