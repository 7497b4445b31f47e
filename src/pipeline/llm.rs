//! Vision-model interaction: one image in, one parsed record out.
//!
//! [`VisionModel`] is the seam: anything that can turn an image plus a
//! prompt into raw text. [`ExtractionClient`] is the HTTP implementation
//! for the two supported providers. They share everything except two
//! things, isolated below per variant:
//!
//! * request shape: OpenAI-style `messages` (Groq) vs. `contents/parts` (Gemini)
//! * response path: `choices[0].message.content` vs.
//!   `candidates[0].content.parts[0].text`
//!
//! Each call is a single blocking round-trip. There is no retry, backoff
//! or streaming: a failed call fails the page.

use crate::config::{ExtractionConfig, Provider, ProviderCredentials};
use crate::error::ExtractError;
use crate::output::PageResult;
use crate::pipeline::encode::{ImagePayload, PageImage};
use crate::pipeline::parse;
use crate::prompts::prompt_for;
use crate::record::Record;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Something that reads an image and answers with text.
#[async_trait]
pub trait VisionModel: Send + Sync {
    /// Send `image` with `prompt`; return the model's raw text answer.
    async fn transcribe(
        &self,
        image: &ImagePayload,
        prompt: &str,
        credentials: &ProviderCredentials,
    ) -> Result<String, ExtractError>;
}

/// HTTP client for the Groq and Gemini vision endpoints.
#[derive(Debug, Clone)]
pub struct ExtractionClient {
    http: reqwest::Client,
    config: ExtractionConfig,
}

impl ExtractionClient {
    pub fn new(config: ExtractionConfig) -> Result<Self, ExtractError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.api_timeout_secs))
            .build()
            .map_err(|e| ExtractError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Extract one page image into a record of the configured mode.
    pub async fn extract(
        &self,
        image: &PageImage,
        credentials: &ProviderCredentials,
    ) -> Result<Record, ExtractError> {
        process_page(self, 1, image, credentials, &self.config)
            .await
            .map(|page| page.record)
    }

    fn endpoint(&self, provider: Provider, model: &str) -> String {
        let base = self.config.base_url_for(provider);
        match provider {
            Provider::Groq => format!("{base}/chat/completions"),
            Provider::Gemini => format!("{base}/models/{model}:generateContent"),
        }
    }
}

#[async_trait]
impl VisionModel for ExtractionClient {
    async fn transcribe(
        &self,
        image: &ImagePayload,
        prompt: &str,
        credentials: &ProviderCredentials,
    ) -> Result<String, ExtractError> {
        let provider = credentials.provider;
        let model = self.config.model_for(provider);
        let url = self.endpoint(provider, model);
        let start = Instant::now();

        let request = match provider {
            Provider::Groq => self
                .http
                .post(&url)
                .bearer_auth(&credentials.api_key)
                .json(&groq_request(model, prompt, image, &self.config)),
            Provider::Gemini => self
                .http
                .post(&url)
                .query(&[("key", credentials.api_key.as_str())])
                .json(&gemini_request(prompt, image, &self.config)),
        };

        let response = request.send().await.map_err(|e| {
            warn!("{} request failed: {}", provider, e);
            ExtractError::Network {
                provider: provider.to_string(),
                detail: e.to_string(),
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|e| format!("<unreadable body: {e}>"));
            warn!("{} API error: HTTP {}", provider, status);
            return Err(ExtractError::Transport {
                provider: provider.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let body: serde_json::Value = response.json().await.map_err(|e| {
            ExtractError::unparsable(format!("{provider} returned a non-JSON body: {e}"))
        })?;

        let text = response_text(provider, body).ok_or_else(|| ExtractError::EmptyResponse {
            provider: provider.to_string(),
        })?;

        debug!(
            "{} ({}) answered {} chars in {:?}",
            provider,
            model,
            text.len(),
            start.elapsed()
        );
        Ok(text)
    }
}

/// Extract one page through any [`VisionModel`] and parse the answer.
///
/// `page_num` is 1-indexed and only used for stats and log lines.
pub async fn process_page<M: VisionModel + ?Sized>(
    model: &M,
    page_num: usize,
    image: &PageImage,
    credentials: &ProviderCredentials,
    config: &ExtractionConfig,
) -> Result<PageResult, ExtractError> {
    let start = Instant::now();
    let prompt = config
        .prompt
        .as_deref()
        .unwrap_or_else(|| prompt_for(config.mode));

    let raw = model
        .transcribe(&image.to_payload(), prompt, credentials)
        .await?;
    let record = parse::parse(&raw, config.mode)?;

    let duration = start.elapsed();
    debug!(
        "Page {} ({}): {} raw chars → {} record in {:?}",
        page_num,
        image.label,
        raw.len(),
        record.mode_name(),
        duration
    );

    Ok(PageResult {
        page_num,
        label: image.label.clone(),
        raw_len: raw.len(),
        duration_ms: duration.as_millis() as u64,
        record,
    })
}

// ── Groq (OpenAI-compatible) ─────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct GroqRequest<'a> {
    model: &'a str,
    messages: Vec<GroqMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct GroqMessage<'a> {
    role: &'static str,
    content: Vec<GroqPart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum GroqPart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: GroqImageUrl },
}

#[derive(Debug, Serialize)]
struct GroqImageUrl {
    url: String,
}

#[derive(Debug, Deserialize)]
struct GroqResponse {
    #[serde(default)]
    choices: Vec<GroqChoice>,
}

#[derive(Debug, Deserialize)]
struct GroqChoice {
    message: Option<GroqReply>,
}

#[derive(Debug, Deserialize)]
struct GroqReply {
    content: Option<String>,
}

fn groq_request<'a>(
    model: &'a str,
    prompt: &'a str,
    image: &ImagePayload,
    config: &ExtractionConfig,
) -> GroqRequest<'a> {
    GroqRequest {
        model,
        messages: vec![GroqMessage {
            role: "user",
            content: vec![
                GroqPart::Text { text: prompt },
                GroqPart::ImageUrl {
                    image_url: GroqImageUrl {
                        url: image.to_data_url(),
                    },
                },
            ],
        }],
        temperature: config.temperature,
        max_tokens: config.max_tokens,
    }
}

// ── Gemini ───────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContentOut<'a>>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContentOut<'a> {
    parts: Vec<GeminiPartOut<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum GeminiPartOut<'a> {
    Text { text: &'a str },
    InlineData { inline_data: GeminiInlineData<'a> },
}

#[derive(Debug, Serialize)]
struct GeminiInlineData<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContentIn>,
}

#[derive(Debug, Deserialize)]
struct GeminiContentIn {
    #[serde(default)]
    parts: Vec<GeminiPartIn>,
}

#[derive(Debug, Deserialize)]
struct GeminiPartIn {
    text: Option<String>,
}

fn gemini_request<'a>(
    prompt: &'a str,
    image: &'a ImagePayload,
    config: &ExtractionConfig,
) -> GeminiRequest<'a> {
    GeminiRequest {
        contents: vec![GeminiContentOut {
            parts: vec![
                GeminiPartOut::Text { text: prompt },
                GeminiPartOut::InlineData {
                    inline_data: GeminiInlineData {
                        mime_type: &image.mime_type,
                        data: &image.data,
                    },
                },
            ],
        }],
        generation_config: GeminiGenerationConfig {
            temperature: config.temperature,
            max_output_tokens: config.max_tokens,
        },
    }
}

// ── Response paths ───────────────────────────────────────────────────────

/// Text at the provider's response path; `None` when absent or empty.
fn response_text(provider: Provider, body: serde_json::Value) -> Option<String> {
    let text = match provider {
        Provider::Groq => serde_json::from_value::<GroqResponse>(body)
            .ok()?
            .choices
            .into_iter()
            .next()?
            .message?
            .content?,
        Provider::Gemini => serde_json::from_value::<GeminiResponse>(body)
            .ok()?
            .candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .next()?
            .text?,
    };
    (!text.is_empty()).then_some(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    fn payload() -> ImagePayload {
        ImagePayload {
            mime_type: "image/png".into(),
            data: "AAAA".into(),
        }
    }

    #[test]
    fn groq_request_shape() {
        let config = ExtractionConfig::default();
        let image = payload();
        let body = serde_json::to_value(groq_request("llama", "PROMPT", &image, &config)).unwrap();
        assert_eq!(body["model"], "llama");
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"][0], json!({"type": "text", "text": "PROMPT"}));
        assert_eq!(
            body["messages"][0]["content"][1]["image_url"]["url"],
            "data:image/png;base64,AAAA"
        );
        assert_eq!(body["messages"][0]["content"][1]["type"], "image_url");
        assert_eq!(body["max_tokens"], 8192);
        assert!((body["temperature"].as_f64().unwrap() - 0.1).abs() < 1e-6);
    }

    #[test]
    fn gemini_request_shape() {
        let config = ExtractionConfig::default();
        let image = payload();
        let body = serde_json::to_value(gemini_request("PROMPT", &image, &config)).unwrap();
        let parts = &body["contents"][0]["parts"];
        assert_eq!(parts[0], json!({"text": "PROMPT"}));
        assert_eq!(
            parts[1],
            json!({"inline_data": {"mime_type": "image/png", "data": "AAAA"}})
        );
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 8192);
    }

    #[test]
    fn groq_response_path() {
        let body = json!({"choices": [{"message": {"role": "assistant", "content": "{\"a\":1}"}}]});
        assert_eq!(response_text(Provider::Groq, body).as_deref(), Some("{\"a\":1}"));
        assert_eq!(response_text(Provider::Groq, json!({"choices": []})), None);
        assert_eq!(
            response_text(Provider::Groq, json!({"choices": [{"message": {"content": ""}}]})),
            None
        );
    }

    #[test]
    fn gemini_response_path() {
        let body = json!({"candidates": [{"content": {"parts": [{"text": "hello"}], "role": "model"}}]});
        assert_eq!(response_text(Provider::Gemini, body).as_deref(), Some("hello"));
        assert_eq!(response_text(Provider::Gemini, json!({"promptFeedback": {}})), None);
        // A Groq-shaped body is empty from Gemini's point of view
        let groq_body = json!({"choices": [{"message": {"content": "x"}}]});
        assert_eq!(response_text(Provider::Gemini, groq_body), None);
    }

    #[test]
    fn endpoints_per_provider() {
        let client = ExtractionClient::new(ExtractionConfig::default()).unwrap();
        assert_eq!(
            client.endpoint(Provider::Groq, "m"),
            "https://api.groq.com/openai/v1/chat/completions"
        );
        assert_eq!(
            client.endpoint(Provider::Gemini, "gemini-2.0-flash"),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }

    #[test]
    fn unreachable_endpoint_is_a_network_error() {
        let config = ExtractionConfig::builder()
            .groq_base_url("http://127.0.0.1:9")
            .api_timeout_secs(2)
            .build()
            .unwrap();
        let client = ExtractionClient::new(config).unwrap();
        let err = tokio_test::block_on(client.transcribe(
            &payload(),
            "p",
            &ProviderCredentials::groq("k"),
        ))
        .unwrap_err();
        assert!(matches!(err, ExtractError::Network { .. }), "got: {err:?}");
    }

    /// Answer exactly one request with `status` and `body`. The handle
    /// yields the request line and headers as received.
    async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        serve_raw(format!(
            "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        ))
        .await
    }

    /// Like [`serve_once`], with the response bytes written as given.
    async fn serve_raw(response: String) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 8192];
            let head_end = loop {
                let n = socket.read(&mut chunk).await.unwrap();
                buf.extend_from_slice(&chunk[..n]);
                if let Some(i) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                    break i + 4;
                }
                if n == 0 {
                    break buf.len();
                }
            };
            let head = String::from_utf8_lossy(&buf[..head_end]).into_owned();
            let length = head
                .lines()
                .filter_map(|l| l.split_once(':'))
                .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
                .and_then(|(_, v)| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            while buf.len() < head_end + length {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
            }

            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            head
        });
        (base, server)
    }

    fn client_at(provider: Provider, base: &str) -> ExtractionClient {
        let builder = ExtractionConfig::builder().api_timeout_secs(5);
        let builder = match provider {
            Provider::Groq => builder.groq_base_url(base),
            Provider::Gemini => builder.gemini_base_url(base),
        };
        ExtractionClient::new(builder.build().unwrap()).unwrap()
    }

    #[tokio::test]
    async fn error_status_keeps_upstream_body() {
        let (base, server) = serve_once("401 Unauthorized", r#"{"error":"bad key"}"#).await;
        let err = client_at(Provider::Groq, &base)
            .transcribe(&payload(), "p", &ProviderCredentials::groq("k"))
            .await
            .unwrap_err();
        match err {
            ExtractError::Transport {
                provider,
                status,
                body,
            } => {
                assert_eq!(provider, Provider::Groq.to_string());
                assert_eq!(status, 401);
                assert_eq!(body, r#"{"error":"bad key"}"#);
            }
            other => panic!("expected Transport, got {other:?}"),
        }

        let head = server.await.unwrap();
        assert!(head.starts_with("POST /chat/completions HTTP/1.1\r\n"), "got: {head}");
        assert!(head.to_ascii_lowercase().contains("authorization: bearer k\r\n"));
    }

    #[tokio::test]
    async fn truncated_error_body_is_reported() {
        // Promises 100 bytes, sends 9, then closes
        let (base, _server) = serve_raw(
            "HTTP/1.1 500 Internal Server Error\r\ncontent-length: 100\r\nconnection: close\r\n\r\n{\"error\":"
                .to_string(),
        )
        .await;
        let err = client_at(Provider::Groq, &base)
            .transcribe(&payload(), "p", &ProviderCredentials::groq("k"))
            .await
            .unwrap_err();
        match err {
            ExtractError::Transport { status, body, .. } => {
                assert_eq!(status, 500);
                assert!(body.starts_with("<unreadable body: "), "got: {body}");
            }
            other => panic!("expected Transport, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn groq_answer_is_read_from_choices() {
        let (base, _server) = serve_once(
            "200 OK",
            r#"{"choices":[{"message":{"role":"assistant","content":"{\"content\":\"hi\"}"}}]}"#,
        )
        .await;
        let text = client_at(Provider::Groq, &base)
            .transcribe(&payload(), "p", &ProviderCredentials::groq("k"))
            .await
            .unwrap();
        assert_eq!(text, r#"{"content":"hi"}"#);
    }

    #[tokio::test]
    async fn success_without_text_is_empty_response() {
        let (base, _server) = serve_once("200 OK", r#"{"choices":[]}"#).await;
        let err = client_at(Provider::Groq, &base)
            .transcribe(&payload(), "p", &ProviderCredentials::groq("k"))
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::EmptyResponse { .. }), "got: {err:?}");
        assert!(err.is_unparsable());
    }

    #[tokio::test]
    async fn success_with_non_json_body_is_unparsable() {
        let (base, _server) = serve_once("200 OK", "<html>busy</html>").await;
        let err = client_at(Provider::Groq, &base)
            .transcribe(&payload(), "p", &ProviderCredentials::groq("k"))
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::UnparsableResponse { .. }), "got: {err:?}");
    }

    #[tokio::test]
    async fn gemini_key_travels_in_the_query() {
        let (base, server) = serve_once("200 OK", r#"{"candidates":[]}"#).await;
        let err = client_at(Provider::Gemini, &base)
            .transcribe(&payload(), "p", &ProviderCredentials::gemini("k"))
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::EmptyResponse { .. }), "got: {err:?}");

        let model = ExtractionConfig::default()
            .model_for(Provider::Gemini)
            .to_string();
        let head = server.await.unwrap();
        assert!(
            head.starts_with(&format!("POST /models/{model}:generateContent?key=k HTTP/1.1\r\n")),
            "got: {head}"
        );
        assert!(!head.to_ascii_lowercase().contains("authorization:"));
    }
}
