use async_trait::async_trait;
use bytes::BytesMut;
use futures::stream::{BoxStream, Stream, StreamExt};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{error, info};

use crate::models::Tone;
use crate::tone::system_instruction;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const API_KEY_VAR: &str = "GEMINI_API_KEY";

pub const TEMPERATURE: f64 = 0.7;
pub const TOP_P: f64 = 0.95;
pub const TOP_K: u32 = 64;

const UNKNOWN_API_ERROR: &str = "An unknown API error occurred.";

#[derive(Debug, Error)]
pub enum GeminiError {
    #[error("Configuration error: {0} is not set")] MissingApiKey(String),
    #[error("HTTP error: {0}")] Http(String),
    #[error("API error (status {status}): {message}")] Api { status: u16, message: String },
    #[error("Stream error: {0}")] Stream(String),
}

impl GeminiError {
    /// Human-readable upstream message, when one exists.
    pub fn upstream_message(&self) -> Option<String> {
        let msg = match self {
            GeminiError::MissingApiKey(_) => return Some(self.to_string()),
            GeminiError::Http(m) | GeminiError::Stream(m) => m.as_str(),
            GeminiError::Api { message, .. } => message.as_str(),
        };
        let msg = msg.trim();
        (!msg.is_empty()).then(|| msg.to_string())
    }

    /// The single message surfaced to the person who submitted the form.
    pub fn user_message(&self) -> String {
        format!(
            "Failed to generate content: {}",
            self.upstream_message().unwrap_or_else(|| UNKNOWN_API_ERROR.to_string())
        )
    }
}

/// Ordered, finite, single-pass sequence of text fragments.
pub type FragmentStream = BoxStream<'static, Result<String, GeminiError>>;

/// Opens one streaming completion upstream. Exactly one request per call, no retry.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn open_stream(&self, prompt: &str, system_instruction: &str) -> Result<FragmentStream, GeminiError>;
}

/// Streams a completion for `prompt` in the given tone, forwarding every fragment to
/// `on_chunk` in arrival order. The returned text is the concatenation of those fragments.
///
/// On failure, fragments already forwarded must not be treated as a result.
pub async fn generate(
    generator: &dyn TextGenerator,
    prompt: &str,
    tone: Tone,
    on_chunk: &mut (dyn FnMut(&str) + Send),
) -> Result<String, GeminiError> {
    let stream = generator.open_stream(prompt, system_instruction(tone)).await?;
    collect_fragments(stream, on_chunk).await
}

pub async fn collect_fragments<S>(stream: S, on_chunk: &mut (dyn FnMut(&str) + Send)) -> Result<String, GeminiError>
where
    S: Stream<Item = Result<String, GeminiError>>,
{
    futures::pin_mut!(stream);
    let mut full_text = String::new();
    while let Some(fragment) = stream.next().await {
        let fragment = fragment?;
        if fragment.is_empty() {
            continue;
        }
        on_chunk(&fragment);
        full_text.push_str(&fragment);
    }
    Ok(full_text)
}

/// Where the API key comes from. Resolved on every call so a rotated key is picked up.
#[derive(Debug, Clone)]
pub enum ApiKeySource {
    Env(String),
    Fixed(String),
}

impl ApiKeySource {
    pub fn resolve(&self) -> Option<String> {
        let key = match self {
            ApiKeySource::Env(var) => std::env::var(var).ok()?,
            ApiKeySource::Fixed(key) => key.clone(),
        };
        let key = key.trim().to_string();
        (!key.is_empty()).then_some(key)
    }

    fn name(&self) -> String {
        match self {
            ApiKeySource::Env(var) => var.clone(),
            ApiKeySource::Fixed(_) => "API key".to_string(),
        }
    }
}

impl Default for ApiKeySource {
    fn default() -> Self { ApiKeySource::Env(API_KEY_VAR.to_string()) }
}

pub struct GeminiClient {
    client: Client,
    key_source: ApiKeySource,
    base_url: String,
    model: String,
}

impl GeminiClient {
    pub fn new(key_source: ApiKeySource, base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            key_source,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str { &self.model }

    pub fn request_body(prompt: &str, system_instruction: &str) -> serde_json::Value {
        json!({
            "contents": [{
                "role": "user",
                "parts": [{"text": prompt}]
            }],
            "systemInstruction": {
                "parts": [{"text": system_instruction}]
            },
            "generationConfig": {
                "temperature": TEMPERATURE,
                "topP": TOP_P,
                "topK": TOP_K
            }
        })
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn open_stream(&self, prompt: &str, system_instruction: &str) -> Result<FragmentStream, GeminiError> {
        let api_key = self
            .key_source
            .resolve()
            .ok_or_else(|| GeminiError::MissingApiKey(self.key_source.name()))?;

        let url = format!(
            "{}/models/{}:streamGenerateContent?alt=sse&key={}",
            self.base_url, self.model, api_key
        );
        info!("🔗 Streaming from: {}", url.replace(&api_key, "***"));

        let response = self.client
            .post(&url)
            .json(&Self::request_body(prompt, system_instruction))
            .send()
            .await
            .map_err(|e| GeminiError::Http(e.to_string()))?;

        let status = response.status();
        info!("📥 Response status: {}", status);

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("❌ API Error response: {}", body);
            return Err(GeminiError::Api { status: status.as_u16(), message: api_error_message(&body) });
        }

        let byte_stream = response.bytes_stream();
        let stream = async_stream::stream! {
            let mut decoder = SseDecoder::default();
            let mut failed = false;
            futures::pin_mut!(byte_stream);

            while let Some(chunk) = byte_stream.next().await {
                let chunk = match chunk {
                    Ok(c) => c,
                    Err(e) => {
                        yield Err(GeminiError::Http(e.to_string()));
                        failed = true;
                        break;
                    }
                };
                for data in decoder.push(&chunk) {
                    let event = parse_event(&data);
                    failed = event.is_err();
                    yield event;
                    if failed {
                        break;
                    }
                }
                if failed {
                    break;
                }
            }
            if !failed {
                if let Some(data) = decoder.finish() {
                    yield parse_event(&data);
                }
            }
        };

        Ok(Box::pin(stream))
    }
}

/// Splits a byte stream into SSE `data:` payloads. Lines are decoded only once complete,
/// so multi-byte characters split across network chunks survive.
#[derive(Default)]
pub struct SseDecoder {
    buffer: BytesMut,
}

impl SseDecoder {
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);
        let mut payloads = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line = self.buffer.split_to(pos + 1);
            if let Some(data) = sse_data(&line) {
                payloads.push(data);
            }
        }
        payloads
    }

    /// Flushes a trailing line that arrived without a newline.
    pub fn finish(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        let rest = self.buffer.split();
        sse_data(&rest)
    }
}

fn sse_data(line: &[u8]) -> Option<String> {
    let line = String::from_utf8_lossy(line);
    let data = line.trim_end_matches(['\r', '\n']).strip_prefix("data:")?.trim_start();
    if data.is_empty() || data == "[DONE]" {
        return None;
    }
    Some(data.to_string())
}

fn parse_event(data: &str) -> Result<String, GeminiError> {
    let chunk: StreamChunk = serde_json::from_str(data)
        .map_err(|e| GeminiError::Stream(format!("malformed stream event: {}", e)))?;
    if let Some(err) = chunk.error {
        return Err(GeminiError::Stream(err.message));
    }
    Ok(chunk
        .candidates
        .into_iter()
        .next()
        .map(|c| c.content.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default())
}

fn api_error_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.trim().to_string())
}

// --- Response Parsing Helpers ---

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct Candidate { #[serde(default)] content: Content }

#[derive(Debug, Deserialize, Default)]
struct Content { #[serde(default)] parts: Vec<Part> }

#[derive(Debug, Deserialize)]
struct Part { #[serde(default)] text: Option<String> }

#[derive(Debug, Deserialize)]
struct ErrorEnvelope { error: ApiErrorBody }

#[derive(Debug, Deserialize)]
struct ApiErrorBody { #[serde(default)] message: String }
