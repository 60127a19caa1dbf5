//! Client for an OpenAI-compatible REST API (`/embeddings`, `/chat/completions`).
//!
//! The base URL is configurable, so any server speaking the same protocol
//! (a local llama.cpp or vLLM instance, a proxy) works. HTTP failures are mapped
//! onto the docqa error taxonomy by [`classify_response`].

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info, warn};

use docqa_core::config::Settings;
use docqa_core::{EmbeddingCapability, Error, GenerationCapability, Result};

// --- OpenAI-compatible serde structs ---

#[derive(serde::Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(serde::Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(serde::Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

#[derive(serde::Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(serde::Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(serde::Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(serde::Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(serde::Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

pub struct OpenAiClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    embedding_model: String,
    embedder_id: String,
    dimension: usize,
    chat_model: String,
    temperature: f32,
    max_tokens: Option<u32>,
}

impl OpenAiClient {
    pub fn new(settings: &Settings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.provider.timeout_secs))
            .build()
            .map_err(|e| Error::InvalidConfig(format!("failed to build HTTP client: {e}")))?;

        let base_url = settings.provider.base_url.trim_end_matches('/').to_string();
        let api_key = settings.api_key();
        if api_key.is_none() {
            warn!("no API key configured (provider.api_key / OPENAI_API_KEY); requests are sent unauthenticated");
        }
        info!(
            "Provider configured: base_url={}, embedding_model={}, chat_model={}",
            base_url, settings.embedding.model, settings.generation.model
        );

        Ok(Self {
            client,
            base_url,
            api_key,
            embedding_model: settings.embedding.model.clone(),
            embedder_id: format!("openai:{}:d{}", settings.embedding.model, settings.embedding.dimension),
            dimension: settings.embedding.dimension,
            chat_model: settings.generation.model.clone(),
            temperature: settings.generation.temperature,
            max_tokens: settings.generation.max_tokens,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post_json<B, R>(&self, route: &str, body: &B) -> Result<R>
    where
        B: serde::Serialize + ?Sized,
        R: serde::de::DeserializeOwned,
    {
        let mut request = self.client.post(format!("{}/{}", self.base_url, route)).json(body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(classify_response(status.as_u16(), &text));
        }
        response
            .json::<R>()
            .await
            .map_err(|e| Error::Provider(format!("malformed {route} response: {e}")))
    }
}

#[async_trait]
impl EmbeddingCapability for OpenAiClient {
    fn embedder_id(&self) -> &str { &self.embedder_id }
    fn dim(&self) -> usize { self.dimension }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let request = EmbeddingRequest { model: &self.embedding_model, input: texts };
        let mut response: EmbeddingResponse = self.post_json("embeddings", &request).await?;
        if response.data.len() != texts.len() {
            return Err(Error::Provider(format!(
                "embedder returned {} vectors for {} inputs",
                response.data.len(),
                texts.len()
            )));
        }
        response.data.sort_by_key(|d| d.index);
        debug!(count = texts.len(), "embedded batch");
        Ok(response.data.into_iter().map(|d| d.embedding).collect())
    }
}

#[async_trait]
impl GenerationCapability for OpenAiClient {
    fn model_id(&self) -> &str { &self.chat_model }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.chat_model,
            messages: vec![ChatMessage { role: "user", content: prompt }],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };
        let response: ChatResponse = self.post_json("chat/completions", &request).await?;
        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| Error::Provider("completion contained no choices".to_string()))
    }
}

/// Map a non-success HTTP response onto the error taxonomy.
pub fn classify_response(status: u16, body: &str) -> Error {
    let detail = format!("HTTP {status}: {}", body.trim());
    match status {
        401 | 403 => Error::Auth(detail),
        429 if body.contains("insufficient_quota") => Error::Quota(detail),
        408 | 409 | 425 | 429 => Error::Transient(detail),
        500..=599 => Error::Transient(detail),
        _ => Error::Provider(detail),
    }
}

fn transport_error(e: reqwest::Error) -> Error {
    if e.is_builder() {
        Error::InvalidConfig(format!("invalid provider request: {e}"))
    } else {
        // Timeouts, refused connections, resets: all worth another attempt.
        Error::Transient(format!("request failed: {e}"))
    }
}
