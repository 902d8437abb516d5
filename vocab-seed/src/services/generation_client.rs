//! Generation service boundary
//!
//! The pipeline sends an instruction plus a strict JSON schema and expects a
//! schema-conformant array back. [`GenerationService`] is the seam; the
//! production implementation talks to an OpenAI-compatible chat completions
//! endpoint. No retries happen here: retrying is the scheduler's decision.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;

const USER_AGENT: &str = concat!("vocab-seed/", env!("CARGO_PKG_VERSION"));

/// Generation service errors
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Network error: {0}")]
    Transport(String),

    #[error("Request timed out")]
    Timeout,

    #[error("API error {0}: {1}")]
    Http(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Response does not match schema: {0}")]
    Schema(String),

    #[error("Generation returned no usable records")]
    Empty,

    #[error("Generation API key not configured")]
    MissingApiKey,
}

/// Which instruction a prompt carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptKind {
    Words,
    Translations,
    Connections,
    Corrections,
}

/// One request to the generation service
#[derive(Debug, Clone)]
pub struct GenerationPrompt {
    pub kind: PromptKind,
    pub system: String,
    pub instruction: String,
    /// Schema name reported to the service
    pub schema_name: &'static str,
    /// Schema of one array element
    pub item_schema: Value,
}

impl GenerationPrompt {
    /// Object-rooted response schema wrapping the item array
    ///
    /// Structured output requires an object at the root, so the array is
    /// returned under `items`.
    pub fn response_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "items": {
                    "type": "array",
                    "items": self.item_schema,
                }
            },
            "required": ["items"],
            "additionalProperties": false,
        })
    }
}

/// Prompt in, array of JSON records out
#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Identifier for logs (model name, "fake", ...)
    fn name(&self) -> &str;

    async fn generate(&self, prompt: &GenerationPrompt) -> Result<Vec<Value>, GenerationError>;
}

/// Resolved connection settings for [`OpenAiCompatibleClient`]
#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub api_base: String,
    pub model: String,
    pub api_key: String,
    pub timeout: Duration,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    response_format: Value,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

/// Chat completions client with strict structured output
pub struct OpenAiCompatibleClient {
    http_client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl OpenAiCompatibleClient {
    pub fn new(settings: GenerationSettings) -> Result<Self, GenerationError> {
        if settings.api_key.trim().is_empty() {
            return Err(GenerationError::MissingApiKey);
        }

        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(settings.timeout)
            .build()
            .map_err(|e| GenerationError::Transport(e.to_string()))?;

        Ok(Self {
            http_client,
            endpoint: format!("{}/chat/completions", settings.api_base.trim_end_matches('/')),
            model: settings.model,
            api_key: settings.api_key,
        })
    }

    fn request_body<'a>(&'a self, prompt: &'a GenerationPrompt) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &prompt.system,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.instruction,
                },
            ],
            response_format: json!({
                "type": "json_schema",
                "json_schema": {
                    "name": prompt.schema_name,
                    "strict": true,
                    "schema": prompt.response_schema(),
                }
            }),
        }
    }
}

#[async_trait]
impl GenerationService for OpenAiCompatibleClient {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &GenerationPrompt) -> Result<Vec<Value>, GenerationError> {
        tracing::debug!(
            kind = ?prompt.kind,
            model = %self.model,
            endpoint = %self.endpoint,
            "Calling generation service"
        );

        let response = self
            .http_client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(prompt))
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(GenerationError::Http(status.as_u16(), error_text));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::Parse(e.to_string()))?;

        let message = body
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .ok_or_else(|| GenerationError::Parse("response has no choices".to_string()))?;

        if let Some(refusal) = message.refusal {
            return Err(GenerationError::Schema(format!("model refused: {}", refusal)));
        }

        let content = message
            .content
            .ok_or_else(|| GenerationError::Parse("response message has no content".to_string()))?;

        extract_items(&content)
    }
}

/// Pull the `items` array out of a structured-output message
pub fn extract_items(content: &str) -> Result<Vec<Value>, GenerationError> {
    let value: Value =
        serde_json::from_str(content).map_err(|e| GenerationError::Parse(e.to_string()))?;

    match value {
        Value::Object(mut object) => match object.remove("items") {
            Some(Value::Array(items)) => Ok(items),
            Some(other) => Err(GenerationError::Schema(format!(
                "'items' is not an array: {}",
                other
            ))),
            None => Err(GenerationError::Schema("missing 'items' field".to_string())),
        },
        // Tolerate services that ignore the wrapper and return the bare array
        Value::Array(items) => Ok(items),
        other => Err(GenerationError::Schema(format!(
            "expected an object, got {}",
            other
        ))),
    }
}

fn map_reqwest_error(e: reqwest::Error) -> GenerationError {
    if e.is_timeout() {
        GenerationError::Timeout
    } else {
        GenerationError::Transport(e.to_string())
    }
}
