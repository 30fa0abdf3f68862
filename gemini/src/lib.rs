//! Minimal Google Gemini API client.
//!
//! This crate provides a focused client for the Generative Language API with:
//! - Non-streaming text generation (`generateContent`)
//! - Batch text embeddings (`batchEmbedContents`)
//!
//! Responses are consumed whole; this client deliberately does not model
//! streaming.

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_EMBED_MODEL: &str = "text-embedding-004";

/// Errors that can occur when using the Gemini client.
#[derive(Debug, Error)]
pub enum Error {
    #[error("API key not configured")]
    NoApiKey,

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Gemini API client.
#[derive(Clone)]
pub struct Gemini {
    client: reqwest::Client,
    api_key: String,
    model: String,
    embed_model: String,
}

impl Gemini {
    /// Create a new Gemini client with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .connect_timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("Failed to build HTTP client"),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            embed_model: DEFAULT_EMBED_MODEL.to_string(),
        }
    }

    /// Create a Gemini client from the GEMINI_API_KEY environment variable.
    pub fn from_env() -> Result<Self, Error> {
        let api_key = std::env::var("GEMINI_API_KEY").map_err(|_| Error::NoApiKey)?;
        Ok(Self::new(api_key))
    }

    /// Set the default generation model for this client.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the embedding model for this client.
    pub fn with_embed_model(mut self, model: impl Into<String>) -> Self {
        self.embed_model = model.into();
        self
    }

    /// Send a generation request and return the full response.
    pub async fn generate(&self, request: Request) -> Result<Response, Error> {
        let model = request.model.clone().unwrap_or_else(|| self.model.clone());
        let api_request = build_api_request(&request);
        let url = format!(
            "{API_BASE}/models/{model}:generateContent?key={}",
            self.api_key
        );

        let response = self
            .client
            .post(url)
            .headers(json_headers())
            .json(&api_request)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                status,
                message: body,
            });
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| Error::Parse(e.to_string()))?;

        parse_response(api_response)
    }

    /// Embed a batch of texts in a single API call.
    ///
    /// The returned vectors are index-aligned with `texts`. The batch is
    /// never decomposed into per-text calls; a count mismatch between the
    /// request and the response is a parse error.
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, Error> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let qualified = format!("models/{}", self.embed_model);
        let api_request = ApiEmbedBatchRequest {
            requests: texts
                .iter()
                .map(|text| ApiEmbedRequest {
                    model: qualified.clone(),
                    content: ApiContent {
                        role: None,
                        parts: vec![ApiPart { text: text.clone() }],
                    },
                })
                .collect(),
        };

        let url = format!(
            "{API_BASE}/models/{}:batchEmbedContents?key={}",
            self.embed_model, self.api_key
        );

        let response = self
            .client
            .post(url)
            .headers(json_headers())
            .json(&api_request)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                status,
                message: body,
            });
        }

        let api_response: ApiEmbedBatchResponse = response
            .json()
            .await
            .map_err(|e| Error::Parse(e.to_string()))?;

        if api_response.embeddings.len() != texts.len() {
            return Err(Error::Parse(format!(
                "embedding count mismatch: sent {}, received {}",
                texts.len(),
                api_response.embeddings.len()
            )));
        }

        Ok(api_response
            .embeddings
            .into_iter()
            .map(|e| e.values)
            .collect())
    }
}

fn json_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers
}

fn build_api_request(request: &Request) -> ApiRequest {
    let contents: Vec<ApiContent> = request
        .messages
        .iter()
        .map(|m| ApiContent {
            role: Some(
                match m.role {
                    Role::User => "user",
                    Role::Model => "model",
                }
                .to_string(),
            ),
            parts: vec![ApiPart {
                text: m.text.clone(),
            }],
        })
        .collect();

    ApiRequest {
        system_instruction: request.system.as_ref().map(|s| ApiContent {
            role: None,
            parts: vec![ApiPart { text: s.clone() }],
        }),
        contents,
        generation_config: ApiGenerationConfig {
            max_output_tokens: request.max_tokens,
            temperature: request.temperature,
        },
    }
}

fn parse_response(api_response: ApiResponse) -> Result<Response, Error> {
    let candidate = api_response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| Error::Parse("response contained no candidates".to_string()))?;

    let text = candidate
        .content
        .map(|c| {
            c.parts
                .into_iter()
                .map(|p| p.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    let finish_reason = match candidate.finish_reason.as_deref() {
        Some("MAX_TOKENS") => FinishReason::MaxTokens,
        Some("SAFETY") => FinishReason::Safety,
        _ => FinishReason::Stop,
    };

    Ok(Response {
        text,
        finish_reason,
        usage: api_response
            .usage_metadata
            .map(|u| Usage {
                input_tokens: u.prompt_token_count,
                output_tokens: u.candidates_token_count,
            })
            .unwrap_or_default(),
    })
}

// ============================================================================
// Public types
// ============================================================================

/// A generation request to send to Gemini.
#[derive(Debug, Clone)]
pub struct Request {
    pub model: Option<String>,
    pub system: Option<String>,
    pub messages: Vec<Message>,
    pub max_tokens: usize,
    pub temperature: Option<f32>,
}

impl Request {
    /// Create a new request with the given messages.
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            model: None,
            system: None,
            messages,
            max_tokens: 8192,
            temperature: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// A message in the conversation.
#[derive(Debug, Clone)]
pub struct Message {
    pub role: Role,
    pub text: String,
}

impl Message {
    /// Create a user message.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    /// Create a model message.
    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            text: text.into(),
        }
    }
}

/// The role of a message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Model,
}

/// A generation response from Gemini.
#[derive(Debug, Clone)]
pub struct Response {
    /// All candidate text concatenated.
    pub text: String,

    /// Why the model stopped generating.
    pub finish_reason: FinishReason,

    /// Token usage information.
    pub usage: Usage,
}

/// Why the model stopped generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    MaxTokens,
    Safety,
}

/// Token usage information.
#[derive(Debug, Clone, Default)]
pub struct Usage {
    pub input_tokens: usize,
    pub output_tokens: usize,
}

// ============================================================================
// Internal API types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<ApiContent>,
    contents: Vec<ApiContent>,
    generation_config: ApiGenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<ApiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiPart {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiGenerationConfig {
    max_output_tokens: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiResponse {
    #[serde(default)]
    candidates: Vec<ApiCandidate>,
    usage_metadata: Option<ApiUsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiCandidate {
    content: Option<ApiContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiUsageMetadata {
    #[serde(default)]
    prompt_token_count: usize,
    #[serde(default)]
    candidates_token_count: usize,
}

#[derive(Debug, Serialize)]
struct ApiEmbedBatchRequest {
    requests: Vec<ApiEmbedRequest>,
}

#[derive(Debug, Serialize)]
struct ApiEmbedRequest {
    model: String,
    content: ApiContent,
}

#[derive(Debug, Deserialize)]
struct ApiEmbedBatchResponse {
    #[serde(default)]
    embeddings: Vec<ApiEmbedding>,
}

#[derive(Debug, Deserialize)]
struct ApiEmbedding {
    values: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = Gemini::new("test-key");
        assert_eq!(client.model, DEFAULT_MODEL);
        assert_eq!(client.embed_model, DEFAULT_EMBED_MODEL);
    }

    #[test]
    fn test_client_with_model() {
        let client = Gemini::new("test-key")
            .with_model("gemini-2.5-pro")
            .with_embed_model("text-embedding-005");
        assert_eq!(client.model, "gemini-2.5-pro");
        assert_eq!(client.embed_model, "text-embedding-005");
    }

    #[test]
    fn test_request_builder() {
        let request = Request::new(vec![Message::user("Xin chào")])
            .with_system("Bạn là người kể chuyện")
            .with_max_tokens(1000)
            .with_temperature(0.7);

        assert_eq!(request.max_tokens, 1000);
        assert!(request.system.is_some());
        assert_eq!(request.temperature, Some(0.7));
    }

    #[test]
    fn test_message_creation() {
        let user_msg = Message::user("Hello");
        assert!(matches!(user_msg.role, Role::User));

        let model_msg = Message::model("Chào đạo hữu");
        assert!(matches!(model_msg.role, Role::Model));
    }

    #[test]
    fn test_api_request_roles() {
        let request = Request::new(vec![Message::user("a"), Message::model("b")]);
        let api = build_api_request(&request);
        assert_eq!(api.contents.len(), 2);
        assert_eq!(api.contents[0].role.as_deref(), Some("user"));
        assert_eq!(api.contents[1].role.as_deref(), Some("model"));
    }

    #[test]
    fn test_parse_response_empty_candidates() {
        let api = ApiResponse {
            candidates: vec![],
            usage_metadata: None,
        };
        assert!(parse_response(api).is_err());
    }

    #[test]
    fn test_parse_response_text() {
        let api = ApiResponse {
            candidates: vec![ApiCandidate {
                content: Some(ApiContent {
                    role: Some("model".to_string()),
                    parts: vec![
                        ApiPart {
                            text: "Bạn vung ".to_string(),
                        },
                        ApiPart {
                            text: "kiếm.".to_string(),
                        },
                    ],
                }),
                finish_reason: Some("STOP".to_string()),
            }],
            usage_metadata: None,
        };

        let response = parse_response(api).unwrap();
        assert_eq!(response.text, "Bạn vung kiếm.");
        assert_eq!(response.finish_reason, FinishReason::Stop);
    }
}
