//! Provider adapters for heterogeneous chat-completion backends.
//!
//! This module presents one call contract — `invoke(provider, request)` —
//! across incompatible upstream wire protocols. Dispatch happens on the
//! provider's family tag; each family is one adapter, so supporting a new
//! backend means adding one adapter with no change to callers.

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::time::Duration;

use paperdesk_core::ai::{LlmProvider, ProviderFamily};

use crate::error::PlanError;

/// Default timeout applied to every provider HTTP call. Provider invocation
/// is the dominant suspension point of a plan run; waiting indefinitely is
/// never acceptable.
pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(120);

/// Anthropic-style backends require a max_tokens value on every request.
const ANTHROPIC_DEFAULT_MAX_TOKENS: u32 = 1024;

/// Protocol version header value for Anthropic-style backends.
const ANTHROPIC_VERSION: &str = "2023-06-01";

// ============================================================================
// Request / response types
// ============================================================================

/// Role of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

impl ChatRole {
    fn as_str(&self) -> &'static str {
        match self {
            ChatRole::System => "system",
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }
}

/// One chat turn sent to a provider.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// A provider-agnostic chat completion request.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    /// Ask the backend for a JSON object response where the protocol
    /// supports it.
    pub json_response: bool,
}

impl ChatRequest {
    /// Concatenation of all system-role message bodies.
    fn system_text(&self) -> String {
        self.messages
            .iter()
            .filter(|m| m.role == ChatRole::System)
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    fn non_system_messages(&self) -> impl Iterator<Item = &ChatMessage> {
        self.messages.iter().filter(|m| m.role != ChatRole::System)
    }
}

/// Normalized provider output: the assistant text plus the raw body for
/// audit records.
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    pub content: String,
    pub raw_response: String,
}

/// The one call contract every provider family implements.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    async fn invoke(
        &self,
        provider: &LlmProvider,
        request: &ChatRequest,
    ) -> Result<ProviderResponse, PlanError>;
}

// ============================================================================
// URL construction
// ============================================================================

/// Builds the chat-completions endpoint for an OpenAI-compatible base URL.
///
/// - a base already ending in `/chat/completions` is used verbatim
/// - a base ending in a version segment (`/v1`, `/v2`, ...) gets
///   `/chat/completions` appended
/// - anything else gets `/v1/chat/completions` appended
pub fn build_chat_completions_url(base_url: &str) -> String {
    let base = base_url.trim_end_matches('/');
    if base.ends_with("/chat/completions") {
        return base.to_string();
    }
    if ends_with_version_segment(base) {
        return format!("{}/chat/completions", base);
    }
    format!("{}/v1/chat/completions", base)
}

fn ends_with_version_segment(base: &str) -> bool {
    base.rsplit('/').next().is_some_and(is_version_segment)
}

/// Drops the version path segment from a chat-completions URL, for backends
/// (e.g. search-augmented providers) that do not serve the versioned path.
fn strip_version_segment(url: &str) -> String {
    let filtered: Vec<&str> = url
        .split('/')
        .enumerate()
        .filter(|&(i, segment)| {
            // Never touch the scheme/host part.
            i < 3 || !is_version_segment(segment)
        })
        .map(|(_, s)| s)
        .collect();
    filtered.join("/")
}

fn is_version_segment(segment: &str) -> bool {
    segment.len() > 1
        && segment.starts_with('v')
        && segment[1..].chars().all(|c| c.is_ascii_digit())
}

fn normalize_base(base_url: &str) -> &str {
    base_url.trim_end_matches('/')
}

// ============================================================================
// Shared HTTP plumbing
// ============================================================================

struct HttpResponse {
    status: StatusCode,
    body: String,
}

async fn post_json(
    client: &reqwest::Client,
    url: &str,
    headers: &[(&str, &str)],
    payload: &Value,
) -> Result<HttpResponse, PlanError> {
    let mut request = client.post(url).json(payload);
    for (name, value) in headers {
        request = request.header(*name, *value);
    }
    let response = request.send().await.map_err(|e| PlanError::ProviderRequest {
        status: None,
        message: format!("request to {} failed: {}", url, e),
    })?;
    let status = response.status();
    let body = response.text().await.map_err(|e| PlanError::ProviderRequest {
        status: Some(status.as_u16()),
        message: format!("failed to read response body: {}", e),
    })?;
    Ok(HttpResponse { status, body })
}

fn status_error(url: &str, response: &HttpResponse) -> PlanError {
    PlanError::ProviderRequest {
        status: Some(response.status.as_u16()),
        message: format!("HTTP {} from {}: {}", response.status, url, response.body),
    }
}

fn parse_body(response: &HttpResponse) -> Result<Value, PlanError> {
    serde_json::from_str(&response.body).map_err(|e| PlanError::ProviderRequest {
        status: Some(response.status.as_u16()),
        message: format!("provider returned non-JSON body: {}", e),
    })
}

/// A 2xx body can still carry an explicit error envelope.
fn check_error_envelope(body: &Value) -> Result<(), PlanError> {
    if let Some(error) = body.get("error") {
        if !error.is_null() {
            return Err(PlanError::ProviderRequest {
                status: None,
                message: format!("provider error envelope: {}", error),
            });
        }
    }
    Ok(())
}

// ============================================================================
// OpenAI-compatible / local family
// ============================================================================

/// Adapter for OpenAI-compatible chat-completions backends, including
/// self-hosted ones (Ollama, vLLM, LM Studio) speaking the same protocol.
pub struct OpenAiCompatibleAdapter {
    client: reqwest::Client,
}

/// One attempt shape in the 404 degradation sequence.
struct RequestVariant {
    url: String,
    json_response: bool,
}

impl OpenAiCompatibleAdapter {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Ordered request variants: the full request first, then the same URL
    /// without the response-format hint, then the un-versioned URL. New
    /// degradation strategies append here.
    fn request_variants(base_url: &str, json_response: bool) -> Vec<RequestVariant> {
        let url = build_chat_completions_url(base_url);
        let mut variants = vec![RequestVariant {
            url: url.clone(),
            json_response,
        }];
        if json_response {
            variants.push(RequestVariant {
                url: url.clone(),
                json_response: false,
            });
        }
        let stripped = strip_version_segment(&url);
        if stripped != url {
            variants.push(RequestVariant {
                url: stripped,
                json_response: false,
            });
        }
        variants
    }

    fn payload(provider: &LlmProvider, request: &ChatRequest, json_response: bool) -> Value {
        let messages: Vec<Value> = request
            .messages
            .iter()
            .map(|m| json!({"role": m.role.as_str(), "content": m.content}))
            .collect();
        let mut payload = json!({
            "model": request.model,
            "messages": messages,
        });
        if let Some(temperature) = request.temperature.or(provider.temperature) {
            payload["temperature"] = json!(temperature);
        }
        if let Some(max_tokens) = request.max_tokens.or(provider.max_tokens) {
            payload["max_tokens"] = json!(max_tokens);
        }
        if json_response {
            payload["response_format"] = json!({"type": "json_object"});
        }
        payload
    }

    fn extract_content(body: &Value) -> Result<String, PlanError> {
        let content = body["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or_default();
        if content.trim().is_empty() {
            return Err(PlanError::EmptyContent);
        }
        Ok(content.to_string())
    }
}

#[async_trait]
impl ProviderAdapter for OpenAiCompatibleAdapter {
    async fn invoke(
        &self,
        provider: &LlmProvider,
        request: &ChatRequest,
    ) -> Result<ProviderResponse, PlanError> {
        let variants = Self::request_variants(&provider.base_url, request.json_response);
        let last = variants.len() - 1;

        for (index, variant) in variants.iter().enumerate() {
            let payload = Self::payload(provider, request, variant.json_response);
            let mut headers: Vec<(&str, &str)> = Vec::new();
            let bearer;
            if let Some(api_key) = provider.api_key.as_deref() {
                bearer = format!("Bearer {}", api_key);
                headers.push(("Authorization", &bearer));
            }

            let response = post_json(&self.client, &variant.url, &headers, &payload).await?;

            // Only a wrong endpoint path degrades to the next variant.
            if response.status == StatusCode::NOT_FOUND && index < last {
                warn!(
                    "404 from {}, retrying with degraded request shape",
                    variant.url
                );
                continue;
            }
            if !response.status.is_success() {
                return Err(status_error(&variant.url, &response));
            }

            let body = parse_body(&response)?;
            check_error_envelope(&body)?;
            let content = Self::extract_content(&body)?;
            return Ok(ProviderResponse {
                content,
                raw_response: response.body,
            });
        }

        unreachable!("request_variants is never empty")
    }
}

// ============================================================================
// Gemini-style family
// ============================================================================

/// Adapter for Gemini-style `generateContent` backends.
pub struct GeminiAdapter {
    client: reqwest::Client,
}

impl GeminiAdapter {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn endpoint(provider: &LlmProvider, model: &str) -> String {
        format!(
            "{}/models/{}:generateContent",
            normalize_base(&provider.base_url),
            urlencoding::encode(model)
        )
    }

    fn payload(provider: &LlmProvider, request: &ChatRequest) -> Value {
        let contents: Vec<Value> = request
            .non_system_messages()
            .map(|m| {
                let role = match m.role {
                    ChatRole::Assistant => "model",
                    _ => "user",
                };
                json!({"role": role, "parts": [{"text": m.content}]})
            })
            .collect();

        let mut payload = json!({"contents": contents});

        let system_text = request.system_text();
        if !system_text.is_empty() {
            payload["systemInstruction"] = json!({"parts": [{"text": system_text}]});
        }

        let mut generation_config = serde_json::Map::new();
        if let Some(temperature) = request.temperature.or(provider.temperature) {
            generation_config.insert("temperature".to_string(), json!(temperature));
        }
        if let Some(max_tokens) = request.max_tokens.or(provider.max_tokens) {
            generation_config.insert("maxOutputTokens".to_string(), json!(max_tokens));
        }
        if !generation_config.is_empty() {
            payload["generationConfig"] = Value::Object(generation_config);
        }

        payload
    }

    fn extract_content(body: &Value) -> Result<String, PlanError> {
        // Grounding metadata (web search citations) is surfaced for
        // observability but never affects trade logic.
        if let Some(grounding) = body["candidates"][0].get("groundingMetadata") {
            debug!("Gemini grounding metadata present: {}", grounding);
        }

        let parts = body["candidates"][0]["content"]["parts"]
            .as_array()
            .cloned()
            .unwrap_or_default();
        let content: String = parts
            .iter()
            .filter_map(|part| part["text"].as_str())
            .collect::<Vec<_>>()
            .join("");
        if content.trim().is_empty() {
            return Err(PlanError::EmptyContent);
        }
        Ok(content)
    }
}

#[async_trait]
impl ProviderAdapter for GeminiAdapter {
    async fn invoke(
        &self,
        provider: &LlmProvider,
        request: &ChatRequest,
    ) -> Result<ProviderResponse, PlanError> {
        let url = Self::endpoint(provider, &request.model);
        let payload = Self::payload(provider, request);

        let api_key = provider.api_key.clone().unwrap_or_default();
        let headers: Vec<(&str, &str)> = vec![("x-goog-api-key", api_key.as_str())];

        let response = post_json(&self.client, &url, &headers, &payload).await?;
        if !response.status.is_success() {
            return Err(status_error(&url, &response));
        }

        let body = parse_body(&response)?;
        check_error_envelope(&body)?;
        let content = Self::extract_content(&body)?;
        Ok(ProviderResponse {
            content,
            raw_response: response.body,
        })
    }
}

// ============================================================================
// Anthropic-style family
// ============================================================================

/// Adapter for Anthropic-style `/v1/messages` backends.
pub struct AnthropicAdapter {
    client: reqwest::Client,
}

impl AnthropicAdapter {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn endpoint(provider: &LlmProvider) -> String {
        format!("{}/v1/messages", normalize_base(&provider.base_url))
    }

    fn payload(provider: &LlmProvider, request: &ChatRequest) -> Value {
        let messages: Vec<Value> = request
            .non_system_messages()
            .map(|m| {
                json!({
                    "role": m.role.as_str(),
                    "content": [{"type": "text", "text": m.content}],
                })
            })
            .collect();

        // The protocol requires max_tokens on every request.
        let max_tokens = request
            .max_tokens
            .or(provider.max_tokens)
            .unwrap_or(ANTHROPIC_DEFAULT_MAX_TOKENS);

        let mut payload = json!({
            "model": request.model,
            "max_tokens": max_tokens,
            "messages": messages,
        });

        let system_text = request.system_text();
        if !system_text.is_empty() {
            payload["system"] = json!(system_text);
        }
        if let Some(temperature) = request.temperature.or(provider.temperature) {
            payload["temperature"] = json!(temperature);
        }

        payload
    }

    fn extract_content(body: &Value) -> Result<String, PlanError> {
        let blocks = body["content"].as_array().cloned().unwrap_or_default();
        let content: String = blocks
            .iter()
            .filter(|block| block["type"].as_str() == Some("text"))
            .filter_map(|block| block["text"].as_str())
            .collect::<Vec<_>>()
            .join("");
        if content.trim().is_empty() {
            return Err(PlanError::EmptyContent);
        }
        Ok(content)
    }
}

#[async_trait]
impl ProviderAdapter for AnthropicAdapter {
    async fn invoke(
        &self,
        provider: &LlmProvider,
        request: &ChatRequest,
    ) -> Result<ProviderResponse, PlanError> {
        let url = Self::endpoint(provider);
        let payload = Self::payload(provider, request);

        let api_key = provider.api_key.clone().unwrap_or_default();
        let headers: Vec<(&str, &str)> = vec![
            ("x-api-key", api_key.as_str()),
            ("anthropic-version", ANTHROPIC_VERSION),
        ];

        let response = post_json(&self.client, &url, &headers, &payload).await?;
        if !response.status.is_success() {
            return Err(status_error(&url, &response));
        }

        let body = parse_body(&response)?;
        check_error_envelope(&body)?;
        let content = Self::extract_content(&body)?;
        Ok(ProviderResponse {
            content,
            raw_response: response.body,
        })
    }
}

// ============================================================================
// Dispatch
// ============================================================================

/// Dispatches invocations to the adapter matching the provider's family.
pub struct ProviderInvoker {
    openai: OpenAiCompatibleAdapter,
    gemini: GeminiAdapter,
    anthropic: AnthropicAdapter,
}

impl ProviderInvoker {
    /// Creates an invoker with the default provider timeout.
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_PROVIDER_TIMEOUT)
    }

    /// Creates an invoker whose HTTP client uses the given timeout.
    pub fn with_timeout(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            openai: OpenAiCompatibleAdapter::new(client.clone()),
            gemini: GeminiAdapter::new(client.clone()),
            anthropic: AnthropicAdapter::new(client),
        }
    }
}

impl Default for ProviderInvoker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProviderAdapter for ProviderInvoker {
    async fn invoke(
        &self,
        provider: &LlmProvider,
        request: &ChatRequest,
    ) -> Result<ProviderResponse, PlanError> {
        match provider.family {
            ProviderFamily::OpenAi | ProviderFamily::Local => {
                self.openai.invoke(provider, request).await
            }
            ProviderFamily::Gemini => self.gemini.invoke(provider, request).await,
            ProviderFamily::Anthropic => self.anthropic.invoke(provider, request).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn provider(family: ProviderFamily, base_url: &str) -> LlmProvider {
        LlmProvider {
            id: "prov-1".to_string(),
            name: "Test".to_string(),
            family,
            base_url: base_url.to_string(),
            api_key: Some("secret".to_string()),
            model: "test-model".to_string(),
            temperature: Some(0.2),
            max_tokens: None,
            is_default: true,
            created_at: Utc::now(),
        }
    }

    fn request() -> ChatRequest {
        ChatRequest {
            model: "test-model".to_string(),
            messages: vec![
                ChatMessage::system("be terse"),
                ChatMessage::system("return json"),
                ChatMessage::user("plan trades"),
            ],
            temperature: None,
            max_tokens: None,
            json_response: true,
        }
    }

    #[test]
    fn chat_completions_url_normalization() {
        assert_eq!(
            build_chat_completions_url("https://api.x.com"),
            "https://api.x.com/v1/chat/completions"
        );
        assert_eq!(
            build_chat_completions_url("https://api.x.com/v1"),
            "https://api.x.com/v1/chat/completions"
        );
        assert_eq!(
            build_chat_completions_url("https://api.x.com/v1/"),
            "https://api.x.com/v1/chat/completions"
        );
        assert_eq!(
            build_chat_completions_url("https://api.x.com/v1/chat/completions"),
            "https://api.x.com/v1/chat/completions"
        );
        assert_eq!(
            build_chat_completions_url("http://localhost:11434/"),
            "http://localhost:11434/v1/chat/completions"
        );
    }

    #[test]
    fn version_segment_is_stripped_for_the_last_fallback() {
        assert_eq!(
            strip_version_segment("https://api.x.com/v1/chat/completions"),
            "https://api.x.com/chat/completions"
        );
        // No version segment: URL unchanged.
        assert_eq!(
            strip_version_segment("https://api.x.com/chat/completions"),
            "https://api.x.com/chat/completions"
        );
    }

    #[test]
    fn openai_request_variants_degrade_in_order() {
        let variants =
            OpenAiCompatibleAdapter::request_variants("https://api.x.com", true);
        assert_eq!(variants.len(), 3);
        assert_eq!(variants[0].url, "https://api.x.com/v1/chat/completions");
        assert!(variants[0].json_response);
        assert_eq!(variants[1].url, "https://api.x.com/v1/chat/completions");
        assert!(!variants[1].json_response);
        assert_eq!(variants[2].url, "https://api.x.com/chat/completions");
        assert!(!variants[2].json_response);
    }

    #[test]
    fn openai_request_variants_without_json_hint() {
        let variants =
            OpenAiCompatibleAdapter::request_variants("https://api.x.com", false);
        assert_eq!(variants.len(), 2);
        assert!(!variants[0].json_response);
        assert_eq!(variants[1].url, "https://api.x.com/chat/completions");
    }

    #[test]
    fn openai_payload_shape() {
        let p = provider(ProviderFamily::OpenAi, "https://api.x.com");
        let payload = OpenAiCompatibleAdapter::payload(&p, &request(), true);
        assert_eq!(payload["model"], "test-model");
        assert_eq!(payload["messages"].as_array().unwrap().len(), 3);
        assert_eq!(payload["messages"][0]["role"], "system");
        assert_eq!(payload["temperature"], json!(0.2));
        assert_eq!(payload["response_format"]["type"], "json_object");

        let bare = OpenAiCompatibleAdapter::payload(&p, &request(), false);
        assert!(bare.get("response_format").is_none());
    }

    #[test]
    fn gemini_payload_splits_system_instruction() {
        let p = provider(ProviderFamily::Gemini, "https://gen.example.com/v1beta");
        let payload = GeminiAdapter::payload(&p, &request());

        assert_eq!(
            payload["systemInstruction"]["parts"][0]["text"],
            "be terse\n\nreturn json"
        );
        let contents = payload["contents"].as_array().unwrap();
        assert_eq!(contents.len(), 1);
        assert_eq!(contents[0]["role"], "user");
        assert_eq!(contents[0]["parts"][0]["text"], "plan trades");
        assert_eq!(payload["generationConfig"]["temperature"], json!(0.2));
    }

    #[test]
    fn gemini_endpoint_encodes_the_model() {
        let p = provider(ProviderFamily::Gemini, "https://gen.example.com/v1beta/");
        let url = GeminiAdapter::endpoint(&p, "models/custom one");
        assert_eq!(
            url,
            "https://gen.example.com/v1beta/models/models%2Fcustom%20one:generateContent"
        );
    }

    #[test]
    fn gemini_content_concatenates_text_parts() {
        let body = json!({
            "candidates": [{
                "content": {"parts": [{"text": "{\"a\":"}, {"text": "1}"}]}
            }]
        });
        assert_eq!(GeminiAdapter::extract_content(&body).unwrap(), "{\"a\":1}");
    }

    #[test]
    fn anthropic_payload_always_carries_max_tokens() {
        let p = provider(ProviderFamily::Anthropic, "https://api.anthropic.com/");
        let payload = AnthropicAdapter::payload(&p, &request());
        assert_eq!(payload["max_tokens"], json!(ANTHROPIC_DEFAULT_MAX_TOKENS));
        assert_eq!(payload["system"], "be terse\n\nreturn json");
        let messages = payload["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["content"][0]["type"], "text");

        assert_eq!(
            AnthropicAdapter::endpoint(&p),
            "https://api.anthropic.com/v1/messages"
        );
    }

    #[test]
    fn anthropic_content_joins_text_blocks_only() {
        let body = json!({
            "content": [
                {"type": "text", "text": "hello "},
                {"type": "tool_use", "id": "x"},
                {"type": "text", "text": "world"}
            ]
        });
        assert_eq!(
            AnthropicAdapter::extract_content(&body).unwrap(),
            "hello world"
        );
    }

    #[test]
    fn empty_content_is_an_error() {
        let body = json!({"choices": [{"message": {"content": ""}}]});
        assert!(matches!(
            OpenAiCompatibleAdapter::extract_content(&body),
            Err(PlanError::EmptyContent)
        ));
    }

    #[test]
    fn error_envelope_is_raised() {
        let body = json!({"error": {"message": "model overloaded"}});
        assert!(matches!(
            check_error_envelope(&body),
            Err(PlanError::ProviderRequest { .. })
        ));
        assert!(check_error_envelope(&json!({"choices": []})).is_ok());
    }
}
