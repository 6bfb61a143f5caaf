//! Chat Providers
//!
//! All supported providers speak the OpenAI-compatible chat-completions wire
//! format with bearer auth; they differ only in endpoint and model.

use super::config::ProviderConfig;
use super::error::{LlmError, LlmErrorKind};
use super::LlmResponse;
use std::str::FromStr;
use std::time::{Duration, Instant};

/// A remote chat model.
pub trait LlmProvider: Send + Sync {
    /// Provider name, unique within a pool
    fn name(&self) -> &str;

    fn model(&self) -> &str;

    /// Whether the provider can currently take requests
    fn is_available(&self) -> bool {
        true
    }

    /// Send one system + user exchange and return the reply.
    fn chat(&self, system_prompt: Option<&str>, user_message: &str) -> Result<LlmResponse, LlmError>;
}

/// Known provider services.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Groq,
    OpenRouter,
    HuggingFace,
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "groq" => Ok(ProviderKind::Groq),
            "openrouter" => Ok(ProviderKind::OpenRouter),
            "huggingface" => Ok(ProviderKind::HuggingFace),
            other => Err(format!("Unknown provider type: {}", other)),
        }
    }
}

/// Chat-completions client for one configured provider.
pub struct ChatCompletionsProvider {
    kind: ProviderKind,
    config: ProviderConfig,
    api_key: String,
    agent: ureq::Agent,
}

impl ChatCompletionsProvider {
    pub fn new(kind: ProviderKind, config: ProviderConfig, api_key: String) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build();
        Self {
            kind,
            config,
            api_key,
            agent,
        }
    }

    /// Build from config, resolving the key. `None` when the provider is
    /// disabled, has no key or is not a known service.
    pub fn from_config(config: ProviderConfig) -> Option<Self> {
        if !config.enabled {
            log::debug!("Provider {} is disabled, skipping", config.name);
            return None;
        }

        let Some(api_key) = config.resolve_api_key() else {
            log::warn!(
                "API key not found for {} (config or env: {}), skipping",
                config.name,
                config.api_key_env_var.as_deref().unwrap_or("-")
            );
            return None;
        };

        match config.name.parse::<ProviderKind>() {
            Ok(kind) => Some(Self::new(kind, config, api_key)),
            Err(e) => {
                log::warn!("{}", e);
                None
            }
        }
    }

    pub fn kind(&self) -> ProviderKind {
        self.kind
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    fn request_body(&self, system_prompt: Option<&str>, user_message: &str) -> serde_json::Value {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system_prompt.filter(|s| !s.is_empty()) {
            messages.push(ureq::json!({ "role": "system", "content": system }));
        }
        messages.push(ureq::json!({ "role": "user", "content": user_message }));

        ureq::json!({
            "model": self.config.model,
            "temperature": self.config.temperature,
            "max_tokens": self.config.max_tokens,
            "messages": messages,
        })
    }
}

impl LlmProvider for ChatCompletionsProvider {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    fn is_available(&self) -> bool {
        !self.api_key.is_empty()
    }

    fn chat(&self, system_prompt: Option<&str>, user_message: &str) -> Result<LlmResponse, LlmError> {
        let name = self.config.name.as_str();
        let started = Instant::now();

        let mut request = self
            .agent
            .post(&self.config.api_url)
            .set("Content-Type", "application/json")
            .set("Authorization", &format!("Bearer {}", self.api_key));
        if self.kind == ProviderKind::OpenRouter {
            request = request.set("X-Title", "forum-labeler");
        }

        let response = request
            .send_json(self.request_body(system_prompt, user_message))
            .map_err(|e| match e {
                ureq::Error::Status(status, resp) => {
                    let retry_after = resp.header("Retry-After").map(str::to_string);
                    let body = resp.into_string().unwrap_or_default();
                    classify_status(name, status, retry_after.as_deref(), &body)
                }
                ureq::Error::Transport(t) => LlmError::network(name, format!("Network error: {}", t)),
            })?;

        let body: serde_json::Value = response
            .into_json()
            .map_err(|e| LlmError::unknown(name, format!("Failed to parse response: {}", e)))?;

        let mut reply = extract_content(name, &self.config.model, &body)?;
        reply.response_time = started.elapsed();
        Ok(reply)
    }
}

/// Map a non-success HTTP status to an error.
pub fn classify_status(provider: &str, status: u16, retry_after: Option<&str>, body: &str) -> LlmError {
    match status {
        429 => {
            let retry_after = retry_after
                .and_then(|s| s.trim().parse::<u64>().ok())
                .map(Duration::from_secs);
            let message = match retry_after {
                Some(d) => format!("Rate limit exceeded, retry after {}s", d.as_secs()),
                None => "Rate limit exceeded".to_string(),
            };
            LlmError::rate_limited(provider, message, retry_after)
        }
        401 | 403 => LlmError::auth(provider, "Invalid API key"),
        400 => LlmError::new(
            LlmErrorKind::InvalidRequest,
            provider,
            format!("Invalid request: {}", error_message(body)),
        ),
        s if s >= 500 => LlmError::server(provider, format!("Server error: {}", s)),
        s => LlmError::unknown(provider, format!("Unexpected response: {}", s)),
    }
}

/// Pull the reply out of a 200 chat-completions body. An `error` field in
/// the body is classified like an HTTP failure.
pub fn extract_content(provider: &str, model: &str, body: &serde_json::Value) -> Result<LlmResponse, LlmError> {
    if let Some(error) = body.get("error") {
        let message = value_text(error.get("message").unwrap_or(error));
        let lower = message.to_lowercase();
        let kind = if lower.contains("rate_limit") || lower.contains("rate limit") {
            LlmErrorKind::RateLimit
        } else if lower.contains("token") || lower.contains("context") {
            LlmErrorKind::TokenLimit
        } else {
            LlmErrorKind::Unknown
        };
        return Err(LlmError::new(kind, provider, format!("API error: {}", message)));
    }

    let content = body["choices"][0]["message"]["content"]
        .as_str()
        .ok_or_else(|| LlmError::unknown(provider, "No content in response"))?;

    let usage = &body["usage"];
    Ok(LlmResponse {
        content: content.to_string(),
        provider: provider.to_string(),
        model: body["model"].as_str().unwrap_or(model).to_string(),
        prompt_tokens: usage["prompt_tokens"].as_u64().unwrap_or(0) as u32,
        completion_tokens: usage["completion_tokens"].as_u64().unwrap_or(0) as u32,
        response_time: Duration::ZERO,
    })
}

fn error_message(body: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(json) => match json.get("error") {
            Some(error) => value_text(error.get("message").unwrap_or(error)),
            None => body.to_string(),
        },
        Err(_) => body.to_string(),
    }
}

fn value_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_classify_rate_limit_with_retry_after() {
        let err = classify_status("groq", 429, Some("12"), "");
        assert_eq!(err.kind, LlmErrorKind::RateLimit);
        assert_eq!(err.retry_after, Some(Duration::from_secs(12)));

        let err = classify_status("groq", 429, Some("soon"), "");
        assert_eq!(err.retry_after, None);
    }

    #[test]
    fn test_classify_other_statuses() {
        assert_eq!(classify_status("g", 401, None, "").kind, LlmErrorKind::Auth);
        assert_eq!(classify_status("g", 403, None, "").kind, LlmErrorKind::Auth);
        assert_eq!(classify_status("g", 503, None, "").kind, LlmErrorKind::Server);
        assert_eq!(classify_status("g", 404, None, "").kind, LlmErrorKind::Unknown);

        let err = classify_status("g", 400, None, r#"{"error":{"message":"model not found"}}"#);
        assert_eq!(err.kind, LlmErrorKind::InvalidRequest);
        assert_eq!(err.message, "Invalid request: model not found");

        let err = classify_status("g", 400, None, r#"{"error":"bad input"}"#);
        assert_eq!(err.message, "Invalid request: bad input");
    }

    #[test]
    fn test_extract_content() {
        let body = json!({
            "model": "llama-3.1-8b-instant",
            "choices": [{ "message": { "role": "assistant", "content": "TRUE" } }],
            "usage": { "prompt_tokens": 120, "completion_tokens": 1 }
        });
        let reply = extract_content("groq", "fallback", &body).unwrap();
        assert_eq!(reply.content, "TRUE");
        assert_eq!(reply.model, "llama-3.1-8b-instant");
        assert_eq!(reply.prompt_tokens, 120);
        assert_eq!(reply.completion_tokens, 1);
    }

    #[test]
    fn test_extract_content_error_bodies() {
        let rate = json!({ "error": { "message": "Rate limit reached for model" } });
        assert_eq!(extract_content("g", "m", &rate).unwrap_err().kind, LlmErrorKind::RateLimit);

        let lower = json!({ "error": { "message": "rate limit exceeded" } });
        assert_eq!(extract_content("g", "m", &lower).unwrap_err().kind, LlmErrorKind::RateLimit);

        let code = json!({ "error": { "message": "RATE_LIMIT_EXCEEDED" } });
        assert_eq!(extract_content("g", "m", &code).unwrap_err().kind, LlmErrorKind::RateLimit);

        let tokens = json!({ "error": "maximum context length exceeded" });
        assert_eq!(extract_content("g", "m", &tokens).unwrap_err().kind, LlmErrorKind::TokenLimit);

        let empty = json!({ "choices": [] });
        assert_eq!(extract_content("g", "m", &empty).unwrap_err().kind, LlmErrorKind::Unknown);
    }

    #[test]
    fn test_provider_kind() {
        assert_eq!("openrouter".parse::<ProviderKind>(), Ok(ProviderKind::OpenRouter));
        assert!("anthropic".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn test_request_body_omits_empty_system_prompt() {
        let config: ProviderConfig = serde_json::from_value(json!({
            "name": "groq",
            "apiUrl": "http://127.0.0.1:9/v1/chat/completions",
            "model": "m",
            "maxTokens": 5
        }))
        .unwrap();
        let provider = ChatCompletionsProvider::new(ProviderKind::Groq, config, "k".to_string());

        let body = provider.request_body(Some(""), "hello");
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert_eq!(body["max_tokens"], 5);

        let body = provider.request_body(Some("be brief"), "hello");
        assert_eq!(body["messages"][0]["role"], "system");
    }
}
