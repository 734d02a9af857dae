use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, warn};

use crate::{ChatMessage, Generation, GenerationConfig, GenerationError, ProviderType, TextGenerator};

/// Environment variable holding the API key by default
pub const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// OpenAI-compatible chat completions client. Also serves Ollama's compatible endpoint.
pub struct OpenAiGenerator {
    http: Client,
    provider: ProviderType,
    endpoint: String,
    api_key: Option<String>,
}

impl OpenAiGenerator {
    pub fn new(provider: ProviderType) -> Self {
        Self {
            http: Client::new(),
            provider,
            endpoint: provider.default_endpoint().to_string(),
            api_key: None,
        }
    }

    /// Build a generator whose API key is read from `env_var`.
    ///
    /// Providers that require a key fail with [`GenerationError::MissingApiKey`]
    /// when the variable is unset or empty.
    pub fn from_env(provider: ProviderType, env_var: &str) -> Result<Self, GenerationError> {
        let key = std::env::var(env_var).ok().filter(|k| !k.trim().is_empty());
        match key {
            Some(key) => Ok(Self::new(provider).with_api_key(key)),
            None if provider.requires_api_key() => {
                Err(GenerationError::MissingApiKey(env_var.to_string()))
            }
            None => Ok(Self::new(provider)),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Default for OpenAiGenerator {
    fn default() -> Self {
        Self::new(ProviderType::OpenAi)
    }
}

// Request types
#[derive(Serialize, Debug)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

// Response types
#[derive(Deserialize, Debug)]
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize, Debug)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize, Debug)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

fn build_request<'a>(messages: &'a [ChatMessage], config: &'a GenerationConfig) -> ChatRequest<'a> {
    ChatRequest {
        model: &config.model,
        messages,
        temperature: config.temperature,
        max_tokens: config.max_tokens,
    }
}

/// Pull the first choice's content out of a completions response body
fn parse_response(body: &str) -> Result<(String, Option<String>), GenerationError> {
    let response: ChatResponse = serde_json::from_str(body)
        .map_err(|e| GenerationError::MalformedResponse(e.to_string()))?;

    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or(GenerationError::EmptyResponse)?;

    Ok((content, response.model))
}

#[async_trait]
impl TextGenerator for OpenAiGenerator {
    fn name(&self) -> &str {
        match self.provider {
            ProviderType::OpenAi => "OpenAI",
            ProviderType::Ollama => "Ollama",
        }
    }

    async fn generate(
        &self,
        messages: &[ChatMessage],
        config: &GenerationConfig,
    ) -> Result<Generation, GenerationError> {
        let start = Instant::now();

        debug!(
            generator = self.name(),
            model = %config.model,
            messages = messages.len(),
            "Sending chat completion request"
        );

        let body = build_request(messages, config);
        let mut req = self.http.post(&self.endpoint).json(&body);

        if let Some(api_key) = &self.api_key {
            req = req.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = req.send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown".to_string());
            warn!(status, "Chat completion request rejected");
            return Err(GenerationError::Http { status, body });
        }

        let text = response.text().await?;
        let (content, model) = parse_response(&text)?;
        let duration = start.elapsed();

        debug!(
            chars = content.chars().count(),
            duration_ms = duration.as_millis(),
            "Chat completion received"
        );

        Ok(Generation::new(content, model, duration))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serializes_roles_and_settings() {
        let messages = vec![
            ChatMessage::system("You are a writer."),
            ChatMessage::user("Rust"),
        ];
        let config = GenerationConfig::default();
        let json = serde_json::to_value(build_request(&messages, &config)).unwrap();

        assert_eq!(json["model"], "gpt-4o-mini");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["role"], "user");
        assert_eq!(json["messages"][1]["content"], "Rust");
        assert!((json["temperature"].as_f64().unwrap() - 0.5).abs() < 1e-6);
        assert!(json.get("max_tokens").is_none());
    }

    #[test]
    fn test_request_includes_max_tokens_when_set() {
        let messages = vec![ChatMessage::user("hi")];
        let config = GenerationConfig::new("gpt-4o").with_max_tokens(128);
        let json = serde_json::to_value(build_request(&messages, &config)).unwrap();
        assert_eq!(json["max_tokens"], 128);
    }

    #[test]
    fn test_parse_response_takes_first_choice() {
        let body = r#"{
            "id": "chatcmpl-1",
            "model": "gpt-4o-mini-2024-07-18",
            "choices": [
                {"index": 0, "message": {"role": "assistant", "content": "YES"}, "finish_reason": "stop"},
                {"index": 1, "message": {"role": "assistant", "content": "ignored"}, "finish_reason": "stop"}
            ]
        }"#;

        let (content, model) = parse_response(body).unwrap();
        assert_eq!(content, "YES");
        assert_eq!(model.as_deref(), Some("gpt-4o-mini-2024-07-18"));
    }

    #[test]
    fn test_parse_response_without_choices_is_empty() {
        let result = parse_response(r#"{"choices": []}"#);
        assert!(matches!(result, Err(GenerationError::EmptyResponse)));
    }

    #[test]
    fn test_parse_response_null_content_is_empty() {
        let body = r#"{"choices": [{"message": {"role": "assistant", "content": null}}]}"#;
        assert!(matches!(
            parse_response(body),
            Err(GenerationError::EmptyResponse)
        ));
    }

    #[test]
    fn test_parse_response_rejects_garbage() {
        assert!(matches!(
            parse_response("<html>502 Bad Gateway</html>"),
            Err(GenerationError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_ollama_uses_local_endpoint() {
        let generator = OpenAiGenerator::new(ProviderType::Ollama);
        assert_eq!(
            generator.endpoint(),
            "http://localhost:11434/v1/chat/completions"
        );
        assert_eq!(generator.name(), "Ollama");
    }

    #[test]
    fn test_from_env_requires_key_for_openai() {
        let result = OpenAiGenerator::from_env(
            ProviderType::OpenAi,
            "DRAFTLOOP_TEST_KEY_THAT_IS_NEVER_SET",
        );
        assert!(matches!(result, Err(GenerationError::MissingApiKey(_))));
    }

    #[test]
    fn test_from_env_allows_keyless_ollama() {
        let result = OpenAiGenerator::from_env(
            ProviderType::Ollama,
            "DRAFTLOOP_TEST_KEY_THAT_IS_NEVER_SET",
        );
        assert!(result.is_ok());
    }
}
