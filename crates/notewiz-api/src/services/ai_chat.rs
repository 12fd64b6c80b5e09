//! Chat-completions client for the AI assistant.
//!
//! Speaks the OpenAI-compatible `chat/completions` wire format, which the
//! default DeepSeek endpoint implements.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use notewiz_core::defaults::{AI_CHAT_MODEL, AI_COST_PER_TOKEN};
use notewiz_core::{ChatMessage, Error, Result};
use notewiz_core::logging::subsystem;

/// A prompt plus its conversation history.
#[derive(Debug, Clone)]
pub struct ChatPrompt {
    pub prompt: String,
    pub previous_messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// The assistant's answer.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatReply {
    pub text: String,
    pub tokens_used: u32,
}

/// Anything that can answer a chat prompt.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn complete(&self, prompt: ChatPrompt) -> Result<ChatReply>;

    /// Model name recorded with each interaction.
    fn model_name(&self) -> &str;
}

/// Interaction cost in USD.
pub fn interaction_cost(tokens_used: u32) -> f64 {
    f64::from(tokens_used) * AI_COST_PER_TOKEN
}

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: WireMessage,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    total_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct UpstreamErrorResponse {
    error: UpstreamError,
}

#[derive(Debug, Deserialize)]
struct UpstreamError {
    message: String,
}

/// Conversation as sent upstream: history, then the new user turn.
fn build_messages(prompt: &ChatPrompt) -> Vec<WireMessage> {
    let mut messages: Vec<WireMessage> = prompt
        .previous_messages
        .iter()
        .map(|m| WireMessage {
            role: m.role.clone(),
            content: m.content.clone(),
        })
        .collect();
    messages.push(WireMessage {
        role: "user".to_string(),
        content: prompt.prompt.clone(),
    });
    messages
}

// =============================================================================
// CLIENT
// =============================================================================

/// HTTP client for a DeepSeek (OpenAI-compatible) endpoint.
pub struct DeepSeekClient {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
}

impl DeepSeekClient {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| Error::Inference(format!("Failed to create HTTP client: {}", e)))?;

        if api_key.is_none() {
            warn!(subsystem = subsystem::AI, "No AI API key configured; upstream calls will likely be rejected");
        }

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key,
            model: AI_CHAT_MODEL.to_string(),
        })
    }
}

#[async_trait]
impl ChatBackend for DeepSeekClient {
    async fn complete(&self, prompt: ChatPrompt) -> Result<ChatReply> {
        let request = ChatCompletionRequest {
            model: &self.model,
            messages: build_messages(&prompt),
            max_tokens: prompt.max_tokens,
            temperature: prompt.temperature,
            stream: false,
        };

        let mut req = self.client.post(&self.endpoint).json(&request);
        if let Some(ref api_key) = self.api_key {
            req = req.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = req
            .send()
            .await
            .map_err(|e| Error::Inference(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let message = response
                .json::<UpstreamErrorResponse>()
                .await
                .map(|body| body.error.message)
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(Error::Inference(format!(
                "AI provider returned {}: {}",
                status, message
            )));
        }

        let result: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| Error::Inference(format!("Failed to parse response: {}", e)))?;

        let text = result
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| Error::Inference("AI provider returned no choices".to_string()))?;
        let tokens_used = result.usage.map(|u| u.total_tokens).unwrap_or(0);

        debug!(subsystem = subsystem::AI, model = %self.model, tokens_used, "Chat completion received");
        Ok(ChatReply { text, tokens_used })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_precedes_prompt() {
        let prompt = ChatPrompt {
            prompt: "and then?".to_string(),
            previous_messages: vec![
                ChatMessage { role: "user".into(), content: "hi".into() },
                ChatMessage { role: "assistant".into(), content: "hello".into() },
            ],
            max_tokens: 64,
            temperature: 0.7,
        };
        let messages = build_messages(&prompt);
        let roles: Vec<_> = messages.iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, ["user", "assistant", "user"]);
        assert_eq!(messages[2].content, "and then?");
    }

    #[test]
    fn test_interaction_cost() {
        assert_eq!(interaction_cost(0), 0.0);
        assert!((interaction_cost(500) - 0.001).abs() < 1e-12);
    }

    #[test]
    fn test_response_parsing_tolerates_missing_usage() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"ok"}}]}"#;
        let parsed: ChatCompletionResponse = serde_json::from_str(body).unwrap();
        assert!(parsed.usage.is_none());
        assert_eq!(parsed.choices[0].message.content, "ok");
    }
}
