//! AI assistant endpoints. Every route here is counted by the AI limiter.

use std::time::Instant;

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use notewiz_core::defaults::{AI_CHAT_MAX_TOKENS, AI_CHAT_PROMPT_MAX_CHARS, AI_CHAT_TEMPERATURE};
use notewiz_core::{AiInteractionRepository, ChatMessage, CreateAiInteractionRequest, RateLimitUsage};

use crate::auth::RequireAuth;
use crate::services::{interaction_cost, ChatPrompt};
use crate::{ApiError, AppState};
use notewiz_core::logging::subsystem;

const MAX_TOKENS_LIMIT: u32 = 4096;
const TEMPERATURE_LIMIT: f32 = 2.0;

fn default_max_tokens() -> u32 {
    AI_CHAT_MAX_TOKENS
}

fn default_temperature() -> f32 {
    AI_CHAT_TEMPERATURE
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct ChatRequest {
    pub prompt: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default)]
    pub previous_messages: Vec<ChatMessage>,
}

impl ChatRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        let len = self.prompt.chars().count();
        if self.prompt.trim().is_empty() || len > AI_CHAT_PROMPT_MAX_CHARS {
            return Err(ApiError::BadRequest(format!(
                "Prompt must be 1 to {} characters",
                AI_CHAT_PROMPT_MAX_CHARS
            )));
        }
        if !(1..=MAX_TOKENS_LIMIT).contains(&self.max_tokens) {
            return Err(ApiError::BadRequest(format!(
                "max_tokens must be between 1 and {}",
                MAX_TOKENS_LIMIT
            )));
        }
        if !(0.0..=TEMPERATURE_LIMIT).contains(&self.temperature) {
            return Err(ApiError::BadRequest(format!(
                "temperature must be between 0 and {}",
                TEMPERATURE_LIMIT
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ChatResponse {
    pub response_text: String,
    pub tokens_used: u32,
    pub processing_time_ms: u64,
    pub timestamp: DateTime<Utc>,
}

#[utoipa::path(post, path = "/api/ai/chat", tag = "AI",
    request_body = ChatRequest,
    responses(
        (status = 200, body = ChatResponse),
        (status = 400),
        (status = 401, description = "Unauthorized"),
        (status = 429, description = "Too many requests. Please try again later."),
        (status = 502, description = "AI provider failed")))]
pub async fn chat(
    State(state): State<AppState>,
    auth: RequireAuth,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    req.validate()?;

    let started = Instant::now();
    let prompt_text = req.prompt.clone();
    let reply = state
        .ai_chat
        .complete(ChatPrompt {
            prompt: req.prompt,
            previous_messages: req.previous_messages,
            max_tokens: req.max_tokens,
            temperature: req.temperature,
        })
        .await?;
    let processing_time_ms = started.elapsed().as_millis() as u64;

    let record = CreateAiInteractionRequest {
        user_id: auth.user_id(),
        prompt: prompt_text,
        response: reply.text.clone(),
        tokens_used: i32::try_from(reply.tokens_used).unwrap_or(i32::MAX),
        processing_time_ms: i32::try_from(processing_time_ms).unwrap_or(i32::MAX),
        model: state.ai_chat.model_name().to_string(),
        cost: interaction_cost(reply.tokens_used),
    };
    if let Err(e) = state.db.ai_interactions.insert(record).await {
        warn!(subsystem = subsystem::AI, user_id = %auth.user_id(), error = %e, "Failed to log AI interaction");
    }

    info!(
        subsystem = subsystem::AI,
        op = "chat",
        user_id = %auth.user_id(),
        tokens_used = reply.tokens_used,
        duration_ms = processing_time_ms,
        "AI chat completed"
    );

    Ok(Json(ChatResponse {
        response_text: reply.text,
        tokens_used: reply.tokens_used,
        processing_time_ms,
        timestamp: Utc::now(),
    }))
}

/// The caller's current rate limit window. This call is itself counted.
#[utoipa::path(get, path = "/api/ai/usage", tag = "AI",
    responses((status = 200, body = RateLimitUsage), (status = 401), (status = 429)))]
pub async fn usage(
    State(state): State<AppState>,
    auth: RequireAuth,
) -> Result<Json<RateLimitUsage>, ApiError> {
    Ok(Json(state.rate_limiter.usage(auth.user_id()).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(prompt: &str) -> ChatRequest {
        ChatRequest {
            prompt: prompt.to_string(),
            max_tokens: AI_CHAT_MAX_TOKENS,
            temperature: AI_CHAT_TEMPERATURE,
            previous_messages: Vec::new(),
        }
    }

    #[test]
    fn test_chat_request_defaults() {
        let req: ChatRequest = serde_json::from_str(r#"{"prompt":"hi"}"#).unwrap();
        assert_eq!(req.max_tokens, 1024);
        assert!((req.temperature - 0.7).abs() < f32::EPSILON);
        assert!(req.previous_messages.is_empty());
    }

    #[test]
    fn test_chat_request_bounds() {
        assert!(request("hello").validate().is_ok());
        assert!(request("   ").validate().is_err());
        assert!(request(&"x".repeat(AI_CHAT_PROMPT_MAX_CHARS)).validate().is_ok());
        assert!(request(&"x".repeat(AI_CHAT_PROMPT_MAX_CHARS + 1)).validate().is_err());

        let mut req = request("hello");
        req.max_tokens = 0;
        assert!(req.validate().is_err());
        req.max_tokens = 4097;
        assert!(req.validate().is_err());

        let mut req = request("hello");
        req.temperature = 2.5;
        assert!(req.validate().is_err());
        req.temperature = 0.0;
        assert!(req.validate().is_ok());
    }
}
