//! AI interaction log.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use notewiz_core::{AiInteractionRepository, CreateAiInteractionRequest, Error, Result};

/// PostgreSQL implementation of AiInteractionRepository.
pub struct PgAiInteractionRepository {
    pool: Pool<Postgres>,
}

impl PgAiInteractionRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AiInteractionRepository for PgAiInteractionRepository {
    async fn insert(&self, req: CreateAiInteractionRequest) -> Result<Uuid> {
        let id = Uuid::now_v7();
        sqlx::query(
            r#"
            INSERT INTO ai_interaction_log
                (id, user_id, prompt, response, tokens_used, processing_time_ms, model, cost, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(id)
        .bind(req.user_id)
        .bind(&req.prompt)
        .bind(&req.response)
        .bind(req.tokens_used)
        .bind(req.processing_time_ms)
        .bind(&req.model)
        .bind(req.cost)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(id)
    }
}
