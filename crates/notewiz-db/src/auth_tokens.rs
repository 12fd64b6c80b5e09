//! Bearer token repository.
//!
//! Tokens are opaque random strings; only their SHA-256 digest is stored.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use notewiz_core::defaults::{AUTH_TOKEN_LENGTH, AUTH_TOKEN_PREFIX};
use notewiz_core::{AuthTokenRepository, CreateAuthTokenRequest, Error, Result, User};

use crate::users::user_from_row;

/// Generate a new bearer token (`nw_at_` + random alphanumerics).
pub fn generate_token() -> String {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();
    let secret: String = (0..AUTH_TOKEN_LENGTH)
        .map(|_| {
            let idx = rng.gen_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect();
    format!("{}{}", AUTH_TOKEN_PREFIX, secret)
}

/// SHA-256 hex digest of a token.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// PostgreSQL implementation of AuthTokenRepository.
pub struct PgAuthTokenRepository {
    pool: Pool<Postgres>,
}

impl PgAuthTokenRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Delete tokens that expired before `now`. Returns the number removed.
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM auth_token WHERE expires_at < $1")
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl AuthTokenRepository for PgAuthTokenRepository {
    async fn insert(&self, req: CreateAuthTokenRequest) -> Result<Uuid> {
        let id = Uuid::now_v7();
        sqlx::query(
            r#"
            INSERT INTO auth_token (id, user_id, token_hash, device_info, created_at, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(id)
        .bind(req.user_id)
        .bind(&req.token_hash)
        .bind(&req.device_info)
        .bind(Utc::now())
        .bind(req.expires_at)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(id)
    }

    async fn resolve(&self, token_hash: &str, now: DateTime<Utc>) -> Result<Option<User>> {
        let row = sqlx::query(
            r#"
            SELECT u.id, u.username, u.full_name, u.email, u.is_admin, u.created_at
            FROM auth_token t
            JOIN app_user u ON u.id = t.user_id
            WHERE t.token_hash = $1
              AND t.revoked_at IS NULL
              AND t.expires_at > $2
            "#,
        )
        .bind(token_hash)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.as_ref().map(user_from_row))
    }

    async fn revoke(&self, token_hash: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE auth_token SET revoked_at = $2 WHERE token_hash = $1 AND revoked_at IS NULL",
        )
        .bind(token_hash)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_token_shape() {
        let token = generate_token();
        assert!(token.starts_with("nw_at_"));
        assert_eq!(token.len(), AUTH_TOKEN_PREFIX.len() + AUTH_TOKEN_LENGTH);
        assert!(token[AUTH_TOKEN_PREFIX.len()..]
            .chars()
            .all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_generate_token_is_random() {
        assert_ne!(generate_token(), generate_token());
    }

    #[test]
    fn test_hash_token_is_stable_hex() {
        let hash = hash_token("nw_at_abc");
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, hash_token("nw_at_abc"));
        assert_ne!(hash, hash_token("nw_at_abd"));
    }
}
