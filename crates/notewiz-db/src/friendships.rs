//! PostgreSQL friendship store.
//!
//! `send_request` holds a transaction-scoped advisory lock on the unordered
//! user pair while it checks and inserts; the partial unique index on
//! pending pairs backs this up. `respond` locks the request row.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row, Transaction};
use tracing::debug;
use uuid::Uuid;

use notewiz_core::friendship::{canonical_pair, check_send, new_request};
use notewiz_core::{
    Error, Friendship, FriendshipError, FriendshipRequest, FriendshipRequestStatus,
    FriendshipStore, Result,
};
use notewiz_core::logging::{component, subsystem};

const REQUEST_COLUMNS: &str = "id, sender_id, receiver_id, status, created_at, updated_at";

fn request_from_row(row: &PgRow) -> Result<FriendshipRequest> {
    let status: String = row.get("status");
    Ok(FriendshipRequest {
        id: row.get("id"),
        sender_id: row.get("sender_id"),
        receiver_id: row.get("receiver_id"),
        status: status
            .parse::<FriendshipRequestStatus>()
            .map_err(Error::Internal)?,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn friendship_from_row(row: &PgRow) -> Friendship {
    Friendship {
        id: row.get("id"),
        user_id: row.get("user_id"),
        friend_id: row.get("friend_id"),
        created_at: row.get("created_at"),
    }
}

/// Advisory lock key input for an unordered pair.
pub fn pair_lock_name(a: Uuid, b: Uuid) -> String {
    let (lo, hi) = canonical_pair(a, b);
    format!("friendship:{}:{}", lo, hi)
}

/// PostgreSQL implementation of FriendshipStore.
pub struct PgFriendshipRepository {
    pool: Pool<Postgres>,
}

impl PgFriendshipRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    async fn are_friends_tx(
        tx: &mut Transaction<'_, Postgres>,
        a: Uuid,
        b: Uuid,
    ) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM friendship
                WHERE (user_id = $1 AND friend_id = $2) OR (user_id = $2 AND friend_id = $1)
            )
            "#,
        )
        .bind(a)
        .bind(b)
        .fetch_one(&mut **tx)
        .await
        .map_err(Error::Database)?;
        Ok(exists)
    }

    async fn pending_between_tx(
        tx: &mut Transaction<'_, Postgres>,
        a: Uuid,
        b: Uuid,
    ) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM friendship_request
                WHERE status = 'Pending'
                  AND ((sender_id = $1 AND receiver_id = $2) OR (sender_id = $2 AND receiver_id = $1))
            )
            "#,
        )
        .bind(a)
        .bind(b)
        .fetch_one(&mut **tx)
        .await
        .map_err(Error::Database)?;
        Ok(exists)
    }
}

#[async_trait]
impl FriendshipStore for PgFriendshipRepository {
    async fn send_request(
        &self,
        sender: Uuid,
        receiver: Uuid,
        now: DateTime<Utc>,
    ) -> Result<FriendshipRequest> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(pair_lock_name(sender, receiver))
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        let already_friends = Self::are_friends_tx(&mut tx, sender, receiver).await?;
        let pending = Self::pending_between_tx(&mut tx, sender, receiver).await?;
        check_send(sender, receiver, already_friends, pending)?;

        let request = new_request(sender, receiver, now);
        sqlx::query(
            r#"
            INSERT INTO friendship_request (id, sender_id, receiver_id, status, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(request.id)
        .bind(request.sender_id)
        .bind(request.receiver_id)
        .bind(request.status.as_str())
        .bind(request.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            let err = Error::Database(e);
            if err.is_unique_violation() {
                Error::Friendship(FriendshipError::DuplicateRequest)
            } else {
                err
            }
        })?;

        tx.commit().await.map_err(Error::Database)?;
        Ok(request)
    }

    async fn respond(
        &self,
        request_id: Uuid,
        decision: FriendshipRequestStatus,
        now: DateTime<Utc>,
    ) -> Result<(FriendshipRequest, Option<Friendship>)> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let select = format!(
            "SELECT {} FROM friendship_request WHERE id = $1 FOR UPDATE",
            REQUEST_COLUMNS
        );
        let row = sqlx::query(&select)
            .bind(request_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(Error::Database)?
            .ok_or_else(|| Error::NotFound(format!("Friend request {} not found", request_id)))?;
        let mut request = request_from_row(&row)?;

        let friendship = request.respond(decision, now)?;

        sqlx::query("UPDATE friendship_request SET status = $2, updated_at = $3 WHERE id = $1")
            .bind(request.id)
            .bind(request.status.as_str())
            .bind(request.updated_at)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        if let Some(f) = &friendship {
            sqlx::query(
                "INSERT INTO friendship (id, user_id, friend_id, created_at) VALUES ($1, $2, $3, $4)",
            )
            .bind(f.id)
            .bind(f.user_id)
            .bind(f.friend_id)
            .bind(f.created_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                let err = Error::Database(e);
                if err.is_unique_violation() {
                    Error::Friendship(FriendshipError::AlreadyFriends)
                } else {
                    err
                }
            })?;
        }

        tx.commit().await.map_err(Error::Database)?;

        debug!(
            subsystem = subsystem::DB,
            component = component::FRIENDSHIP_STORE,
            op = "respond",
            friend_request_id = %request.id,
            status = %request.status,
            "Friend request row updated"
        );
        Ok((request, friendship))
    }

    async fn remove_friendship(&self, friendship_id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM friendship WHERE id = $1")
            .bind(friendship_id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!(
                "Friendship {} not found",
                friendship_id
            )));
        }
        Ok(())
    }

    async fn are_friends(&self, a: Uuid, b: Uuid) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM friendship
                WHERE (user_id = $1 AND friend_id = $2) OR (user_id = $2 AND friend_id = $1)
            )
            "#,
        )
        .bind(a)
        .bind(b)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(exists)
    }

    async fn get_request(&self, request_id: Uuid) -> Result<Option<FriendshipRequest>> {
        let sql = format!(
            "SELECT {} FROM friendship_request WHERE id = $1",
            REQUEST_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(request_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;
        row.as_ref().map(request_from_row).transpose()
    }

    async fn list_requests(&self, user_id: Uuid) -> Result<Vec<FriendshipRequest>> {
        let sql = format!(
            r#"
            SELECT {} FROM friendship_request
            WHERE sender_id = $1 OR receiver_id = $1
            ORDER BY created_at DESC
            "#,
            REQUEST_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;
        rows.iter().map(request_from_row).collect()
    }

    async fn get_friendship(&self, friendship_id: Uuid) -> Result<Option<Friendship>> {
        let row = sqlx::query("SELECT id, user_id, friend_id, created_at FROM friendship WHERE id = $1")
            .bind(friendship_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(row.as_ref().map(friendship_from_row))
    }

    async fn list_friendships(&self, user_id: Uuid) -> Result<Vec<Friendship>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, friend_id, created_at FROM friendship
            WHERE user_id = $1 OR friend_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(rows.iter().map(friendship_from_row).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_lock_name_is_order_independent() {
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();
        assert_eq!(pair_lock_name(a, b), pair_lock_name(b, a));
        assert_ne!(pair_lock_name(a, b), pair_lock_name(a, Uuid::now_v7()));
    }
}
