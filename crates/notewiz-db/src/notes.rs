//! Note and note share repositories.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use notewiz_core::{
    CreateNoteRequest, Error, Note, NoteRepository, NoteShare, NoteShareRepository, Result,
    UpdateNoteRequest,
};

const NOTE_COLUMNS: &str = "id, user_id, document_id, title, content, color, is_pinned, \
     is_private, cover_image_url, tags, created_at, updated_at";

fn note_from_row(row: &PgRow) -> Note {
    Note {
        id: row.get("id"),
        user_id: row.get("user_id"),
        document_id: row.get("document_id"),
        title: row.get("title"),
        content: row.get("content"),
        color: row.get("color"),
        is_pinned: row.get("is_pinned"),
        is_private: row.get("is_private"),
        cover_image_url: row.get("cover_image_url"),
        tags: row.get("tags"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn share_from_row(row: &PgRow) -> NoteShare {
    NoteShare {
        id: row.get("id"),
        note_id: row.get("note_id"),
        shared_with_user_id: row.get("shared_with_user_id"),
        can_edit: row.get("can_edit"),
        shared_at: row.get("shared_at"),
    }
}

/// Trim, drop empties and de-duplicate tags, keeping first-seen order.
pub fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !out.iter().any(|t| t == tag) {
            out.push(tag.to_string());
        }
    }
    out
}

/// PostgreSQL implementation of NoteRepository.
pub struct PgNoteRepository {
    pool: Pool<Postgres>,
}

impl PgNoteRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NoteRepository for PgNoteRepository {
    async fn insert(&self, user_id: Uuid, req: CreateNoteRequest) -> Result<Note> {
        let sql = format!(
            r#"
            INSERT INTO note (id, user_id, document_id, title, content, color, is_pinned,
                              is_private, cover_image_url, tags, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {}
            "#,
            NOTE_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(Uuid::now_v7())
            .bind(user_id)
            .bind(req.document_id)
            .bind(&req.title)
            .bind(&req.content)
            .bind(&req.color)
            .bind(req.is_pinned)
            .bind(req.is_private)
            .bind(&req.cover_image_url)
            .bind(normalize_tags(req.tags))
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(note_from_row(&row))
    }

    async fn get(&self, id: Uuid) -> Result<Option<Note>> {
        let sql = format!("SELECT {} FROM note WHERE id = $1", NOTE_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(row.as_ref().map(note_from_row))
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Note>> {
        let sql = format!(
            "SELECT {} FROM note WHERE user_id = $1 ORDER BY is_pinned DESC, created_at DESC",
            NOTE_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(rows.iter().map(note_from_row).collect())
    }

    async fn list_shared_with(&self, user_id: Uuid) -> Result<Vec<Note>> {
        let rows = sqlx::query(
            r#"
            SELECT n.id, n.user_id, n.document_id, n.title, n.content, n.color, n.is_pinned,
                   n.is_private, n.cover_image_url, n.tags, n.created_at, n.updated_at
            FROM note n
            JOIN note_share s ON s.note_id = n.id
            WHERE s.shared_with_user_id = $1
            ORDER BY s.shared_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(rows.iter().map(note_from_row).collect())
    }

    async fn update(&self, id: Uuid, req: UpdateNoteRequest) -> Result<Note> {
        let sql = format!(
            r#"
            UPDATE note SET
                title = COALESCE($2, title),
                content = COALESCE($3, content),
                color = COALESCE($4, color),
                is_pinned = COALESCE($5, is_pinned),
                is_private = COALESCE($6, is_private),
                cover_image_url = COALESCE($7, cover_image_url),
                tags = COALESCE($8, tags),
                updated_at = $9
            WHERE id = $1
            RETURNING {}
            "#,
            NOTE_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(&req.title)
            .bind(&req.content)
            .bind(&req.color)
            .bind(req.is_pinned)
            .bind(req.is_private)
            .bind(&req.cover_image_url)
            .bind(req.tags.map(normalize_tags))
            .bind(Utc::now())
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?
            .ok_or_else(|| Error::NotFound(format!("Note {} not found", id)))?;

        Ok(note_from_row(&row))
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        // note_share and note_drawing rows cascade.
        let result = sqlx::query("DELETE FROM note WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("Note {} not found", id)));
        }
        Ok(())
    }

    async fn ids_for_document(&self, document_id: Uuid) -> Result<Vec<Uuid>> {
        let ids: Vec<Uuid> =
            sqlx::query_scalar("SELECT id FROM note WHERE document_id = $1 ORDER BY created_at")
                .bind(document_id)
                .fetch_all(&self.pool)
                .await
                .map_err(Error::Database)?;
        Ok(ids)
    }
}

/// PostgreSQL implementation of NoteShareRepository.
pub struct PgNoteShareRepository {
    pool: Pool<Postgres>,
}

impl PgNoteShareRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NoteShareRepository for PgNoteShareRepository {
    async fn insert(
        &self,
        note_id: Uuid,
        shared_with_user_id: Uuid,
        can_edit: bool,
    ) -> Result<NoteShare> {
        let row = sqlx::query(
            r#"
            INSERT INTO note_share (id, note_id, shared_with_user_id, can_edit, shared_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, note_id, shared_with_user_id, can_edit, shared_at
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(note_id)
        .bind(shared_with_user_id)
        .bind(can_edit)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            let err = Error::Database(e);
            if err.is_unique_violation() {
                Error::Conflict("Note is already shared with this user".to_string())
            } else {
                err
            }
        })?;

        Ok(share_from_row(&row))
    }

    async fn get(&self, id: Uuid) -> Result<Option<NoteShare>> {
        let row = sqlx::query(
            "SELECT id, note_id, shared_with_user_id, can_edit, shared_at FROM note_share WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(row.as_ref().map(share_from_row))
    }

    async fn find(&self, note_id: Uuid, user_id: Uuid) -> Result<Option<NoteShare>> {
        let row = sqlx::query(
            r#"
            SELECT id, note_id, shared_with_user_id, can_edit, shared_at
            FROM note_share
            WHERE note_id = $1 AND shared_with_user_id = $2
            "#,
        )
        .bind(note_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(row.as_ref().map(share_from_row))
    }

    async fn list_for_note(&self, note_id: Uuid) -> Result<Vec<NoteShare>> {
        let rows = sqlx::query(
            r#"
            SELECT id, note_id, shared_with_user_id, can_edit, shared_at
            FROM note_share
            WHERE note_id = $1
            ORDER BY shared_at
            "#,
        )
        .bind(note_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(rows.iter().map(share_from_row).collect())
    }

    async fn set_can_edit(&self, id: Uuid, can_edit: bool) -> Result<NoteShare> {
        let row = sqlx::query(
            r#"
            UPDATE note_share SET can_edit = $2
            WHERE id = $1
            RETURNING id, note_id, shared_with_user_id, can_edit, shared_at
            "#,
        )
        .bind(id)
        .bind(can_edit)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?
        .ok_or_else(|| Error::NotFound(format!("Share {} not found", id)))?;
        Ok(share_from_row(&row))
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM note_share WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("Share {} not found", id)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_tags() {
        let tags = vec![
            " work ".to_string(),
            "".to_string(),
            "work".to_string(),
            "home".to_string(),
            "   ".to_string(),
        ];
        assert_eq!(normalize_tags(tags), vec!["work", "home"]);
    }
}
