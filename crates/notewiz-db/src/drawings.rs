//! Note drawing repository.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use notewiz_core::{Error, NoteDrawing, NoteDrawingRepository, Result};

const DRAWING_COLUMNS: &str = "id, note_id, drawing_data, created_at, updated_at";

fn drawing_from_row(row: &PgRow) -> NoteDrawing {
    NoteDrawing {
        id: row.get("id"),
        note_id: row.get("note_id"),
        drawing_data: row.get("drawing_data"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

/// PostgreSQL implementation of NoteDrawingRepository.
pub struct PgNoteDrawingRepository {
    pool: Pool<Postgres>,
}

impl PgNoteDrawingRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NoteDrawingRepository for PgNoteDrawingRepository {
    async fn insert(&self, note_id: Uuid, drawing_data: &str) -> Result<NoteDrawing> {
        let sql = format!(
            "INSERT INTO note_drawing (id, note_id, drawing_data, created_at) \
             VALUES ($1, $2, $3, $4) RETURNING {}",
            DRAWING_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(Uuid::now_v7())
            .bind(note_id)
            .bind(drawing_data)
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(drawing_from_row(&row))
    }

    async fn get(&self, id: Uuid) -> Result<Option<NoteDrawing>> {
        let sql = format!("SELECT {} FROM note_drawing WHERE id = $1", DRAWING_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(row.as_ref().map(drawing_from_row))
    }

    async fn list_for_note(&self, note_id: Uuid) -> Result<Vec<NoteDrawing>> {
        let sql = format!(
            "SELECT {} FROM note_drawing WHERE note_id = $1 ORDER BY created_at, id",
            DRAWING_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(note_id)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(rows.iter().map(drawing_from_row).collect())
    }

    async fn update(&self, id: Uuid, drawing_data: &str) -> Result<NoteDrawing> {
        let sql = format!(
            "UPDATE note_drawing SET drawing_data = $2, updated_at = $3 \
             WHERE id = $1 RETURNING {}",
            DRAWING_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(drawing_data)
            .bind(Utc::now())
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?
            .ok_or_else(|| Error::NotFound(format!("Drawing {} not found", id)))?;
        Ok(drawing_from_row(&row))
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM note_drawing WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(result.rows_affected() > 0)
    }
}
