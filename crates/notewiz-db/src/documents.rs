//! Document repository implementation.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use notewiz_core::{CreateDocumentRequest, Document, DocumentRepository, Error, Result};

const DOCUMENT_COLUMNS: &str =
    "id, user_id, title, file_name, file_path, content_type, file_size, extracted_text, created_at";

fn document_from_row(row: &PgRow) -> Document {
    Document {
        id: row.get("id"),
        user_id: row.get("user_id"),
        title: row.get("title"),
        file_name: row.get("file_name"),
        file_path: row.get("file_path"),
        content_type: row.get("content_type"),
        file_size: row.get("file_size"),
        extracted_text: row.get("extracted_text"),
        created_at: row.get("created_at"),
    }
}

/// PostgreSQL implementation of DocumentRepository.
pub struct PgDocumentRepository {
    pool: Pool<Postgres>,
}

impl PgDocumentRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentRepository for PgDocumentRepository {
    async fn insert(&self, req: CreateDocumentRequest) -> Result<Document> {
        let sql = format!(
            r#"
            INSERT INTO document (id, user_id, title, file_name, file_path, content_type,
                                  file_size, extracted_text, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {}
            "#,
            DOCUMENT_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(Uuid::now_v7())
            .bind(req.user_id)
            .bind(&req.title)
            .bind(&req.file_name)
            .bind(&req.file_path)
            .bind(&req.content_type)
            .bind(req.file_size)
            .bind(&req.extracted_text)
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(document_from_row(&row))
    }

    async fn get(&self, id: Uuid) -> Result<Option<Document>> {
        let sql = format!("SELECT {} FROM document WHERE id = $1", DOCUMENT_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(row.as_ref().map(document_from_row))
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Document>> {
        let sql = format!(
            "SELECT {} FROM document WHERE user_id = $1 ORDER BY created_at DESC",
            DOCUMENT_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(rows.iter().map(document_from_row).collect())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        // Linked notes keep their content; document_id is set to NULL.
        let result = sqlx::query("DELETE FROM document WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("Document {} not found", id)));
        }
        Ok(())
    }
}
