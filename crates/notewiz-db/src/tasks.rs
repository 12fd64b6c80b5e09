//! Task repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use notewiz_core::{Error, Result, Task, TaskInput, TaskRepository};

const TASK_COLUMNS: &str = "id, user_id, title, description, due_date, priority, reminder, \
     is_completed, created_at, completed_at";

fn task_from_row(row: &PgRow) -> Task {
    Task {
        id: row.get("id"),
        user_id: row.get("user_id"),
        title: row.get("title"),
        description: row.get("description"),
        due_date: row.get("due_date"),
        priority: row.get("priority"),
        reminder: row.get("reminder"),
        is_completed: row.get("is_completed"),
        created_at: row.get("created_at"),
        completed_at: row.get("completed_at"),
    }
}

/// PostgreSQL implementation of TaskRepository.
pub struct PgTaskRepository {
    pool: Pool<Postgres>,
}

impl PgTaskRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TaskRepository for PgTaskRepository {
    async fn insert(&self, user_id: Uuid, input: TaskInput, now: DateTime<Utc>) -> Result<Task> {
        input.validate()?;

        let sql = format!(
            r#"
            INSERT INTO task (id, user_id, title, description, due_date, priority, reminder,
                              is_completed, created_at, completed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {}
            "#,
            TASK_COLUMNS
        );
        let completed_at = input.is_completed.then_some(now);
        let row = sqlx::query(&sql)
            .bind(Uuid::now_v7())
            .bind(user_id)
            .bind(&input.title)
            .bind(&input.description)
            .bind(input.due_date)
            .bind(input.priority)
            .bind(input.reminder)
            .bind(input.is_completed)
            .bind(now)
            .bind(completed_at)
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(task_from_row(&row))
    }

    async fn get(&self, id: Uuid) -> Result<Option<Task>> {
        let sql = format!("SELECT {} FROM task WHERE id = $1", TASK_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(row.as_ref().map(task_from_row))
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Task>> {
        let sql = format!(
            "SELECT {} FROM task WHERE user_id = $1 ORDER BY is_completed, due_date, priority",
            TASK_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(rows.iter().map(task_from_row).collect())
    }

    async fn update(&self, id: Uuid, input: TaskInput, now: DateTime<Utc>) -> Result<Task> {
        input.validate()?;

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let select = format!("SELECT {} FROM task WHERE id = $1 FOR UPDATE", TASK_COLUMNS);
        let current = sqlx::query(&select)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(Error::Database)?
            .map(|row| task_from_row(&row))
            .ok_or_else(|| Error::NotFound(format!("Task {} not found", id)))?;

        let completed_at = current.next_completed_at(input.is_completed, now);

        let update = format!(
            r#"
            UPDATE task SET
                title = $2,
                description = $3,
                due_date = $4,
                priority = $5,
                reminder = $6,
                is_completed = $7,
                completed_at = $8
            WHERE id = $1
            RETURNING {}
            "#,
            TASK_COLUMNS
        );
        let row = sqlx::query(&update)
            .bind(id)
            .bind(&input.title)
            .bind(&input.description)
            .bind(input.due_date)
            .bind(input.priority)
            .bind(input.reminder)
            .bind(input.is_completed)
            .bind(completed_at)
            .fetch_one(&mut *tx)
            .await
            .map_err(Error::Database)?;

        tx.commit().await.map_err(Error::Database)?;
        Ok(task_from_row(&row))
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM task WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("Task {} not found", id)));
        }
        Ok(())
    }
}
