//! SQLite content store implementation

use async_trait::async_trait;
use quizcast_domain::{
    BotUser, Category, ContentStore, Draft, DraftContent, StoreError, UserRegistry,
};
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use std::path::Path;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use uuid::Uuid;

const TOPIC_CURSOR_KEY: &str = "topic_cursor";

type DraftRow = (
    String,
    String,
    String,
    Option<String>,
    String,
);

/// SQLite-backed draft, cursor and user store
pub struct SqliteContentStore {
    pool: SqlitePool,
}

impl SqliteContentStore {
    /// Open the database file, creating it and its tables if needed
    pub async fn new(db_path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db_path = db_path.as_ref();

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Database(format!("Failed to create directory: {}", e)))?;
        }

        let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&db_url)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let store = Self { pool };
        store.run_migrations().await?;

        Ok(store)
    }

    /// Create an in-memory SQLite store (for testing)
    pub async fn in_memory() -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let store = Self { pool };
        store.run_migrations().await?;

        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS drafts (
                category TEXT PRIMARY KEY,
                id TEXT NOT NULL,
                text_content TEXT NOT NULL,
                payload TEXT NOT NULL,
                image_url TEXT,
                topic TEXT,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                user_id INTEGER PRIMARY KEY,
                username TEXT,
                joined_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }

    fn draft_from_row(
        category: &str,
        (id, payload, _text, topic, created_at): DraftRow,
    ) -> Result<Draft, StoreError> {
        let category: Category = category
            .parse()
            .map_err(|e: quizcast_domain::UnknownCategory| StoreError::Serialization(e.to_string()))?;
        let id = Uuid::parse_str(&id).map_err(|e| StoreError::Serialization(e.to_string()))?;
        let content: DraftContent = serde_json::from_str(&payload)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let created_at = OffsetDateTime::parse(&created_at, &Rfc3339)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        Ok(Draft {
            id,
            category,
            content,
            topic,
            created_at,
        })
    }
}

#[async_trait]
impl ContentStore for SqliteContentStore {
    async fn get_draft(&self, category: Category) -> Result<Option<Draft>, StoreError> {
        let row: Option<DraftRow> = sqlx::query_as(
            "SELECT id, payload, text_content, topic, created_at FROM drafts WHERE category = ?",
        )
        .bind(category.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        row.map(|row| Self::draft_from_row(category.as_str(), row))
            .transpose()
    }

    async fn put_draft(&self, draft: &Draft) -> Result<(), StoreError> {
        let payload = serde_json::to_string(&draft.content)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let created_at = draft
            .created_at
            .format(&Rfc3339)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO drafts (category, id, text_content, payload, image_url, topic, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(category) DO UPDATE SET
                id = excluded.id,
                text_content = excluded.text_content,
                payload = excluded.payload,
                image_url = excluded.image_url,
                topic = excluded.topic,
                created_at = excluded.created_at
            "#,
        )
        .bind(draft.category.as_str())
        .bind(draft.id.to_string())
        .bind(draft.text_content())
        .bind(&payload)
        .bind(draft.image_url())
        .bind(&draft.topic)
        .bind(&created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }

    async fn list_drafts(&self) -> Result<Vec<Draft>, StoreError> {
        let rows: Vec<(String, String, String, String, Option<String>, String)> = sqlx::query_as(
            "SELECT category, id, payload, text_content, topic, created_at FROM drafts",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        let mut drafts = rows
            .into_iter()
            .map(|(category, id, payload, text, topic, created_at)| {
                Self::draft_from_row(&category, (id, payload, text, topic, created_at))
            })
            .collect::<Result<Vec<_>, _>>()?;
        drafts.sort_by_key(|d| d.category);

        Ok(drafts)
    }

    async fn topic_cursor(&self) -> Result<u64, StoreError> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
            .bind(TOPIC_CURSOR_KEY)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        row.map_or(Ok(0), |(value,)| cursor_from_db(value))
    }

    async fn advance_topic_cursor(&self) -> Result<u64, StoreError> {
        // Single statement, so concurrent advances never lose an increment
        let (value,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO settings (key, value) VALUES (?, 1)
            ON CONFLICT(key) DO UPDATE SET value = value + 1
            RETURNING value
            "#,
        )
        .bind(TOPIC_CURSOR_KEY)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        cursor_from_db(value)
    }
}

fn cursor_from_db(value: i64) -> Result<u64, StoreError> {
    u64::try_from(value)
        .map_err(|_| StoreError::Serialization(format!("Negative topic cursor {}", value)))
}

#[async_trait]
impl UserRegistry for SqliteContentStore {
    async fn register_user(&self, user: &BotUser) -> Result<bool, StoreError> {
        let joined_at = user
            .joined_at
            .format(&Rfc3339)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let result = sqlx::query(
            r#"
            INSERT INTO users (user_id, username, joined_at)
            VALUES (?, ?, ?)
            ON CONFLICT(user_id) DO NOTHING
            "#,
        )
        .bind(user.user_id)
        .bind(&user.username)
        .bind(&joined_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    async fn count_users(&self) -> Result<u64, StoreError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(count.max(0) as u64)
    }

    async fn list_user_ids(&self) -> Result<Vec<i64>, StoreError> {
        let rows: Vec<(i64,)> = sqlx::query_as("SELECT user_id FROM users ORDER BY joined_at, user_id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}
