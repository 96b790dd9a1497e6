//! 持久化会话存储
//!
//! 使用 SQLite 存储 `{phone_number, state, data}`，支持跨重启恢复进行中的工作流

#![cfg(feature = "async-sqlite")]

use std::path::Path;

use async_trait::async_trait;
use sqlx::Row;

use super::state::WorkflowState;
use super::store::{Session, SessionData, SessionError, SessionRecord, SessionStore};

/// SQLite 会话存储
pub struct SqliteSessionStore {
    pool: sqlx::sqlite::SqlitePool,
}

impl SqliteSessionStore {
    /// 打开（或创建）数据库并建表
    pub async fn new(db_path: impl AsRef<Path>) -> Result<Self, sqlx::Error> {
        let db_url = format!("sqlite:{}?mode=rwc", db_path.as_ref().display());

        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&db_url)
            .await?;

        let store = Self { pool };
        store.init_tables().await?;
        Ok(store)
    }

    async fn init_tables(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS whatsapp_sessions (
                phone_number TEXT PRIMARY KEY,
                state TEXT NOT NULL,
                data TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn load(&self, phone: &str) -> Result<Option<SessionRecord>, SessionError> {
        let row = sqlx::query("SELECT state, data FROM whatsapp_sessions WHERE phone_number = ?")
            .bind(phone)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| SessionError::Storage(e.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let state: String = row.get("state");
        let data: String = row.get("data");
        let data: SessionData = serde_json::from_str(&data)?;
        Ok(Some(SessionRecord { state, data }))
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn get(&self, phone: &str) -> Session {
        match self.load(phone).await {
            Ok(Some(record)) => record.into(),
            Ok(None) => Session::default(),
            Err(e) => {
                tracing::warn!(phone, "Failed to load session, using IDLE: {}", e);
                Session::default()
            }
        }
    }

    async fn update(&self, phone: &str, state: WorkflowState, data: SessionData) -> Result<(), SessionError> {
        let data = serde_json::to_string(&data)?;
        let now = chrono::Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO whatsapp_sessions (phone_number, state, data, updated_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(phone_number) DO UPDATE SET
                state = excluded.state,
                data = excluded.data,
                updated_at = excluded.updated_at",
        )
        .bind(phone)
        .bind(state.as_tag())
        .bind(data)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| SessionError::Storage(e.to_string()))?;
        Ok(())
    }

    async fn clear(&self, phone: &str) -> Result<(), SessionError> {
        sqlx::query("DELETE FROM whatsapp_sessions WHERE phone_number = ?")
            .bind(phone)
            .execute(&self.pool)
            .await
            .map_err(|e| SessionError::Storage(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_session_survives_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("sessions.db");

        let store = SqliteSessionStore::new(&db_path).await.unwrap();
        let mut data = SessionData::new();
        data.insert("type".into(), Value::String("securite".into()));
        store
            .update("+22670000000", WorkflowState::MenuIncidentProject, data)
            .await
            .unwrap();
        store.close().await;

        let reopened = SqliteSessionStore::new(&db_path).await.unwrap();
        let session = reopened.get("+22670000000").await;
        assert_eq!(session.state, WorkflowState::MenuIncidentProject);
        assert_eq!(session.get_str("type"), Some("securite"));

        reopened.clear("+22670000000").await.unwrap();
        assert_eq!(reopened.get("+22670000000").await.state, WorkflowState::Idle);
    }
}
