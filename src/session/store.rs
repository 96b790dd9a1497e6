//! 会话存储抽象层
//!
//! 以手机号为键保存 `{state, data}`；get 永不失败（缺失时返回 IDLE / 空 data）。
//! 支持内存和持久化（SQLite，feature `async-sqlite`）两种实现。

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::sync::RwLock;

use super::state::WorkflowState;
use crate::memory::Message;

/// 会话存储错误
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Session storage error: {0}")]
    Storage(String),

    #[error("Session serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// 会话数据袋：跨步骤累积的任意键值
pub type SessionData = Map<String, Value>;

/// data 中保存对话历史的键
pub const HISTORY_KEY: &str = "history";

/// 单个手机号的会话
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub state: WorkflowState,
    pub data: SessionData,
}

impl Session {
    pub fn new(state: WorkflowState, data: SessionData) -> Self {
        Self { state, data }
    }

    /// 读取字符串字段（缺失或非字符串时返回 None）
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }

    /// 已持久化的对话历史（只含 user/assistant）
    pub fn history(&self) -> Vec<Message> {
        self.data
            .get(HISTORY_KEY)
            .cloned()
            .and_then(|v| serde_json::from_value::<Vec<Message>>(v).ok())
            .unwrap_or_default()
    }
}

/// 存储层的原始记录：state 为字符串标签
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub state: String,
    pub data: SessionData,
}

impl From<SessionRecord> for Session {
    fn from(r: SessionRecord) -> Self {
        Session {
            state: WorkflowState::from_tag(&r.state),
            data: r.data,
        }
    }
}

/// 会话存储接口
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// 读取会话；不存在或读取失败时返回默认 IDLE 会话
    async fn get(&self, phone: &str) -> Session;

    /// 写入状态与数据
    async fn update(&self, phone: &str, state: WorkflowState, data: SessionData) -> Result<(), SessionError>;

    /// 删除会话（回到 IDLE）
    async fn clear(&self, phone: &str) -> Result<(), SessionError>;
}

/// 内存会话存储
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, SessionRecord>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 直接读取原始记录（测试用：可观察未知标签等原始状态）
    pub async fn raw(&self, phone: &str) -> Option<SessionRecord> {
        self.sessions.read().await.get(phone).cloned()
    }

    /// 直接写入原始记录（测试用：注入任意标签）
    pub async fn put_raw(&self, phone: &str, record: SessionRecord) {
        self.sessions.write().await.insert(phone.to_string(), record);
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, phone: &str) -> Session {
        self.sessions
            .read()
            .await
            .get(phone)
            .cloned()
            .map(Session::from)
            .unwrap_or_default()
    }

    async fn update(&self, phone: &str, state: WorkflowState, data: SessionData) -> Result<(), SessionError> {
        self.sessions.write().await.insert(
            phone.to_string(),
            SessionRecord {
                state: state.as_tag().to_string(),
                data,
            },
        );
        Ok(())
    }

    async fn clear(&self, phone: &str) -> Result<(), SessionError> {
        self.sessions.write().await.remove(phone);
        Ok(())
    }
}

/// 创建会话存储
///
/// 如果提供了 db_path 且启用了 async-sqlite feature，则使用持久化存储；否则使用内存存储
pub async fn create_session_store(db_path: Option<&std::path::Path>) -> Arc<dyn SessionStore> {
    #[cfg(feature = "async-sqlite")]
    if let Some(path) = db_path {
        match super::sqlite::SqliteSessionStore::new(path).await {
            Ok(store) => {
                tracing::info!("Using persistent session store: {:?}", path);
                return Arc::new(store);
            }
            Err(e) => {
                tracing::warn!("Failed to create persistent store, falling back to memory: {}", e);
            }
        }
    }

    #[cfg(not(feature = "async-sqlite"))]
    if db_path.is_some() {
        tracing::warn!("Persistent session store requested but async-sqlite feature not enabled, using memory store");
    }

    tracing::info!("Using in-memory session store");
    Arc::new(MemorySessionStore::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_session_defaults_to_idle() {
        let store = MemorySessionStore::new();
        let session = store.get("+22600000000").await;
        assert_eq!(session.state, WorkflowState::Idle);
        assert!(session.data.is_empty());
    }

    #[tokio::test]
    async fn test_update_then_clear() {
        let store = MemorySessionStore::new();
        let mut data = SessionData::new();
        data.insert("pays".into(), Value::String("Burkina Faso".into()));
        store
            .update("+226", WorkflowState::SignalementChantier, data)
            .await
            .unwrap();

        let session = store.get("+226").await;
        assert_eq!(session.state, WorkflowState::SignalementChantier);
        assert_eq!(session.get_str("pays"), Some("Burkina Faso"));

        store.clear("+226").await.unwrap();
        assert_eq!(store.get("+226").await, Session::default());
    }

    #[tokio::test]
    async fn test_unknown_stored_tag_reads_as_idle() {
        let store = MemorySessionStore::new();
        store
            .put_raw(
                "+226",
                SessionRecord {
                    state: "WAITING_FOR_LEGACY_THING".into(),
                    data: SessionData::new(),
                },
            )
            .await;
        assert_eq!(store.get("+226").await.state, WorkflowState::Idle);
    }
}
