//! 会话仓库：按手机号串行化的读-改-写
//!
//! 同一手机号的并发消息在 begin() 处排队（异步互斥锁），请求开始时读一次会话，
//! 处理过程中的 update / clear 只记录在事务里，commit() 时最多写一次。

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use super::state::WorkflowState;
use super::store::{Session, SessionData, SessionError, SessionStore};

/// 会话仓库：包装 SessionStore，并为每个手机号维护一把异步锁
pub struct SessionRepository {
    store: Arc<dyn SessionStore>,
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

/// 事务中待写入的变更
#[derive(Debug, Clone, PartialEq)]
enum PendingWrite {
    None,
    Update,
    Clear,
}

impl SessionRepository {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self {
            store,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    fn lock_for(&self, phone: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = match self.locks.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        // 回收无人持有的锁
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        locks
            .entry(phone.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    /// 开启一个会话事务：等待同号码的前一请求结束后读取会话
    pub async fn begin(&self, phone: &str) -> SessionTxn {
        let guard = self.lock_for(phone).lock_owned().await;
        let session = self.store.get(phone).await;
        tracing::debug!(phone, state = %session.state, "Session loaded");
        SessionTxn {
            phone: phone.to_string(),
            loaded_state: session.state,
            session,
            pending: PendingWrite::None,
            store: self.store.clone(),
            _guard: guard,
        }
    }
}

/// 单次请求内的会话事务
pub struct SessionTxn {
    phone: String,
    loaded_state: WorkflowState,
    session: Session,
    pending: PendingWrite,
    store: Arc<dyn SessionStore>,
    _guard: OwnedMutexGuard<()>,
}

impl SessionTxn {
    pub fn phone(&self) -> &str {
        &self.phone
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn state(&self) -> WorkflowState {
        self.session.state
    }

    pub fn data(&self) -> &SessionData {
        &self.session.data
    }

    /// 设置新状态与数据（commit 时写入）
    pub fn update(&mut self, state: WorkflowState, data: SessionData) {
        self.session = Session::new(state, data);
        self.pending = PendingWrite::Update;
    }

    /// 清空会话（commit 时删除）
    pub fn clear(&mut self) {
        self.session = Session::default();
        self.pending = PendingWrite::Clear;
    }

    /// 提交：最多一次写入；随后释放手机号锁
    pub async fn commit(self) -> Result<(), SessionError> {
        let from = self.loaded_state;
        let to = self.session.state;
        let result = match self.pending {
            PendingWrite::None => Ok(()),
            PendingWrite::Update => {
                self.store
                    .update(&self.phone, self.session.state, self.session.data)
                    .await
            }
            PendingWrite::Clear => self.store.clear(&self.phone).await,
        };
        if result.is_ok() && from != to {
            tracing::debug!(phone = %self.phone, %from, %to, "Session transition");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MemorySessionStore;
    use serde_json::Value;
    use std::time::Duration;

    #[tokio::test]
    async fn test_clear_then_update_writes_final_state() {
        let store = Arc::new(MemorySessionStore::new());
        let repo = SessionRepository::new(store.clone());

        let mut txn = repo.begin("+226").await;
        txn.clear();
        txn.update(WorkflowState::MenuIncidentType, SessionData::new());
        txn.commit().await.unwrap();

        assert_eq!(store.get("+226").await.state, WorkflowState::MenuIncidentType);
    }

    #[tokio::test]
    async fn test_same_phone_requests_are_serialized() {
        let store = Arc::new(MemorySessionStore::new());
        let repo = Arc::new(SessionRepository::new(store.clone()));

        let mut first = repo.begin("+226").await;

        let repo2 = repo.clone();
        let second = tokio::spawn(async move {
            let mut txn = repo2.begin("+226").await;
            let seen = txn.data().get("n").and_then(Value::as_u64).unwrap_or(0);
            let mut data = SessionData::new();
            data.insert("n".into(), Value::from(seen + 1));
            txn.update(WorkflowState::StockSearchQuery, data);
            txn.commit().await.unwrap();
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        let mut data = SessionData::new();
        data.insert("n".into(), Value::from(1u64));
        first.update(WorkflowState::StockMenuChoice, data);
        first.commit().await.unwrap();

        second.await.unwrap();
        let session = store.get("+226").await;
        assert_eq!(session.data.get("n").and_then(Value::as_u64), Some(2));
        assert_eq!(session.state, WorkflowState::StockSearchQuery);
    }
}
