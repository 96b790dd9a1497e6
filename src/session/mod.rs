//! 会话层：工作流状态枚举、会话存储（内存 / SQLite）、按手机号串行化的会话仓库

pub mod repository;
#[cfg(feature = "async-sqlite")]
pub mod sqlite;
pub mod state;
pub mod store;

pub use repository::{SessionRepository, SessionTxn};
#[cfg(feature = "async-sqlite")]
pub use sqlite::SqliteSessionStore;
pub use state::{WorkflowFamily, WorkflowState};
pub use store::{
    create_session_store, MemorySessionStore, Session, SessionData, SessionError, SessionRecord,
    SessionStore, HISTORY_KEY,
};
