//! Agent 错误类型
//!
//! 会话状态机与编排循环内部统一返回 AgentError；对外入口（process_query / process_query_with_ai）
//! 负责把任何错误转成固定的致歉回复，不会向渠道适配层抛出。

use thiserror::Error;

use crate::backend::BackendError;
use crate::llm::LlmError;
use crate::session::SessionError;

/// Agent 运行过程中可能出现的错误（LLM、后端、工具、会话、配置）
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Tool execution failed: {0}")]
    ToolExecutionFailed(String),

    #[error("Tool timeout: {0}")]
    ToolTimeout(String),

    /// LLM 请求了未注册的工具
    #[error("Hallucinated tool: {0}")]
    HallucinatedTool(String),

    #[error("Magic link error: {0}")]
    MagicLink(String),

    #[error("Config error: {0}")]
    ConfigError(String),
}
