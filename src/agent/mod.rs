//! 对话核心：会话状态机 + LLM 工具调用编排
//!
//! - `process_query`：WhatsApp / Web 统一入口，会话状态优先，必要时交给编排循环
//! - `process_query_with_ai`：两段式 LLM 往返（工具调用 → 合成），附带魔法链接与列表菜单
//!
//! 两个入口都不会返回错误：任何失败都转成固定致歉回复。

pub mod builder;
pub mod command;
pub mod intent;
pub mod orchestrator;
pub mod prompts;
pub mod round;
pub mod shortcuts;
pub mod state_machine;
pub mod types;
pub mod workflows;

use std::sync::Arc;

use crate::backend::Backend;
use crate::llm::LlmClient;
use crate::magic_link::MagicLinkGenerator;
use crate::session::SessionRepository;
use crate::tools::ToolExecutor;

pub use builder::{create_agent_builder, AgentBuilder};
pub use command::{parse_idle, parse_in_workflow, InboundCommand};
pub use intent::{execute_query, DetectedIntent, IntentAction, IntentDetector, IntentModule};
pub use prompts::Prompts;
pub use round::{ToolCallRound, ToolOutcome};
pub use types::{AgentResponse, ChatRequest, MediaAttachment, APOLOGY_TEXT};
pub use workflows::WorkflowKind;

/// 运行参数
#[derive(Debug, Clone)]
pub struct AgentSettings {
    pub max_history: usize,
    /// 关闭后 Web 渠道走关键词旧路径
    pub ai_enabled: bool,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_history: crate::memory::DEFAULT_MAX_HISTORY,
            ai_enabled: true,
        }
    }
}

/// 对话 Agent：持有 LLM、工具执行器、业务后端、会话仓库与魔法链接生成器
pub struct Agent {
    pub(crate) llm: Arc<dyn LlmClient>,
    pub(crate) tools: ToolExecutor,
    pub(crate) backend: Arc<dyn Backend>,
    pub(crate) sessions: SessionRepository,
    pub(crate) magic_links: Arc<dyn MagicLinkGenerator>,
    pub(crate) prompts: Prompts,
    pub(crate) settings: AgentSettings,
}

impl Agent {
    pub fn sessions(&self) -> &SessionRepository {
        &self.sessions
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    pub fn llm(&self) -> &Arc<dyn LlmClient> {
        &self.llm
    }

    pub fn settings(&self) -> &AgentSettings {
        &self.settings
    }
}
