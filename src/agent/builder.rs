//! Agent 构建器：统一的 Agent 初始化逻辑
//!
//! 控制台 / WhatsApp / Web 三个入口共享同一套组件选择：
//! - LLM：按配置与环境变量选择（见 `llm::create_llm_from_config`）
//! - 业务后端：配置了 supabase_url 且存在 SUPABASE_SERVICE_KEY 时用 Supabase，否则内存后端
//! - 会话存储：配置了 db_path 且启用 async-sqlite 时用 SQLite，否则内存
//!
//! 测试可通过 with_* 注入任意组件。

use std::path::PathBuf;
use std::sync::Arc;

use crate::backend::{Backend, MemoryBackend, SupabaseBackend};
use crate::config::AppConfig;
use crate::llm::LlmClient;
use crate::magic_link::{BackendMagicLinkGenerator, MagicLinkGenerator};
use crate::session::{create_session_store, MemorySessionStore, SessionRepository, SessionStore};
use crate::tools::{business_registry, ToolExecutor};

use super::{Agent, AgentSettings, Prompts};

/// Agent 构建器：未注入的组件按配置创建
pub struct AgentBuilder {
    config: AppConfig,
    llm: Option<Arc<dyn LlmClient>>,
    backend: Option<Arc<dyn Backend>>,
    session_store: Option<Arc<dyn SessionStore>>,
    magic_links: Option<Arc<dyn MagicLinkGenerator>>,
    prompts: Option<Prompts>,
}

impl AgentBuilder {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            llm: None,
            backend: None,
            session_store: None,
            magic_links: None,
            prompts: None,
        }
    }

    pub fn with_llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn with_backend(mut self, backend: Arc<dyn Backend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn with_session_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.session_store = Some(store);
        self
    }

    pub fn with_magic_links(mut self, generator: Arc<dyn MagicLinkGenerator>) -> Self {
        self.magic_links = Some(generator);
        self
    }

    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = Some(prompts);
        self
    }

    /// 根据配置选择业务后端
    pub fn build_backend(&self) -> Arc<dyn Backend> {
        match self.config.backend.supabase_url.as_deref() {
            Some(url) => match SupabaseBackend::from_env(url) {
                Some(backend) => {
                    tracing::info!("Using Supabase backend ({})", url);
                    Arc::new(backend)
                }
                None => {
                    tracing::warn!("SUPABASE_SERVICE_KEY not set, using in-memory backend");
                    Arc::new(MemoryBackend::new())
                }
            },
            None => {
                tracing::warn!("No supabase_url configured, using in-memory backend");
                Arc::new(MemoryBackend::new())
            }
        }
    }

    /// 异步构建：会按配置打开持久化会话存储
    pub async fn build_async(mut self) -> Agent {
        if self.session_store.is_none() {
            self.session_store = Some(create_session_store(self.config.session.db_path.as_deref()).await);
        }
        self.build()
    }

    /// 同步构建：未注入会话存储时使用内存存储
    pub fn build(self) -> Agent {
        let llm = self
            .llm
            .clone()
            .unwrap_or_else(|| crate::llm::create_llm_from_config(&self.config));
        let backend = self.backend.clone().unwrap_or_else(|| self.build_backend());
        let store = self
            .session_store
            .clone()
            .unwrap_or_else(|| Arc::new(MemorySessionStore::new()));
        let magic_links = self.magic_links.clone().unwrap_or_else(|| {
            Arc::new(
                BackendMagicLinkGenerator::new(backend.clone(), self.config.magic_link.base_url.clone())
                    .with_expiry_hours(self.config.magic_link.expiry_hours),
            )
        });
        let tools = ToolExecutor::new(business_registry(backend.clone()), self.config.tools.tool_timeout_secs);
        tracing::debug!(tools = ?tools.tool_names(), "Tools registered");

        Agent {
            llm,
            tools,
            backend,
            sessions: SessionRepository::new(store),
            magic_links,
            prompts: self.prompts.unwrap_or_else(Prompts::load),
            settings: AgentSettings {
                max_history: self.config.app.max_history,
                ai_enabled: self.config.llm.ai_enabled,
            },
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

/// 便捷函数：从默认路径加载配置并创建 AgentBuilder
pub fn create_agent_builder(config_path: Option<PathBuf>) -> AgentBuilder {
    AgentBuilder::new(crate::config::load_config_or_default(config_path))
}
