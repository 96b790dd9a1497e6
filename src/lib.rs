//! ASI-TRACK 智能助手
//!
//! 模块划分：
//! - **agent**: 会话状态机、多步工作流、LLM 工具调用编排、提示词、关键词回退路径
//! - **backend**: 业务数据后端（Supabase / 内存）
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误类型
//! - **integrations**: WhatsApp Webhook、Web 聊天 API
//! - **interactive**: WhatsApp 交互消息（按钮 / 列表）构建与固定菜单
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / DeepSeek / Mock）
//! - **magic_link**: 魔法链接判定与生成
//! - **memory**: 对话消息与有界历史
//! - **observability**: 日志初始化
//! - **session**: 工作流状态、会话存储与按手机号串行化的会话仓库
//! - **tools**: 业务工具、注册表与执行器

pub mod agent;
pub mod backend;
pub mod config;
pub mod core;
pub mod integrations;
pub mod interactive;
pub mod llm;
pub mod magic_link;
pub mod memory;
pub mod observability;
pub mod session;
pub mod tools;
