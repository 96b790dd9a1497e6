//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `ASITRACK__*` 覆盖（双下划线表示嵌套，如 `ASITRACK__LLM__MODEL=gpt-4o`）。
//! 密钥（LLM API Key、WhatsApp Token、Supabase Key）只从环境变量读取，不进配置文件。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub llm: LlmSection,
    pub tools: ToolsSection,
    pub magic_link: MagicLinkSection,
    pub backend: BackendSection,
    pub session: SessionSection,
    pub whatsapp: WhatsappSection,
    pub server: ServerSection,
}

/// [app] 段：应用名、持久化历史条数
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppSection {
    pub name: String,
    /// 会话中保留的 user/assistant 消息条数
    pub max_history: usize,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: "ASI-TRACK".to_string(),
            max_history: crate::memory::DEFAULT_MAX_HISTORY,
        }
    }
}

/// [llm] 段：后端选择、模型、超时
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    /// 后端：deepseek / openai / mock；实际选择还取决于哪个 API Key 存在
    pub provider: String,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub temperature: f32,
    pub request_timeout_secs: u64,
    /// 关闭后 Web 渠道走关键词 + execute_query 的旧路径
    pub ai_enabled: bool,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: None,
            base_url: None,
            temperature: 0.3,
            request_timeout_secs: 60,
            ai_enabled: true,
        }
    }
}

/// [tools] 段：单次工具调用超时（秒）
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToolsSection {
    pub tool_timeout_secs: u64,
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            tool_timeout_secs: 30,
        }
    }
}

/// [magic_link] 段：分享链接前缀与有效期
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MagicLinkSection {
    pub base_url: String,
    pub expiry_hours: i64,
}

impl Default for MagicLinkSection {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            expiry_hours: crate::magic_link::DEFAULT_EXPIRY_HOURS,
        }
    }
}

/// [backend] 段：Supabase 项目地址；为空时使用内存后端（仅开发）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct BackendSection {
    pub supabase_url: Option<String>,
}

/// [session] 段：SQLite 会话库路径；为空时使用内存存储
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SessionSection {
    pub db_path: Option<PathBuf>,
}

/// [whatsapp] 段：Graph API 版本与企业号码 ID
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WhatsappSection {
    pub api_version: String,
    pub phone_number_id: Option<String>,
}

impl Default for WhatsappSection {
    fn default() -> Self {
        Self {
            api_version: "v18.0".to_string(),
            phone_number_id: None,
        }
    }
}

/// [server] 段：HTTP 监听地址
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

/// 从 config 目录加载配置，环境变量 ASITRACK__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 ASITRACK__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("ASITRACK")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}

/// 加载配置，失败时记录 warn 并回退默认值
pub fn load_config_or_default(config_path: Option<PathBuf>) -> AppConfig {
    load_config(config_path).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        AppConfig::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.app.max_history, 10);
        assert_eq!(cfg.magic_link.expiry_hours, 48);
        assert!(cfg.llm.ai_enabled);
        assert_eq!(cfg.server.port, 3000);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(
            &path,
            "[llm]\nprovider = \"mock\"\nai_enabled = false\n\n[magic_link]\nbase_url = \"https://asi.example\"\n",
        )
        .unwrap();
        let cfg = load_config(Some(path)).unwrap();
        assert_eq!(cfg.llm.provider, "mock");
        assert!(!cfg.llm.ai_enabled);
        assert_eq!(cfg.magic_link.base_url, "https://asi.example");
        assert_eq!(cfg.magic_link.expiry_hours, 48);
    }
}
