//! 魔法链接生成器：随机令牌写入 magic_links 表，返回 `{base_url}/share/{token}`

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde_json::Value;

use super::{ResourceType, DEFAULT_EXPIRY_HOURS};
use crate::backend::{Backend, MagicLinkRecord};
use crate::core::AgentError;

/// 链接申请
#[derive(Debug, Clone, PartialEq)]
pub struct MagicLinkRequest {
    pub resource_type: ResourceType,
    pub resource_id: Option<String>,
    pub phone_number: Option<String>,
    /// 为空时使用生成器默认有效期
    pub expiry_hours: Option<i64>,
    pub metadata: Option<Value>,
}

/// 已签发的链接
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MagicLink {
    pub url: String,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl MagicLink {
    /// 剩余有效小时数（四舍五入）
    pub fn hours_valid(&self) -> i64 {
        ((self.expires_at - Utc::now()).num_minutes() as f64 / 60.0).round() as i64
    }
}

#[async_trait]
pub trait MagicLinkGenerator: Send + Sync {
    async fn generate(&self, request: MagicLinkRequest) -> Result<MagicLink, AgentError>;
}

/// 通过业务后端保存链接记录的生成器
pub struct BackendMagicLinkGenerator {
    backend: Arc<dyn Backend>,
    base_url: String,
    default_expiry_hours: i64,
}

impl BackendMagicLinkGenerator {
    pub fn new(backend: Arc<dyn Backend>, base_url: impl Into<String>) -> Self {
        Self {
            backend,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            default_expiry_hours: DEFAULT_EXPIRY_HOURS,
        }
    }

    pub fn with_expiry_hours(mut self, hours: i64) -> Self {
        self.default_expiry_hours = hours;
        self
    }
}

#[async_trait]
impl MagicLinkGenerator for BackendMagicLinkGenerator {
    async fn generate(&self, request: MagicLinkRequest) -> Result<MagicLink, AgentError> {
        let hours = request.expiry_hours.unwrap_or(self.default_expiry_hours);
        if hours <= 0 {
            return Err(AgentError::MagicLink(format!("invalid expiry: {hours}h")));
        }
        let token = uuid::Uuid::new_v4().simple().to_string();
        let expires_at = Utc::now() + Duration::hours(hours);
        let record = MagicLinkRecord {
            token: token.clone(),
            resource_type: request.resource_type.as_str().to_string(),
            resource_id: request.resource_id,
            phone_number: request.phone_number,
            expires_at,
            metadata: request.metadata.unwrap_or(Value::Null),
        };
        self.backend
            .store_magic_link(&record)
            .await
            .map_err(|e| AgentError::MagicLink(e.to_string()))?;
        tracing::info!(resource_type = %record.resource_type, expires_at = %expires_at, "Magic link issued");
        Ok(MagicLink {
            url: format!("{}/share/{}", self.base_url, token),
            token,
            expires_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;

    fn request() -> MagicLinkRequest {
        MagicLinkRequest {
            resource_type: ResourceType::Stocks,
            resource_id: None,
            phone_number: Some("+226".into()),
            expiry_hours: None,
            metadata: Some(serde_json::json!({"tool": "get_stocks"})),
        }
    }

    #[tokio::test]
    async fn test_generate_stores_record() {
        let backend = Arc::new(MemoryBackend::new());
        let generator = BackendMagicLinkGenerator::new(backend.clone(), "https://asi-track.app/");
        let link = generator.generate(request()).await.unwrap();

        assert_eq!(link.url, format!("https://asi-track.app/share/{}", link.token));
        assert_eq!(link.hours_valid(), 48);
        let stored = backend.magic_links().await;
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].resource_type, "stocks");
    }

    #[tokio::test]
    async fn test_backend_failure_is_reported() {
        let backend = Arc::new(MemoryBackend::new());
        backend.set_fail_writes(true);
        let generator = BackendMagicLinkGenerator::new(backend, "http://localhost:3000");
        assert!(matches!(generator.generate(request()).await, Err(AgentError::MagicLink(_))));
    }
}
