//! 业务数据后端
//!
//! 会话状态机与工具只通过 Backend trait 读写业务数据（项目、财务、库存、事故、设备、整改事项、媒体、魔法链接）。
//! - SupabaseBackend：PostgREST over reqwest（生产）
//! - MemoryBackend：内存实现（测试与本地开发）

pub mod memory;
pub mod supabase;
pub mod types;

use async_trait::async_trait;
use thiserror::Error;

pub use memory::MemoryBackend;
pub use supabase::SupabaseBackend;
pub use types::*;

/// 后端读写错误
#[derive(Error, Debug, Clone)]
pub enum BackendError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Backend returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// 内存后端的故障注入
    #[error("Simulated failure: {0}")]
    Simulated(String),
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        BackendError::Http(e.to_string())
    }
}

/// 业务数据后端接口
#[async_trait]
pub trait Backend: Send + Sync {
    async fn list_projects(&self, filter: &ProjectFilter) -> Result<Vec<Project>, BackendError>;

    async fn find_project(&self, id: &str) -> Result<Option<Project>, BackendError>;

    /// 单项目财务明细；项目不存在时返回 None
    async fn project_finances(&self, project_id: &str) -> Result<Option<ProjectFinances>, BackendError>;

    async fn global_kpis(&self) -> Result<GlobalKpis, BackendError>;

    /// query 为 None 时返回全部库存
    async fn list_stocks(&self, query: Option<&str>) -> Result<Vec<StockItem>, BackendError>;

    async fn list_incidents(&self, filter: &IncidentFilter) -> Result<Vec<Incident>, BackendError>;

    async fn create_incident(&self, incident: NewIncident) -> Result<Incident, BackendError>;

    async fn list_equipment(&self, filter: &EquipmentFilter) -> Result<Vec<Equipment>, BackendError>;

    async fn create_signalement(&self, signalement: Signalement) -> Result<Signalement, BackendError>;

    /// 按编号查找（不区分大小写）
    async fn find_signalement(&self, numero: &str) -> Result<Option<Signalement>, BackendError>;

    async fn update_signalement(
        &self,
        numero: &str,
        update: SignalementUpdate,
    ) -> Result<Signalement, BackendError>;

    /// 最紧急的未结整改事项（按截止日期升序）
    async fn top_signalements(&self, limit: usize) -> Result<Vec<Signalement>, BackendError>;

    async fn attach_media(&self, media: NewProjectMedia) -> Result<(), BackendError>;

    async fn store_magic_link(&self, link: &MagicLinkRecord) -> Result<(), BackendError>;
}

/// 未结整改事项排序：有截止日期的在前，按日期升序
pub(crate) fn sort_by_urgency(items: &mut [Signalement]) {
    items.sort_by(|a, b| match (a.echeance, b.echeance) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.numero.cmp(&b.numero),
    });
}
