//! 会话工作流状态
//!
//! 持久化层只存字符串标签（如 `WAITING_FOR_SIGNALEMENT_PAYS`），内存中一律使用 WorkflowState 枚举。
//! 每个状态带有所属工作流族（family），可否被「annuler / menu …」取消是族的结构属性，不靠前缀字符串判断。

use std::fmt;

/// 工作流族
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkflowFamily {
    /// 不在任何多步流程中
    Idle,
    SignalementCreation,
    SignalementUpdate,
    /// 旧入口：WAITING_FOR_INCIDENT_*
    Incident,
    /// 菜单入口：WORKFLOW_INCIDENT_*
    MenuIncident,
    Stock,
    Media,
    Finances,
}

/// 会话状态（闭集）；未知标签一律解析为 Idle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WorkflowState {
    #[default]
    Idle,

    SignalementPays,
    SignalementChantier,
    SignalementProbleme,
    SignalementAction,
    SignalementSection,
    SignalementPersonne,
    SignalementEcheance,

    SignalementIdUpdate,
    SignalementUpdateField,
    SignalementRapport,
    SignalementNewEcheance,
    SignalementNewPersonne,

    IncidentType,
    IncidentDescription,
    IncidentPhoto,
    IncidentLocation,

    MenuIncidentType,
    MenuIncidentProject,
    MenuIncidentDescription,
    MenuIncidentPhoto,

    StockMenuChoice,
    StockSearchQuery,

    MediaProject,
    MediaUpload,

    ProjectIdFinances,
}

impl WorkflowState {
    /// 全部状态（含 Idle），用于全覆盖测试
    pub const ALL: [WorkflowState; 26] = [
        WorkflowState::Idle,
        WorkflowState::SignalementPays,
        WorkflowState::SignalementChantier,
        WorkflowState::SignalementProbleme,
        WorkflowState::SignalementAction,
        WorkflowState::SignalementSection,
        WorkflowState::SignalementPersonne,
        WorkflowState::SignalementEcheance,
        WorkflowState::SignalementIdUpdate,
        WorkflowState::SignalementUpdateField,
        WorkflowState::SignalementRapport,
        WorkflowState::SignalementNewEcheance,
        WorkflowState::SignalementNewPersonne,
        WorkflowState::IncidentType,
        WorkflowState::IncidentDescription,
        WorkflowState::IncidentPhoto,
        WorkflowState::IncidentLocation,
        WorkflowState::MenuIncidentType,
        WorkflowState::MenuIncidentProject,
        WorkflowState::MenuIncidentDescription,
        WorkflowState::MenuIncidentPhoto,
        WorkflowState::StockMenuChoice,
        WorkflowState::StockSearchQuery,
        WorkflowState::MediaProject,
        WorkflowState::MediaUpload,
        WorkflowState::ProjectIdFinances,
    ];

    /// 持久化用的字符串标签
    pub fn as_tag(&self) -> &'static str {
        use WorkflowState::*;
        match self {
            Idle => "IDLE",
            SignalementPays => "WAITING_FOR_SIGNALEMENT_PAYS",
            SignalementChantier => "WAITING_FOR_SIGNALEMENT_CHANTIER",
            SignalementProbleme => "WAITING_FOR_SIGNALEMENT_PROBLEME",
            SignalementAction => "WAITING_FOR_SIGNALEMENT_ACTION",
            SignalementSection => "WAITING_FOR_SIGNALEMENT_SECTION",
            SignalementPersonne => "WAITING_FOR_SIGNALEMENT_PERSONNE",
            SignalementEcheance => "WAITING_FOR_SIGNALEMENT_ECHEANCE",
            SignalementIdUpdate => "WAITING_FOR_SIGNALEMENT_ID_UPDATE",
            SignalementUpdateField => "WAITING_FOR_SIGNALEMENT_UPDATE_FIELD",
            SignalementRapport => "WAITING_FOR_SIGNALEMENT_RAPPORT",
            SignalementNewEcheance => "WAITING_FOR_SIGNALEMENT_NEW_ECHEANCE",
            SignalementNewPersonne => "WAITING_FOR_SIGNALEMENT_NEW_PERSONNE",
            IncidentType => "WAITING_FOR_INCIDENT_TYPE",
            IncidentDescription => "WAITING_FOR_INCIDENT_DESCRIPTION",
            IncidentPhoto => "WAITING_FOR_INCIDENT_PHOTO",
            IncidentLocation => "WAITING_FOR_INCIDENT_LOCATION",
            MenuIncidentType => "WORKFLOW_INCIDENT_TYPE",
            MenuIncidentProject => "WORKFLOW_INCIDENT_PROJECT",
            MenuIncidentDescription => "WORKFLOW_INCIDENT_DESCRIPTION",
            MenuIncidentPhoto => "WORKFLOW_INCIDENT_PHOTO",
            StockMenuChoice => "WAITING_FOR_STOCK_MENU_CHOICE",
            StockSearchQuery => "WAITING_FOR_STOCK_SEARCH_QUERY",
            MediaProject => "WORKFLOW_MEDIA_PROJECT",
            MediaUpload => "WORKFLOW_MEDIA_UPLOAD",
            ProjectIdFinances => "WAITING_FOR_PROJECT_ID_FINANCES",
        }
    }

    /// 从持久化标签解析；无法识别的标签视为 Idle
    pub fn from_tag(tag: &str) -> Self {
        Self::ALL
            .iter()
            .copied()
            .find(|s| s.as_tag() == tag)
            .unwrap_or_else(|| {
                if !tag.is_empty() && tag != "IDLE" {
                    tracing::debug!(tag, "Unknown session state, treating as IDLE");
                }
                WorkflowState::Idle
            })
    }

    pub fn family(&self) -> WorkflowFamily {
        use WorkflowState::*;
        match self {
            Idle => WorkflowFamily::Idle,
            SignalementPays | SignalementChantier | SignalementProbleme | SignalementAction
            | SignalementSection | SignalementPersonne | SignalementEcheance => {
                WorkflowFamily::SignalementCreation
            }
            SignalementIdUpdate | SignalementUpdateField | SignalementRapport
            | SignalementNewEcheance | SignalementNewPersonne => WorkflowFamily::SignalementUpdate,
            IncidentType | IncidentDescription | IncidentPhoto | IncidentLocation => {
                WorkflowFamily::Incident
            }
            MenuIncidentType | MenuIncidentProject | MenuIncidentDescription
            | MenuIncidentPhoto => WorkflowFamily::MenuIncident,
            StockMenuChoice | StockSearchQuery => WorkflowFamily::Stock,
            MediaProject | MediaUpload => WorkflowFamily::Media,
            ProjectIdFinances => WorkflowFamily::Finances,
        }
    }

    /// 处于多步流程中（可被取消关键字打断）
    pub fn is_in_workflow(&self) -> bool {
        self.family() != WorkflowFamily::Idle
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}
