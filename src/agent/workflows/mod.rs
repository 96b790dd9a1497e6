//! 多步工作流
//!
//! 每个状态恰好对应一个处理函数（`handle_step` 对 WorkflowState 穷尽匹配）。处理函数从 session.data
//! 读取已收集字段，最多做一次有副作用的操作，然后推进状态或在终止步清空会话。
//! 后端失败一律清空会话并返回简短的法语错误，不会让用户卡在半途。

mod finances;
mod incident;
mod media;
mod signalement;
mod signalement_update;
mod stock;

use serde_json::Value;

use crate::backend::BackendError;
use crate::core::AgentError;
use crate::session::{SessionData, SessionTxn, WorkflowState};

use super::command::normalize;
use super::types::{AgentResponse, MediaAttachment};
use super::Agent;

/// 可启动的工作流
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkflowKind {
    Signalement,
    SignalementUpdate,
    /// 文字入口的事故申报（WAITING_FOR_INCIDENT_*）
    Incident,
    /// 菜单入口的事故申报（WORKFLOW_INCIDENT_*）
    MenuIncident,
    Stock,
    Media,
    Finances,
}

impl WorkflowKind {
    pub fn token(&self) -> &'static str {
        match self {
            WorkflowKind::Signalement => "signalement",
            WorkflowKind::SignalementUpdate => "maj_signalement",
            WorkflowKind::Incident => "declaration_incident",
            WorkflowKind::MenuIncident => "incident",
            WorkflowKind::Stock => "stock",
            WorkflowKind::Media => "media",
            WorkflowKind::Finances => "finances",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        [
            WorkflowKind::Signalement,
            WorkflowKind::SignalementUpdate,
            WorkflowKind::Incident,
            WorkflowKind::MenuIncident,
            WorkflowKind::Stock,
            WorkflowKind::Media,
            WorkflowKind::Finances,
        ]
        .into_iter()
        .find(|k| k.token().eq_ignore_ascii_case(token.trim()))
    }
}

/// 工作流步骤的输入
#[derive(Debug, Clone, Copy)]
pub(crate) struct StepInput<'a> {
    pub text: &'a str,
    pub media: Option<&'a MediaAttachment>,
}

impl<'a> StepInput<'a> {
    pub fn new(text: &'a str, media: Option<&'a MediaAttachment>) -> Self {
        Self { text, media }
    }

    pub fn trimmed(&self) -> &'a str {
        self.text.trim()
    }

    pub fn is_blank(&self) -> bool {
        self.trimmed().is_empty()
    }

    /// 「passer」按钮或同义词
    pub fn is_skip(&self) -> bool {
        matches!(normalize(self.text).as_str(), "passer" | "skip" | "non" | "aucun" | "aucune")
    }
}

/// 在现有 data 上追加一个字段
pub(crate) fn data_with(base: &SessionData, key: &str, value: impl Into<Value>) -> SessionData {
    let mut data = base.clone();
    data.insert(key.to_string(), value.into());
    data
}

/// 会话缺少必需字段（例如存储被外部改写）：清空并请用户重新开始
pub(crate) fn session_expired(txn: &mut SessionTxn) -> AgentResponse {
    tracing::warn!(phone = txn.phone(), state = %txn.state(), "Workflow data missing, resetting session");
    txn.clear();
    AgentResponse::text("⌛ Votre session a expiré. Tapez *menu* pour recommencer.")
        .with_interactive(crate::interactive::action_menu())
}

/// 后端失败：清空会话并返回简短错误
pub(crate) fn backend_failure(txn: &mut SessionTxn, what: &str, err: BackendError) -> AgentResponse {
    tracing::error!(phone = txn.phone(), state = %txn.state(), "Backend failure while {}: {}", what, err);
    txn.clear();
    AgentResponse::text(format!("❌ Erreur lors de {what}. Veuillez réessayer plus tard."))
        .with_error(err.to_string())
}

/// 金额格式：千位空格分隔，如 `1 250 000 FCFA`
pub(crate) fn format_amount(amount: f64) -> String {
    let rounded = amount.round() as i64;
    let digits = rounded.unsigned_abs().to_string();
    let mut grouped = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(c);
    }
    let sign = if rounded < 0 { "-" } else { "" };
    format!("{sign}{grouped} FCFA")
}

/// 启动工作流：写入初始状态并返回第一个提示
pub(crate) async fn start(agent: &Agent, kind: WorkflowKind, txn: &mut SessionTxn) -> Result<AgentResponse, AgentError> {
    tracing::info!(phone = txn.phone(), workflow = kind.token(), "Starting workflow");
    let response = match kind {
        WorkflowKind::Signalement => signalement::start(txn),
        WorkflowKind::SignalementUpdate => signalement_update::start(txn),
        WorkflowKind::Incident => incident::start_legacy(txn),
        WorkflowKind::MenuIncident => incident::start_menu(txn),
        WorkflowKind::Stock => stock::start(txn),
        WorkflowKind::Media => media::start(agent, txn).await,
        WorkflowKind::Finances => finances::start(agent, txn).await,
    };
    Ok(response.with_action(format!("workflow:{}", kind.token())))
}

/// 按当前状态分发到唯一的处理函数；Idle 返回 None
pub(crate) async fn handle_step(
    agent: &Agent,
    txn: &mut SessionTxn,
    input: &StepInput<'_>,
) -> Result<Option<AgentResponse>, AgentError> {
    use WorkflowState::*;
    let response = match txn.state() {
        Idle => return Ok(None),

        SignalementPays | SignalementChantier | SignalementProbleme | SignalementAction
        | SignalementSection | SignalementPersonne => signalement::collect(txn, input),
        SignalementEcheance => signalement::finish(agent, txn, input).await,

        SignalementIdUpdate => signalement_update::on_numero(agent, txn, input).await,
        SignalementUpdateField => signalement_update::on_field(txn, input),
        SignalementRapport | SignalementNewEcheance | SignalementNewPersonne => {
            signalement_update::apply(agent, txn, input).await
        }

        IncidentType => incident::on_legacy_type(txn, input),
        IncidentDescription => incident::on_legacy_description(txn, input),
        IncidentPhoto => incident::on_legacy_photo(txn, input),
        IncidentLocation => incident::on_legacy_location(agent, txn, input).await,

        MenuIncidentType => incident::on_menu_type(agent, txn, input).await,
        MenuIncidentProject => incident::on_menu_project(agent, txn, input).await,
        MenuIncidentDescription => incident::on_menu_description(txn, input),
        MenuIncidentPhoto => incident::on_menu_photo(agent, txn, input).await,

        StockMenuChoice => stock::on_choice(agent, txn, input).await,
        StockSearchQuery => stock::on_search(agent, txn, input).await,

        MediaProject => media::on_project(agent, txn, input).await,
        MediaUpload => media::on_upload(agent, txn, input).await,

        ProjectIdFinances => finances::on_project(agent, txn, input).await,
    };
    Ok(Some(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workflow_tokens_roundtrip() {
        for kind in [
            WorkflowKind::Signalement,
            WorkflowKind::SignalementUpdate,
            WorkflowKind::Incident,
            WorkflowKind::MenuIncident,
            WorkflowKind::Stock,
            WorkflowKind::Media,
            WorkflowKind::Finances,
        ] {
            assert_eq!(WorkflowKind::from_token(kind.token()), Some(kind));
        }
        assert_eq!(WorkflowKind::from_token("inconnu"), None);
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(1_250_000.0), "1 250 000 FCFA");
        assert_eq!(format_amount(999.6), "1 000 FCFA");
        assert_eq!(format_amount(-4500.0), "-4 500 FCFA");
        assert_eq!(format_amount(0.0), "0 FCFA");
    }

    #[test]
    fn test_skip_synonyms() {
        assert!(StepInput::new("Passer", None).is_skip());
        assert!(!StepInput::new("photo", None).is_skip());
    }
}
