//! 快捷表
//!
//! - 菜单动作 id（列表行 / 按钮 id）→ 转交编排循环的消息（令牌或自然语言提示）
//! - 编排循环的前置短路表：固定回复、启动工作流，或在调用 LLM 之前把消息改写成更完整的提示

use crate::interactive::{self, menus::*};

use super::types::AgentResponse;
use super::workflows::WorkflowKind;

pub const SHOW_ACTION_MENU: &str = "[SHOW_ACTION_MENU]";
const START_WORKFLOW_PREFIX: &str = "[START_WORKFLOW:";

const KPI_PROMPT: &str = "Utilise get_global_kpis puis présente les indicateurs clés du portefeuille : \
     budget total, montant engagé, taux de consommation, avancement moyen, incidents et signalements ouverts, \
     articles en stock faible. Compare chaque valeur à un repère et termine par une recommandation concrète.";
const PROJECTS_PROMPT: &str = "Utilise get_projects pour lister les projets en cours avec leur avancement. \
     Signale les projets en retard par rapport à l'avancement moyen.";
const TOP20_PROMPT: &str = "Utilise get_top_signalements (limit 20) et présente les signalements ouverts \
     les plus urgents : numéro, problème, responsable, échéance. Mets en avant ceux dont l'échéance est dépassée.";

/// `[START_WORKFLOW:<kind>]`
pub fn start_workflow_token(kind: WorkflowKind) -> String {
    format!("{START_WORKFLOW_PREFIX}{}]", kind.token())
}

/// 菜单动作 id → 转交消息
pub fn menu_action_message(id: &str) -> Option<String> {
    let message = match id {
        MENU_BUTTON_ID => SHOW_ACTION_MENU.to_string(),
        ACTION_KPIS => "Montre-moi les KPIs globaux".to_string(),
        ACTION_PROJETS => "Montre-moi la liste des projets en cours".to_string(),
        ACTION_TOP20 => "Montre-moi le Top 20 des signalements urgents".to_string(),
        ACTION_FINANCES => start_workflow_token(WorkflowKind::Finances),
        ACTION_STOCKS => start_workflow_token(WorkflowKind::Stock),
        ACTION_SIGNALER_INCIDENT => start_workflow_token(WorkflowKind::MenuIncident),
        ACTION_NOUVEAU_SIGNALEMENT => start_workflow_token(WorkflowKind::Signalement),
        ACTION_MAJ_SIGNALEMENT => start_workflow_token(WorkflowKind::SignalementUpdate),
        ACTION_MEDIA => start_workflow_token(WorkflowKind::Media),
        _ => {
            // 编排结果里合成的列表行
            if let Some(project_id) = id.strip_prefix(PROJECT_ROW_PREFIX).filter(|s| !s.is_empty()) {
                return Some(format!(
                    "Donne-moi le détail du projet {project_id} : avancement, statut et situation financière."
                ));
            }
            if let Some(incident_id) = id.strip_prefix("incident_").filter(|s| !s.is_empty() && !s.starts_with("type_")) {
                return Some(format!("Donne-moi le détail de l'incident {incident_id}."));
            }
            return None;
        }
    };
    Some(message)
}

/// 特殊令牌：`[START_WORKFLOW:*]` 或 `[SHOW_ACTION_MENU]`
pub fn is_special_token(message: &str) -> bool {
    let m = message.trim();
    m == SHOW_ACTION_MENU || (m.starts_with(START_WORKFLOW_PREFIX) && m.ends_with(']'))
}

/// 前置短路的结果
#[derive(Debug, Clone, PartialEq)]
pub enum Shortcut {
    /// 直接回复，不调用 LLM
    Canned(AgentResponse),
    /// 启动多步工作流（需要会话）
    StartWorkflow(WorkflowKind),
    /// 改写后的用户提示
    Rewrite(String),
    PassThrough,
}

/// 按固定顺序匹配前置短路表
pub fn resolve(message: &str) -> Shortcut {
    let trimmed = message.trim();
    if trimmed == SHOW_ACTION_MENU {
        return Shortcut::Canned(
            AgentResponse::text(ACTION_MENU_BODY)
                .with_interactive(interactive::action_menu())
                .with_action("show_menu"),
        );
    }
    if let Some(kind) = trimmed
        .strip_prefix(START_WORKFLOW_PREFIX)
        .and_then(|rest| rest.strip_suffix(']'))
    {
        return match WorkflowKind::from_token(kind) {
            Some(kind) => Shortcut::StartWorkflow(kind),
            None => {
                tracing::warn!(kind, "Unknown workflow token");
                Shortcut::Canned(
                    AgentResponse::text("❓ Action inconnue. Voici le menu :")
                        .with_interactive(interactive::action_menu()),
                )
            }
        };
    }

    let lower = trimmed.to_lowercase();
    if super::command::is_bare_greeting(&lower) {
        return Shortcut::Canned(AgentResponse::text(greeting_text()).with_interactive(greeting_menu()));
    }
    if lower.contains("kpis globaux") || lower.contains("kpi globaux") {
        return Shortcut::Rewrite(KPI_PROMPT.to_string());
    }
    if lower.contains("top 20") {
        return Shortcut::Rewrite(TOP20_PROMPT.to_string());
    }
    if lower.contains("liste des projets") {
        return Shortcut::Rewrite(PROJECTS_PROMPT.to_string());
    }
    Shortcut::PassThrough
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_menu_action_table() {
        assert_eq!(menu_action_message("menu").as_deref(), Some(SHOW_ACTION_MENU));
        assert_eq!(
            menu_action_message(ACTION_SIGNALER_INCIDENT).as_deref(),
            Some("[START_WORKFLOW:incident]")
        );
        assert!(menu_action_message("projet_4").unwrap().contains("projet 4"));
        assert!(menu_action_message("incident_type_qualite").is_none());
        assert!(menu_action_message("quelque chose").is_none());
    }

    #[test]
    fn test_resolve_order() {
        assert!(matches!(resolve("[SHOW_ACTION_MENU]"), Shortcut::Canned(_)));
        assert_eq!(
            resolve("[START_WORKFLOW:stock]"),
            Shortcut::StartWorkflow(WorkflowKind::Stock)
        );
        assert!(matches!(resolve("[START_WORKFLOW:inconnu]"), Shortcut::Canned(_)));
        assert_eq!(resolve("Montre-moi les KPIs globaux"), Shortcut::Rewrite(KPI_PROMPT.to_string()));
        assert_eq!(resolve("Quel est le budget du projet 3 ?"), Shortcut::PassThrough);
    }

    #[test]
    fn test_special_tokens() {
        assert!(is_special_token(" [SHOW_ACTION_MENU] "));
        assert!(is_special_token("[START_WORKFLOW:media]"));
        assert!(!is_special_token("[START_WORKFLOW:media"));
    }
}
