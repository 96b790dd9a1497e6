//! 新建整改事项：国家 → 工地 → 问题 → 纠正措施 → 分区 → 负责人 → 截止日期

use chrono::Utc;

use crate::backend::{new_signalement_numero, parse_due_date, Signalement};
use crate::session::{SessionData, SessionTxn, WorkflowState};

use super::{backend_failure, data_with, session_expired, AgentResponse, StepInput};
use crate::agent::Agent;

/// 收集步骤：(当前状态, 写入的字段, 下一状态, 下一提示)
const STEPS: [(WorkflowState, &str, WorkflowState, &str); 6] = [
    (
        WorkflowState::SignalementPays,
        "pays",
        WorkflowState::SignalementChantier,
        "2️⃣ Quel est le nom du chantier ?",
    ),
    (
        WorkflowState::SignalementChantier,
        "chantier",
        WorkflowState::SignalementProbleme,
        "3️⃣ Décrivez le problème constaté.",
    ),
    (
        WorkflowState::SignalementProbleme,
        "probleme",
        WorkflowState::SignalementAction,
        "4️⃣ Quelle action corrective proposez-vous ?",
    ),
    (
        WorkflowState::SignalementAction,
        "action_corrective",
        WorkflowState::SignalementSection,
        "5️⃣ Quelle section ou quel lot est concerné ?",
    ),
    (
        WorkflowState::SignalementSection,
        "section",
        WorkflowState::SignalementPersonne,
        "6️⃣ Qui est responsable de cette action ?",
    ),
    (
        WorkflowState::SignalementPersonne,
        "responsable",
        WorkflowState::SignalementEcheance,
        "7️⃣ Quelle est l'échéance ? (JJ/MM/AAAA)",
    ),
];

const FIRST_PROMPT: &str = "🆕 *Nouveau signalement*\n\n1️⃣ Dans quel pays se situe le chantier ?\n\n_Tapez *annuler* à tout moment pour arrêter._";

pub(super) fn start(txn: &mut SessionTxn) -> AgentResponse {
    txn.update(WorkflowState::SignalementPays, SessionData::new());
    AgentResponse::text(FIRST_PROMPT)
}

fn prompt_for(state: WorkflowState) -> &'static str {
    if state == WorkflowState::SignalementPays {
        return FIRST_PROMPT;
    }
    STEPS
        .iter()
        .find(|(_, _, next, _)| *next == state)
        .map(|(_, _, _, prompt)| *prompt)
        .unwrap_or(FIRST_PROMPT)
}

pub(super) fn collect(txn: &mut SessionTxn, input: &StepInput<'_>) -> AgentResponse {
    let state = txn.state();
    let Some((_, field, next, prompt)) = STEPS.iter().find(|(s, ..)| *s == state) else {
        return session_expired(txn);
    };
    if input.is_blank() {
        return AgentResponse::text(format!("⚠️ Réponse vide.\n\n{}", prompt_for(state)));
    }
    let data = data_with(txn.data(), field, input.trimmed());
    txn.update(*next, data);
    AgentResponse::text(*prompt)
}

pub(super) async fn finish(agent: &Agent, txn: &mut SessionTxn, input: &StepInput<'_>) -> AgentResponse {
    let Some(probleme) = txn.session().get_str("probleme").map(str::to_string) else {
        return session_expired(txn);
    };
    let now = Utc::now();
    let echeance = parse_due_date(input.trimmed()).unwrap_or_else(|| {
        tracing::debug!(input = input.trimmed(), "Unrecognized due date, using today");
        now.date_naive()
    });
    let field = |key: &str| txn.session().get_str(key).map(str::to_string);
    let signalement = Signalement {
        numero: new_signalement_numero(now),
        pays: field("pays"),
        chantier: field("chantier"),
        probleme,
        action_corrective: field("action_corrective"),
        section: field("section"),
        responsable: field("responsable"),
        echeance: Some(echeance),
        statut: Some("ouvert".into()),
        rapports: Vec::new(),
        created_by: Some(txn.phone().to_string()),
        created_at: Some(now),
    };

    match agent.backend.create_signalement(signalement).await {
        Ok(created) => {
            txn.clear();
            tracing::info!(numero = %created.numero, "Signalement created");
            AgentResponse::text(format!(
                "✅ Signalement *{}* enregistré.\n\n📍 {} — {}\n⚠️ {}\n👤 {}\n📅 Échéance : {}",
                created.numero,
                created.pays.as_deref().unwrap_or("-"),
                created.chantier.as_deref().unwrap_or("-"),
                created.probleme,
                created.responsable.as_deref().unwrap_or("-"),
                echeance.format("%d/%m/%Y"),
            ))
            .with_data(serde_json::json!({ "numero": created.numero }))
        }
        Err(e) => backend_failure(txn, "l'enregistrement du signalement", e),
    }
}
