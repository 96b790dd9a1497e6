//! 更新整改事项：编号 → 选择字段 → 新值（进度报告 / 截止日期 / 负责人）

use chrono::Utc;

use crate::backend::{parse_due_date, BackendError, SignalementUpdate};
use crate::interactive::{self, FIELD_ECHEANCE, FIELD_PERSONNE, FIELD_RAPPORT};
use crate::session::{SessionData, SessionTxn, WorkflowState};

use super::{backend_failure, data_with, session_expired, AgentResponse, StepInput};
use crate::agent::command::normalize;
use crate::agent::Agent;

pub(super) fn start(txn: &mut SessionTxn) -> AgentResponse {
    txn.update(WorkflowState::SignalementIdUpdate, SessionData::new());
    AgentResponse::text(
        "✏️ *Mise à jour d'un signalement*\n\nIndiquez le numéro du signalement (ex. SIG-2026-4F3A9C).",
    )
}

pub(super) async fn on_numero(agent: &Agent, txn: &mut SessionTxn, input: &StepInput<'_>) -> AgentResponse {
    if input.is_blank() {
        return AgentResponse::text("⚠️ Indiquez le numéro du signalement (ex. SIG-2026-4F3A9C).");
    }
    let numero = input.trimmed().to_uppercase();
    match agent.backend.find_signalement(&numero).await {
        Ok(Some(found)) => {
            let data = data_with(txn.data(), "numero", found.numero.clone());
            txn.update(WorkflowState::SignalementUpdateField, data);
            AgentResponse::text(format!("✏️ Signalement *{}* : {}", found.numero, found.probleme))
                .with_interactive(interactive::update_field_menu(&found.numero))
        }
        Ok(None) => {
            txn.clear();
            AgentResponse::text(format!("❌ Signalement *{numero}* introuvable."))
                .with_interactive(interactive::action_menu())
        }
        Err(e) => backend_failure(txn, "la recherche du signalement", e),
    }
}

enum Field {
    Rapport,
    Echeance,
    Personne,
}

fn parse_field(input: &str) -> Option<Field> {
    let n = normalize(input);
    if n == FIELD_RAPPORT || n == "1" || n.contains("rapport") {
        Some(Field::Rapport)
    } else if n == FIELD_ECHEANCE || n == "2" || n.contains("echeance") || n.contains("date") {
        Some(Field::Echeance)
    } else if n == FIELD_PERSONNE || n == "3" || n.contains("responsable") || n.contains("personne") {
        Some(Field::Personne)
    } else {
        None
    }
}

pub(super) fn on_field(txn: &mut SessionTxn, input: &StepInput<'_>) -> AgentResponse {
    let Some(numero) = txn.session().get_str("numero").map(str::to_string) else {
        return session_expired(txn);
    };
    let (next, prompt) = match parse_field(input.text) {
        Some(Field::Rapport) => (WorkflowState::SignalementRapport, "📝 Saisissez le rapport d'avancement :"),
        Some(Field::Echeance) => (WorkflowState::SignalementNewEcheance, "📅 Nouvelle échéance ? (JJ/MM/AAAA)"),
        Some(Field::Personne) => (WorkflowState::SignalementNewPersonne, "👤 Qui est le nouveau responsable ?"),
        None => {
            return AgentResponse::text("⚠️ Choix non reconnu. Que voulez-vous mettre à jour ?")
                .with_interactive(interactive::update_field_menu(&numero));
        }
    };
    let data = txn.data().clone();
    txn.update(next, data);
    AgentResponse::text(prompt)
}

pub(super) async fn apply(agent: &Agent, txn: &mut SessionTxn, input: &StepInput<'_>) -> AgentResponse {
    let Some(numero) = txn.session().get_str("numero").map(str::to_string) else {
        return session_expired(txn);
    };
    if input.is_blank() {
        return AgentResponse::text("⚠️ Réponse vide, veuillez réessayer.");
    }
    let value = input.trimmed().to_string();
    let (update, label) = match txn.state() {
        WorkflowState::SignalementRapport => (SignalementUpdate::AddReport(value), "Rapport ajouté"),
        WorkflowState::SignalementNewEcheance => {
            let date = parse_due_date(&value).unwrap_or_else(|| Utc::now().date_naive());
            (SignalementUpdate::Echeance(date), "Échéance mise à jour")
        }
        WorkflowState::SignalementNewPersonne => (SignalementUpdate::Responsable(value), "Responsable mis à jour"),
        _ => return session_expired(txn),
    };

    match agent.backend.update_signalement(&numero, update).await {
        Ok(updated) => {
            txn.clear();
            let echeance = updated
                .echeance
                .map(|d| d.format("%d/%m/%Y").to_string())
                .unwrap_or_else(|| "-".into());
            AgentResponse::text(format!(
                "✅ {label} pour *{}*.\n👤 {}\n📅 Échéance : {}\n📝 Rapports : {}",
                updated.numero,
                updated.responsable.as_deref().unwrap_or("-"),
                echeance,
                updated.rapports.len(),
            ))
        }
        Err(BackendError::NotFound(_)) => {
            txn.clear();
            AgentResponse::text(format!("❌ Signalement *{numero}* introuvable."))
        }
        Err(e) => backend_failure(txn, "la mise à jour du signalement", e),
    }
}
