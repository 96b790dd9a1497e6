//! 事故申报的两条流程
//!
//! - 文字入口（WAITING_FOR_INCIDENT_*）：类型 → 描述 → 照片 → 位置
//! - 菜单入口（WORKFLOW_INCIDENT_*）：类型列表 → 项目列表 → 描述 → 照片
//!
//! 两条流程字段不同，分别保留。

use crate::backend::{NewIncident, ProjectFilter};
use crate::interactive::{self, parse_incident_type, parse_project_selection, INCIDENT_TYPES};
use crate::session::{SessionData, SessionTxn, WorkflowState};

use super::{backend_failure, data_with, session_expired, AgentResponse, StepInput};
use crate::agent::Agent;

const PROJECT_MENU_SIZE: usize = 10;

fn legacy_type_prompt() -> String {
    let options: Vec<String> = INCIDENT_TYPES
        .iter()
        .enumerate()
        .map(|(i, (_, label))| format!("{}. {}", i + 1, label))
        .collect();
    format!(
        "⚠️ *Déclaration d'incident*\n\nQuel type d'incident ? Répondez par le numéro :\n{}",
        options.join("\n")
    )
}

fn type_label(code: &str) -> &'static str {
    INCIDENT_TYPES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, label)| *label)
        .unwrap_or("📌 Autre")
}

fn photo_prompt() -> Option<crate::interactive::InteractivePayload> {
    interactive::skip_button("📷 Envoyez une photo de l'incident, ou appuyez sur *Passer*.")
}

// ---- 文字入口 ----

pub(super) fn start_legacy(txn: &mut SessionTxn) -> AgentResponse {
    txn.update(WorkflowState::IncidentType, SessionData::new());
    AgentResponse::text(legacy_type_prompt())
}

pub(super) fn on_legacy_type(txn: &mut SessionTxn, input: &StepInput<'_>) -> AgentResponse {
    let Some(code) = parse_incident_type(input.text) else {
        return AgentResponse::text(format!("⚠️ Type non reconnu.\n\n{}", legacy_type_prompt()));
    };
    let data = data_with(txn.data(), "type_incident", code);
    txn.update(WorkflowState::IncidentDescription, data);
    AgentResponse::text(format!("{} — Décrivez l'incident :", type_label(code)))
}

pub(super) fn on_legacy_description(txn: &mut SessionTxn, input: &StepInput<'_>) -> AgentResponse {
    if input.is_blank() {
        return AgentResponse::text("⚠️ Décrivez l'incident en quelques mots.");
    }
    let data = data_with(txn.data(), "description", input.trimmed());
    txn.update(WorkflowState::IncidentPhoto, data);
    AgentResponse::text("📷 Photo de l'incident ?").with_interactive(photo_prompt())
}

pub(super) fn on_legacy_photo(txn: &mut SessionTxn, input: &StepInput<'_>) -> AgentResponse {
    let data = match input.media {
        Some(media) => data_with(txn.data(), "photo_url", media.reference.clone()),
        None => txn.data().clone(),
    };
    txn.update(WorkflowState::IncidentLocation, data);
    AgentResponse::text("📍 Partagez la localisation (ou décrivez le lieu).")
        .with_interactive(interactive::skip_button("📍 Où s'est produit l'incident ?"))
}

pub(super) async fn on_legacy_location(agent: &Agent, txn: &mut SessionTxn, input: &StepInput<'_>) -> AgentResponse {
    let localisation = (!input.is_blank() && !input.is_skip()).then(|| input.trimmed().to_string());
    create(agent, txn, localisation).await
}

// ---- 菜单入口 ----

pub(super) fn start_menu(txn: &mut SessionTxn) -> AgentResponse {
    txn.update(WorkflowState::MenuIncidentType, SessionData::new());
    AgentResponse::text("⚠️ Quel type d'incident souhaitez-vous déclarer ?")
        .with_interactive(interactive::incident_type_menu())
}

pub(super) async fn on_menu_type(agent: &Agent, txn: &mut SessionTxn, input: &StepInput<'_>) -> AgentResponse {
    let Some(code) = parse_incident_type(input.text) else {
        return AgentResponse::text("⚠️ Type non reconnu, choisissez dans la liste.")
            .with_interactive(interactive::incident_type_menu());
    };
    let filter = ProjectFilter {
        limit: Some(PROJECT_MENU_SIZE),
        ..Default::default()
    };
    let projects = match agent.backend.list_projects(&filter).await {
        Ok(projects) => projects,
        Err(e) => return backend_failure(txn, "la récupération des projets", e),
    };
    let data = data_with(txn.data(), "type_incident", code);
    if projects.is_empty() {
        txn.update(WorkflowState::MenuIncidentDescription, data);
        return AgentResponse::text(format!("{} — Décrivez l'incident :", type_label(code)));
    }
    txn.update(WorkflowState::MenuIncidentProject, data);
    AgentResponse::text(format!("{} — Sur quel projet ?", type_label(code))).with_interactive(
        interactive::project_menu("🏗️ Sélectionnez le projet concerné :", &projects),
    )
}

pub(super) async fn on_menu_project(agent: &Agent, txn: &mut SessionTxn, input: &StepInput<'_>) -> AgentResponse {
    let project_id = parse_project_selection(input.text);
    match agent.backend.find_project(&project_id).await {
        Ok(Some(project)) => {
            let mut data = data_with(txn.data(), "projet_id", project.id.clone());
            data.insert("projet_nom".into(), project.nom.clone().into());
            txn.update(WorkflowState::MenuIncidentDescription, data);
            AgentResponse::text(format!("📝 Décrivez l'incident sur *{}* :", project.nom))
        }
        Ok(None) => {
            tracing::info!(phone = txn.phone(), project_id = %project_id, "Incident project not found");
            txn.clear();
            AgentResponse::text(format!(
                "❌ Projet introuvable ({project_id}). La déclaration est annulée, tapez *menu* pour recommencer."
            ))
        }
        Err(e) => backend_failure(txn, "la recherche du projet", e),
    }
}

pub(super) fn on_menu_description(txn: &mut SessionTxn, input: &StepInput<'_>) -> AgentResponse {
    if input.is_blank() {
        return AgentResponse::text("⚠️ Décrivez l'incident en quelques mots.");
    }
    let data = data_with(txn.data(), "description", input.trimmed());
    txn.update(WorkflowState::MenuIncidentPhoto, data);
    AgentResponse::text("📷 Photo de l'incident ?").with_interactive(photo_prompt())
}

pub(super) async fn on_menu_photo(agent: &Agent, txn: &mut SessionTxn, input: &StepInput<'_>) -> AgentResponse {
    if let Some(media) = input.media {
        let data = data_with(txn.data(), "photo_url", media.reference.clone());
        txn.update(txn.state(), data);
    }
    create(agent, txn, None).await
}

// ---- 终止步 ----

async fn create(agent: &Agent, txn: &mut SessionTxn, localisation: Option<String>) -> AgentResponse {
    let (Some(type_incident), Some(description)) = (
        txn.session().get_str("type_incident").map(str::to_string),
        txn.session().get_str("description").map(str::to_string),
    ) else {
        return session_expired(txn);
    };
    let incident = NewIncident {
        type_incident,
        description,
        gravite: None,
        statut: "ouvert".into(),
        projet_id: txn.session().get_str("projet_id").map(str::to_string),
        localisation,
        photo_url: txn.session().get_str("photo_url").map(str::to_string),
        signale_par: Some(txn.phone().to_string()),
    };
    let projet = txn.session().get_str("projet_nom").map(str::to_string);

    match agent.backend.create_incident(incident).await {
        Ok(created) => {
            txn.clear();
            tracing::info!(incident_id = %created.id, "Incident created");
            let mut text = format!(
                "✅ Incident enregistré (n° {}).\n\n{} — {}",
                created.id,
                type_label(&created.type_incident),
                created.description
            );
            if let Some(projet) = projet {
                text.push_str(&format!("\n🏗️ Projet : {projet}"));
            }
            if created.photo_url.is_some() {
                text.push_str("\n📷 Photo jointe");
            }
            text.push_str("\n\nL'équipe HSE a été notifiée.");
            AgentResponse::text(text).with_data(serde_json::json!({ "incident_id": created.id }))
        }
        Err(e) => backend_failure(txn, "l'enregistrement de l'incident", e),
    }
}
