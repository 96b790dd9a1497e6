//! 项目财务查询：选择项目 → 财务摘要（附魔法链接）

use serde_json::json;

use crate::backend::{ProjectFilter, ProjectFinances};
use crate::interactive::{self, parse_project_selection};
use crate::magic_link::{link_footer, MagicLinkRequest, ResourceType};
use crate::session::{SessionData, SessionTxn, WorkflowState};

use super::{backend_failure, format_amount, AgentResponse, StepInput};
use crate::agent::Agent;

const PROMPT: &str = "💰 *Finances projet*\n\nSélectionnez le projet ou tapez son identifiant.";

pub(super) async fn start(agent: &Agent, txn: &mut SessionTxn) -> AgentResponse {
    txn.update(WorkflowState::ProjectIdFinances, SessionData::new());
    let filter = ProjectFilter {
        limit: Some(10),
        ..Default::default()
    };
    match agent.backend.list_projects(&filter).await {
        Ok(projects) => AgentResponse::text(PROMPT)
            .with_interactive(interactive::project_menu("🏗️ Choisissez un projet :", &projects)),
        Err(e) => {
            tracing::warn!("Project list unavailable for finances menu: {}", e);
            AgentResponse::text(PROMPT)
        }
    }
}

fn summary(f: &ProjectFinances) -> String {
    let mut lines = vec![
        format!("💰 *{}*", f.projet),
        format!("Budget : {}", format_amount(f.budget)),
        format!("Engagé : {} ({:.1}%)", format_amount(f.engage), f.taux_consommation),
        format!("Payé : {}", format_amount(f.paye)),
        format!("Reste à engager : {}", format_amount(f.reste_a_engager)),
    ];
    if let Some(top) = f.depenses_par_categorie.first() {
        lines.push(format!("📊 1er poste : {} ({})", top.categorie, format_amount(top.montant)));
    }
    if f.taux_consommation > 90.0 {
        lines.push("⚠️ Budget presque entièrement consommé.".into());
    }
    lines.join("\n")
}

pub(super) async fn on_project(agent: &Agent, txn: &mut SessionTxn, input: &StepInput<'_>) -> AgentResponse {
    let project_id = parse_project_selection(input.text);
    let finances = match agent.backend.project_finances(&project_id).await {
        Ok(Some(f)) => f,
        Ok(None) => {
            txn.clear();
            return AgentResponse::text(format!("❌ Projet introuvable ({project_id})."));
        }
        Err(e) => return backend_failure(txn, "la récupération des finances", e),
    };
    txn.clear();

    let mut text = summary(&finances);
    let request = MagicLinkRequest {
        resource_type: ResourceType::Finances,
        resource_id: Some(finances.projet_id.clone()),
        phone_number: Some(txn.phone().to_string()),
        expiry_hours: None,
        metadata: Some(json!({ "tool": "get_project_finances", "data": finances })),
    };
    match agent.magic_links.generate(request).await {
        Ok(link) => text.push_str(&link_footer(&link.url, link.hours_valid())),
        Err(e) => tracing::warn!("Magic link generation failed: {}", e),
    }
    AgentResponse::text(text).with_data(json!(finances))
}
