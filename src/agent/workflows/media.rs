//! 项目媒体上传：选择项目 → 发送照片 / 视频

use crate::backend::{NewProjectMedia, ProjectFilter};
use crate::interactive::{self, parse_project_selection};
use crate::session::{SessionData, SessionTxn, WorkflowState};

use super::{backend_failure, data_with, session_expired, AgentResponse, StepInput};
use crate::agent::Agent;

pub(super) async fn start(agent: &Agent, txn: &mut SessionTxn) -> AgentResponse {
    let filter = ProjectFilter {
        limit: Some(10),
        ..Default::default()
    };
    match agent.backend.list_projects(&filter).await {
        Ok(projects) if projects.is_empty() => {
            txn.clear();
            AgentResponse::text("📷 Aucun projet disponible pour le moment.")
        }
        Ok(projects) => {
            txn.update(WorkflowState::MediaProject, SessionData::new());
            AgentResponse::text("📷 Pour quel projet souhaitez-vous envoyer une photo ou une vidéo ?")
                .with_interactive(interactive::project_menu("🏗️ Sélectionnez le projet :", &projects))
        }
        Err(e) => backend_failure(txn, "la récupération des projets", e),
    }
}

pub(super) async fn on_project(agent: &Agent, txn: &mut SessionTxn, input: &StepInput<'_>) -> AgentResponse {
    let project_id = parse_project_selection(input.text);
    match agent.backend.find_project(&project_id).await {
        Ok(Some(project)) => {
            let mut data = data_with(txn.data(), "projet_id", project.id.clone());
            data.insert("projet_nom".into(), project.nom.clone().into());
            txn.update(WorkflowState::MediaUpload, data);
            AgentResponse::text(format!("📤 Envoyez maintenant la photo ou la vidéo pour *{}*.", project.nom))
        }
        Ok(None) => {
            txn.clear();
            AgentResponse::text(format!("❌ Projet introuvable ({project_id})."))
        }
        Err(e) => backend_failure(txn, "la recherche du projet", e),
    }
}

pub(super) async fn on_upload(agent: &Agent, txn: &mut SessionTxn, input: &StepInput<'_>) -> AgentResponse {
    let Some(media) = input.media else {
        return AgentResponse::text("📎 Veuillez envoyer une photo ou une vidéo (ou tapez *annuler*).");
    };
    let (Some(projet_id), projet_nom) = (
        txn.session().get_str("projet_id").map(str::to_string),
        txn.session().get_str("projet_nom").unwrap_or("-").to_string(),
    ) else {
        return session_expired(txn);
    };
    let record = NewProjectMedia {
        projet_id,
        media_ref: media.reference.clone(),
        mime_type: media.mime_type.clone(),
        caption: media
            .caption
            .clone()
            .or_else(|| (!input.is_blank()).then(|| input.trimmed().to_string())),
        uploaded_by: Some(txn.phone().to_string()),
    };
    match agent.backend.attach_media(record).await {
        Ok(()) => {
            txn.clear();
            AgentResponse::text(format!("✅ Média ajouté au projet *{projet_nom}*."))
        }
        Err(e) => backend_failure(txn, "l'enregistrement du média", e),
    }
}
