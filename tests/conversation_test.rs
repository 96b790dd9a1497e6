//! 会话状态机端到端测试：菜单导航、工作流推进、取消与失败清理

mod common;

use asi_track::agent::{ChatRequest, MediaAttachment};
use asi_track::backend::{MemoryBackend, Signalement};
use asi_track::interactive::{InteractivePayload, ACTION_MENU_BODY, CANCELLED_TEXT};
use asi_track::llm::{LlmReply, ScriptedLlmClient};
use asi_track::memory::Role;
use asi_track::session::{SessionData, SessionRecord, WorkflowState};
use chrono::NaiveDate;
use serde_json::json;

use common::{assert_within_limits, harness, projects, PHONE};

#[tokio::test]
async fn test_menu_navigation_into_incident_workflow() {
    let h = harness(
        MemoryBackend::new().with_projects(projects(3)),
        ScriptedLlmClient::default(),
    );

    let greeting = h.agent.process_query(ChatRequest::whatsapp(PHONE, "bonjour")).await;
    let payload = greeting.interactive.expect("greeting has a button");
    assert!(matches!(payload, InteractivePayload::Button { .. }));
    assert_eq!(payload.option_ids(), vec!["menu"]);

    let menu = h
        .agent
        .process_query(ChatRequest::whatsapp(PHONE, "[SHOW_ACTION_MENU]"))
        .await;
    let payload = menu.interactive.expect("action menu");
    assert!(matches!(payload, InteractivePayload::List { .. }));
    assert_eq!(payload.body(), ACTION_MENU_BODY);
    assert_within_limits(&payload);

    let start = h
        .agent
        .process_query(ChatRequest::whatsapp(PHONE, "action_signaler_incident"))
        .await;
    let payload = start.interactive.expect("incident types");
    assert_eq!(payload.option_ids().len(), 5);
    let record = h.store.raw(PHONE).await.unwrap();
    assert_eq!(record.state, WorkflowState::MenuIncidentType.as_tag());

    let typed = h
        .agent
        .process_query(ChatRequest::whatsapp(PHONE, "incident_type_securite"))
        .await;
    assert!(typed.interactive.is_some());
    let record = h.store.raw(PHONE).await.unwrap();
    assert_eq!(record.state, WorkflowState::MenuIncidentProject.as_tag());
    assert_eq!(record.data["type_incident"], "securite");

    let unknown = h.agent.process_query(ChatRequest::whatsapp(PHONE, "projet_999")).await;
    assert!(unknown.response.contains("introuvable"));
    assert!(h.store.raw(PHONE).await.is_none());

    assert_eq!(h.llm.call_count(), 0);
}

#[tokio::test]
async fn test_menu_incident_with_project_and_photo() {
    let h = harness(
        MemoryBackend::new().with_projects(projects(2)),
        ScriptedLlmClient::default(),
    );

    for message in ["action_signaler_incident", "2", "projet_2", "Fuite d'huile sur la pelle"] {
        h.agent.process_query(ChatRequest::whatsapp(PHONE, message)).await;
    }
    let record = h.store.raw(PHONE).await.unwrap();
    assert_eq!(record.state, WorkflowState::MenuIncidentPhoto.as_tag());

    let photo = MediaAttachment {
        reference: "wamid-photo-1".into(),
        mime_type: Some("image/jpeg".into()),
        caption: None,
    };
    let done = h
        .agent
        .process_query(ChatRequest::whatsapp(PHONE, "").with_media(photo))
        .await;
    assert!(done.response.contains("Incident enregistré"));
    assert!(h.store.raw(PHONE).await.is_none());

    let incidents = h.backend.incidents().await;
    assert_eq!(incidents.len(), 1);
    assert_eq!(incidents[0].type_incident, "qualite");
    assert_eq!(incidents[0].projet_id.as_deref(), Some("2"));
    assert_eq!(incidents[0].photo_url.as_deref(), Some("wamid-photo-1"));
}

#[tokio::test]
async fn test_text_incident_flow_records_reporter() {
    let h = harness(MemoryBackend::new(), ScriptedLlmClient::default());

    let start = h
        .agent
        .process_query(ChatRequest::whatsapp(PHONE, "Signaler incident"))
        .await;
    assert!(start.response.contains("Quel type d'incident"));

    h.agent.process_query(ChatRequest::whatsapp(PHONE, "1")).await;
    h.agent
        .process_query(ChatRequest::whatsapp(PHONE, "Chute d'un ouvrier sur l'échafaudage"))
        .await;
    let photo = MediaAttachment {
        reference: "media-123".into(),
        mime_type: Some("image/jpeg".into()),
        caption: Some("échafaudage".into()),
    };
    h.agent
        .process_query(ChatRequest::whatsapp(PHONE, "").with_media(photo))
        .await;
    let record = h.store.raw(PHONE).await.unwrap();
    assert_eq!(record.state, WorkflowState::IncidentLocation.as_tag());

    let done = h.agent.process_query(ChatRequest::whatsapp(PHONE, "Zone B")).await;
    assert!(done.response.contains("Photo jointe"));

    let incidents = h.backend.incidents().await;
    assert_eq!(incidents.len(), 1);
    let incident = &incidents[0];
    assert_eq!(incident.type_incident, "securite");
    assert_eq!(incident.localisation.as_deref(), Some("Zone B"));
    assert_eq!(incident.photo_url.as_deref(), Some("media-123"));
    assert_eq!(incident.signale_par.as_deref(), Some(PHONE));
    assert!(h.store.raw(PHONE).await.is_none());
}

#[tokio::test]
async fn test_signalement_collects_every_field() {
    let h = harness(MemoryBackend::new(), ScriptedLlmClient::default());

    let answers = [
        "nouveau signalement",
        "Burkina Faso",
        "Ouaga 2000",
        "Fissure sur la dalle du R+1",
        "Reprise au mortier de réparation",
        "Lot 2 gros oeuvre",
        "Awa Ouédraogo",
    ];
    for answer in answers {
        h.agent.process_query(ChatRequest::whatsapp(PHONE, answer)).await;
    }
    let record = h.store.raw(PHONE).await.unwrap();
    assert_eq!(record.state, WorkflowState::SignalementEcheance.as_tag());
    assert_eq!(record.data["chantier"], "Ouaga 2000");

    let done = h.agent.process_query(ChatRequest::whatsapp(PHONE, "15/11/2026")).await;
    assert!(done.response.contains("15/11/2026"));
    assert!(h.store.raw(PHONE).await.is_none());

    let saved = h.backend.signalements().await;
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].pays.as_deref(), Some("Burkina Faso"));
    assert_eq!(saved[0].responsable.as_deref(), Some("Awa Ouédraogo"));
    assert_eq!(saved[0].echeance, NaiveDate::from_ymd_opt(2026, 11, 15));
    assert_eq!(saved[0].created_by.as_deref(), Some(PHONE));
}

#[tokio::test]
async fn test_cancel_from_every_workflow_state() {
    let h = harness(MemoryBackend::new(), ScriptedLlmClient::default());

    for state in WorkflowState::ALL.into_iter().filter(|s| s.is_in_workflow()) {
        let mut data = SessionData::new();
        data.insert("pays".into(), json!("Niger"));
        h.store
            .put_raw(
                PHONE,
                SessionRecord {
                    state: state.as_tag().to_string(),
                    data,
                },
            )
            .await;

        let response = h.agent.process_query(ChatRequest::whatsapp(PHONE, "Annuler")).await;
        assert_eq!(response.response, CANCELLED_TEXT, "state {state}");
        assert_eq!(response.action.as_deref(), Some("cancelled"));
        assert!(matches!(response.interactive, Some(InteractivePayload::List { .. })));
        assert!(h.store.raw(PHONE).await.is_none(), "state {state} not cleared");
    }
    assert_eq!(h.llm.call_count(), 0);
}

#[tokio::test]
async fn test_unknown_state_tag_behaves_like_idle() {
    let h = harness(MemoryBackend::new(), ScriptedLlmClient::default());
    h.store
        .put_raw(
            PHONE,
            SessionRecord {
                state: "WAITING_FOR_SOMETHING_REMOVED".into(),
                data: SessionData::new(),
            },
        )
        .await;

    let response = h.agent.process_query(ChatRequest::whatsapp(PHONE, "bonjour")).await;
    assert!(matches!(response.interactive, Some(InteractivePayload::Button { .. })));
    assert_eq!(h.llm.call_count(), 0);
}

#[tokio::test]
async fn test_backend_failure_on_final_step_clears_session() {
    let h = harness(MemoryBackend::new(), ScriptedLlmClient::default());
    let mut data = SessionData::new();
    data.insert("pays".into(), json!("Mali"));
    data.insert("probleme".into(), json!("Garde-corps manquant"));
    h.store
        .put_raw(
            PHONE,
            SessionRecord {
                state: WorkflowState::SignalementEcheance.as_tag().to_string(),
                data,
            },
        )
        .await;
    h.backend.set_fail_writes(true);

    let response = h.agent.process_query(ChatRequest::whatsapp(PHONE, "31/12/2026")).await;
    assert!(response.response.contains("Erreur"));
    assert!(response.error.is_some());
    assert!(h.store.raw(PHONE).await.is_none());
    assert!(h.backend.signalements().await.is_empty());
}

#[tokio::test]
async fn test_free_text_history_is_bounded() {
    let replies = (1..=12).map(|i| LlmReply::text(format!("réponse {i}")));
    let h = harness(MemoryBackend::new(), ScriptedLlmClient::new(replies));

    for i in 1..=12 {
        let response = h
            .agent
            .process_query(ChatRequest::whatsapp(PHONE, format!("question {i}")))
            .await;
        assert_eq!(response.response, format!("réponse {i}"));
    }

    let record = h.store.raw(PHONE).await.unwrap();
    assert_eq!(record.state, WorkflowState::Idle.as_tag());
    let history = record.data["history"].as_array().unwrap().clone();
    assert_eq!(history.len(), 10);
    for (i, message) in history.iter().enumerate() {
        let expected = if i % 2 == 0 { "user" } else { "assistant" };
        assert_eq!(message["role"], expected);
    }
    assert_eq!(history[0]["content"], "question 8");
    assert_eq!(history[9]["content"], "réponse 12");

    let last = h.llm.requests().pop().unwrap();
    assert_eq!(last.messages.len(), 12);
    assert_eq!(last.messages[0].role, Role::System);
    assert_eq!(last.messages[11].content, "question 12");
}

#[tokio::test]
async fn test_llm_failure_returns_apology() {
    let h = harness(MemoryBackend::new(), ScriptedLlmClient::default());

    let response = h
        .agent
        .process_query(ChatRequest::whatsapp(PHONE, "Quel est l'état du chantier ?"))
        .await;
    assert!(response.response.starts_with("😔 Désolé"));
    assert!(response.error.is_some());
    assert!(h.store.raw(PHONE).await.is_none());
}

#[tokio::test]
async fn test_stock_workflow_search() {
    let h = harness(
        MemoryBackend::new().with_stocks(common::stocks()),
        ScriptedLlmClient::default(),
    );

    let menu = h.agent.process_query(ChatRequest::whatsapp(PHONE, "action_stocks")).await;
    assert_eq!(menu.interactive.unwrap().option_ids(), vec!["stock_all", "stock_low", "stock_search"]);

    h.agent.process_query(ChatRequest::whatsapp(PHONE, "stock_search")).await;
    let record = h.store.raw(PHONE).await.unwrap();
    assert_eq!(record.state, WorkflowState::StockSearchQuery.as_tag());

    let found = h.agent.process_query(ChatRequest::whatsapp(PHONE, "ciment")).await;
    assert!(found.response.contains("Ciment CPJ 45"));
    assert!(!found.response.contains("Fer à béton"));
    assert!(h.store.raw(PHONE).await.is_none());
}

fn open_signalement() -> Signalement {
    Signalement {
        numero: "SIG-2026-0A1B2C".into(),
        probleme: "Fissure sur la dalle".into(),
        responsable: Some("Awa Ouédraogo".into()),
        statut: Some("ouvert".into()),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_signalement_update_each_field() {
    let h = harness(
        MemoryBackend::new().with_signalements(vec![open_signalement()]),
        ScriptedLlmClient::default(),
    );

    let start = h
        .agent
        .process_query(ChatRequest::whatsapp(PHONE, "action_maj_signalement"))
        .await;
    assert!(start.response.contains("numéro du signalement"));
    let record = h.store.raw(PHONE).await.unwrap();
    assert_eq!(record.state, WorkflowState::SignalementIdUpdate.as_tag());

    let found = h.agent.process_query(ChatRequest::whatsapp(PHONE, "sig-2026-0a1b2c")).await;
    assert!(found.response.contains("Fissure sur la dalle"));
    let record = h.store.raw(PHONE).await.unwrap();
    assert_eq!(record.state, WorkflowState::SignalementUpdateField.as_tag());
    assert_eq!(record.data["numero"], "SIG-2026-0A1B2C");

    h.agent.process_query(ChatRequest::whatsapp(PHONE, "maj_rapport")).await;
    let record = h.store.raw(PHONE).await.unwrap();
    assert_eq!(record.state, WorkflowState::SignalementRapport.as_tag());
    let done = h
        .agent
        .process_query(ChatRequest::whatsapp(PHONE, "Reprise au mortier effectuée"))
        .await;
    assert!(done.response.contains("Rapport ajouté"));
    assert!(h.store.raw(PHONE).await.is_none());

    for message in ["action_maj_signalement", "SIG-2026-0A1B2C", "2"] {
        h.agent.process_query(ChatRequest::whatsapp(PHONE, message)).await;
    }
    let record = h.store.raw(PHONE).await.unwrap();
    assert_eq!(record.state, WorkflowState::SignalementNewEcheance.as_tag());
    let done = h.agent.process_query(ChatRequest::whatsapp(PHONE, "20/12/2026")).await;
    assert!(done.response.contains("20/12/2026"));
    assert!(h.store.raw(PHONE).await.is_none());

    for message in ["action_maj_signalement", "SIG-2026-0A1B2C", "3"] {
        h.agent.process_query(ChatRequest::whatsapp(PHONE, message)).await;
    }
    let record = h.store.raw(PHONE).await.unwrap();
    assert_eq!(record.state, WorkflowState::SignalementNewPersonne.as_tag());
    let done = h.agent.process_query(ChatRequest::whatsapp(PHONE, "Issa Kaboré")).await;
    assert!(done.response.contains("Responsable mis à jour"));
    assert!(h.store.raw(PHONE).await.is_none());

    let saved = h.backend.signalements().await;
    assert_eq!(saved[0].rapports, vec!["Reprise au mortier effectuée".to_string()]);
    assert_eq!(saved[0].echeance, NaiveDate::from_ymd_opt(2026, 12, 20));
    assert_eq!(saved[0].responsable.as_deref(), Some("Issa Kaboré"));
    assert_eq!(h.llm.call_count(), 0);
}

#[tokio::test]
async fn test_signalement_update_unknown_numero_clears_session() {
    let h = harness(
        MemoryBackend::new().with_signalements(vec![open_signalement()]),
        ScriptedLlmClient::default(),
    );

    h.agent
        .process_query(ChatRequest::whatsapp(PHONE, "action_maj_signalement"))
        .await;
    let missing = h.agent.process_query(ChatRequest::whatsapp(PHONE, "SIG-2026-FFFFFF")).await;
    assert!(missing.response.contains("introuvable"));
    assert!(h.store.raw(PHONE).await.is_none());
    assert!(h.backend.signalements().await[0].rapports.is_empty());
}

#[tokio::test]
async fn test_media_upload_attaches_to_project() {
    let h = harness(
        MemoryBackend::new().with_projects(projects(3)),
        ScriptedLlmClient::default(),
    );

    let start = h.agent.process_query(ChatRequest::whatsapp(PHONE, "action_media")).await;
    assert_eq!(start.interactive.unwrap().option_ids().len(), 3);
    let record = h.store.raw(PHONE).await.unwrap();
    assert_eq!(record.state, WorkflowState::MediaProject.as_tag());

    h.agent.process_query(ChatRequest::whatsapp(PHONE, "projet_3")).await;
    let record = h.store.raw(PHONE).await.unwrap();
    assert_eq!(record.state, WorkflowState::MediaUpload.as_tag());

    // 没有附件时停在上传步骤
    let nudge = h.agent.process_query(ChatRequest::whatsapp(PHONE, "voilà")).await;
    assert!(nudge.response.contains("Veuillez envoyer"));
    let record = h.store.raw(PHONE).await.unwrap();
    assert_eq!(record.state, WorkflowState::MediaUpload.as_tag());

    let video = MediaAttachment {
        reference: "wamid-video-7".into(),
        mime_type: Some("video/mp4".into()),
        caption: Some("Coulage dalle".into()),
    };
    let done = h
        .agent
        .process_query(ChatRequest::whatsapp(PHONE, "").with_media(video))
        .await;
    assert!(done.response.contains("Chantier 3"));
    assert!(h.store.raw(PHONE).await.is_none());

    let media = h.backend.media().await;
    assert_eq!(media.len(), 1);
    assert_eq!(media[0].projet_id, "3");
    assert_eq!(media[0].media_ref, "wamid-video-7");
    assert_eq!(media[0].caption.as_deref(), Some("Coulage dalle"));
    assert_eq!(media[0].uploaded_by.as_deref(), Some(PHONE));
}

#[tokio::test]
async fn test_media_unknown_project_clears_session() {
    let h = harness(
        MemoryBackend::new().with_projects(projects(2)),
        ScriptedLlmClient::default(),
    );

    h.agent.process_query(ChatRequest::whatsapp(PHONE, "action_media")).await;
    let missing = h.agent.process_query(ChatRequest::whatsapp(PHONE, "projet_42")).await;
    assert!(missing.response.contains("introuvable"));
    assert!(h.store.raw(PHONE).await.is_none());
    assert!(h.backend.media().await.is_empty());
}

#[tokio::test]
async fn test_finances_lookup_attaches_link() {
    let h = harness(
        MemoryBackend::new().with_projects(projects(2)),
        ScriptedLlmClient::default(),
    );

    let start = h.agent.process_query(ChatRequest::whatsapp(PHONE, "action_finances")).await;
    assert_eq!(start.interactive.unwrap().option_ids(), vec!["projet_1", "projet_2"]);
    let record = h.store.raw(PHONE).await.unwrap();
    assert_eq!(record.state, WorkflowState::ProjectIdFinances.as_tag());

    let summary = h.agent.process_query(ChatRequest::whatsapp(PHONE, "projet_2")).await;
    assert!(summary.response.contains("Chantier 2"));
    assert!(summary.response.contains("/share/"));
    assert_eq!(summary.data.unwrap()["projet_id"], "2");
    assert!(h.store.raw(PHONE).await.is_none());

    let links = h.backend.magic_links().await;
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].resource_type, "finances");
    assert_eq!(links[0].resource_id.as_deref(), Some("2"));
    assert_eq!(h.llm.call_count(), 0);
}

#[tokio::test]
async fn test_finances_unknown_project_clears_session() {
    let h = harness(
        MemoryBackend::new().with_projects(projects(2)),
        ScriptedLlmClient::default(),
    );

    h.agent.process_query(ChatRequest::whatsapp(PHONE, "action_finances")).await;
    let missing = h.agent.process_query(ChatRequest::whatsapp(PHONE, "77")).await;
    assert!(missing.response.contains("introuvable"));
    assert!(h.store.raw(PHONE).await.is_none());
    assert!(h.backend.magic_links().await.is_empty());
}
