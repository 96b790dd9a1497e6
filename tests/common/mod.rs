//! 集成测试共用的装配

#![allow(dead_code)]

use std::sync::Arc;

use asi_track::agent::{Agent, AgentBuilder, Prompts};
use asi_track::backend::{MemoryBackend, Project, StockItem};
use asi_track::config::AppConfig;
use asi_track::interactive::{InteractivePayload, MAX_BUTTONS, MAX_ROWS_PER_SECTION, MAX_SECTIONS};
use asi_track::llm::ScriptedLlmClient;
use asi_track::session::MemorySessionStore;

pub const PHONE: &str = "+22670000001";

pub struct Harness {
    pub agent: Agent,
    pub backend: Arc<MemoryBackend>,
    pub store: Arc<MemorySessionStore>,
    pub llm: Arc<ScriptedLlmClient>,
}

pub fn harness(backend: MemoryBackend, llm: ScriptedLlmClient) -> Harness {
    let backend = Arc::new(backend);
    let store = Arc::new(MemorySessionStore::new());
    let llm = Arc::new(llm);
    let agent = AgentBuilder::new(AppConfig::default())
        .with_llm(llm.clone())
        .with_backend(backend.clone())
        .with_session_store(store.clone())
        .with_prompts(Prompts::default())
        .build();
    Harness {
        agent,
        backend,
        store,
        llm,
    }
}

pub fn projects(n: usize) -> Vec<Project> {
    (1..=n)
        .map(|i| Project {
            id: i.to_string(),
            nom: format!("Chantier {i}"),
            pays: Some("Burkina Faso".into()),
            statut: Some("en cours".into()),
            avancement: Some(10.0 * i as f64),
            budget: Some(1_000_000.0),
            chef_projet: None,
        })
        .collect()
}

pub fn stocks() -> Vec<StockItem> {
    vec![
        StockItem {
            id: "1".into(),
            designation: "Ciment CPJ 45".into(),
            quantite: 12.0,
            seuil_alerte: Some(20.0),
            unite: Some("sac".into()),
            ..Default::default()
        },
        StockItem {
            id: "2".into(),
            designation: "Fer à béton 12".into(),
            quantite: 300.0,
            seuil_alerte: Some(50.0),
            unite: Some("barre".into()),
            ..Default::default()
        },
    ]
}

/// 交互载荷满足 WhatsApp 上限
pub fn assert_within_limits(payload: &InteractivePayload) {
    match payload {
        InteractivePayload::Button { buttons, .. } => {
            assert!((1..=MAX_BUTTONS).contains(&buttons.len()));
        }
        InteractivePayload::List { sections, .. } => {
            assert!((1..=MAX_SECTIONS).contains(&sections.len()));
            for s in sections {
                assert!((1..=MAX_ROWS_PER_SECTION).contains(&s.rows.len()));
            }
        }
    }
}
