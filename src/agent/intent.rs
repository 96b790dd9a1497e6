//! 关键词意图识别 + 旧版查询执行（Web 渠道关闭 AI 时的回退路径）
//!
//! 规则匹配，不调用 LLM：归一化后的文本 → `{module, action, filters}`。

use std::collections::BTreeMap;
use std::sync::Arc;

use regex::Regex;
use serde::Serialize;
use serde_json::json;

use crate::backend::{Backend, EquipmentFilter, IncidentFilter, ProjectFilter};
use crate::core::AgentError;

use super::command::normalize;
use super::types::AgentResponse;
use super::workflows::format_amount;

/// 业务模块
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentModule {
    Projets,
    Finances,
    Stocks,
    Incidents,
    Equipements,
    Signalements,
    Kpis,
    Inconnu,
}

/// 查询动作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentAction {
    Lister,
    Rechercher,
    Resumer,
    Detail,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetectedIntent {
    pub module: IntentModule,
    pub action: IntentAction,
    pub filters: BTreeMap<String, String>,
}

/// 模块关键词，按优先级排列（KPI / 财务在项目之前）
const MODULE_KEYWORDS: [(IntentModule, &[&str]); 7] = [
    (IntentModule::Kpis, &["kpi", "kpis", "indicateur", "tableau de bord", "dashboard"]),
    (IntentModule::Finances, &["finance", "budget", "depense", "cout", "argent", "engage"]),
    (IntentModule::Signalements, &["signalement", "non-conformite", "reserve", "top 20"]),
    (IntentModule::Incidents, &["incident", "accident", "securite"]),
    (IntentModule::Stocks, &["stock", "materiau", "article", "ciment", "inventaire"]),
    (IntentModule::Equipements, &["equipement", "engin", "machine", "materiel"]),
    (IntentModule::Projets, &["projet", "chantier", "avancement"]),
];

const STATUS_KEYWORDS: [(&str, &str); 4] = [
    ("en cours", "en cours"),
    ("termine", "termine"),
    ("ouvert", "ouvert"),
    ("suspendu", "suspendu"),
];

const COUNTRIES: [&str; 9] = [
    "burkina", "mali", "senegal", "cote d'ivoire", "niger", "togo", "benin", "guinee", "ghana",
];

/// 意图识别器
pub struct IntentDetector {
    project_id: Option<Regex>,
    search: Option<Regex>,
}

impl Default for IntentDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl IntentDetector {
    pub fn new() -> Self {
        Self {
            project_id: Regex::new(r"\bprojet\s*(?:n[o°]?\s*|#\s*)?(\d+)\b").ok(),
            search: Regex::new(r"\b(?:cherche|chercher|recherche|rechercher|trouve)\s+(.+?)(?:\s+dans\b.*)?$").ok(),
        }
    }

    fn capture(re: &Option<Regex>, text: &str) -> Option<String> {
        re.as_ref()?
            .captures(text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
    }

    pub fn detect(&self, message: &str) -> DetectedIntent {
        let text = normalize(message);
        let mut filters = BTreeMap::new();

        let module = MODULE_KEYWORDS
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| text.contains(k)))
            .map(|(m, _)| *m)
            .unwrap_or(IntentModule::Inconnu);

        if let Some(id) = Self::capture(&self.project_id, &text) {
            filters.insert("projet_id".to_string(), id);
        }
        if let Some((_, statut)) = STATUS_KEYWORDS.iter().find(|(k, _)| text.contains(k)) {
            filters.insert("statut".to_string(), statut.to_string());
        }
        if let Some(pays) = COUNTRIES.iter().find(|c| text.contains(*c)) {
            filters.insert("pays".to_string(), pays.to_string());
        }

        let action = if let Some(q) = Self::capture(&self.search, &text) {
            filters.insert("query".to_string(), q);
            IntentAction::Rechercher
        } else if filters.contains_key("projet_id") || text.contains("detail") {
            IntentAction::Detail
        } else if module == IntentModule::Kpis || text.contains("resume") || text.contains("synthese") {
            IntentAction::Resumer
        } else {
            IntentAction::Lister
        };

        DetectedIntent { module, action, filters }
    }
}

const FALLBACK_TEXT: &str = "Je n'ai pas compris votre demande. Vous pouvez m'interroger sur : \
     projets, finances, stocks, incidents, équipements, signalements ou KPIs.";

/// 按识别结果直接查询后端并格式化
pub async fn execute_query(backend: &Arc<dyn Backend>, intent: &DetectedIntent) -> Result<AgentResponse, AgentError> {
    let filter = |key: &str| intent.filters.get(key).cloned();
    tracing::debug!(module = ?intent.module, action = ?intent.action, "Executing keyword query");

    let response = match intent.module {
        IntentModule::Projets => {
            if let (IntentAction::Detail, Some(id)) = (intent.action, filter("projet_id")) {
                match backend.find_project(&id).await? {
                    Some(p) => AgentResponse::text(format!(
                        "**{}** ({})\n- Statut : {}\n- Avancement : {}%\n- Budget : {}",
                        p.nom,
                        p.pays.as_deref().unwrap_or("-"),
                        p.statut.as_deref().unwrap_or("-"),
                        p.avancement.unwrap_or(0.0),
                        format_amount(p.budget.unwrap_or(0.0)),
                    ))
                    .with_data(json!(p)),
                    None => AgentResponse::text(format!("Projet {id} introuvable.")),
                }
            } else {
                let projects = backend
                    .list_projects(&ProjectFilter {
                        statut: filter("statut"),
                        pays: filter("pays"),
                        search: filter("query"),
                        limit: None,
                    })
                    .await?;
                let lines: Vec<String> = projects
                    .iter()
                    .map(|p| format!("- {} : {}%", p.nom, p.avancement.unwrap_or(0.0)))
                    .collect();
                AgentResponse::text(format!("{} projet(s) :\n{}", projects.len(), lines.join("\n")))
                    .with_data(json!(projects))
            }
        }
        IntentModule::Finances => match filter("projet_id") {
            Some(id) => match backend.project_finances(&id).await? {
                Some(f) => AgentResponse::text(format!(
                    "Finances de **{}** : budget {}, engagé {} ({:.1}%), payé {}.",
                    f.projet,
                    format_amount(f.budget),
                    format_amount(f.engage),
                    f.taux_consommation,
                    format_amount(f.paye)
                ))
                .with_data(json!(f)),
                None => AgentResponse::text(format!("Projet {id} introuvable.")),
            },
            None => kpi_response(backend).await?,
        },
        IntentModule::Kpis => kpi_response(backend).await?,
        IntentModule::Stocks => {
            let items = backend.list_stocks(filter("query").as_deref()).await?;
            let low = items.iter().filter(|s| s.is_low()).count();
            AgentResponse::text(format!("{} article(s) en stock, dont {} sous le seuil d'alerte.", items.len(), low))
                .with_data(json!(items))
        }
        IntentModule::Incidents => {
            let incidents = backend
                .list_incidents(&IncidentFilter {
                    statut: filter("statut"),
                    projet_id: filter("projet_id"),
                    limit: None,
                })
                .await?;
            let open = incidents.iter().filter(|i| i.is_open()).count();
            AgentResponse::text(format!("{} incident(s), dont {} ouvert(s).", incidents.len(), open))
                .with_data(json!(incidents))
        }
        IntentModule::Equipements => {
            let equipment = backend
                .list_equipment(&EquipmentFilter {
                    statut: filter("statut"),
                    projet_id: filter("projet_id"),
                })
                .await?;
            AgentResponse::text(format!("{} équipement(s) recensé(s).", equipment.len())).with_data(json!(equipment))
        }
        IntentModule::Signalements => {
            let top = backend.top_signalements(20).await?;
            let lines: Vec<String> = top
                .iter()
                .map(|s| {
                    let due = s.echeance.map(|d| d.format("%d/%m/%Y").to_string()).unwrap_or_else(|| "-".into());
                    format!("- {} : {} (échéance {})", s.numero, s.probleme, due)
                })
                .collect();
            AgentResponse::text(format!("{} signalement(s) ouvert(s) :\n{}", top.len(), lines.join("\n")))
                .with_data(json!(top))
        }
        IntentModule::Inconnu => AgentResponse::text(FALLBACK_TEXT),
    };
    Ok(response)
}

async fn kpi_response(backend: &Arc<dyn Backend>) -> Result<AgentResponse, AgentError> {
    let k = backend.global_kpis().await?;
    Ok(AgentResponse::text(format!(
        "**Indicateurs globaux**\n- Projets : {} ({} actifs)\n- Budget total : {}\n- Engagé : {} ({:.1}%)\n\
         - Avancement moyen : {}%\n- Incidents ouverts : {}\n- Signalements ouverts : {}\n- Stock faible : {} article(s)",
        k.total_projets,
        k.projets_actifs,
        format_amount(k.budget_total),
        format_amount(k.engage_total),
        k.taux_consommation_global,
        k.avancement_moyen,
        k.incidents_ouverts,
        k.signalements_ouverts,
        k.articles_stock_faible,
    ))
    .with_data(json!(k)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MemoryBackend, Project, StockItem};

    #[test]
    fn test_detect_module_and_filters() {
        let d = IntentDetector::new();
        let i = d.detect("Quel est le budget du projet 12 ?");
        assert_eq!(i.module, IntentModule::Finances);
        assert_eq!(i.action, IntentAction::Detail);
        assert_eq!(i.filters.get("projet_id").map(String::as_str), Some("12"));

        let i = d.detect("Liste des projets en cours au Burkina");
        assert_eq!(i.module, IntentModule::Projets);
        assert_eq!(i.action, IntentAction::Lister);
        assert_eq!(i.filters.get("statut").map(String::as_str), Some("en cours"));
        assert_eq!(i.filters.get("pays").map(String::as_str), Some("burkina"));

        let i = d.detect("Cherche ciment dans le stock");
        assert_eq!(i.module, IntentModule::Stocks);
        assert_eq!(i.action, IntentAction::Rechercher);
        assert_eq!(i.filters.get("query").map(String::as_str), Some("ciment"));

        assert_eq!(d.detect("Bonjour toi").module, IntentModule::Inconnu);
    }

    #[tokio::test]
    async fn test_execute_stock_query() {
        let backend: Arc<dyn Backend> = Arc::new(MemoryBackend::new().with_stocks(vec![
            StockItem {
                id: "1".into(),
                designation: "Ciment".into(),
                quantite: 5.0,
                seuil_alerte: Some(10.0),
                ..Default::default()
            },
            StockItem {
                id: "2".into(),
                designation: "Fer".into(),
                quantite: 50.0,
                seuil_alerte: Some(10.0),
                ..Default::default()
            },
        ]));
        let intent = IntentDetector::new().detect("état des stocks");
        let resp = execute_query(&backend, &intent).await.unwrap();
        assert!(resp.response.contains("2 article(s)"));
        assert!(resp.response.contains("1 sous le seuil"));
    }

    #[tokio::test]
    async fn test_execute_unknown_project() {
        let backend: Arc<dyn Backend> = Arc::new(MemoryBackend::new().with_projects(vec![Project {
            id: "1".into(),
            nom: "Route".into(),
            ..Default::default()
        }]));
        let intent = IntentDetector::new().detect("détail du projet 9");
        let resp = execute_query(&backend, &intent).await.unwrap();
        assert!(resp.response.contains("introuvable"));
    }
}
