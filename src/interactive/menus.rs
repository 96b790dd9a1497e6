//! 预置菜单：问候、快捷操作、事故类型、项目列表等

use serde_json::Value;

use super::{button_message, list_message, Button, InteractivePayload, ListRow, ListSection};
use crate::backend::Project;

/// 问候消息里唯一按钮的 id
pub const MENU_BUTTON_ID: &str = "menu";

pub const ACTION_MENU_BODY: &str = "Voici les actions rapides disponibles :";
pub const CANCELLED_TEXT: &str = "❌ Opération annulée.";

pub const ACTION_KPIS: &str = "action_kpis";
pub const ACTION_PROJETS: &str = "action_projets";
pub const ACTION_FINANCES: &str = "action_finances";
pub const ACTION_STOCKS: &str = "action_stocks";
pub const ACTION_TOP20: &str = "action_top20";
pub const ACTION_SIGNALER_INCIDENT: &str = "action_signaler_incident";
pub const ACTION_NOUVEAU_SIGNALEMENT: &str = "action_nouveau_signalement";
pub const ACTION_MAJ_SIGNALEMENT: &str = "action_maj_signalement";
pub const ACTION_MEDIA: &str = "action_media";

/// 项目行 id 前缀：`projet_{id}`
pub const PROJECT_ROW_PREFIX: &str = "projet_";
/// 事故类型行 id 前缀：`incident_type_{code}`
pub const INCIDENT_TYPE_ROW_PREFIX: &str = "incident_type_";

/// 事故类型：(代码, 显示名)
pub const INCIDENT_TYPES: [(&str, &str); 5] = [
    ("securite", "🦺 Sécurité"),
    ("qualite", "✅ Qualité"),
    ("environnement", "🌿 Environnement"),
    ("materiel", "🔧 Matériel / Équipement"),
    ("autre", "📌 Autre"),
];

pub const STOCK_ALL: &str = "stock_all";
pub const STOCK_LOW: &str = "stock_low";
pub const STOCK_SEARCH: &str = "stock_search";

pub const FIELD_RAPPORT: &str = "maj_rapport";
pub const FIELD_ECHEANCE: &str = "maj_echeance";
pub const FIELD_PERSONNE: &str = "maj_personne";

pub const SKIP_ID: &str = "passer";

pub fn greeting_text() -> String {
    "👋 Bonjour et bienvenue sur *ASI-TRACK* !\n\nJe peux vous donner les KPIs, l'état des projets, \
     les finances, les stocks, ou enregistrer un incident / signalement.\n\nAppuyez sur *Menu* pour commencer."
        .to_string()
}

pub fn greeting_menu() -> Option<InteractivePayload> {
    button_message(&greeting_text(), vec![Button::new(MENU_BUTTON_ID, "📋 Menu")])
}

pub fn action_menu() -> Option<InteractivePayload> {
    list_message(
        ACTION_MENU_BODY,
        "Voir les actions",
        vec![
            ListSection::new(
                Some("📊 Consulter"),
                vec![
                    ListRow::new(ACTION_KPIS, "📈 KPIs globaux").with_description("Vue d'ensemble du portefeuille"),
                    ListRow::new(ACTION_PROJETS, "🏗️ Projets").with_description("Projets en cours et avancement"),
                    ListRow::new(ACTION_FINANCES, "💰 Finances projet").with_description("Budget, engagé, payé"),
                    ListRow::new(ACTION_STOCKS, "📦 Stocks").with_description("Niveaux de stock et alertes"),
                    ListRow::new(ACTION_TOP20, "🔥 Top 20").with_description("Signalements les plus urgents"),
                ],
            ),
            ListSection::new(
                Some("📝 Déclarer"),
                vec![
                    ListRow::new(ACTION_SIGNALER_INCIDENT, "⚠️ Signaler incident"),
                    ListRow::new(ACTION_NOUVEAU_SIGNALEMENT, "🆕 Nouveau signalement"),
                    ListRow::new(ACTION_MAJ_SIGNALEMENT, "✏️ MAJ signalement"),
                    ListRow::new(ACTION_MEDIA, "📷 Photo / vidéo projet"),
                ],
            ),
        ],
    )
}

pub fn incident_type_menu() -> Option<InteractivePayload> {
    let rows = INCIDENT_TYPES
        .iter()
        .map(|(code, label)| ListRow::new(format!("{INCIDENT_TYPE_ROW_PREFIX}{code}"), *label))
        .collect();
    list_message(
        "⚠️ *Signaler un incident*\n\nQuel type d'incident souhaitez-vous déclarer ?",
        "Type d'incident",
        vec![ListSection::new(Some("Types"), rows)],
    )
}

/// 事故类型文字选择（编号 1-5、行 id 或类型名）→ 类型代码
pub fn parse_incident_type(input: &str) -> Option<&'static str> {
    let normalized = input.trim().to_lowercase();
    let normalized = normalized.strip_prefix(INCIDENT_TYPE_ROW_PREFIX).unwrap_or(&normalized);
    if normalized.is_empty() {
        return None;
    }
    if let Ok(n) = normalized.parse::<usize>() {
        return INCIDENT_TYPES.get(n.checked_sub(1)?).map(|(code, _)| *code);
    }
    INCIDENT_TYPES
        .iter()
        .find(|(code, label)| *code == normalized || label.to_lowercase().contains(normalized))
        .map(|(code, _)| *code)
}

fn project_row(project: &Project) -> ListRow {
    let mut details = Vec::new();
    if let Some(pays) = &project.pays {
        details.push(pays.clone());
    }
    if let Some(statut) = &project.statut {
        details.push(statut.clone());
    }
    if let Some(avancement) = project.avancement {
        details.push(format!("{avancement:.0}%"));
    }
    let row = ListRow::new(format!("{PROJECT_ROW_PREFIX}{}", project.id), project.nom.clone());
    if details.is_empty() {
        row
    } else {
        row.with_description(details.join(" · "))
    }
}

/// 项目选择列表（最多 10 行）
pub fn project_menu(body: &str, projects: &[Project]) -> Option<InteractivePayload> {
    let rows = projects.iter().map(project_row).collect();
    list_message(body, "Choisir un projet", vec![ListSection::new(Some("Projets"), rows)])
}

/// 从行 id（`projet_12`）或原始输入中取出项目 id
pub fn parse_project_selection(input: &str) -> String {
    let trimmed = input.trim();
    trimmed.strip_prefix(PROJECT_ROW_PREFIX).unwrap_or(trimmed).to_string()
}

pub fn stock_menu() -> Option<InteractivePayload> {
    button_message(
        "📦 *Consultation des stocks*\n\nQue souhaitez-vous voir ?",
        vec![
            Button::new(STOCK_ALL, "📦 Tout le stock"),
            Button::new(STOCK_LOW, "⚠️ Stock faible"),
            Button::new(STOCK_SEARCH, "🔍 Rechercher"),
        ],
    )
}

pub fn update_field_menu(numero: &str) -> Option<InteractivePayload> {
    button_message(
        &format!("✏️ Signalement *{numero}*\n\nQue voulez-vous mettre à jour ?"),
        vec![
            Button::new(FIELD_RAPPORT, "📝 Ajouter rapport"),
            Button::new(FIELD_ECHEANCE, "📅 Échéance"),
            Button::new(FIELD_PERSONNE, "👤 Responsable"),
        ],
    )
}

pub fn skip_button(body: &str) -> Option<InteractivePayload> {
    button_message(body, vec![Button::new(SKIP_ID, "⏭️ Passer")])
}

/// 从工具结果快照合成的列表（get_projects / get_incidents），最多 10 行
pub fn snapshot_menu(tool_name: &str, items: &[Value]) -> Option<InteractivePayload> {
    let (body, button, rows): (&str, &str, Vec<ListRow>) = match tool_name {
        "get_projects" => (
            "🏗️ Sélectionnez un projet pour plus de détails :",
            "Voir les projets",
            items
                .iter()
                .filter_map(|v| serde_json::from_value::<Project>(v.clone()).ok())
                .map(|p| project_row(&p))
                .collect(),
        ),
        "get_incidents" => (
            "⚠️ Incidents récents :",
            "Voir les incidents",
            items.iter().filter_map(incident_row).collect(),
        ),
        _ => return None,
    };
    let rows: Vec<ListRow> = rows.into_iter().take(super::MAX_ROWS_PER_SECTION).collect();
    list_message(body, button, vec![ListSection::new(None, rows)])
}

fn incident_row(item: &Value) -> Option<ListRow> {
    let id = match item.get("id")? {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    let kind = item.get("type_incident").and_then(Value::as_str).unwrap_or("incident");
    let row = ListRow::new(format!("incident_{id}"), format!("{kind} #{id}"));
    Some(match item.get("description").and_then(Value::as_str) {
        Some(d) => row.with_description(d),
        None => row,
    })
}
