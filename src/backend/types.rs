//! 业务数据类型（与 Supabase 表字段一一对应）

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// 兼容数字与字符串主键
fn id_string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    match Value::deserialize(d)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!("invalid id: {other}"))),
    }
}

fn opt_id_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    match Option::<Value>::deserialize(d)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!("invalid id: {other}"))),
    }
}

/// 项目（projets）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Project {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub nom: String,
    #[serde(default)]
    pub pays: Option<String>,
    #[serde(default)]
    pub statut: Option<String>,
    /// 进度百分比 0-100
    #[serde(default)]
    pub avancement: Option<f64>,
    #[serde(default)]
    pub budget: Option<f64>,
    #[serde(default)]
    pub chef_projet: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ProjectFilter {
    pub statut: Option<String>,
    pub pays: Option<String>,
    /// 按名称模糊搜索
    pub search: Option<String>,
    pub limit: Option<usize>,
}

/// 支出行（depenses）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Expense {
    #[serde(deserialize_with = "id_string")]
    pub projet_id: String,
    pub categorie: String,
    pub montant: f64,
    /// engage | paye
    #[serde(default)]
    pub statut: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CategoryTotal {
    pub categorie: String,
    pub montant: f64,
}

/// 单项目财务明细
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProjectFinances {
    pub projet_id: String,
    pub projet: String,
    pub budget: f64,
    pub engage: f64,
    pub paye: f64,
    pub reste_a_engager: f64,
    /// 已承诺 / 预算，百分比
    pub taux_consommation: f64,
    pub depenses_par_categorie: Vec<CategoryTotal>,
}

impl ProjectFinances {
    pub fn compute(project: &Project, expenses: &[Expense]) -> Self {
        let budget = project.budget.unwrap_or(0.0);
        let mut engage = 0.0;
        let mut paye = 0.0;
        let mut per_category: Vec<CategoryTotal> = Vec::new();
        for e in expenses.iter().filter(|e| e.projet_id == project.id) {
            engage += e.montant;
            if e.statut.as_deref() == Some("paye") {
                paye += e.montant;
            }
            match per_category.iter_mut().find(|c| c.categorie == e.categorie) {
                Some(c) => c.montant += e.montant,
                None => per_category.push(CategoryTotal {
                    categorie: e.categorie.clone(),
                    montant: e.montant,
                }),
            }
        }
        per_category.sort_by(|a, b| b.montant.total_cmp(&a.montant));
        Self {
            projet_id: project.id.clone(),
            projet: project.nom.clone(),
            budget,
            engage,
            paye,
            reste_a_engager: budget - engage,
            taux_consommation: percent(engage, budget),
            depenses_par_categorie: per_category,
        }
    }
}

fn percent(part: f64, total: f64) -> f64 {
    if total <= 0.0 {
        0.0
    } else {
        ((part / total) * 1000.0).round() / 10.0
    }
}

/// 全局 KPI
#[derive(Debug, Clone, Serialize, PartialEq, Default)]
pub struct GlobalKpis {
    pub total_projets: usize,
    pub projets_actifs: usize,
    pub budget_total: f64,
    pub engage_total: f64,
    pub taux_consommation_global: f64,
    pub avancement_moyen: f64,
    pub incidents_ouverts: usize,
    pub signalements_ouverts: usize,
    pub articles_stock_faible: usize,
}

impl GlobalKpis {
    pub fn compute(
        projects: &[Project],
        expenses: &[Expense],
        incidents: &[Incident],
        signalements: &[Signalement],
        stocks: &[StockItem],
    ) -> Self {
        let budget_total: f64 = projects.iter().filter_map(|p| p.budget).sum();
        let engage_total: f64 = expenses.iter().map(|e| e.montant).sum();
        let progress: Vec<f64> = projects.iter().filter_map(|p| p.avancement).collect();
        let avancement_moyen = if progress.is_empty() {
            0.0
        } else {
            (progress.iter().sum::<f64>() / progress.len() as f64 * 10.0).round() / 10.0
        };
        Self {
            total_projets: projects.len(),
            projets_actifs: projects
                .iter()
                .filter(|p| p.statut.as_deref().map(is_active_status).unwrap_or(false))
                .count(),
            budget_total,
            engage_total,
            taux_consommation_global: percent(engage_total, budget_total),
            avancement_moyen,
            incidents_ouverts: incidents.iter().filter(|i| i.is_open()).count(),
            signalements_ouverts: signalements.iter().filter(|s| s.is_open()).count(),
            articles_stock_faible: stocks.iter().filter(|s| s.is_low()).count(),
        }
    }
}

fn is_active_status(statut: &str) -> bool {
    matches!(statut.to_lowercase().as_str(), "en cours" | "en_cours" | "actif" | "active")
}

/// 库存物料（stocks）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct StockItem {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub designation: String,
    #[serde(default)]
    pub reference: Option<String>,
    pub quantite: f64,
    #[serde(default)]
    pub seuil_alerte: Option<f64>,
    #[serde(default)]
    pub unite: Option<String>,
    #[serde(default)]
    pub emplacement: Option<String>,
}

impl StockItem {
    /// 数量低于等于告警阈值
    pub fn is_low(&self) -> bool {
        self.seuil_alerte.map(|s| self.quantite <= s).unwrap_or(false)
    }
}

/// 事故（incidents）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Incident {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub type_incident: String,
    pub description: String,
    #[serde(default)]
    pub gravite: Option<String>,
    #[serde(default)]
    pub statut: Option<String>,
    #[serde(default, deserialize_with = "opt_id_string")]
    pub projet_id: Option<String>,
    #[serde(default)]
    pub localisation: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub signale_par: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Incident {
    pub fn is_open(&self) -> bool {
        !matches!(self.statut.as_deref(), Some("resolu") | Some("clos") | Some("ferme"))
    }
}

#[derive(Debug, Clone, Default)]
pub struct IncidentFilter {
    pub statut: Option<String>,
    pub projet_id: Option<String>,
    pub limit: Option<usize>,
}

/// 新建事故
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NewIncident {
    pub type_incident: String,
    pub description: String,
    pub gravite: Option<String>,
    pub statut: String,
    pub projet_id: Option<String>,
    pub localisation: Option<String>,
    pub photo_url: Option<String>,
    pub signale_par: Option<String>,
}

/// 设备（equipements）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Equipment {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub designation: String,
    #[serde(default)]
    pub categorie: Option<String>,
    #[serde(default)]
    pub statut: Option<String>,
    #[serde(default, deserialize_with = "opt_id_string")]
    pub projet_id: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct EquipmentFilter {
    pub statut: Option<String>,
    pub projet_id: Option<String>,
}

/// 整改事项（signalements）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Signalement {
    /// 对外编号，如 SIG-2026-4F3A9C
    pub numero: String,
    #[serde(default)]
    pub pays: Option<String>,
    #[serde(default)]
    pub chantier: Option<String>,
    pub probleme: String,
    #[serde(default)]
    pub action_corrective: Option<String>,
    #[serde(default)]
    pub section: Option<String>,
    #[serde(default)]
    pub responsable: Option<String>,
    #[serde(default)]
    pub echeance: Option<NaiveDate>,
    #[serde(default)]
    pub statut: Option<String>,
    #[serde(default)]
    pub rapports: Vec<String>,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Signalement {
    pub fn is_open(&self) -> bool {
        !matches!(self.statut.as_deref(), Some("clos") | Some("resolu") | Some("termine"))
    }
}

/// 生成整改事项编号：SIG-<年份>-<6 位十六进制>
pub fn new_signalement_numero(now: DateTime<Utc>) -> String {
    let hex = uuid::Uuid::new_v4().simple().to_string();
    format!("SIG-{}-{}", now.format("%Y"), hex[..6].to_uppercase())
}

/// 解析截止日期：JJ/MM/AAAA、AAAA-MM-JJ、JJ-MM-AAAA；无法识别时返回 None（由调用方回退到当天）
pub fn parse_due_date(input: &str) -> Option<NaiveDate> {
    let input = input.trim();
    ["%d/%m/%Y", "%Y-%m-%d", "%d-%m-%Y"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(input, fmt).ok())
}

/// 对 signalement 的单项更新
#[derive(Debug, Clone, PartialEq)]
pub enum SignalementUpdate {
    AddReport(String),
    Echeance(NaiveDate),
    Responsable(String),
}

/// 项目媒体（projet_medias）
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NewProjectMedia {
    pub projet_id: String,
    pub media_ref: String,
    pub mime_type: Option<String>,
    pub caption: Option<String>,
    pub uploaded_by: Option<String>,
}

/// 魔法链接记录（magic_links）
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MagicLinkRecord {
    pub token: String,
    pub resource_type: String,
    pub resource_id: Option<String>,
    pub phone_number: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub metadata: Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_ids_are_accepted() {
        let p: Project = serde_json::from_str(r#"{"id": 12, "nom": "Route Ouaga"}"#).unwrap();
        assert_eq!(p.id, "12");
        let i: Incident = serde_json::from_str(
            r#"{"id": "a1", "type_incident": "securite", "description": "chute", "projet_id": 3}"#,
        )
        .unwrap();
        assert_eq!(i.projet_id.as_deref(), Some("3"));
    }

    #[test]
    fn test_project_finances_compute() {
        let project = Project {
            id: "1".into(),
            nom: "Pont".into(),
            budget: Some(1000.0),
            ..Default::default()
        };
        let expenses = vec![
            Expense { projet_id: "1".into(), categorie: "materiaux".into(), montant: 300.0, statut: Some("paye".into()) },
            Expense { projet_id: "1".into(), categorie: "main_oeuvre".into(), montant: 450.0, statut: None },
            Expense { projet_id: "2".into(), categorie: "materiaux".into(), montant: 999.0, statut: None },
        ];
        let f = ProjectFinances::compute(&project, &expenses);
        assert_eq!(f.engage, 750.0);
        assert_eq!(f.paye, 300.0);
        assert_eq!(f.reste_a_engager, 250.0);
        assert_eq!(f.taux_consommation, 75.0);
        assert_eq!(f.depenses_par_categorie[0].categorie, "main_oeuvre");
    }

    #[test]
    fn test_low_stock() {
        let item = StockItem {
            quantite: 5.0,
            seuil_alerte: Some(10.0),
            ..Default::default()
        };
        assert!(item.is_low());
        assert!(!StockItem { quantite: 5.0, ..Default::default() }.is_low());
    }

    #[test]
    fn test_parse_due_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2026, 3, 15);
        assert_eq!(parse_due_date("15/03/2026"), expected);
        assert_eq!(parse_due_date("2026-03-15"), expected);
        assert_eq!(parse_due_date(" 15-03-2026 "), expected);
        assert_eq!(parse_due_date("demain"), None);
        assert_eq!(parse_due_date("31/02/2026"), None);
    }

    #[test]
    fn test_signalement_numero_format() {
        let now = DateTime::parse_from_rfc3339("2026-05-01T10:00:00Z").unwrap().with_timezone(&Utc);
        let numero = new_signalement_numero(now);
        let re = regex::Regex::new(r"^SIG-2026-[0-9A-F]{6}$").unwrap();
        assert!(re.is_match(&numero), "{numero}");
    }
}
