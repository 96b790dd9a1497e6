//! Supabase 后端：通过 PostgREST 读写业务表
//!
//! 认证使用 service key（`apikey` 头 + Bearer）；写操作带 `Prefer: return=representation` 以拿回插入行。
//! KPI 在客户端聚合。

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;

use super::types::*;
use super::{sort_by_urgency, Backend, BackendError};

/// Supabase PostgREST 客户端
#[derive(Clone)]
pub struct SupabaseBackend {
    client: Client,
    rest_url: String,
    service_key: String,
}

impl SupabaseBackend {
    pub fn new(supabase_url: &str, service_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            rest_url: format!("{}/rest/v1", supabase_url.trim_end_matches('/')),
            service_key: service_key.into(),
        }
    }

    /// 从环境变量 SUPABASE_SERVICE_KEY 读取密钥
    pub fn from_env(supabase_url: &str) -> Option<Self> {
        std::env::var("SUPABASE_SERVICE_KEY")
            .ok()
            .filter(|k| !k.is_empty())
            .map(|k| Self::new(supabase_url, k))
    }

    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
    }

    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, BackendError> {
        let url = format!("{}/{}", self.rest_url, table);
        let resp = self
            .authed(self.client.get(&url))
            .query(query)
            .send()
            .await?;
        decode(resp).await
    }

    async fn insert<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        table: &str,
        body: &B,
    ) -> Result<Vec<T>, BackendError> {
        let url = format!("{}/{}", self.rest_url, table);
        let resp = self
            .authed(self.client.post(&url))
            .header("Prefer", "return=representation")
            .json(body)
            .send()
            .await?;
        decode(resp).await
    }

    async fn insert_ignore<B: Serialize + ?Sized>(&self, table: &str, body: &B) -> Result<(), BackendError> {
        let url = format!("{}/{}", self.rest_url, table);
        let resp = self.authed(self.client.post(&url)).json(body).send().await?;
        check_status(resp).await.map(|_| ())
    }

    async fn patch<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
        body: &B,
    ) -> Result<Vec<T>, BackendError> {
        let url = format!("{}/{}", self.rest_url, table);
        let resp = self
            .authed(self.client.patch(&url))
            .header("Prefer", "return=representation")
            .query(query)
            .json(body)
            .send()
            .await?;
        decode(resp).await
    }

    async fn all_expenses(&self) -> Result<Vec<Expense>, BackendError> {
        self.select("depenses", &[("select", "projet_id,categorie,montant,statut".into())])
            .await
    }
}

async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, BackendError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(BackendError::Status {
        status: status.as_u16(),
        body,
    })
}

async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<Vec<T>, BackendError> {
    let resp = check_status(resp).await?;
    let text = resp.text().await?;
    serde_json::from_str(&text).map_err(|e| BackendError::Decode(e.to_string()))
}

fn eq(v: &str) -> String {
    format!("eq.{v}")
}

/// LIKE 字面量：`%` `_` `\` 转义，去掉 PostgREST 的 `*` 通配符
fn like_literal(v: &str) -> String {
    let mut out = String::with_capacity(v.len());
    for c in v.chars() {
        match c {
            '*' => {}
            '%' | '_' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

fn ilike(v: &str) -> String {
    format!("ilike.*{}*", like_literal(v))
}

/// `or=(...)` 内的值用双引号包住，避免 `,().:` 被当作语法
fn quoted(v: &str) -> String {
    format!("\"{}\"", v.replace('\\', "\\\\").replace('"', "\\\""))
}

fn stock_search_filter(term: &str) -> String {
    let pattern = quoted(&format!("*{}*", like_literal(term)));
    format!("(designation.ilike.{pattern},reference.ilike.{pattern})")
}

fn numero_filter(numero: &str) -> String {
    eq(&numero.trim().to_uppercase())
}

#[async_trait]
impl Backend for SupabaseBackend {
    async fn list_projects(&self, filter: &ProjectFilter) -> Result<Vec<Project>, BackendError> {
        let mut q = vec![("select", "*".to_string()), ("order", "nom.asc".to_string())];
        if let Some(s) = &filter.statut {
            q.push(("statut", eq(s)));
        }
        if let Some(p) = &filter.pays {
            q.push(("pays", ilike(p)));
        }
        if let Some(s) = &filter.search {
            q.push(("nom", ilike(s)));
        }
        if let Some(l) = filter.limit {
            q.push(("limit", l.to_string()));
        }
        self.select("projets", &q).await
    }

    async fn find_project(&self, id: &str) -> Result<Option<Project>, BackendError> {
        let rows: Vec<Project> = self
            .select("projets", &[("select", "*".into()), ("id", eq(id)), ("limit", "1".into())])
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn project_finances(&self, project_id: &str) -> Result<Option<ProjectFinances>, BackendError> {
        let Some(project) = self.find_project(project_id).await? else {
            return Ok(None);
        };
        let expenses: Vec<Expense> = self
            .select(
                "depenses",
                &[
                    ("select", "projet_id,categorie,montant,statut".into()),
                    ("projet_id", eq(project_id)),
                ],
            )
            .await?;
        Ok(Some(ProjectFinances::compute(&project, &expenses)))
    }

    async fn global_kpis(&self) -> Result<GlobalKpis, BackendError> {
        let projects = self.list_projects(&ProjectFilter::default()).await?;
        let expenses = self.all_expenses().await?;
        let incidents = self.list_incidents(&IncidentFilter::default()).await?;
        let signalements: Vec<Signalement> = self.select("signalements", &[("select", "*".into())]).await?;
        let stocks = self.list_stocks(None).await?;
        Ok(GlobalKpis::compute(&projects, &expenses, &incidents, &signalements, &stocks))
    }

    async fn list_stocks(&self, query: Option<&str>) -> Result<Vec<StockItem>, BackendError> {
        let mut q = vec![("select", "*".to_string()), ("order", "designation.asc".to_string())];
        if let Some(term) = query {
            q.push(("or", stock_search_filter(term)));
        }
        self.select("stocks", &q).await
    }

    async fn list_incidents(&self, filter: &IncidentFilter) -> Result<Vec<Incident>, BackendError> {
        let mut q = vec![("select", "*".to_string()), ("order", "created_at.desc".to_string())];
        if let Some(s) = &filter.statut {
            q.push(("statut", eq(s)));
        }
        if let Some(p) = &filter.projet_id {
            q.push(("projet_id", eq(p)));
        }
        if let Some(l) = filter.limit {
            q.push(("limit", l.to_string()));
        }
        self.select("incidents", &q).await
    }

    async fn create_incident(&self, incident: NewIncident) -> Result<Incident, BackendError> {
        let rows: Vec<Incident> = self.insert("incidents", &incident).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| BackendError::Decode("insert returned no row".into()))
    }

    async fn list_equipment(&self, filter: &EquipmentFilter) -> Result<Vec<Equipment>, BackendError> {
        let mut q = vec![("select", "*".to_string())];
        if let Some(s) = &filter.statut {
            q.push(("statut", eq(s)));
        }
        if let Some(p) = &filter.projet_id {
            q.push(("projet_id", eq(p)));
        }
        self.select("equipements", &q).await
    }

    async fn create_signalement(&self, signalement: Signalement) -> Result<Signalement, BackendError> {
        let rows: Vec<Signalement> = self.insert("signalements", &signalement).await?;
        Ok(rows.into_iter().next().unwrap_or(signalement))
    }

    async fn find_signalement(&self, numero: &str) -> Result<Option<Signalement>, BackendError> {
        let rows: Vec<Signalement> = self
            .select(
                "signalements",
                &[("select", "*".into()), ("numero", numero_filter(numero)), ("limit", "1".into())],
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn update_signalement(
        &self,
        numero: &str,
        update: SignalementUpdate,
    ) -> Result<Signalement, BackendError> {
        let current = self
            .find_signalement(numero)
            .await?
            .ok_or_else(|| BackendError::NotFound(numero.to_string()))?;
        let body = match update {
            SignalementUpdate::AddReport(r) => {
                let mut rapports = current.rapports.clone();
                rapports.push(r);
                json!({ "rapports": rapports })
            }
            SignalementUpdate::Echeance(d) => json!({ "echeance": d }),
            SignalementUpdate::Responsable(p) => json!({ "responsable": p }),
        };
        let rows: Vec<Signalement> = self
            .patch("signalements", &[("numero", eq(&current.numero))], &body)
            .await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| BackendError::NotFound(numero.to_string()))
    }

    async fn top_signalements(&self, limit: usize) -> Result<Vec<Signalement>, BackendError> {
        let rows: Vec<Signalement> = self
            .select(
                "signalements",
                &[
                    ("select", "*".into()),
                    ("statut", "not.in.(clos,resolu,termine)".into()),
                    ("order", "echeance.asc.nullslast".into()),
                ],
            )
            .await?;
        let mut open: Vec<Signalement> = rows.into_iter().filter(|s| s.is_open()).collect();
        sort_by_urgency(&mut open);
        open.truncate(limit);
        Ok(open)
    }

    async fn attach_media(&self, media: NewProjectMedia) -> Result<(), BackendError> {
        self.insert_ignore("projet_medias", &media).await
    }

    async fn store_magic_link(&self, link: &MagicLinkRecord) -> Result<(), BackendError> {
        self.insert_ignore("magic_links", link).await
    }
}
