//! 内存后端（用于测试与本地开发，无需 Supabase）
//!
//! 支持故障注入：fail_writes / fail_reads 打开后对应操作返回 BackendError::Simulated。

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::types::*;
use super::{sort_by_urgency, Backend, BackendError};

#[derive(Debug, Default)]
struct Tables {
    projects: Vec<Project>,
    expenses: Vec<Expense>,
    stocks: Vec<StockItem>,
    incidents: Vec<Incident>,
    equipment: Vec<Equipment>,
    signalements: Vec<Signalement>,
    media: Vec<NewProjectMedia>,
    magic_links: Vec<MagicLinkRecord>,
}

/// 内存后端
#[derive(Debug, Default)]
pub struct MemoryBackend {
    tables: RwLock<Tables>,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_projects(mut self, projects: Vec<Project>) -> Self {
        self.tables.get_mut().projects = projects;
        self
    }

    pub fn with_expenses(mut self, expenses: Vec<Expense>) -> Self {
        self.tables.get_mut().expenses = expenses;
        self
    }

    pub fn with_stocks(mut self, stocks: Vec<StockItem>) -> Self {
        self.tables.get_mut().stocks = stocks;
        self
    }

    pub fn with_incidents(mut self, incidents: Vec<Incident>) -> Self {
        self.tables.get_mut().incidents = incidents;
        self
    }

    pub fn with_equipment(mut self, equipment: Vec<Equipment>) -> Self {
        self.tables.get_mut().equipment = equipment;
        self
    }

    pub fn with_signalements(mut self, signalements: Vec<Signalement>) -> Self {
        self.tables.get_mut().signalements = signalements;
        self
    }

    /// 打开后所有写操作失败
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// 打开后所有读操作失败
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    fn check_read(&self) -> Result<(), BackendError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(BackendError::Simulated("read failure".into()));
        }
        Ok(())
    }

    fn check_write(&self) -> Result<(), BackendError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(BackendError::Simulated("write failure".into()));
        }
        Ok(())
    }

    pub async fn incidents(&self) -> Vec<Incident> {
        self.tables.read().await.incidents.clone()
    }

    pub async fn signalements(&self) -> Vec<Signalement> {
        self.tables.read().await.signalements.clone()
    }

    pub async fn media(&self) -> Vec<NewProjectMedia> {
        self.tables.read().await.media.clone()
    }

    pub async fn magic_links(&self) -> Vec<MagicLinkRecord> {
        self.tables.read().await.magic_links.clone()
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn list_projects(&self, filter: &ProjectFilter) -> Result<Vec<Project>, BackendError> {
        self.check_read()?;
        let t = self.tables.read().await;
        let mut out: Vec<Project> = t
            .projects
            .iter()
            .filter(|p| {
                filter
                    .statut
                    .as_deref()
                    .map_or(true, |s| p.statut.as_deref().is_some_and(|ps| ps.eq_ignore_ascii_case(s)))
            })
            .filter(|p| {
                filter
                    .pays
                    .as_deref()
                    .map_or(true, |s| p.pays.as_deref().is_some_and(|pp| contains_ci(pp, s)))
            })
            .filter(|p| filter.search.as_deref().map_or(true, |s| contains_ci(&p.nom, s)))
            .cloned()
            .collect();
        if let Some(limit) = filter.limit {
            out.truncate(limit);
        }
        Ok(out)
    }

    async fn find_project(&self, id: &str) -> Result<Option<Project>, BackendError> {
        self.check_read()?;
        let t = self.tables.read().await;
        Ok(t.projects.iter().find(|p| p.id == id).cloned())
    }

    async fn project_finances(&self, project_id: &str) -> Result<Option<ProjectFinances>, BackendError> {
        self.check_read()?;
        let t = self.tables.read().await;
        Ok(t
            .projects
            .iter()
            .find(|p| p.id == project_id)
            .map(|p| ProjectFinances::compute(p, &t.expenses)))
    }

    async fn global_kpis(&self) -> Result<GlobalKpis, BackendError> {
        self.check_read()?;
        let t = self.tables.read().await;
        Ok(GlobalKpis::compute(
            &t.projects,
            &t.expenses,
            &t.incidents,
            &t.signalements,
            &t.stocks,
        ))
    }

    async fn list_stocks(&self, query: Option<&str>) -> Result<Vec<StockItem>, BackendError> {
        self.check_read()?;
        let t = self.tables.read().await;
        Ok(t
            .stocks
            .iter()
            .filter(|s| {
                query.map_or(true, |q| {
                    contains_ci(&s.designation, q)
                        || s.reference.as_deref().is_some_and(|r| contains_ci(r, q))
                })
            })
            .cloned()
            .collect())
    }

    async fn list_incidents(&self, filter: &IncidentFilter) -> Result<Vec<Incident>, BackendError> {
        self.check_read()?;
        let t = self.tables.read().await;
        let mut out: Vec<Incident> = t
            .incidents
            .iter()
            .filter(|i| filter.statut.as_deref().map_or(true, |s| i.statut.as_deref() == Some(s)))
            .filter(|i| {
                filter
                    .projet_id
                    .as_deref()
                    .map_or(true, |p| i.projet_id.as_deref() == Some(p))
            })
            .cloned()
            .collect();
        if let Some(limit) = filter.limit {
            out.truncate(limit);
        }
        Ok(out)
    }

    async fn create_incident(&self, incident: NewIncident) -> Result<Incident, BackendError> {
        self.check_write()?;
        let mut t = self.tables.write().await;
        let created = Incident {
            id: format!("INC-{}", t.incidents.len() + 1),
            type_incident: incident.type_incident,
            description: incident.description,
            gravite: incident.gravite,
            statut: Some(incident.statut),
            projet_id: incident.projet_id,
            localisation: incident.localisation,
            photo_url: incident.photo_url,
            signale_par: incident.signale_par,
            created_at: Some(chrono::Utc::now()),
        };
        t.incidents.push(created.clone());
        Ok(created)
    }

    async fn list_equipment(&self, filter: &EquipmentFilter) -> Result<Vec<Equipment>, BackendError> {
        self.check_read()?;
        let t = self.tables.read().await;
        Ok(t
            .equipment
            .iter()
            .filter(|e| filter.statut.as_deref().map_or(true, |s| e.statut.as_deref() == Some(s)))
            .filter(|e| {
                filter
                    .projet_id
                    .as_deref()
                    .map_or(true, |p| e.projet_id.as_deref() == Some(p))
            })
            .cloned()
            .collect())
    }

    async fn create_signalement(&self, signalement: Signalement) -> Result<Signalement, BackendError> {
        self.check_write()?;
        let mut t = self.tables.write().await;
        t.signalements.push(signalement.clone());
        Ok(signalement)
    }

    async fn find_signalement(&self, numero: &str) -> Result<Option<Signalement>, BackendError> {
        self.check_read()?;
        let t = self.tables.read().await;
        Ok(t
            .signalements
            .iter()
            .find(|s| s.numero.eq_ignore_ascii_case(numero))
            .cloned())
    }

    async fn update_signalement(
        &self,
        numero: &str,
        update: SignalementUpdate,
    ) -> Result<Signalement, BackendError> {
        self.check_write()?;
        let mut t = self.tables.write().await;
        let s = t
            .signalements
            .iter_mut()
            .find(|s| s.numero.eq_ignore_ascii_case(numero))
            .ok_or_else(|| BackendError::NotFound(numero.to_string()))?;
        match update {
            SignalementUpdate::AddReport(r) => s.rapports.push(r),
            SignalementUpdate::Echeance(d) => s.echeance = Some(d),
            SignalementUpdate::Responsable(p) => s.responsable = Some(p),
        }
        Ok(s.clone())
    }

    async fn top_signalements(&self, limit: usize) -> Result<Vec<Signalement>, BackendError> {
        self.check_read()?;
        let t = self.tables.read().await;
        let mut open: Vec<Signalement> = t.signalements.iter().filter(|s| s.is_open()).cloned().collect();
        sort_by_urgency(&mut open);
        open.truncate(limit);
        Ok(open)
    }

    async fn attach_media(&self, media: NewProjectMedia) -> Result<(), BackendError> {
        self.check_write()?;
        self.tables.write().await.media.push(media);
        Ok(())
    }

    async fn store_magic_link(&self, link: &MagicLinkRecord) -> Result<(), BackendError> {
        self.check_write()?;
        self.tables.write().await.magic_links.push(link.clone());
        Ok(())
    }
}
