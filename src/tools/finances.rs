//! 财务工具：单项目财务明细、全局 KPI

use std::sync::Arc;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use crate::backend::Backend;
use crate::tools::schema::parameters_schema_for;
use crate::tools::{parse_args, Tool, ToolContext};

#[derive(Debug, Deserialize, JsonSchema)]
struct ProjectFinancesArgs {
    /// Identifiant du projet
    projet_id: String,
}

/// get_project_finances：预算、已承诺、已支付、按类别支出
pub struct GetProjectFinancesTool {
    backend: Arc<dyn Backend>,
}

impl GetProjectFinancesTool {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Tool for GetProjectFinancesTool {
    fn name(&self) -> &str {
        "get_project_finances"
    }

    fn description(&self) -> &str {
        "Détail financier d'un projet : budget, engagé, payé, reste à engager, taux de consommation, dépenses par catégorie."
    }

    fn parameters_schema(&self) -> Value {
        parameters_schema_for::<ProjectFinancesArgs>()
    }

    async fn execute(&self, args: Value, _ctx: &ToolContext) -> Result<Value, String> {
        let args: ProjectFinancesArgs = parse_args(args)?;
        let finances = self
            .backend
            .project_finances(&args.projet_id)
            .await
            .map_err(|e| e.to_string())?
            .ok_or_else(|| format!("Projet {} introuvable", args.projet_id))?;
        serde_json::to_value(finances).map_err(|e| e.to_string())
    }
}

/// get_global_kpis：全局 KPI 汇总（无参数）
pub struct GetGlobalKpisTool {
    backend: Arc<dyn Backend>,
}

impl GetGlobalKpisTool {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Tool for GetGlobalKpisTool {
    fn name(&self) -> &str {
        "get_global_kpis"
    }

    fn description(&self) -> &str {
        "Indicateurs globaux : nombre de projets, budget total, engagé, taux de consommation, avancement moyen, incidents et signalements ouverts, articles en stock faible."
    }

    async fn execute(&self, _args: Value, _ctx: &ToolContext) -> Result<Value, String> {
        let kpis = self.backend.global_kpis().await.map_err(|e| e.to_string())?;
        serde_json::to_value(kpis).map_err(|e| e.to_string())
    }
}
