//! 整改事项工具：Top 20 与创建

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use crate::backend::{new_signalement_numero, parse_due_date, Backend, Signalement};
use crate::tools::schema::parameters_schema_for;
use crate::tools::{parse_args, Tool, ToolContext};

/// Top 20 的默认条数
pub const TOP_SIGNALEMENTS_DEFAULT: usize = 20;

#[derive(Debug, Deserialize, JsonSchema)]
struct TopSignalementsArgs {
    /// Nombre d'éléments (20 par défaut)
    limit: Option<usize>,
}

/// get_top_signalements：最紧急的未结整改事项
pub struct GetTopSignalementsTool {
    backend: Arc<dyn Backend>,
}

impl GetTopSignalementsTool {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Tool for GetTopSignalementsTool {
    fn name(&self) -> &str {
        "get_top_signalements"
    }

    fn description(&self) -> &str {
        "Top des signalements ouverts les plus urgents (échéance la plus proche en premier)."
    }

    fn parameters_schema(&self) -> Value {
        parameters_schema_for::<TopSignalementsArgs>()
    }

    async fn execute(&self, args: Value, _ctx: &ToolContext) -> Result<Value, String> {
        let args: TopSignalementsArgs = parse_args(args)?;
        let limit = args.limit.unwrap_or(TOP_SIGNALEMENTS_DEFAULT);
        let items = self
            .backend
            .top_signalements(limit)
            .await
            .map_err(|e| e.to_string())?;
        serde_json::to_value(items).map_err(|e| e.to_string())
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
struct CreateSignalementArgs {
    pays: Option<String>,
    chantier: Option<String>,
    /// Description du problème constaté
    probleme: String,
    action_corrective: Option<String>,
    section: Option<String>,
    /// Personne responsable
    responsable: Option<String>,
    /// Échéance au format JJ/MM/AAAA
    echeance: Option<String>,
}

/// create_signalement：生成 SIG 编号并写入
pub struct CreateSignalementTool {
    backend: Arc<dyn Backend>,
}

impl CreateSignalementTool {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Tool for CreateSignalementTool {
    fn name(&self) -> &str {
        "create_signalement"
    }

    fn description(&self) -> &str {
        "Crée un signalement (action corrective suivie) et retourne son numéro SIG-AAAA-XXXXXX."
    }

    fn parameters_schema(&self) -> Value {
        parameters_schema_for::<CreateSignalementArgs>()
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<Value, String> {
        let args: CreateSignalementArgs = parse_args(args)?;
        let now = Utc::now();
        let echeance = args
            .echeance
            .as_deref()
            .map(|d| parse_due_date(d).unwrap_or_else(|| now.date_naive()));
        let signalement = Signalement {
            numero: new_signalement_numero(now),
            pays: args.pays,
            chantier: args.chantier,
            probleme: args.probleme,
            action_corrective: args.action_corrective,
            section: args.section,
            responsable: args.responsable,
            echeance,
            statut: Some("ouvert".into()),
            rapports: Vec::new(),
            created_by: ctx.phone_number.clone(),
            created_at: Some(now),
        };
        let created = self
            .backend
            .create_signalement(signalement)
            .await
            .map_err(|e| e.to_string())?;
        serde_json::to_value(created).map_err(|e| e.to_string())
    }
}
