//! 项目列表工具

use std::sync::Arc;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use crate::backend::{Backend, ProjectFilter};
use crate::tools::schema::parameters_schema_for;
use crate::tools::{parse_args, Tool, ToolContext};

#[derive(Debug, Deserialize, JsonSchema)]
struct GetProjectsArgs {
    /// Filtre sur le statut (ex. "en cours", "termine")
    statut: Option<String>,
    /// Filtre sur le pays
    pays: Option<String>,
    /// Recherche dans le nom du projet
    search: Option<String>,
    /// Nombre maximum de projets
    limit: Option<usize>,
}

/// get_projects：按状态 / 国家 / 名称筛选项目
pub struct GetProjectsTool {
    backend: Arc<dyn Backend>,
}

impl GetProjectsTool {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Tool for GetProjectsTool {
    fn name(&self) -> &str {
        "get_projects"
    }

    fn description(&self) -> &str {
        "Liste les projets (nom, pays, statut, avancement, budget, chef de projet) avec filtres optionnels."
    }

    fn parameters_schema(&self) -> Value {
        parameters_schema_for::<GetProjectsArgs>()
    }

    async fn execute(&self, args: Value, _ctx: &ToolContext) -> Result<Value, String> {
        let args: GetProjectsArgs = parse_args(args)?;
        let filter = ProjectFilter {
            statut: args.statut,
            pays: args.pays,
            search: args.search,
            limit: args.limit,
        };
        let projects = self
            .backend
            .list_projects(&filter)
            .await
            .map_err(|e| e.to_string())?;
        serde_json::to_value(projects).map_err(|e| e.to_string())
    }
}
