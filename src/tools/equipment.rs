//! 设备工具

use std::sync::Arc;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use crate::backend::{Backend, EquipmentFilter};
use crate::tools::schema::parameters_schema_for;
use crate::tools::{parse_args, Tool, ToolContext};

#[derive(Debug, Deserialize, JsonSchema)]
struct GetEquipmentArgs {
    /// Filtre sur le statut (ex. "disponible", "en panne")
    statut: Option<String>,
    projet_id: Option<String>,
}

/// get_equipment
pub struct GetEquipmentTool {
    backend: Arc<dyn Backend>,
}

impl GetEquipmentTool {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Tool for GetEquipmentTool {
    fn name(&self) -> &str {
        "get_equipment"
    }

    fn description(&self) -> &str {
        "Liste les équipements et engins (désignation, catégorie, statut, projet d'affectation)."
    }

    fn parameters_schema(&self) -> Value {
        parameters_schema_for::<GetEquipmentArgs>()
    }

    async fn execute(&self, args: Value, _ctx: &ToolContext) -> Result<Value, String> {
        let args: GetEquipmentArgs = parse_args(args)?;
        let filter = EquipmentFilter {
            statut: args.statut,
            projet_id: args.projet_id,
        };
        let items = self
            .backend
            .list_equipment(&filter)
            .await
            .map_err(|e| e.to_string())?;
        serde_json::to_value(items).map_err(|e| e.to_string())
    }
}
