//! 库存工具

use std::sync::Arc;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use crate::backend::Backend;
use crate::tools::schema::parameters_schema_for;
use crate::tools::{parse_args, Tool, ToolContext};

#[derive(Debug, Deserialize, JsonSchema)]
struct GetStocksArgs {
    /// Ne retourner que les articles sous le seuil d'alerte
    #[serde(default)]
    low_only: bool,
}

/// get_stocks：全部库存，或仅低于告警阈值的物料
pub struct GetStocksTool {
    backend: Arc<dyn Backend>,
}

impl GetStocksTool {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Tool for GetStocksTool {
    fn name(&self) -> &str {
        "get_stocks"
    }

    fn description(&self) -> &str {
        "Liste les articles en stock (désignation, référence, quantité, seuil d'alerte, emplacement)."
    }

    fn parameters_schema(&self) -> Value {
        parameters_schema_for::<GetStocksArgs>()
    }

    async fn execute(&self, args: Value, _ctx: &ToolContext) -> Result<Value, String> {
        let args: GetStocksArgs = parse_args(args)?;
        let mut items = self.backend.list_stocks(None).await.map_err(|e| e.to_string())?;
        if args.low_only {
            items.retain(|i| i.is_low());
        }
        serde_json::to_value(items).map_err(|e| e.to_string())
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
struct SearchStocksArgs {
    /// Texte recherché dans la désignation ou la référence
    query: String,
}

/// search_stocks：按名称或编号搜索物料
pub struct SearchStocksTool {
    backend: Arc<dyn Backend>,
}

impl SearchStocksTool {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl Tool for SearchStocksTool {
    fn name(&self) -> &str {
        "search_stocks"
    }

    fn description(&self) -> &str {
        "Recherche un article de stock par désignation ou référence."
    }

    fn parameters_schema(&self) -> Value {
        parameters_schema_for::<SearchStocksArgs>()
    }

    async fn execute(&self, args: Value, _ctx: &ToolContext) -> Result<Value, String> {
        let args: SearchStocksArgs = parse_args(args)?;
        let items = self
            .backend
            .list_stocks(Some(args.query.trim()))
            .await
            .map_err(|e| e.to_string())?;
        serde_json::to_value(items).map_err(|e| e.to_string())
    }
}
