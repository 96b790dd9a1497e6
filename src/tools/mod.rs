//! 工具层：Tool trait、注册表、执行器，以及 ASI-TRACK 业务工具

pub mod chart;
pub mod equipment;
pub mod executor;
pub mod finances;
pub mod incidents;
pub mod projects;
pub mod registry;
pub mod schema;
pub mod signalements;
pub mod stocks;

use std::sync::Arc;

use crate::backend::Backend;

pub use chart::GenerateChartTool;
pub use equipment::GetEquipmentTool;
pub use executor::ToolExecutor;
pub use finances::{GetGlobalKpisTool, GetProjectFinancesTool};
pub use incidents::{CreateIncidentTool, GetIncidentsTool};
pub use projects::GetProjectsTool;
pub use registry::{parse_args, Tool, ToolContext, ToolRegistry};
pub use schema::parameters_schema_for;
pub use signalements::{CreateSignalementTool, GetTopSignalementsTool};
pub use stocks::{GetStocksTool, SearchStocksTool};

/// 注册全部业务工具
pub fn business_registry(backend: Arc<dyn Backend>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(GetProjectsTool::new(backend.clone()));
    registry.register(GetProjectFinancesTool::new(backend.clone()));
    registry.register(GetGlobalKpisTool::new(backend.clone()));
    registry.register(GetStocksTool::new(backend.clone()));
    registry.register(SearchStocksTool::new(backend.clone()));
    registry.register(GetIncidentsTool::new(backend.clone()));
    registry.register(GetEquipmentTool::new(backend.clone()));
    registry.register(GetTopSignalementsTool::new(backend.clone()));
    registry.register(CreateIncidentTool::new(backend.clone()));
    registry.register(CreateSignalementTool::new(backend));
    registry.register(GenerateChartTool);
    registry
}
