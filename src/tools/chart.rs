//! 图表工具：生成 QuickChart 图片 URL（返回字符串而非原始数据）

use async_trait::async_trait;
use reqwest::Url;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::tools::schema::parameters_schema_for;
use crate::tools::{parse_args, Tool, ToolContext};

const QUICKCHART_URL: &str = "https://quickchart.io/chart";

#[derive(Debug, Deserialize, JsonSchema)]
struct ChartArgs {
    /// bar, line, pie ou doughnut
    chart_type: String,
    title: String,
    labels: Vec<String>,
    values: Vec<f64>,
    /// Légende de la série
    dataset_label: Option<String>,
}

/// generate_chart
pub struct GenerateChartTool;

#[async_trait]
impl Tool for GenerateChartTool {
    fn name(&self) -> &str {
        "generate_chart"
    }

    fn description(&self) -> &str {
        "Génère un graphique (bar, line, pie, doughnut) et retourne l'URL de l'image."
    }

    fn parameters_schema(&self) -> Value {
        parameters_schema_for::<ChartArgs>()
    }

    async fn execute(&self, args: Value, _ctx: &ToolContext) -> Result<Value, String> {
        let args: ChartArgs = parse_args(args)?;
        chart_url(&args).map(Value::String)
    }
}

fn chart_url(args: &ChartArgs) -> Result<String, String> {
    let kind = match args.chart_type.to_lowercase().as_str() {
        k @ ("bar" | "line" | "pie" | "doughnut") => k.to_string(),
        other => return Err(format!("Type de graphique non supporté : {other}")),
    };
    if args.labels.len() != args.values.len() {
        return Err("labels et values doivent avoir la même longueur".into());
    }
    let config = json!({
        "type": kind,
        "data": {
            "labels": args.labels,
            "datasets": [{
                "label": args.dataset_label.clone().unwrap_or_else(|| args.title.clone()),
                "data": args.values,
            }]
        },
        "options": {
            "title": { "display": true, "text": args.title }
        }
    });
    let url = Url::parse_with_params(
        QUICKCHART_URL,
        &[("c", config.to_string()), ("w", "600".into()), ("h", "400".into())],
    )
    .map_err(|e| e.to_string())?;
    Ok(url.to_string())
}
