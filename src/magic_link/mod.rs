//! 魔法链接：何时把结果交给完整网页视图
//!
//! `needs_external_view` 是唯一的规模/相关性判定，链接生成与列表菜单合成共用：
//! - 魔法链接：数组 ≥ 5 项，或对象 > 10 个键，或工具属于「总是给链接」名单（财务明细类）
//! - 选择菜单：get_projects / get_incidents 返回 > 3 项

pub mod generator;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub use generator::{BackendMagicLinkGenerator, MagicLink, MagicLinkGenerator, MagicLinkRequest};

/// 链接默认有效期（小时）
pub const DEFAULT_EXPIRY_HOURS: i64 = 48;

/// 无论结果大小都给链接的工具
pub const ALWAYS_LINK_TOOLS: [&str; 2] = ["get_project_finances", "get_global_kpis"];

/// 可合成选择菜单的工具
pub const MENU_TOOLS: [&str; 2] = ["get_projects", "get_incidents"];

const LINK_MIN_ITEMS: usize = 5;
const LINK_MAX_KEYS: usize = 10;
const MENU_MIN_ITEMS: usize = 3;

/// 工具结果的形状
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultShape {
    Array(usize),
    Object(usize),
    Scalar,
}

impl ResultShape {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Array(items) => ResultShape::Array(items.len()),
            Value::Object(map) => ResultShape::Object(map.len()),
            Value::String(s) => match serde_json::from_str::<Value>(s) {
                Ok(inner @ (Value::Array(_) | Value::Object(_))) => ResultShape::of(&inner),
                _ => ResultShape::Scalar,
            },
            _ => ResultShape::Scalar,
        }
    }
}

/// 外部视图种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternalView {
    MagicLink,
    SelectionMenu,
}

/// 结果是否需要外部视图（链接或选择菜单）
pub fn needs_external_view(tool_name: &str, shape: ResultShape, view: ExternalView) -> bool {
    match view {
        ExternalView::MagicLink => {
            ALWAYS_LINK_TOOLS.contains(&tool_name)
                || match shape {
                    ResultShape::Array(n) => n >= LINK_MIN_ITEMS,
                    ResultShape::Object(keys) => keys > LINK_MAX_KEYS,
                    ResultShape::Scalar => false,
                }
        }
        ExternalView::SelectionMenu => {
            MENU_TOOLS.contains(&tool_name) && matches!(shape, ResultShape::Array(n) if n > MENU_MIN_ITEMS)
        }
    }
}

/// 链接指向的资源类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Finances,
    Stocks,
    Projets,
    Custom,
}

impl ResourceType {
    pub fn for_tool(tool_name: &str) -> Self {
        match tool_name {
            "get_project_finances" | "get_global_kpis" => ResourceType::Finances,
            "get_stocks" | "search_stocks" => ResourceType::Stocks,
            "get_projects" => ResourceType::Projets,
            _ => ResourceType::Custom,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Finances => "finances",
            ResourceType::Stocks => "stocks",
            ResourceType::Projets => "projets",
            ResourceType::Custom => "custom",
        }
    }
}

/// 一次成功的工具调用结果（按调用顺序）
#[derive(Debug, Clone, Copy)]
pub struct ToolResultRef<'a> {
    pub tool_name: &'a str,
    pub data: &'a Value,
}

/// 根据本轮工具调用决定是否申请链接
///
/// `invoked` 是全部调用的工具名（含失败的），名单判定和资源类型（取第一个工具）看它；
/// 规模判定和元数据快照只看成功结果。快照优先取名单内工具，否则取第一个超过规模阈值的工具。
pub fn plan_magic_link(
    invoked: &[&str],
    results: &[ToolResultRef<'_>],
    phone_number: Option<&str>,
) -> Option<MagicLinkRequest> {
    let first = invoked.first()?;
    let allowlisted = invoked.iter().find(|name| ALWAYS_LINK_TOOLS.contains(*name));
    let qualifying: Vec<&ToolResultRef<'_>> = results
        .iter()
        .filter(|r| needs_external_view(r.tool_name, ResultShape::of(r.data), ExternalView::MagicLink))
        .collect();
    let prioritized = qualifying
        .iter()
        .find(|r| ALWAYS_LINK_TOOLS.contains(&r.tool_name))
        .or_else(|| qualifying.first());
    if allowlisted.is_none() && prioritized.is_none() {
        return None;
    }

    let resource_id = prioritized
        .and_then(|r| r.data.get("projet_id"))
        .and_then(Value::as_str)
        .map(str::to_string);
    let metadata = match (prioritized, allowlisted) {
        (Some(r), _) => json!({ "tool": r.tool_name, "data": r.data }),
        (None, Some(name)) => json!({ "tool": name, "data": Value::Null }),
        (None, None) => return None,
    };

    Some(MagicLinkRequest {
        resource_type: ResourceType::for_tool(first),
        resource_id,
        phone_number: phone_number.map(str::to_string),
        expiry_hours: None,
        metadata: Some(metadata),
    })
}

/// 附在回复末尾的链接说明
pub fn link_footer(url: &str, hours: i64) -> String {
    format!("\n\n🔗 Voir le détail complet : {url}\n⏳ Lien valable {hours}h")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn array(n: usize) -> Value {
        Value::Array((0..n).map(|i| json!({ "id": i })).collect())
    }

    #[test]
    fn test_link_gate_array_threshold() {
        let four = ResultShape::of(&array(4));
        let five = ResultShape::of(&array(5));
        assert!(!needs_external_view("get_stocks", four, ExternalView::MagicLink));
        assert!(needs_external_view("get_stocks", five, ExternalView::MagicLink));
    }

    #[test]
    fn test_link_gate_object_keys_and_allowlist() {
        let mut big = serde_json::Map::new();
        for i in 0..11 {
            big.insert(format!("k{i}"), json!(i));
        }
        assert!(needs_external_view("custom", ResultShape::of(&Value::Object(big)), ExternalView::MagicLink));
        assert!(!needs_external_view("custom", ResultShape::Object(10), ExternalView::MagicLink));
        assert!(needs_external_view(
            "get_project_finances",
            ResultShape::of(&json!({"budget": 1})),
            ExternalView::MagicLink
        ));
    }

    #[test]
    fn test_menu_gate() {
        assert!(!needs_external_view("get_projects", ResultShape::Array(3), ExternalView::SelectionMenu));
        assert!(needs_external_view("get_incidents", ResultShape::Array(4), ExternalView::SelectionMenu));
        assert!(!needs_external_view("get_stocks", ResultShape::Array(40), ExternalView::SelectionMenu));
    }

    #[test]
    fn test_shape_of_json_string() {
        assert_eq!(ResultShape::of(&json!("[1,2,3]")), ResultShape::Array(3));
        assert_eq!(ResultShape::of(&json!("https://quickchart.io/chart?c=x")), ResultShape::Scalar);
    }

    #[test]
    fn test_plan_prefers_allowlisted_snapshot() {
        let stocks = array(6);
        let finances = json!({"projet_id": "12", "budget": 10.0});
        let results = [
            ToolResultRef { tool_name: "get_stocks", data: &stocks },
            ToolResultRef { tool_name: "get_project_finances", data: &finances },
        ];
        let req = plan_magic_link(&["get_stocks", "get_project_finances"], &results, Some("+226")).unwrap();
        assert_eq!(req.resource_type, ResourceType::Stocks);
        assert_eq!(req.resource_id.as_deref(), Some("12"));
        assert_eq!(req.metadata.unwrap()["tool"], "get_project_finances");
    }

    #[test]
    fn test_plan_none_for_small_results() {
        let small = array(2);
        let results = [ToolResultRef { tool_name: "get_projects", data: &small }];
        assert!(plan_magic_link(&["get_projects"], &results, Some("+226")).is_none());
        assert!(plan_magic_link(&[], &[], None).is_none());
    }

    #[test]
    fn test_plan_failed_allowlisted_tool_still_links() {
        let stocks = array(2);
        let results = [ToolResultRef { tool_name: "get_stocks", data: &stocks }];
        let req = plan_magic_link(&["get_project_finances", "get_stocks"], &results, None).unwrap();
        assert_eq!(req.resource_type, ResourceType::Finances);
        assert_eq!(req.resource_id, None);
        let metadata = req.metadata.unwrap();
        assert_eq!(metadata["tool"], "get_project_finances");
        assert!(metadata["data"].is_null());
    }

    #[test]
    fn test_plan_resource_type_from_failed_first_tool() {
        let projects = array(7);
        let results = [ToolResultRef { tool_name: "get_projects", data: &projects }];
        let req = plan_magic_link(&["get_stocks", "get_projects"], &results, None).unwrap();
        assert_eq!(req.resource_type, ResourceType::Stocks);
        assert_eq!(req.metadata.unwrap()["tool"], "get_projects");
    }
}
