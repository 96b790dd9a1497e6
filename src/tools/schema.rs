//! 工具参数 JSON Schema 生成：schemars 从参数结构体派生

use schemars::{schema_for, JsonSchema};
use serde_json::Value;

/// 生成函数调用用的参数 schema（去掉 `$schema` / `title` 等顶层元信息）
pub fn parameters_schema_for<T: JsonSchema>() -> Value {
    let schema = schema_for!(T);
    let mut value = serde_json::to_value(&schema).unwrap_or_else(|_| serde_json::json!({"type": "object"}));
    if let Value::Object(map) = &mut value {
        map.remove("$schema");
        map.remove("title");
        map.entry("properties").or_insert_with(|| serde_json::json!({}));
    }
    value
}
