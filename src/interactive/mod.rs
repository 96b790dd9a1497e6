//! 交互消息构建器（WhatsApp 按钮 / 列表）
//!
//! 纯函数、确定性：超出平台限制的输入被静默截断，并通过 `warn!` 报告，从不报错。
//! - 按钮：1–3 个，标题 ≤ 20 字符
//! - 列表：1–10 个分区，每区 1–10 行；行标题 ≤ 24，行描述 ≤ 72，列表按钮文字 ≤ 20

pub mod menus;

use serde::{Deserialize, Serialize};

pub use menus::*;

pub const MAX_BUTTONS: usize = 3;
pub const BUTTON_TITLE_MAX: usize = 20;
pub const MAX_SECTIONS: usize = 10;
pub const MAX_ROWS_PER_SECTION: usize = 10;
pub const ROW_TITLE_MAX: usize = 24;
pub const ROW_DESCRIPTION_MAX: usize = 72;
pub const LIST_BUTTON_MAX: usize = 20;
pub const SECTION_TITLE_MAX: usize = 24;
pub const BODY_MAX: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    pub id: String,
    pub title: String,
}

impl Button {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListRow {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ListRow {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub rows: Vec<ListRow>,
}

impl ListSection {
    pub fn new(title: Option<&str>, rows: Vec<ListRow>) -> Self {
        Self {
            title: title.map(str::to_string),
            rows,
        }
    }
}

/// 交互消息载荷：按钮或列表（按响应现建，从不持久化）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum InteractivePayload {
    Button {
        body: String,
        buttons: Vec<Button>,
    },
    List {
        body: String,
        button: String,
        sections: Vec<ListSection>,
    },
}

impl InteractivePayload {
    pub fn body(&self) -> &str {
        match self {
            InteractivePayload::Button { body, .. } | InteractivePayload::List { body, .. } => body,
        }
    }

    /// 所有可选项的 id（按钮 id 或列表行 id），按显示顺序
    pub fn option_ids(&self) -> Vec<&str> {
        match self {
            InteractivePayload::Button { buttons, .. } => buttons.iter().map(|b| b.id.as_str()).collect(),
            InteractivePayload::List { sections, .. } => sections
                .iter()
                .flat_map(|s| s.rows.iter().map(|r| r.id.as_str()))
                .collect(),
        }
    }
}

/// 按字符截断（不按字节，避免切断多字节字符）
fn truncate(field: &str, value: &str, max: usize) -> String {
    if value.chars().count() <= max {
        return value.to_string();
    }
    tracing::warn!(field, max, value, "Interactive field truncated");
    value.chars().take(max).collect()
}

/// 构建按钮消息；没有任何按钮时返回 None
pub fn button_message(body: &str, buttons: Vec<Button>) -> Option<InteractivePayload> {
    if buttons.is_empty() {
        tracing::warn!("Button message without buttons dropped");
        return None;
    }
    if buttons.len() > MAX_BUTTONS {
        tracing::warn!(count = buttons.len(), max = MAX_BUTTONS, "Too many buttons, extra dropped");
    }
    let buttons = buttons
        .into_iter()
        .take(MAX_BUTTONS)
        .map(|b| Button {
            title: truncate("button.title", &b.title, BUTTON_TITLE_MAX),
            id: b.id,
        })
        .collect();
    Some(InteractivePayload::Button {
        body: truncate("body", body, BODY_MAX),
        buttons,
    })
}

/// 构建列表消息；空分区被丢弃，没有任何行时返回 None
pub fn list_message(body: &str, button: &str, sections: Vec<ListSection>) -> Option<InteractivePayload> {
    let non_empty: Vec<ListSection> = sections.into_iter().filter(|s| !s.rows.is_empty()).collect();
    if non_empty.is_empty() {
        tracing::warn!("List message without rows dropped");
        return None;
    }
    if non_empty.len() > MAX_SECTIONS {
        tracing::warn!(count = non_empty.len(), max = MAX_SECTIONS, "Too many sections, extra dropped");
    }
    let sections = non_empty
        .into_iter()
        .take(MAX_SECTIONS)
        .map(|section| {
            if section.rows.len() > MAX_ROWS_PER_SECTION {
                tracing::warn!(
                    count = section.rows.len(),
                    max = MAX_ROWS_PER_SECTION,
                    "Too many rows in section, extra dropped"
                );
            }
            ListSection {
                title: section
                    .title
                    .as_deref()
                    .map(|t| truncate("section.title", t, SECTION_TITLE_MAX)),
                rows: section
                    .rows
                    .into_iter()
                    .take(MAX_ROWS_PER_SECTION)
                    .map(|row| ListRow {
                        title: truncate("row.title", &row.title, ROW_TITLE_MAX),
                        description: row
                            .description
                            .as_deref()
                            .map(|d| truncate("row.description", d, ROW_DESCRIPTION_MAX)),
                        id: row.id,
                    })
                    .collect(),
            }
        })
        .collect();
    Some(InteractivePayload::List {
        body: truncate("body", body, BODY_MAX),
        button: truncate("list.button", button, LIST_BUTTON_MAX),
        sections,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_within_limits(payload: &InteractivePayload) {
        match payload {
            InteractivePayload::Button { buttons, .. } => {
                assert!((1..=MAX_BUTTONS).contains(&buttons.len()));
                assert!(buttons.iter().all(|b| b.title.chars().count() <= BUTTON_TITLE_MAX));
            }
            InteractivePayload::List { button, sections, .. } => {
                assert!(button.chars().count() <= LIST_BUTTON_MAX);
                assert!((1..=MAX_SECTIONS).contains(&sections.len()));
                for s in sections {
                    assert!((1..=MAX_ROWS_PER_SECTION).contains(&s.rows.len()));
                    for r in &s.rows {
                        assert!(r.title.chars().count() <= ROW_TITLE_MAX);
                        assert!(r.description.as_deref().map_or(0, |d| d.chars().count()) <= ROW_DESCRIPTION_MAX);
                    }
                }
            }
        }
    }

    #[test]
    fn test_oversized_buttons_are_truncated() {
        let buttons = (0..7)
            .map(|i| Button::new(format!("b{i}"), "Un titre de bouton beaucoup trop long"))
            .collect();
        let payload = button_message("Choisissez", buttons).unwrap();
        assert_within_limits(&payload);
        assert_eq!(payload.option_ids(), vec!["b0", "b1", "b2"]);
    }

    #[test]
    fn test_oversized_list_is_truncated() {
        let sections = (0..14)
            .map(|s| {
                ListSection::new(
                    Some("Une section au titre très long"),
                    (0..25)
                        .map(|r| {
                            ListRow::new(format!("r{s}-{r}"), "é".repeat(60)).with_description("x".repeat(300))
                        })
                        .collect(),
                )
            })
            .collect();
        let payload = list_message("Liste", "Un libellé de bouton trop long", sections).unwrap();
        assert_within_limits(&payload);
        assert_eq!(payload.option_ids().len(), 100);
    }

    #[test]
    fn test_builder_is_deterministic() {
        let make = || {
            list_message(
                "Projets",
                "Voir",
                vec![ListSection::new(None, vec![ListRow::new("projet_1", "Route nationale numéro 1 Ouaga")])],
            )
        };
        assert_eq!(make(), make());
    }

    #[test]
    fn test_empty_inputs_yield_none() {
        assert!(button_message("x", vec![]).is_none());
        assert!(list_message("x", "y", vec![ListSection::new(Some("vide"), vec![])]).is_none());
    }

    #[test]
    fn test_payload_serialization_tag() {
        let payload = button_message("Salut", vec![Button::new("menu", "Menu")]).unwrap();
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["type"], "button");
        assert_eq!(json["buttons"][0]["id"], "menu");
    }
}
