//! 入站消息解析：在任何分发之前把文本转成封闭的命令集合
//!
//! 工作流进行中只区分「取消」与「自由文本」；空闲时依次识别特殊令牌 / 菜单动作 id、
//! 问候或菜单关键词、工作流入口命令，其余都是自由文本。

use super::shortcuts::{is_special_token, menu_action_message};
use super::workflows::WorkflowKind;

/// 取消关键词（不区分大小写的子串匹配）
pub const CANCEL_KEYWORDS: [&str; 6] = ["annuler", "cancel", "menu", "retour", "stop", "quitter"];

const GREETING_KEYWORDS: [&str; 6] = ["bonjour", "salut", "hello", "hi", "bonsoir", "coucou"];
const MENU_KEYWORDS: [&str; 4] = ["menu", "aide", "help", "accueil"];

/// 工作流入口命令（已去重音、小写）
const ENTRY_COMMANDS: [(&str, WorkflowKind); 8] = [
    ("nouveau signalement", WorkflowKind::Signalement),
    ("mettre a jour signalement", WorkflowKind::SignalementUpdate),
    ("maj signalement", WorkflowKind::SignalementUpdate),
    ("consulter stock", WorkflowKind::Stock),
    ("verifier stock", WorkflowKind::Stock),
    ("signaler incident", WorkflowKind::Incident),
    ("finances projet", WorkflowKind::Finances),
    ("ajouter media", WorkflowKind::Media),
];

/// 解析后的入站命令
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundCommand {
    /// 工作流中的取消
    Cancel,
    /// 特殊令牌或菜单动作 id；`forward` 为转交编排循环的消息
    MenuToken { id: String, forward: String },
    Greeting,
    MainMenu,
    Start(WorkflowKind),
    FreeText(String),
}

/// 小写、去重音、去首尾标点、合并空白
pub fn normalize(message: &str) -> String {
    let folded: String = message
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'à' | 'â' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'î' | 'ï' => 'i',
            'ô' | 'ö' => 'o',
            'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            c => c,
        })
        .collect();
    folded
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_matches(|c: char| c.is_ascii_punctuation())
        .trim()
        .to_string()
}

fn words(normalized: &str) -> impl Iterator<Item = &str> {
    normalized
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
}

/// 消息是否包含取消关键词（子串匹配，可能误伤含这些片段的长词）
pub fn is_cancellation(message: &str) -> bool {
    let lower = message.to_lowercase();
    CANCEL_KEYWORDS.iter().any(|k| lower.contains(k))
}

fn contains_word(normalized: &str, keywords: &[&str]) -> bool {
    words(normalized).any(|w| keywords.contains(&w))
}

/// 整条消息就是一个问候词（编排短路表使用）
pub fn is_bare_greeting(message: &str) -> bool {
    let n = normalize(message);
    GREETING_KEYWORDS.contains(&n.as_str())
}

/// 工作流进行中的解析
pub fn parse_in_workflow(message: &str) -> InboundCommand {
    if is_cancellation(message) {
        InboundCommand::Cancel
    } else {
        InboundCommand::FreeText(message.to_string())
    }
}

/// 空闲状态下的解析
pub fn parse_idle(message: &str) -> InboundCommand {
    let trimmed = message.trim();
    if is_special_token(trimmed) {
        return InboundCommand::MenuToken {
            id: trimmed.to_string(),
            forward: trimmed.to_string(),
        };
    }
    if let Some(forward) = menu_action_message(trimmed) {
        return InboundCommand::MenuToken {
            id: trimmed.to_string(),
            forward,
        };
    }

    let normalized = normalize(trimmed);
    if contains_word(&normalized, &GREETING_KEYWORDS) {
        return InboundCommand::Greeting;
    }
    if contains_word(&normalized, &MENU_KEYWORDS) {
        return InboundCommand::MainMenu;
    }
    if let Some((_, kind)) = ENTRY_COMMANDS.iter().find(|(cmd, _)| normalized == *cmd) {
        return InboundCommand::Start(*kind);
    }
    InboundCommand::FreeText(message.to_string())
}
