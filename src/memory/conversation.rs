//! 短期记忆：对话历史
//!
//! 持久化的历史只保留最近 N 条 user/assistant 消息（默认 10 条）；
//! 工具调用往返（assistant tool_calls + tool 结果）只存在于单次请求的内存中，从不写入会话。

use serde::{Deserialize, Serialize};

/// 持久化历史默认保留条数
pub const DEFAULT_MAX_HISTORY: usize = 10;

/// 消息角色（与 LLM API 一致）
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
    Tool,
}

/// LLM 请求的一次工具调用（arguments 为原始 JSON 字符串）
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: String,
}

/// 单条消息
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    /// 仅 assistant 消息：本轮请求的工具调用
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// 仅 tool 消息：对应的 tool_call_id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    fn plain(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::plain(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::plain(Role::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::plain(Role::System, content)
    }

    /// 带工具调用的 assistant 消息（content 可为空）
    pub fn assistant_tool_calls(content: Option<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.unwrap_or_default(),
            tool_calls,
            tool_call_id: None,
        }
    }

    pub fn tool(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: Some(tool_call_id.into()),
        }
    }

    /// 可以进入持久化历史的消息（user / assistant 纯文本）
    pub fn is_persistable(&self) -> bool {
        matches!(self.role, Role::User | Role::Assistant) && self.tool_calls.is_empty()
    }
}

/// 持久化对话历史：只接收 user/assistant，超出上限时丢弃最旧的消息
#[derive(Clone, Debug)]
pub struct ConversationHistory {
    messages: Vec<Message>,
    max_messages: usize,
}

impl ConversationHistory {
    pub fn new(max_messages: usize) -> Self {
        Self {
            messages: Vec::new(),
            max_messages,
        }
    }

    /// 从已有消息构建（过滤掉 system/tool 及带 tool_calls 的消息，并裁剪）
    pub fn from_messages(messages: impl IntoIterator<Item = Message>, max_messages: usize) -> Self {
        let mut history = Self::new(max_messages);
        for m in messages {
            history.push(m);
        }
        history
    }

    pub fn push(&mut self, msg: Message) {
        if !msg.is_persistable() {
            return;
        }
        self.messages.push(msg);
        self.prune();
    }

    /// 追加一轮对话（用户原文 + 最终回复）
    pub fn push_turn(&mut self, user: impl Into<String>, assistant: impl Into<String>) {
        self.push(Message::user(user));
        self.push(Message::assistant(assistant));
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }

    fn prune(&mut self) {
        if self.messages.len() > self.max_messages {
            let excess = self.messages.len() - self.max_messages;
            self.messages.drain(..excess);
        }
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl Default for ConversationHistory {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_HISTORY)
    }
}
