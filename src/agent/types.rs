//! 对话入口的请求 / 响应类型（与渠道无关）

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::AgentError;
use crate::interactive::InteractivePayload;
use crate::memory::Message;

/// 所有顶层错误统一返回的致歉文本
pub const APOLOGY_TEXT: &str =
    "😔 Désolé, une erreur est survenue lors du traitement de votre demande. Veuillez réessayer dans un instant.";

/// 入站消息附带的媒体（WhatsApp media id 或 URL）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaAttachment {
    pub reference: String,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
}

/// 一次对话请求
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub history: Vec<Message>,
    /// WhatsApp 渠道的手机号；Web 渠道为空
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub media: Option<MediaAttachment>,
}

impl ChatRequest {
    pub fn whatsapp(phone: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            phone_number: Some(phone.into()),
            ..Default::default()
        }
    }

    pub fn web(message: impl Into<String>, history: Vec<Message>) -> Self {
        Self {
            message: message.into(),
            history,
            ..Default::default()
        }
    }

    pub fn with_media(mut self, media: MediaAttachment) -> Self {
        self.media = Some(media);
        self
    }
}

/// 对话响应：文本 + 可选数据 / 动作 / 交互载荷 / 错误
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AgentResponse {
    pub response: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interactive: Option<InteractivePayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AgentResponse {
    pub fn text(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            ..Default::default()
        }
    }

    pub fn with_interactive(mut self, interactive: Option<InteractivePayload>) -> Self {
        self.interactive = interactive;
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// 顶层失败：固定致歉文本 + 原始错误
    pub fn failure(err: &AgentError) -> Self {
        Self::text(APOLOGY_TEXT).with_error(err.to_string())
    }
}
