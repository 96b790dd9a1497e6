//! WhatsApp Cloud API 集成
//!
//! GET /webhook 完成 Meta 订阅校验；POST /webhook 解析入站消息（文本、按钮 / 列表回复、媒体、位置），
//! 交给 Agent::process_query，再把文本（按 4000 字符分段）和交互载荷发回。
//! 无论处理成败都返回 200，避免 Meta 重投。

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::agent::{Agent, AgentResponse, ChatRequest, MediaAttachment};
use crate::interactive::InteractivePayload;

/// WhatsApp 单条文本上限 4096，留余量
const MAX_TEXT_CHARS: usize = 4000;

/// 出站消息发送接口（Graph API；测试可替换为记录实现）
#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send_text(&self, to: &str, body: &str) -> anyhow::Result<()>;

    async fn send_interactive(&self, to: &str, payload: &InteractivePayload) -> anyhow::Result<()>;
}

/// WhatsApp 服务状态
pub struct WhatsappState {
    pub agent: Arc<Agent>,
    pub sender: Arc<dyn MessageSender>,
    pub verify_token: String,
}

/// Webhook 验证参数
#[derive(Debug, Deserialize)]
pub struct WebhookVerifyQuery {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

/// WhatsApp Webhook 请求体
#[derive(Debug, Deserialize)]
pub struct WebhookPayload {
    pub object: Option<String>,
    pub entry: Option<Vec<WebhookEntry>>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookEntry {
    pub changes: Option<Vec<WebhookChange>>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookChange {
    pub value: Option<WebhookValue>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookValue {
    pub messages: Option<Vec<WebhookMessage>>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookMessage {
    pub from: String,
    #[serde(rename = "type")]
    pub msg_type: Option<String>,
    pub text: Option<WebhookText>,
    pub interactive: Option<WebhookInteractive>,
    pub image: Option<WebhookMedia>,
    pub video: Option<WebhookMedia>,
    pub document: Option<WebhookMedia>,
    pub location: Option<WebhookLocation>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookText {
    pub body: String,
}

#[derive(Debug, Deserialize)]
pub struct WebhookInteractive {
    pub button_reply: Option<WebhookReply>,
    pub list_reply: Option<WebhookReply>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookReply {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct WebhookMedia {
    pub id: String,
    pub mime_type: Option<String>,
    pub caption: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub name: Option<String>,
    pub address: Option<String>,
}

impl WebhookMessage {
    /// 转成与渠道无关的请求；不支持的消息类型返回 None
    pub fn into_request(self) -> Option<ChatRequest> {
        let phone = self.from;
        let request = match self.msg_type.as_deref() {
            Some("text") => ChatRequest::whatsapp(&phone, self.text?.body),
            Some("interactive") => {
                let interactive = self.interactive?;
                let reply = interactive.button_reply.or(interactive.list_reply)?;
                ChatRequest::whatsapp(&phone, reply.id)
            }
            Some("image") | Some("video") | Some("document") => {
                let media = self.image.or(self.video).or(self.document)?;
                let caption = media.caption.clone().unwrap_or_default();
                ChatRequest::whatsapp(&phone, caption).with_media(MediaAttachment {
                    reference: media.id,
                    mime_type: media.mime_type,
                    caption: media.caption,
                })
            }
            Some("location") => {
                let loc = self.location?;
                let label = loc.name.or(loc.address).unwrap_or_else(|| "Position".to_string());
                ChatRequest::whatsapp(&phone, format!("📍 {label} ({:.5}, {:.5})", loc.latitude, loc.longitude))
            }
            other => {
                tracing::debug!(msg_type = ?other, "Ignoring unsupported WhatsApp message");
                return None;
            }
        };
        Some(request)
    }
}

/// 创建 WhatsApp 路由
pub fn create_router(state: Arc<WhatsappState>) -> Router {
    Router::new()
        .route("/webhook", get(webhook_verify).post(webhook_receive))
        .route("/health", get(|| async { "OK" }))
        .with_state(state)
}

/// GET /webhook - Meta 验证 Webhook
async fn webhook_verify(
    State(state): State<Arc<WhatsappState>>,
    Query(query): Query<WebhookVerifyQuery>,
) -> Result<String, StatusCode> {
    if query.mode.as_deref() == Some("subscribe") && query.verify_token.as_deref() == Some(state.verify_token.as_str()) {
        Ok(query.challenge.unwrap_or_default())
    } else {
        Err(StatusCode::FORBIDDEN)
    }
}

/// POST /webhook - 接收 WhatsApp 消息
async fn webhook_receive(
    State(state): State<Arc<WhatsappState>>,
    payload: Result<Json<WebhookPayload>, JsonRejection>,
) -> StatusCode {
    let payload = match payload {
        Ok(Json(payload)) => payload,
        Err(e) => {
            tracing::warn!("Ignoring unreadable webhook payload: {}", e);
            return StatusCode::OK;
        }
    };
    if payload.object.as_deref() != Some("whatsapp_business_account") {
        return StatusCode::OK;
    }

    let messages = payload
        .entry
        .unwrap_or_default()
        .into_iter()
        .flat_map(|e| e.changes.unwrap_or_default())
        .filter_map(|c| c.value)
        .flat_map(|v| v.messages.unwrap_or_default());

    for msg in messages {
        let Some(request) = msg.into_request() else { continue };
        let to = request.phone_number.clone().unwrap_or_default();
        let response = state.agent.process_query(request).await;
        if let Err(e) = deliver(state.sender.as_ref(), &to, &response).await {
            tracing::error!(to = %to, "Failed to send WhatsApp reply: {}", e);
        }
    }

    StatusCode::OK
}

/// 发送回复：有交互载荷时文本作为载荷正文前的说明一并发出
async fn deliver(sender: &dyn MessageSender, to: &str, response: &AgentResponse) -> anyhow::Result<()> {
    match &response.interactive {
        Some(payload) => {
            if !response.response.is_empty() && response.response != payload.body() {
                sender.send_text(to, &response.response).await?;
            }
            sender.send_interactive(to, payload).await
        }
        None => sender.send_text(to, &response.response).await,
    }
}

/// 按字符分段
fn split_text(body: &str) -> Vec<String> {
    if body.chars().count() <= MAX_TEXT_CHARS {
        return vec![body.to_string()];
    }
    body.chars()
        .collect::<Vec<_>>()
        .chunks(MAX_TEXT_CHARS)
        .map(|c| c.iter().collect())
        .collect()
}

/// Graph API 的 interactive 对象
pub fn graph_interactive(payload: &InteractivePayload) -> Value {
    match payload {
        InteractivePayload::Button { body, buttons } => json!({
            "type": "button",
            "body": { "text": body },
            "action": {
                "buttons": buttons
                    .iter()
                    .map(|b| json!({ "type": "reply", "reply": { "id": b.id, "title": b.title } }))
                    .collect::<Vec<_>>()
            }
        }),
        InteractivePayload::List { body, button, sections } => json!({
            "type": "list",
            "body": { "text": body },
            "action": { "button": button, "sections": sections }
        }),
    }
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    messaging_product: &'static str,
    to: String,
    #[serde(rename = "type")]
    msg_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<SendMessageText<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    interactive: Option<Value>,
}

#[derive(Debug, Serialize)]
struct SendMessageText<'a> {
    body: &'a str,
}

/// 通过 WhatsApp Cloud API 发送消息
pub struct GraphApiSender {
    client: reqwest::Client,
    access_token: String,
    url: String,
}

impl GraphApiSender {
    pub fn new(access_token: impl Into<String>, phone_number_id: &str, api_version: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            access_token: access_token.into(),
            url: format!("https://graph.facebook.com/{api_version}/{phone_number_id}/messages"),
        }
    }

    async fn post(&self, req: &SendMessageRequest<'_>) -> anyhow::Result<()> {
        let resp = self
            .client
            .post(&self.url)
            .bearer_auth(&self.access_token)
            .json(req)
            .send()
            .await?;
        if !resp.status().is_success() {
            let text = resp.text().await?;
            anyhow::bail!("WhatsApp API error: {}", text);
        }
        Ok(())
    }
}

#[async_trait]
impl MessageSender for GraphApiSender {
    async fn send_text(&self, to: &str, body: &str) -> anyhow::Result<()> {
        for chunk in split_text(body) {
            self.post(&SendMessageRequest {
                messaging_product: "whatsapp",
                to: to.replace('+', ""),
                msg_type: "text",
                text: Some(SendMessageText { body: &chunk }),
                interactive: None,
            })
            .await?;
        }
        Ok(())
    }

    async fn send_interactive(&self, to: &str, payload: &InteractivePayload) -> anyhow::Result<()> {
        self.post(&SendMessageRequest {
            messaging_product: "whatsapp",
            to: to.replace('+', ""),
            msg_type: "interactive",
            text: None,
            interactive: Some(graph_interactive(payload)),
        })
        .await
    }
}
