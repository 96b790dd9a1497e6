//! Web 聊天 API
//!
//! POST /api/chat `{message, history}` → 与渠道无关的响应 JSON；GET /health。
//! Web 渠道没有手机号，不走会话状态机。

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::{get, post}, Json, Router};
use serde::Deserialize;

use crate::agent::{Agent, AgentResponse, ChatRequest};
use crate::memory::Message;

#[derive(Debug, Deserialize)]
pub struct WebChatRequest {
    pub message: String,
    #[serde(default)]
    pub history: Vec<Message>,
}

pub fn create_router(agent: Arc<Agent>) -> Router {
    Router::new()
        .route("/api/chat", post(api_chat))
        .route("/health", get(|| async { "OK" }))
        .with_state(agent)
}

async fn api_chat(
    State(agent): State<Arc<Agent>>,
    Json(req): Json<WebChatRequest>,
) -> Result<Json<AgentResponse>, (StatusCode, String)> {
    let message = req.message.trim();
    if message.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "message is required".to_string()));
    }
    let response = agent.process_query(ChatRequest::web(message, req.history)).await;
    Ok(Json(response))
}
