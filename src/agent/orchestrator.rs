//! LLM 工具调用编排：短路表 → 渠道提示词 → 第一次调用（带工具）→ 工具轮 → 第二次调用（合成）
//!
//! 仅在有手机号时生成魔法链接并持久化对话历史。顶层入口不返回错误。

use serde_json::Value;

use crate::core::AgentError;
use crate::llm::{CompletionRequest, LlmError};
use crate::magic_link::{link_footer, plan_magic_link};
use crate::memory::{ConversationHistory, Message};
use crate::session::{SessionData, SessionError, SessionTxn, WorkflowState, HISTORY_KEY};
use crate::tools::ToolContext;

use super::round::ToolCallRound;
use super::shortcuts::{self, Shortcut};
use super::types::AgentResponse;
use super::{workflows, Agent};

const WHATSAPP_ONLY_TEXT: &str = "📱 Cette action est disponible uniquement sur WhatsApp.";

impl Agent {
    /// 编排入口：有手机号时自行开启会话事务；任何错误都转成致歉回复
    pub async fn process_query_with_ai(
        &self,
        message: &str,
        phone_number: Option<&str>,
        external_history: &[Message],
    ) -> AgentResponse {
        let result = match phone_number {
            Some(phone) => {
                let mut txn = self.sessions.begin(phone).await;
                let result = self.orchestrate(message, Some(&mut txn), external_history).await;
                if let Err(e) = txn.commit().await {
                    tracing::error!(phone, "Session commit failed: {}", e);
                }
                result
            }
            None => self.orchestrate(message, None, external_history).await,
        };
        result.unwrap_or_else(|e| {
            tracing::error!("Orchestration failed: {}", e);
            AgentResponse::failure(&e)
        })
    }

    /// 编排主体；txn 为 None 表示 Web 渠道
    pub(crate) async fn orchestrate(
        &self,
        message: &str,
        mut txn: Option<&mut SessionTxn>,
        external_history: &[Message],
    ) -> Result<AgentResponse, AgentError> {
        let prompt = match shortcuts::resolve(message) {
            Shortcut::Canned(response) => return Ok(response),
            Shortcut::StartWorkflow(kind) => {
                return match txn {
                    Some(txn) => workflows::start(self, kind, txn).await,
                    None => Ok(AgentResponse::text(WHATSAPP_ONLY_TEXT)),
                };
            }
            Shortcut::Rewrite(prompt) => prompt,
            Shortcut::PassThrough => message.to_string(),
        };

        let phone = txn.as_deref().map(|t| t.phone().to_string());
        let prior = if !external_history.is_empty() {
            external_history.to_vec()
        } else {
            txn.as_deref().map(|t| t.session().history()).unwrap_or_default()
        };
        let history = ConversationHistory::from_messages(prior, self.settings.max_history);

        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(Message::system(self.prompts.for_channel(phone.is_some())));
        messages.extend(history.messages().iter().cloned());
        messages.push(Message::user(prompt));

        let first = self
            .llm
            .chat_complete(CompletionRequest::with_tools(messages.clone(), self.tools.declarations()))
            .await?;

        let (text, round) = if first.wants_tools() {
            let ctx = ToolContext::new(phone.as_deref());
            let round = ToolCallRound::run(&self.tools, messages, first, &ctx).await;
            tracing::debug!(tools = ?round.tool_names(), "Tool round finished");
            let second = self.llm.chat_complete(round.synthesis_request()).await?;
            (second.content, Some(round))
        } else {
            (first.content, None)
        };
        let mut text = text
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or(AgentError::Llm(LlmError::EmptyResponse))?;

        let mut interactive = None;
        let mut data: Option<Value> = None;
        if let Some(round) = &round {
            if let Some(phone) = phone.as_deref() {
                let invoked = round.tool_names();
                if let Some(request) = plan_magic_link(&invoked, &round.successful_results(), Some(phone)) {
                    match self.magic_links.generate(request).await {
                        Ok(link) => text.push_str(&link_footer(&link.url, link.hours_valid())),
                        Err(e) => tracing::warn!(phone, "Magic link generation failed: {}", e),
                    }
                }
            }
            interactive = round.selection_menu();
            data = round.data_snapshot();
        }

        if let Some(txn) = txn.as_deref_mut() {
            let mut history = history;
            history.push_turn(message, text.as_str());
            let mut session_data = SessionData::new();
            session_data.insert(HISTORY_KEY.to_string(), serde_json::to_value(history.messages()).map_err(SessionError::from)?);
            txn.update(WorkflowState::Idle, session_data);
        }

        let mut response = AgentResponse::text(text).with_interactive(interactive);
        response.data = data;
        Ok(response)
    }
}
