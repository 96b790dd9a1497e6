//! 会话状态机：WhatsApp 消息先看会话状态，再决定是否交给编排循环
//!
//! 优先级：工作流中的取消 → 当前状态的步骤处理 → 特殊令牌 / 菜单动作 → 问候 / 菜单关键词 →
//! 工作流入口命令 → 编排循环。Web 渠道（无手机号）跳过会话逻辑。

use crate::core::AgentError;
use crate::interactive::{self, ACTION_MENU_BODY, CANCELLED_TEXT};
use crate::session::SessionTxn;

use super::command::{parse_idle, parse_in_workflow, InboundCommand};
use super::intent::{execute_query, IntentDetector};
use super::types::{AgentResponse, ChatRequest};
use super::workflows::{self, StepInput};
use super::Agent;

const EMPTY_MESSAGE_TEXT: &str = "🤔 Je n'ai pas reçu de texte. Choisissez une action :";

impl Agent {
    /// 统一入口：永不返回错误
    pub async fn process_query(&self, request: ChatRequest) -> AgentResponse {
        let phone = request
            .phone_number
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty());
        let Some(phone) = phone else {
            return self.process_web(&request).await;
        };

        let mut txn = self.sessions.begin(phone).await;
        let response = match self.dispatch(&mut txn, &request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(phone, state = %txn.state(), "Request failed: {}", e);
                txn.clear();
                AgentResponse::failure(&e)
            }
        };
        if let Err(e) = txn.commit().await {
            tracing::error!(phone, "Session commit failed: {}", e);
        }
        response
    }

    async fn process_web(&self, request: &ChatRequest) -> AgentResponse {
        let result = if self.settings.ai_enabled {
            self.orchestrate(&request.message, None, &request.history).await
        } else {
            let intent = IntentDetector::new().detect(&request.message);
            execute_query(&self.backend, &intent).await
        };
        result.unwrap_or_else(|e| {
            tracing::error!("Web request failed: {}", e);
            AgentResponse::failure(&e)
        })
    }

    async fn dispatch(&self, txn: &mut SessionTxn, request: &ChatRequest) -> Result<AgentResponse, AgentError> {
        if txn.state().is_in_workflow() {
            if parse_in_workflow(&request.message) == InboundCommand::Cancel {
                tracing::info!(phone = txn.phone(), state = %txn.state(), "Workflow cancelled");
                txn.clear();
                return Ok(AgentResponse::text(CANCELLED_TEXT)
                    .with_interactive(interactive::action_menu())
                    .with_action("cancelled"));
            }
            let input = StepInput::new(&request.message, request.media.as_ref());
            if let Some(response) = workflows::handle_step(self, txn, &input).await? {
                return Ok(response);
            }
        }

        if request.message.trim().is_empty() {
            return Ok(AgentResponse::text(EMPTY_MESSAGE_TEXT).with_interactive(interactive::action_menu()));
        }

        match parse_idle(&request.message) {
            InboundCommand::MenuToken { id, forward } => {
                tracing::debug!(phone = txn.phone(), id = %id, "Menu token");
                self.orchestrate(&forward, Some(&mut *txn), &[]).await
            }
            InboundCommand::Greeting => {
                txn.clear();
                Ok(AgentResponse::text(interactive::greeting_text()).with_interactive(interactive::greeting_menu()))
            }
            InboundCommand::MainMenu => {
                txn.clear();
                Ok(AgentResponse::text(ACTION_MENU_BODY)
                    .with_interactive(interactive::action_menu())
                    .with_action("show_menu"))
            }
            InboundCommand::Start(kind) => workflows::start(self, kind, txn).await,
            InboundCommand::FreeText(text) => self.orchestrate(&text, Some(&mut *txn), &request.history).await,
            // 空闲时不会解析出 Cancel
            InboundCommand::Cancel => Ok(AgentResponse::text(ACTION_MENU_BODY).with_interactive(interactive::action_menu())),
        }
    }
}
