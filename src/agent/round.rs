//! 一轮工具调用：按 LLM 给出的顺序逐个执行，收集结果并构造合成请求
//!
//! 工具失败不会中断本轮：错误以 `{"error": "..."}` 作为该调用的 tool 消息内容回传给 LLM。

use serde_json::{json, Value};

use crate::interactive::{snapshot_menu, InteractivePayload};
use crate::llm::{CompletionRequest, LlmReply};
use crate::magic_link::{needs_external_view, ExternalView, ResultShape, ToolResultRef};
use crate::memory::{Message, ToolCall};
use crate::tools::{ToolContext, ToolExecutor};

/// 单个工具调用的结果
#[derive(Debug, Clone)]
pub struct ToolOutcome {
    pub call: ToolCall,
    pub result: Result<Value, String>,
}

impl ToolOutcome {
    /// 回传给 LLM 的 tool 消息内容
    pub fn content(&self) -> String {
        match &self.result {
            Ok(Value::String(s)) => s.clone(),
            Ok(v) => v.to_string(),
            Err(e) => json!({ "error": e }).to_string(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// 参数为空串时视为 `{}`
fn parse_arguments(raw: &str) -> Result<Value, String> {
    if raw.trim().is_empty() {
        return Ok(json!({}));
    }
    serde_json::from_str(raw).map_err(|e| format!("Invalid tool arguments: {e}"))
}

/// 一轮工具调用的完整记录
#[derive(Debug, Clone)]
pub struct ToolCallRound {
    request_messages: Vec<Message>,
    assistant: Message,
    outcomes: Vec<ToolOutcome>,
}

impl ToolCallRound {
    /// 顺序执行 reply 中的全部工具调用
    pub async fn run(
        executor: &ToolExecutor,
        request_messages: Vec<Message>,
        reply: LlmReply,
        ctx: &ToolContext,
    ) -> Self {
        let mut outcomes = Vec::with_capacity(reply.tool_calls.len());
        for call in &reply.tool_calls {
            let result = match parse_arguments(&call.arguments) {
                Ok(args) => executor
                    .execute(&call.name, args, ctx)
                    .await
                    .map_err(|e| e.to_string()),
                Err(e) => Err(e),
            };
            if let Err(e) = &result {
                tracing::warn!(tool = %call.name, "Tool call failed: {}", e);
            }
            outcomes.push(ToolOutcome {
                call: call.clone(),
                result,
            });
        }
        Self {
            request_messages,
            assistant: Message::assistant_tool_calls(reply.content, reply.tool_calls),
            outcomes,
        }
    }

    /// 原请求 + assistant(tool_calls) + 每个调用一条 tool 消息（同序）
    pub fn synthesis_messages(&self) -> Vec<Message> {
        let mut messages = self.request_messages.clone();
        messages.push(self.assistant.clone());
        messages.extend(
            self.outcomes
                .iter()
                .map(|o| Message::tool(o.call.id.clone(), o.content())),
        );
        messages
    }

    /// 第二次请求：不带工具
    pub fn synthesis_request(&self) -> CompletionRequest {
        CompletionRequest::text_only(self.synthesis_messages())
    }

    pub fn outcomes(&self) -> &[ToolOutcome] {
        &self.outcomes
    }

    pub fn tool_names(&self) -> Vec<&str> {
        self.outcomes.iter().map(|o| o.call.name.as_str()).collect()
    }

    /// 成功的结果（按调用顺序）
    pub fn successful_results(&self) -> Vec<ToolResultRef<'_>> {
        self.outcomes
            .iter()
            .filter_map(|o| {
                o.result.as_ref().ok().map(|data| ToolResultRef {
                    tool_name: o.call.name.as_str(),
                    data,
                })
            })
            .collect()
    }

    /// 第一个满足菜单条件的结果生成的选择列表
    pub fn selection_menu(&self) -> Option<InteractivePayload> {
        self.successful_results().into_iter().find_map(|r| {
            if !needs_external_view(r.tool_name, ResultShape::of(r.data), ExternalView::SelectionMenu) {
                return None;
            }
            r.data
                .as_array()
                .and_then(|items| snapshot_menu(r.tool_name, items))
        })
    }

    /// 响应里附带的数据快照：单个成功结果直接给出，多个时按工具名归档
    pub fn data_snapshot(&self) -> Option<Value> {
        let results = self.successful_results();
        match results.as_slice() {
            [] => None,
            [only] => Some(only.data.clone()),
            many => Some(Value::Object(
                many.iter()
                    .map(|r| (r.tool_name.to_string(), r.data.clone()))
                    .collect(),
            )),
        }
    }
}
