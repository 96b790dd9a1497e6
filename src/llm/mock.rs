//! Mock LLM 客户端（用于测试与本地开发，无需 API）
//!
//! - MockLlmClient：回显最后一条 User 消息，从不请求工具
//! - ScriptedLlmClient：按顺序返回预置回复，并记录每次请求，便于断言编排循环发出的消息序列

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::{CompletionRequest, LlmClient, LlmError, LlmReply};
use crate::memory::Role;

/// Mock 客户端：回显用户最后一条消息
#[derive(Debug, Default)]
pub struct MockLlmClient;

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn chat_complete(&self, request: CompletionRequest) -> Result<LlmReply, LlmError> {
        let last_user = request
            .messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or("(no input)");

        Ok(LlmReply::text(format!("Echo from Mock: {}", last_user)))
    }
}

/// 脚本化客户端：依次弹出预置回复；脚本耗尽时返回 EmptyResponse
#[derive(Debug, Default)]
pub struct ScriptedLlmClient {
    replies: Mutex<VecDeque<Result<LlmReply, LlmError>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedLlmClient {
    pub fn new(replies: impl IntoIterator<Item = LlmReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().map(Ok).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// 追加一条失败回复
    pub fn push_error(&self, err: LlmError) {
        if let Ok(mut q) = self.replies.lock() {
            q.push_back(Err(err));
        }
    }

    /// 已收到的全部请求（按调用顺序）
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlmClient {
    async fn chat_complete(&self, request: CompletionRequest) -> Result<LlmReply, LlmError> {
        if let Ok(mut r) = self.requests.lock() {
            r.push(request);
        }
        self.replies
            .lock()
            .ok()
            .and_then(|mut q| q.pop_front())
            .unwrap_or(Err(LlmError::EmptyResponse))
    }
}
