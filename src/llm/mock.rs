//! Mock LLM 客户端（用于测试，无需 API）
//!
//! 按入队顺序回放预设回复：结构化结果、对话回合或错误；同时记录每次请求的消息，便于断言 prompt 内容。
//! 队列耗尽后：结构化模式返回 None，对话模式返回不带工具调用的空回合（结束对话）。

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::llm::{AssistantTurn, LlmClient, LlmError, Message, OutputSchema, ToolSpec};

/// 预设回复
#[derive(Debug, Clone)]
pub enum MockReply {
    Structured(Option<Value>),
    Turn(AssistantTurn),
    Error(LlmError),
}

/// 一次被记录的请求
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub messages: Vec<Message>,
    /// 结构化请求的 schema 名称
    pub schema: Option<String>,
    /// 对话请求中声明的工具名
    pub tools: Vec<String>,
}

/// Mock 客户端：脚本化回放
#[derive(Debug, Default)]
pub struct MockLlmClient {
    replies: Mutex<VecDeque<MockReply>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_structured(self, value: Option<Value>) -> Self {
        self.push(MockReply::Structured(value))
    }

    pub fn push_turn(self, turn: AssistantTurn) -> Self {
        self.push(MockReply::Turn(turn))
    }

    pub fn push_error(self, err: LlmError) -> Self {
        self.push(MockReply::Error(err))
    }

    fn push(self, reply: MockReply) -> Self {
        if let Ok(mut q) = self.replies.lock() {
            q.push_back(reply);
        }
        self
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }

    /// 尚未被消费的预设回复数
    pub fn remaining(&self) -> usize {
        self.replies.lock().map(|q| q.len()).unwrap_or(0)
    }

    fn record(&self, request: RecordedRequest) -> Option<MockReply> {
        if let Ok(mut r) = self.requests.lock() {
            r.push(request);
        }
        self.replies.lock().ok().and_then(|mut q| q.pop_front())
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete_structured(
        &self,
        messages: &[Message],
        schema: &OutputSchema,
    ) -> Result<Option<Value>, LlmError> {
        let reply = self.record(RecordedRequest {
            messages: messages.to_vec(),
            schema: Some(schema.name.clone()),
            tools: Vec::new(),
        });
        match reply {
            Some(MockReply::Structured(v)) => Ok(v),
            Some(MockReply::Error(e)) => Err(e),
            Some(MockReply::Turn(_)) => Err(LlmError::InvalidResponse(
                "mock: expected structured reply, got dialogue turn".to_string(),
            )),
            None => Ok(None),
        }
    }

    async fn chat(
        &self,
        messages: &[Message],
        tools: &[ToolSpec],
    ) -> Result<AssistantTurn, LlmError> {
        let reply = self.record(RecordedRequest {
            messages: messages.to_vec(),
            schema: None,
            tools: tools.iter().map(|t| t.name.clone()).collect(),
        });
        match reply {
            Some(MockReply::Turn(t)) => Ok(t),
            Some(MockReply::Error(e)) => Err(e),
            Some(MockReply::Structured(_)) => Err(LlmError::InvalidResponse(
                "mock: expected dialogue turn, got structured reply".to_string(),
            )),
            None => Ok(AssistantTurn::default()),
        }
    }
}
