//! LLM 客户端抽象
//!
//! 所有后端实现 LlmClient：complete_structured（按 Schema 返回结构化结果，可能为空）与
//! chat（带工具声明的对话回合）。RetryingLlmClient 为任意客户端叠加指数退避重试。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::llm::{AssistantTurn, Message, ToolSpec};

/// LLM 调用错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LlmError {
    #[error("Rate limited (retry after {retry_after_ms} ms)")]
    RateLimited { retry_after_ms: u64 },

    #[error("Request timed out")]
    Timeout,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Missing API key: set {0}")]
    MissingApiKey(String),

    #[error("LLM config error: {0}")]
    Config(String),
}

impl LlmError {
    /// 限流、超时、网络错误可重试；其余直接返回
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            LlmError::RateLimited { .. } | LlmError::Timeout | LlmError::Transport(_)
        )
    }
}

/// 结构化输出约束：名称 + JSON Schema
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSchema {
    pub name: String,
    pub description: String,
    pub schema: Value,
}

/// LLM 客户端 trait
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// 结构化模式：返回符合 schema 的 JSON；模型未给出结果时返回 Ok(None)
    async fn complete_structured(
        &self,
        messages: &[Message],
        schema: &OutputSchema,
    ) -> Result<Option<Value>, LlmError>;

    /// 对话模式：单个回合，模型可返回文本或若干工具调用
    async fn chat(&self, messages: &[Message], tools: &[ToolSpec])
        -> Result<AssistantTurn, LlmError>;

    /// 获取累计 token 使用统计：(prompt_tokens, completion_tokens, total_tokens)
    fn token_usage(&self) -> (u64, u64, u64) {
        (0, 0, 0)
    }
}

/// 重试参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay_ms: 500,
        }
    }
}

impl RetryConfig {
    /// 第 attempt 次重试前的等待：base * 2^attempt；限流时取服务端建议值与其较大者
    fn delay_for(&self, attempt: u32, err: &LlmError) -> Duration {
        let backoff = self.base_delay_ms.saturating_mul(1u64 << attempt.min(16));
        let ms = match err {
            LlmError::RateLimited { retry_after_ms } => backoff.max(*retry_after_ms),
            _ => backoff,
        };
        Duration::from_millis(ms)
    }
}

/// 带重试的客户端包装
pub struct RetryingLlmClient {
    inner: Arc<dyn LlmClient>,
    config: RetryConfig,
}

impl RetryingLlmClient {
    pub fn new(inner: Arc<dyn LlmClient>, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    async fn with_retry<T, F, Fut>(&self, op: &str, mut call: F) -> Result<T, LlmError>
    where
        F: FnMut() -> Fut + Send,
        Fut: std::future::Future<Output = Result<T, LlmError>> + Send,
        T: Send,
    {
        let mut attempt = 0;
        loop {
            match call().await {
                Ok(v) => return Ok(v),
                Err(e) if e.is_transient() && attempt < self.config.max_retries => {
                    let delay = self.config.delay_for(attempt, &e);
                    tracing::warn!(
                        op,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "transient LLM error, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl LlmClient for RetryingLlmClient {
    async fn complete_structured(
        &self,
        messages: &[Message],
        schema: &OutputSchema,
    ) -> Result<Option<Value>, LlmError> {
        self.with_retry("complete_structured", || {
            self.inner.complete_structured(messages, schema)
        })
        .await
    }

    async fn chat(
        &self,
        messages: &[Message],
        tools: &[ToolSpec],
    ) -> Result<AssistantTurn, LlmError> {
        self.with_retry("chat", || self.inner.chat(messages, tools)).await
    }

    fn token_usage(&self) -> (u64, u64, u64) {
        self.inner.token_usage()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;

    #[test]
    fn test_transient_classification() {
        assert!(LlmError::Timeout.is_transient());
        assert!(LlmError::RateLimited { retry_after_ms: 10 }.is_transient());
        assert!(LlmError::Transport("reset".into()).is_transient());
        assert!(!LlmError::Api("bad request".into()).is_transient());
        assert!(!LlmError::MissingApiKey("GROQ_API_KEY".into()).is_transient());
    }

    #[test]
    fn test_backoff_respects_retry_after() {
        let cfg = RetryConfig {
            max_retries: 3,
            base_delay_ms: 100,
        };
        assert_eq!(cfg.delay_for(0, &LlmError::Timeout), Duration::from_millis(100));
        assert_eq!(cfg.delay_for(2, &LlmError::Timeout), Duration::from_millis(400));
        assert_eq!(
            cfg.delay_for(0, &LlmError::RateLimited { retry_after_ms: 900 }),
            Duration::from_millis(900)
        );
    }

    struct FixedUsage;

    #[async_trait]
    impl LlmClient for FixedUsage {
        async fn complete_structured(
            &self,
            _messages: &[Message],
            _schema: &OutputSchema,
        ) -> Result<Option<Value>, LlmError> {
            Ok(None)
        }

        async fn chat(
            &self,
            _messages: &[Message],
            _tools: &[ToolSpec],
        ) -> Result<AssistantTurn, LlmError> {
            Ok(AssistantTurn::default())
        }

        fn token_usage(&self) -> (u64, u64, u64) {
            (7, 3, 10)
        }
    }

    #[test]
    fn test_retry_wrapper_reports_inner_usage() {
        let client = RetryingLlmClient::new(Arc::new(FixedUsage), RetryConfig::default());
        assert_eq!(client.token_usage(), (7, 3, 10));
    }

    #[tokio::test]
    async fn test_retry_recovers_from_transient_error() {
        let mock = Arc::new(
            MockLlmClient::new()
                .push_error(LlmError::Timeout)
                .push_turn(AssistantTurn::text("ok")),
        );
        let client = RetryingLlmClient::new(
            mock.clone(),
            RetryConfig {
                max_retries: 1,
                base_delay_ms: 1,
            },
        );
        let turn = client.chat(&[Message::user("hi")], &[]).await.unwrap();
        assert_eq!(turn.content.as_deref(), Some("ok"));
        assert_eq!(mock.request_count(), 2);
    }

    #[tokio::test]
    async fn test_retry_does_not_retry_permanent_error() {
        let mock = Arc::new(
            MockLlmClient::new()
                .push_error(LlmError::Api("invalid model".into()))
                .push_turn(AssistantTurn::text("unreachable")),
        );
        let client = RetryingLlmClient::new(mock.clone(), RetryConfig::default());
        let err = client.chat(&[Message::user("hi")], &[]).await.unwrap_err();
        assert_eq!(err, LlmError::Api("invalid model".into()));
        assert_eq!(mock.request_count(), 1);
    }
}
