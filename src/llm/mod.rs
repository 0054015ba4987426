//! LLM 层：客户端抽象与实现（OpenAI 兼容后端 / 重试包装 / Mock）与结构化输出

pub mod message;
pub mod mock;
pub mod openai;
pub mod provider;
pub mod structured;
pub mod traits;

use std::sync::Arc;
use std::time::Duration;

pub use message::{AssistantTurn, Message, Role, ToolCall, ToolSpec};
pub use mock::{MockLlmClient, MockReply, RecordedRequest};
pub use openai::{OpenAiClient, TokenUsage};
pub use provider::Provider;
pub use structured::{infer, output_schema_for};
pub use traits::{LlmClient, LlmError, OutputSchema, RetryConfig, RetryingLlmClient};

use crate::config::LlmSection;

/// 根据 [llm] 配置创建推理服务句柄：OpenAI 兼容客户端 + 重试包装
pub fn create_llm_from_config(cfg: &LlmSection) -> Result<Arc<dyn LlmClient>, LlmError> {
    let provider: Provider = cfg.provider.parse().map_err(LlmError::Config)?;
    let api_key = provider.api_key()?;
    let model = cfg
        .model
        .clone()
        .unwrap_or_else(|| provider.default_model().to_string());
    let base_url = cfg
        .base_url
        .as_deref()
        .or_else(|| provider.default_base_url());

    tracing::info!(provider = ?provider, model = %model, "Using OpenAI-compatible LLM");

    let client = OpenAiClient::new(base_url, &model, &api_key)
        .with_max_tokens(cfg.max_tokens)
        .with_temperature(cfg.temperature)
        .with_timeout(Duration::from_secs(cfg.request_timeout_secs));

    Ok(Arc::new(RetryingLlmClient::new(
        Arc::new(client),
        RetryConfig {
            max_retries: cfg.retry.max_retries,
            base_delay_ms: cfg.retry.base_delay_ms,
        },
    )))
}
