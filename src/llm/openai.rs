//! OpenAI 兼容 API 客户端
//!
//! 通过 async_openai 调用任意 OpenAI 兼容端点（可配置 base_url）；请求体与响应使用 byot（自带类型）
//! 直接收发 JSON，以便统一处理 tools / tool_choice。
//! 结构化输出通过「强制调用单一函数」实现：函数参数即 schema，解析 arguments 得到结果。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_openai::config::OpenAIConfig;
use async_openai::error::OpenAIError;
use async_openai::Client;
use async_trait::async_trait;
use serde_json::{json, Value};

use crate::llm::{
    AssistantTurn, LlmClient, LlmError, Message, OutputSchema, Role, ToolCall, ToolSpec,
};

/// Token 使用统计（累计值）
#[derive(Debug, Clone, Default)]
pub struct TokenUsage {
    pub prompt_tokens: Arc<AtomicU64>,
    pub completion_tokens: Arc<AtomicU64>,
    pub total_tokens: Arc<AtomicU64>,
}

impl TokenUsage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, prompt: u64, completion: u64) {
        self.prompt_tokens.fetch_add(prompt, Ordering::Relaxed);
        self.completion_tokens.fetch_add(completion, Ordering::Relaxed);
        self.total_tokens.fetch_add(prompt + completion, Ordering::Relaxed);
    }

    pub fn get(&self) -> (u64, u64, u64) {
        (
            self.prompt_tokens.load(Ordering::Relaxed),
            self.completion_tokens.load(Ordering::Relaxed),
            self.total_tokens.load(Ordering::Relaxed),
        )
    }
}

/// OpenAI 兼容客户端
pub struct OpenAiClient {
    client: Client<OpenAIConfig>,
    model: String,
    max_tokens: u32,
    temperature: Option<f32>,
    timeout: Duration,
    pub usage: TokenUsage,
}

impl OpenAiClient {
    pub fn new(base_url: Option<&str>, model: &str, api_key: &str) -> Self {
        let config = match base_url {
            Some(url) => OpenAIConfig::new().with_api_base(url).with_api_key(api_key),
            None => OpenAIConfig::new().with_api_key(api_key),
        };

        Self {
            client: Client::with_config(config),
            model: model.to_string(),
            max_tokens: 4096,
            temperature: None,
            timeout: Duration::from_secs(120),
            usage: TokenUsage::new(),
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn request_body(&self, messages: &[Message], tools: &[Value], tool_choice: Option<Value>) -> Value {
        let mut body = json!({
            "model": self.model,
            "messages": to_wire_messages(messages),
            "max_tokens": self.max_tokens,
        });
        if let Some(t) = self.temperature {
            body["temperature"] = json!(t);
        }
        if !tools.is_empty() {
            body["tools"] = Value::Array(tools.to_vec());
        }
        if let Some(choice) = tool_choice {
            body["tool_choice"] = choice;
        }
        body
    }

    async fn send(&self, body: Value) -> Result<Value, LlmError> {
        let response: Value = tokio::time::timeout(self.timeout, self.client.chat().create_byot(body))
            .await
            .map_err(|_| LlmError::Timeout)?
            .map_err(map_openai_error)?;

        if let Some(usage) = response.get("usage") {
            let prompt = usage.get("prompt_tokens").and_then(Value::as_u64).unwrap_or(0);
            let completion = usage
                .get("completion_tokens")
                .and_then(Value::as_u64)
                .unwrap_or(0);
            self.usage.add(prompt, completion);
        }
        Ok(response)
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    fn token_usage(&self) -> (u64, u64, u64) {
        self.usage.get()
    }

    async fn complete_structured(
        &self,
        messages: &[Message],
        schema: &OutputSchema,
    ) -> Result<Option<Value>, LlmError> {
        let tool = tool_to_wire(&ToolSpec {
            name: schema.name.clone(),
            description: schema.description.clone(),
            parameters: schema.schema.clone(),
        });
        let choice = json!({ "type": "function", "function": { "name": schema.name } });
        let body = self.request_body(messages, &[tool], Some(choice));
        let response = self.send(body).await?;
        let turn = parse_turn(&response)?;

        Ok(turn
            .tool_calls
            .into_iter()
            .find(|c| c.name == schema.name)
            .map(|c| c.arguments)
            .filter(|v| !v.is_null()))
    }

    async fn chat(
        &self,
        messages: &[Message],
        tools: &[ToolSpec],
    ) -> Result<AssistantTurn, LlmError> {
        let wire_tools: Vec<Value> = tools.iter().map(tool_to_wire).collect();
        let body = self.request_body(messages, &wire_tools, None);
        let response = self.send(body).await?;
        parse_turn(&response)
    }
}

fn map_openai_error(e: OpenAIError) -> LlmError {
    let msg = e.to_string();
    let lower = msg.to_lowercase();
    if lower.contains("rate limit") || lower.contains("429") {
        LlmError::RateLimited { retry_after_ms: 0 }
    } else if matches!(e, OpenAIError::Reqwest(_)) {
        LlmError::Transport(msg)
    } else {
        LlmError::Api(msg)
    }
}

fn tool_to_wire(spec: &ToolSpec) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": spec.name,
            "description": spec.description,
            "parameters": spec.parameters,
        }
    })
}

fn to_wire_messages(messages: &[Message]) -> Vec<Value> {
    messages
        .iter()
        .map(|m| match m.role {
            Role::System => json!({ "role": "system", "content": m.content }),
            Role::User => json!({ "role": "user", "content": m.content }),
            Role::Assistant if m.tool_calls.is_empty() => {
                json!({ "role": "assistant", "content": m.content })
            }
            Role::Assistant => {
                let calls: Vec<Value> = m
                    .tool_calls
                    .iter()
                    .map(|c| {
                        let arguments = match &c.arguments {
                            Value::String(raw) => raw.clone(),
                            other => other.to_string(),
                        };
                        json!({
                            "id": c.id,
                            "type": "function",
                            "function": { "name": c.name, "arguments": arguments },
                        })
                    })
                    .collect();
                json!({ "role": "assistant", "content": m.content, "tool_calls": calls })
            }
            Role::Tool => json!({
                "role": "tool",
                "tool_call_id": m.tool_call_id.clone().unwrap_or_default(),
                "content": m.content,
            }),
        })
        .collect()
}

/// 取 choices[0].message，解析文本与工具调用
fn parse_turn(response: &Value) -> Result<AssistantTurn, LlmError> {
    let message = response
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .ok_or_else(|| LlmError::InvalidResponse("response has no choices[0].message".into()))?;

    let content = message
        .get("content")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(String::from);

    let tool_calls = message
        .get("tool_calls")
        .and_then(Value::as_array)
        .map(|calls| {
            calls
                .iter()
                .enumerate()
                .filter_map(|(i, c)| {
                    let function = c.get("function")?;
                    let name = function.get("name")?.as_str()?.to_string();
                    let id = c
                        .get("id")
                        .and_then(Value::as_str)
                        .map(String::from)
                        .unwrap_or_else(|| format!("call_{i}"));
                    let arguments = match function.get("arguments") {
                        Some(Value::String(raw)) => serde_json::from_str(raw)
                            .unwrap_or_else(|_| Value::String(raw.clone())),
                        Some(other) => other.clone(),
                        None => json!({}),
                    };
                    Some(ToolCall::new(id, name, arguments))
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(AssistantTurn {
        content,
        tool_calls,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_usage_accumulates() {
        let usage = TokenUsage::new();
        usage.add(10, 5);
        usage.add(3, 2);
        assert_eq!(usage.get(), (13, 7, 20));

        let client = OpenAiClient::new(None, "m", "sk-test");
        client.usage.add(1, 1);
        assert_eq!(client.token_usage(), (1, 1, 2));
    }

    #[test]
    fn test_parse_turn_with_tool_calls() {
        let response = json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {
                            "name": "write_file",
                            "arguments": "{\"path\":\"index.html\",\"content\":\"<html></html>\"}"
                        }
                    }]
                }
            }]
        });
        let turn = parse_turn(&response).unwrap();
        assert!(turn.content.is_none());
        assert_eq!(turn.tool_calls.len(), 1);
        assert_eq!(turn.tool_calls[0].name, "write_file");
        assert_eq!(turn.tool_calls[0].arguments["path"], "index.html");
    }

    #[test]
    fn test_parse_turn_keeps_malformed_arguments_raw() {
        let response = json!({
            "choices": [{ "message": { "tool_calls": [{
                "id": "c", "function": { "name": "read_file", "arguments": "{not json" }
            }]}}]
        });
        let turn = parse_turn(&response).unwrap();
        assert_eq!(turn.tool_calls[0].arguments, Value::String("{not json".into()));
    }

    #[test]
    fn test_parse_turn_without_choices_is_invalid() {
        let err = parse_turn(&json!({ "choices": [] })).unwrap_err();
        assert!(matches!(err, LlmError::InvalidResponse(_)));
    }

    #[test]
    fn test_wire_messages_carry_tool_call_ids() {
        let call = ToolCall::new("call_9", "list_files", json!({}));
        let turn = AssistantTurn::calls(vec![call]);
        let wire = to_wire_messages(&[
            Message::system("sys"),
            Message::from_turn(&turn),
            Message::tool_result("call_9", "index.html"),
        ]);
        assert_eq!(wire[0]["role"], "system");
        assert_eq!(wire[1]["tool_calls"][0]["id"], "call_9");
        assert_eq!(wire[1]["tool_calls"][0]["function"]["arguments"], "{}");
        assert_eq!(wire[2]["role"], "tool");
        assert_eq!(wire[2]["tool_call_id"], "call_9");
    }

    #[test]
    fn test_request_body_forces_structured_function() {
        let client = OpenAiClient::new(Some("http://localhost:1"), "m", "sk-test").with_max_tokens(16);
        let body = client.request_body(
            &[Message::user("plan")],
            &[json!({"type": "function"})],
            Some(json!({"type": "function", "function": {"name": "Plan"}})),
        );
        assert_eq!(body["model"], "m");
        assert_eq!(body["max_tokens"], 16);
        assert_eq!(body["tool_choice"]["function"]["name"], "Plan");
        assert!(body.get("temperature").is_none());
    }
}
