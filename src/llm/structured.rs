//! 结构化输出：按类型生成 Schema，调用 complete_structured 并反序列化
//!
//! 部分后端会把函数参数当作字符串返回（甚至包在 ```json 代码块中），这里统一剥离后再解析。

use std::sync::OnceLock;

use regex::Regex;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::llm::{LlmClient, LlmError, Message, OutputSchema};
use crate::tools::schema::inline_schema_for;

/// 为类型 T 构建结构化输出约束
pub fn output_schema_for<T: JsonSchema>(name: &str, description: &str) -> OutputSchema {
    OutputSchema {
        name: name.to_string(),
        description: description.to_string(),
        schema: inline_schema_for::<T>(),
    }
}

fn fenced_block() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```(?:json)?\s*(.*?)\s*```").ok())
        .as_ref()
}

/// 将模型返回值解析为 T；null / 空字符串视为「无结果」
pub fn decode_structured<T: DeserializeOwned>(value: Value) -> Result<Option<T>, LlmError> {
    let value = match value {
        Value::Null => return Ok(None),
        Value::String(raw) => {
            let text = fenced_block()
                .and_then(|re| re.captures(&raw))
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_string())
                .unwrap_or_else(|| raw.trim().to_string());
            if text.is_empty() || text == "null" {
                return Ok(None);
            }
            serde_json::from_str::<Value>(&text)
                .map_err(|e| LlmError::InvalidResponse(format!("{e}: {text}")))?
        }
        other => other,
    };
    serde_json::from_value(value)
        .map(Some)
        .map_err(|e| LlmError::InvalidResponse(e.to_string()))
}

/// 结构化推理：单条 user prompt + schema，返回 T 或 None
pub async fn infer<T>(
    llm: &dyn LlmClient,
    prompt: &str,
    schema: &OutputSchema,
) -> Result<Option<T>, LlmError>
where
    T: DeserializeOwned,
{
    tracing::debug!(schema = %schema.name, prompt = %prompt, "structured inference");
    let raw = llm
        .complete_structured(&[Message::user(prompt.to_string())], schema)
        .await?;
    match raw {
        Some(v) => decode_structured(v),
        None => Ok(None),
    }
}
