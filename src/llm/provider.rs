//! OpenAI 兼容后端：Groq / DeepSeek / OpenAI
//!
//! 三者均走 OpenAI Chat Completions 格式，仅 Base URL、API Key 环境变量与默认模型不同。

use std::str::FromStr;

use crate::llm::LlmError;

pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const GROQ_DEFAULT_MODEL: &str = "moonshotai/kimi-k2-instruct-0905";
pub const DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com";
pub const DEEPSEEK_CHAT: &str = "deepseek-chat";
pub const OPENAI_DEFAULT_MODEL: &str = "gpt-4o-mini";

/// 后端类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Groq,
    DeepSeek,
    OpenAi,
}

impl Provider {
    pub fn default_base_url(&self) -> Option<&'static str> {
        match self {
            Provider::Groq => Some(GROQ_BASE_URL),
            Provider::DeepSeek => Some(DEEPSEEK_BASE_URL),
            // async-openai 默认 https://api.openai.com/v1
            Provider::OpenAi => None,
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Provider::Groq => GROQ_DEFAULT_MODEL,
            Provider::DeepSeek => DEEPSEEK_CHAT,
            Provider::OpenAi => OPENAI_DEFAULT_MODEL,
        }
    }

    pub fn api_key_env(&self) -> &'static str {
        match self {
            Provider::Groq => "GROQ_API_KEY",
            Provider::DeepSeek => "DEEPSEEK_API_KEY",
            Provider::OpenAi => "OPENAI_API_KEY",
        }
    }

    /// 从环境变量读取 API Key；未设置或为空时报错，不回退到 Mock
    pub fn api_key(&self) -> Result<String, LlmError> {
        std::env::var(self.api_key_env())
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| LlmError::MissingApiKey(self.api_key_env().to_string()))
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "groq" => Ok(Provider::Groq),
            "deepseek" => Ok(Provider::DeepSeek),
            "openai" => Ok(Provider::OpenAi),
            other => Err(format!("unknown LLM provider: {other}")),
        }
    }
}
