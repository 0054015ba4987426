//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `CODEFORGE__*` 覆盖（双下划线表示嵌套，如 `CODEFORGE__LLM__PROVIDER=openai`）。

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::stages::{CoderSettings, VerifyMode};
use crate::tools::WritePolicy;

/// 指定额外配置文件路径的环境变量
pub const CONFIG_PATH_ENV: &str = "CODEFORGE_CONFIG";

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub llm: LlmSection,
    pub coder: CoderSection,
    pub engine: EngineSection,
}

/// [app] 段：生成项目的根目录
#[derive(Debug, Clone, Deserialize)]
pub struct AppSection {
    #[serde(default = "default_project_root")]
    pub project_root: PathBuf,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            project_root: default_project_root(),
        }
    }
}

fn default_project_root() -> PathBuf {
    PathBuf::from("generated_project")
}

/// [llm] 段：后端选择、生成参数与超时
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSection {
    /// 后端：groq / deepseek / openai
    #[serde(default = "default_provider")]
    pub provider: String,
    /// 未设置时使用 provider 的默认模型
    pub model: Option<String>,
    pub base_url: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    pub temperature: Option<f32>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub retry: RetrySection,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            base_url: None,
            max_tokens: default_max_tokens(),
            temperature: None,
            request_timeout_secs: default_request_timeout_secs(),
            retry: RetrySection::default(),
        }
    }
}

fn default_provider() -> String {
    "groq".to_string()
}

fn default_max_tokens() -> u32 {
    16384
}

fn default_request_timeout_secs() -> u64 {
    120
}

/// [llm.retry] 段：瞬时错误（限流、超时、连接失败）的重试
#[derive(Debug, Clone, Deserialize)]
pub struct RetrySection {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

fn default_max_retries() -> u32 {
    2
}

fn default_base_delay_ms() -> u64 {
    500
}

/// [coder] 段：工具对话轮数、工具超时、写入策略与写入校验
#[derive(Debug, Clone, Deserialize)]
pub struct CoderSection {
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: usize,
    /// 单次工具调用超时（秒）
    #[serde(default = "default_tool_timeout_secs")]
    pub tool_timeout_secs: u64,
    #[serde(default)]
    pub write_policy: WritePolicy,
    #[serde(default)]
    pub verify_writes: VerifyMode,
}

impl Default for CoderSection {
    fn default() -> Self {
        Self {
            max_tool_rounds: default_max_tool_rounds(),
            tool_timeout_secs: default_tool_timeout_secs(),
            write_policy: WritePolicy::default(),
            verify_writes: VerifyMode::default(),
        }
    }
}

impl CoderSection {
    pub fn settings(&self) -> CoderSettings {
        CoderSettings {
            max_tool_rounds: self.max_tool_rounds,
            tool_timeout: Duration::from_secs(self.tool_timeout_secs),
            write_policy: self.write_policy,
            verify: self.verify_writes,
        }
    }
}

fn default_max_tool_rounds() -> usize {
    25
}

fn default_tool_timeout_secs() -> u64 {
    30
}

/// [engine] 段：状态转移上限
#[derive(Debug, Clone, Deserialize)]
pub struct EngineSection {
    #[serde(default = "default_max_transitions")]
    pub max_transitions: usize,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            max_transitions: default_max_transitions(),
        }
    }
}

fn default_max_transitions() -> usize {
    crate::workflow::DEFAULT_MAX_TRANSITIONS
}

/// 从 config 目录加载配置，环境变量 CODEFORGE__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 CODEFORGE__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("CODEFORGE")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    let cfg: AppConfig = c.try_deserialize()?;
    cfg.validate()?;
    Ok(cfg)
}

/// 三个阶段各至少运行一次所需的最少状态转移次数
const MIN_TRANSITIONS: usize = 3;

impl AppConfig {
    /// 校验取值范围：Coder 至少一轮对话，引擎至少能走完三个阶段
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if self.coder.max_tool_rounds == 0 {
            return Err(config::ConfigError::Message(
                "coder.max_tool_rounds must be at least 1".to_string(),
            ));
        }
        if self.engine.max_transitions < MIN_TRANSITIONS {
            return Err(config::ConfigError::Message(format!(
                "engine.max_transitions must be at least {MIN_TRANSITIONS}, got {}",
                self.engine.max_transitions
            )));
        }
        Ok(())
    }
}
