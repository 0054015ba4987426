//! Coder 可用的四个工具：read_file / write_file / list_files / get_current_directory
//!
//! coder_toolbox 为每个实现步骤构建一个只含这四个工具的注册表；write_file 按 WritePolicy 决定
//! 是否允许写入当前目标以外的文件，并把每次成功写入记入 WriteLog 供步骤结束后校验。

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use crate::tools::schema::inline_schema_for;
use crate::tools::{parse_args, ProjectFs, Tool, ToolError, ToolRegistry};

pub const READ_FILE: &str = "read_file";
pub const WRITE_FILE: &str = "write_file";
pub const LIST_FILES: &str = "list_files";
pub const GET_CURRENT_DIRECTORY: &str = "get_current_directory";

/// 跨文件写入策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WritePolicy {
    /// 允许写项目内任意文件；写非目标文件时记 warn 日志
    #[default]
    Any,
    /// 只允许写当前步骤的目标文件
    TargetOnly,
}

/// 本步成功写入的文件（解析后的绝对路径，按写入顺序）
#[derive(Debug, Default)]
pub struct WriteLog {
    writes: Mutex<Vec<PathBuf>>,
}

impl WriteLog {
    pub fn record(&self, path: PathBuf) {
        if let Ok(mut w) = self.writes.lock() {
            w.push(path);
        }
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.writes.lock().map(|w| w.clone()).unwrap_or_default()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.writes
            .lock()
            .map(|w| w.iter().any(|p| p == path))
            .unwrap_or(false)
    }
}

#[derive(Deserialize, JsonSchema)]
struct ReadFileArgs {
    /// 相对项目根目录的文件路径
    path: String,
}

#[derive(Deserialize, JsonSchema)]
struct WriteFileArgs {
    /// 相对项目根目录的文件路径
    path: String,
    /// 完整文件内容（覆盖原内容）
    content: String,
}

#[derive(Deserialize, JsonSchema)]
struct ListFilesArgs {
    /// 要列出的子目录，省略时列出整个项目
    #[serde(default)]
    directory: Option<String>,
}

/// 读取文件内容，不存在时返回空
pub struct ReadFileTool {
    fs: Arc<ProjectFs>,
}

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        READ_FILE
    }

    fn description(&self) -> &str {
        "Read a file from the project. Returns an empty string if the file does not exist."
    }

    fn parameters_schema(&self) -> Value {
        inline_schema_for::<ReadFileArgs>()
    }

    async fn execute(&self, args: Value) -> Result<String, ToolError> {
        let args: ReadFileArgs = parse_args(READ_FILE, args)?;
        tracing::debug!(path = %args.path, "read_file");
        self.fs.read(&args.path)
    }
}

/// 写入文件（覆盖），自动创建父目录
pub struct WriteFileTool {
    fs: Arc<ProjectFs>,
    target: PathBuf,
    policy: WritePolicy,
    log: Arc<WriteLog>,
}

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        WRITE_FILE
    }

    fn description(&self) -> &str {
        "Write the complete content of a file in the project, creating parent directories as needed. \
         This is the only way to save your work."
    }

    fn parameters_schema(&self) -> Value {
        inline_schema_for::<WriteFileArgs>()
    }

    async fn execute(&self, args: Value) -> Result<String, ToolError> {
        let args: WriteFileArgs = parse_args(WRITE_FILE, args)?;
        let resolved = self.fs.resolve(&args.path)?;
        if resolved != self.target {
            match self.policy {
                WritePolicy::TargetOnly => {
                    return Err(ToolError::WriteDenied(format!(
                        "{} is not the target of this step; only {} may be written",
                        args.path,
                        self.target.display()
                    )));
                }
                WritePolicy::Any => {
                    tracing::warn!(path = %args.path, target = %self.target.display(), "write outside step target");
                }
            }
        }
        let written = self.fs.write(&args.path, &args.content)?;
        self.log.record(written);
        Ok(format!("WROTE:{} ({} bytes)", args.path, args.content.len()))
    }
}

/// 列出项目文件
pub struct ListFilesTool {
    fs: Arc<ProjectFs>,
}

#[async_trait]
impl Tool for ListFilesTool {
    fn name(&self) -> &str {
        LIST_FILES
    }

    fn description(&self) -> &str {
        "List all files under the project root (or under a sub-directory), one path per line."
    }

    fn parameters_schema(&self) -> Value {
        inline_schema_for::<ListFilesArgs>()
    }

    async fn execute(&self, args: Value) -> Result<String, ToolError> {
        let args: ListFilesArgs = parse_args(LIST_FILES, args)?;
        let files = self.fs.list(args.directory.as_deref())?;
        if files.is_empty() {
            Ok("No files found.".to_string())
        } else {
            Ok(files.join("\n"))
        }
    }
}

/// 返回项目根目录的绝对路径
pub struct CurrentDirectoryTool {
    fs: Arc<ProjectFs>,
}

#[async_trait]
impl Tool for CurrentDirectoryTool {
    fn name(&self) -> &str {
        GET_CURRENT_DIRECTORY
    }

    fn description(&self) -> &str {
        "Return the absolute path of the project root."
    }

    async fn execute(&self, _args: Value) -> Result<String, ToolError> {
        Ok(self.fs.cwd())
    }
}

/// 为单个步骤构建工具集；目标路径本身越界时报错
pub fn coder_toolbox(
    fs: Arc<ProjectFs>,
    target: &str,
    policy: WritePolicy,
    log: Arc<WriteLog>,
) -> Result<ToolRegistry, ToolError> {
    let target = fs.resolve(target)?;
    let mut registry = ToolRegistry::new();
    registry.register(ReadFileTool { fs: fs.clone() });
    registry.register(WriteFileTool {
        fs: fs.clone(),
        target,
        policy,
        log,
    });
    registry.register(ListFilesTool { fs: fs.clone() });
    registry.register(CurrentDirectoryTool { fs });
    Ok(registry)
}
