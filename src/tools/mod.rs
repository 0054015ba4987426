//! 工具层：项目文件系统、四个 Coder 工具、注册表与执行器

pub mod executor;
pub mod filesystem;
pub mod project_tools;
pub mod registry;
pub mod schema;

pub use executor::ToolExecutor;
pub use filesystem::ProjectFs;
pub use project_tools::{coder_toolbox, WriteLog, WritePolicy};
pub use registry::{parse_args, Tool, ToolError, ToolRegistry};
