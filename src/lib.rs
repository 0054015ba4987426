//! Codeforge - 多阶段代码生成流水线
//!
//! 用户需求依次经过三个阶段：
//! - Planner：需求 -> 工程计划（Plan）
//! - Architect：Plan -> 有序实现步骤（TaskPlan）
//! - Coder：每次调用实现一个步骤，通过 read_file / write_file / list_files / get_current_directory
//!   四个工具在项目根目录下读写文件，步骤全部完成后标记 DONE
//!
//! 模块划分：
//! - core：阶段产物、共享状态、错误类型
//! - llm：推理服务抽象（结构化输出 / 工具对话）、OpenAI 兼容客户端、重试、Mock
//! - tools：项目文件系统与 Coder 工具集
//! - react：工具对话循环
//! - workflow：阶段图与执行引擎
//! - stages：三个阶段的实现与提示词
//! - pipeline：装配与入口

pub mod config;
pub mod core;
pub mod llm;
pub mod observability;
pub mod pipeline;
pub mod react;
pub mod stages;
pub mod tools;
pub mod workflow;

pub use crate::core::{PipelineError, SharedState};
pub use pipeline::Pipeline;
