//! 流水线错误类型
//!
//! 核心层不做重试与回滚：任何阶段内的错误都原样上抛到进程边界，由 main 统一打印并以非零码退出。

use thiserror::Error;

use crate::llm::LlmError;
use crate::tools::ToolError;
use crate::workflow::{GraphError, NodeId};

/// 流水线运行中可能出现的错误
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Planner / Architect 未得到可用的结构化结果（空值或无法解析），致命
    #[error("Planning failure in {stage}: {reason}")]
    PlanningFailure { stage: NodeId, reason: String },

    /// 文件系统操作失败（I/O、超时），致命
    #[error("Tool failure: {0}")]
    Tool(#[from] ToolError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("{node} requires `{field}` in shared state")]
    MissingState { field: &'static str, node: NodeId },

    #[error("{writer} may not write `{field}` (owned by {owner})")]
    FieldOwnership {
        field: &'static str,
        owner: NodeId,
        writer: NodeId,
    },

    #[error("`{0}` was already written")]
    FieldAlreadyWritten(&'static str),

    #[error("Step cursor already at end ({0} steps)")]
    CursorExhausted(usize),

    /// verify_writes = strict 时，目标文件在本步未被写入
    #[error("Target file {filepath} was not written during step {step}")]
    TargetNotWritten { step: usize, filepath: String },
}

impl PipelineError {
    pub fn planning(stage: NodeId, reason: impl Into<String>) -> Self {
        Self::PlanningFailure {
            stage,
            reason: reason.into(),
        }
    }
}
