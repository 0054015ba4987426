//! 流水线阶段：Planner / Architect / Coder

pub mod architect;
pub mod coder;
pub mod planner;
pub mod prompts;

pub use architect::ArchitectStage;
pub use coder::{assemble_context, CoderSettings, CoderStage, VerifyMode, CONTEXT_HEADER};
pub use planner::PlannerStage;

use crate::core::PipelineError;
use crate::llm::LlmError;
use crate::workflow::NodeId;

/// 结构化推理结果：空结果或无法解析视为 PlanningFailure，其余 LLM 错误原样上抛
pub(crate) fn require_output<T>(
    stage: NodeId,
    result: Result<Option<T>, LlmError>,
) -> Result<T, PipelineError> {
    match result {
        Ok(Some(value)) => Ok(value),
        Ok(None) => Err(PipelineError::planning(stage, "model returned no structured result")),
        Err(LlmError::InvalidResponse(reason)) => Err(PipelineError::planning(stage, reason)),
        Err(e) => Err(e.into()),
    }
}
