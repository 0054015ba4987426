//! Coder 阶段：每次调用完成一个实现步骤并推进游标
//!
//! 流程：取 CoderState（首次调用时由 TaskPlan 创建）-> 游标到末尾则写 DONE ->
//! 读取目标文件与前序步骤文件拼成上下文 -> 工具对话 -> 校验目标文件是否写入 -> 推进游标。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::core::{
    CoderPhase, CoderState, ImplementationStep, PipelineError, SharedState, StateUpdate, StepRecord,
};
use crate::llm::LlmClient;
use crate::react::converse;
use crate::stages::prompts::{coder_task_prompt, CODER_SYSTEM_PROMPT};
use crate::tools::{coder_toolbox, ProjectFs, ToolError, ToolExecutor, WriteLog, WritePolicy};
use crate::workflow::{NodeId, Stage};

/// 上下文块标题
pub const CONTEXT_HEADER: &str = "=== EXISTING PROJECT FILES ===\n";

/// 步骤结束后对目标文件写入情况的校验方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerifyMode {
    Off,
    /// 未写入时记 warn 日志，继续运行
    #[default]
    Warn,
    /// 未写入时终止运行
    Strict,
}

/// Coder 运行参数
#[derive(Debug, Clone)]
pub struct CoderSettings {
    pub max_tool_rounds: usize,
    pub tool_timeout: Duration,
    pub write_policy: WritePolicy,
    pub verify: VerifyMode,
}

impl Default for CoderSettings {
    fn default() -> Self {
        Self {
            max_tool_rounds: 25,
            tool_timeout: Duration::from_secs(30),
            write_policy: WritePolicy::Any,
            verify: VerifyMode::Warn,
        }
    }
}

/// 拼接前序步骤目标文件的完整内容（按步骤顺序；不存在或为空的文件跳过）
pub fn assemble_context(fs: &ProjectFs, steps: &[ImplementationStep]) -> Result<String, ToolError> {
    let mut context = String::from(CONTEXT_HEADER);
    for step in steps {
        let content = fs.read(&step.filepath)?;
        if !content.is_empty() {
            context.push_str(&format!("\n--- {} ---\n{}\n", step.filepath, content));
        }
    }
    Ok(context)
}

pub struct CoderStage {
    llm: Arc<dyn LlmClient>,
    fs: Arc<ProjectFs>,
    settings: CoderSettings,
}

impl CoderStage {
    pub fn new(llm: Arc<dyn LlmClient>, fs: Arc<ProjectFs>, settings: CoderSettings) -> Self {
        Self { llm, fs, settings }
    }

    async fn implement(
        &self,
        idx: usize,
        step: &ImplementationStep,
        coder_state: &CoderState,
    ) -> Result<StepRecord, PipelineError> {
        let existing = self.fs.read(&step.filepath)?;
        let context = assemble_context(&self.fs, coder_state.completed_steps())?;
        let prompt = coder_task_prompt(&context, step, &existing);
        tracing::debug!(prompt = %prompt, "coder task prompt");

        let log = Arc::new(WriteLog::default());
        let registry = coder_toolbox(
            self.fs.clone(),
            &step.filepath,
            self.settings.write_policy,
            log.clone(),
        )?;
        let executor = ToolExecutor::new(registry, self.settings.tool_timeout);

        let outcome = converse(
            self.llm.as_ref(),
            &executor,
            CODER_SYSTEM_PROMPT,
            &prompt,
            self.settings.max_tool_rounds,
        )
        .await?;

        let target = self.fs.resolve(&step.filepath)?;
        let wrote_target = log.contains(&target);
        if !wrote_target {
            match self.settings.verify {
                VerifyMode::Off => {}
                VerifyMode::Warn => {
                    tracing::warn!(step = idx, filepath = %step.filepath, "target file was not written");
                }
                VerifyMode::Strict => {
                    return Err(PipelineError::TargetNotWritten {
                        step: idx,
                        filepath: step.filepath.clone(),
                    });
                }
            }
        }

        Ok(StepRecord {
            step: idx,
            filepath: step.filepath.clone(),
            model_turns: outcome.turns,
            tool_calls: outcome.tool_calls,
            wrote_target,
            budget_exhausted: outcome.budget_exhausted,
            completed_at: chrono::Utc::now().timestamp(),
        })
    }
}

#[async_trait]
impl Stage for CoderStage {
    fn node(&self) -> NodeId {
        NodeId::Coder
    }

    async fn run(&self, state: &SharedState) -> Result<StateUpdate, PipelineError> {
        let mut coder_state = match state.coder_state() {
            Some(cs) => cs.clone(),
            None => {
                let task_plan = state.task_plan().ok_or(PipelineError::MissingState {
                    field: "task_plan",
                    node: NodeId::Coder,
                })?;
                CoderState::new(task_plan.clone())
            }
        };

        let idx = match coder_state.phase() {
            CoderPhase::Done => {
                tracing::info!(steps = coder_state.total_steps(), "all steps implemented");
                return Ok(StateUpdate::with_coder_state(coder_state).done());
            }
            CoderPhase::Pending(idx) => idx,
        };
        let step = coder_state
            .current_step()
            .cloned()
            .ok_or(PipelineError::CursorExhausted(idx))?;
        tracing::info!(
            step = idx + 1,
            total = coder_state.total_steps(),
            filepath = %step.filepath,
            "implementing step"
        );

        let record = self.implement(idx, &step, &coder_state).await?;
        coder_state.advance(record)?;
        Ok(StateUpdate::with_coder_state(coder_state))
    }
}
