//! 共享状态：贯穿 Planner → Architect → Coder 的单一记录
//!
//! 每个字段只由其所属阶段写入一次；唯一跨调用变化的是 coder_state（游标推进）。
//! 阶段返回 StateUpdate，由引擎调用 merge 合并，合并时校验字段归属与只写一次。

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::{ImplementationStep, PipelineError, Plan, TaskPlan};
use crate::workflow::NodeId;

/// 运行完成标记（序列化为 "DONE"）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    #[serde(rename = "DONE")]
    Done,
}

/// 流水线阶段：由共享状态中已写入的字段推导
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum PipelinePhase {
    /// 仅有 user_prompt
    Requested,
    /// Plan 已写入
    Planned,
    /// TaskPlan 已写入，Coder 尚未运行
    Architected,
    /// Coder 运行中：已完成 step 个，共 total 个
    Coding { step: usize, total: usize },
    /// status = DONE
    Done,
}

/// Coder 状态机：Pending(idx) 或 Done
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoderPhase {
    Pending(usize),
    Done,
}

/// 单个已完成步骤的执行记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepRecord {
    pub step: usize,
    pub filepath: String,
    /// 本步与模型的对话轮数
    pub model_turns: usize,
    /// 本步执行的工具调用（名称，按顺序）
    pub tool_calls: Vec<String>,
    /// 目标文件是否在本步被写入
    pub wrote_target: bool,
    /// 是否因轮数上限提前结束对话
    pub budget_exhausted: bool,
    pub completed_at: i64,
}

/// Coder 游标：TaskPlan 共享引用 + current_step_idx
#[derive(Debug, Clone, Serialize)]
pub struct CoderState {
    task_plan: Arc<TaskPlan>,
    current_step_idx: usize,
    records: Vec<StepRecord>,
}

impl CoderState {
    pub fn new(task_plan: Arc<TaskPlan>) -> Self {
        Self {
            task_plan,
            current_step_idx: 0,
            records: Vec::new(),
        }
    }

    pub fn task_plan(&self) -> &TaskPlan {
        &self.task_plan
    }

    pub fn current_step_idx(&self) -> usize {
        self.current_step_idx
    }

    pub fn total_steps(&self) -> usize {
        self.task_plan.len()
    }

    pub fn phase(&self) -> CoderPhase {
        if self.current_step_idx >= self.task_plan.len() {
            CoderPhase::Done
        } else {
            CoderPhase::Pending(self.current_step_idx)
        }
    }

    pub fn current_step(&self) -> Option<&ImplementationStep> {
        self.task_plan.steps().get(self.current_step_idx)
    }

    /// 游标之前的所有步骤（0..idx），即「已有项目」视图的来源
    pub fn completed_steps(&self) -> &[ImplementationStep] {
        let end = self.current_step_idx.min(self.task_plan.len());
        &self.task_plan.steps()[..end]
    }

    pub fn records(&self) -> &[StepRecord] {
        &self.records
    }

    /// 记录当前步骤并将游标加一；游标已到末尾时拒绝推进
    pub fn advance(&mut self, record: StepRecord) -> Result<usize, PipelineError> {
        if self.current_step_idx >= self.task_plan.len() {
            return Err(PipelineError::CursorExhausted(self.task_plan.len()));
        }
        self.records.push(record);
        self.current_step_idx += 1;
        Ok(self.current_step_idx)
    }
}

/// 阶段返回的部分更新
#[derive(Debug, Default)]
pub struct StateUpdate {
    pub plan: Option<Plan>,
    pub task_plan: Option<Arc<TaskPlan>>,
    pub coder_state: Option<CoderState>,
    pub status: Option<RunStatus>,
}

impl StateUpdate {
    pub fn with_plan(plan: Plan) -> Self {
        Self {
            plan: Some(plan),
            ..Self::default()
        }
    }

    pub fn with_task_plan(task_plan: TaskPlan) -> Self {
        Self {
            task_plan: Some(Arc::new(task_plan)),
            ..Self::default()
        }
    }

    pub fn with_coder_state(coder_state: CoderState) -> Self {
        Self {
            coder_state: Some(coder_state),
            ..Self::default()
        }
    }

    pub fn done(mut self) -> Self {
        self.status = Some(RunStatus::Done);
        self
    }
}

/// 单次运行的共享状态
#[derive(Debug, Clone, Serialize)]
pub struct SharedState {
    user_prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    plan: Option<Plan>,
    #[serde(skip_serializing_if = "Option::is_none")]
    task_plan: Option<Arc<TaskPlan>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    coder_state: Option<CoderState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<RunStatus>,
}

impl SharedState {
    pub fn new(user_prompt: impl Into<String>) -> Self {
        Self {
            user_prompt: user_prompt.into(),
            plan: None,
            task_plan: None,
            coder_state: None,
            status: None,
        }
    }

    pub fn user_prompt(&self) -> &str {
        &self.user_prompt
    }

    pub fn plan(&self) -> Option<&Plan> {
        self.plan.as_ref()
    }

    pub fn task_plan(&self) -> Option<&Arc<TaskPlan>> {
        self.task_plan.as_ref()
    }

    pub fn coder_state(&self) -> Option<&CoderState> {
        self.coder_state.as_ref()
    }

    pub fn status(&self) -> Option<RunStatus> {
        self.status
    }

    pub fn is_done(&self) -> bool {
        self.status == Some(RunStatus::Done)
    }

    pub fn phase(&self) -> PipelinePhase {
        if self.is_done() {
            return PipelinePhase::Done;
        }
        match (&self.plan, &self.task_plan, &self.coder_state) {
            (_, _, Some(cs)) => PipelinePhase::Coding {
                step: cs.current_step_idx(),
                total: cs.total_steps(),
            },
            (_, Some(_), None) => PipelinePhase::Architected,
            (Some(_), None, None) => PipelinePhase::Planned,
            (None, None, None) => PipelinePhase::Requested,
        }
    }

    /// 合并阶段更新：校验字段归属，plan / task_plan / status 只能写一次
    pub fn merge(&mut self, writer: NodeId, update: StateUpdate) -> Result<(), PipelineError> {
        if let Some(plan) = update.plan {
            check_owner("plan", NodeId::Planner, writer)?;
            if self.plan.is_some() {
                return Err(PipelineError::FieldAlreadyWritten("plan"));
            }
            self.plan = Some(plan);
        }
        if let Some(task_plan) = update.task_plan {
            check_owner("task_plan", NodeId::Architect, writer)?;
            if self.task_plan.is_some() {
                return Err(PipelineError::FieldAlreadyWritten("task_plan"));
            }
            self.task_plan = Some(task_plan);
        }
        if let Some(coder_state) = update.coder_state {
            check_owner("coder_state", NodeId::Coder, writer)?;
            self.coder_state = Some(coder_state);
        }
        if let Some(status) = update.status {
            check_owner("status", NodeId::Coder, writer)?;
            if self.status.is_some() {
                return Err(PipelineError::FieldAlreadyWritten("status"));
            }
            self.status = Some(status);
        }
        Ok(())
    }
}

fn check_owner(field: &'static str, owner: NodeId, writer: NodeId) -> Result<(), PipelineError> {
    if owner == writer {
        Ok(())
    } else {
        Err(PipelineError::FieldOwnership {
            field,
            owner,
            writer,
        })
    }
}
