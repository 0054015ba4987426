//! 流水线引擎
//!
//! 从入口节点开始依次执行阶段：run -> merge -> 按出边决定下一节点，直到条件边返回 Exit。
//! 任一阶段失败立即终止并返回错误；状态转移次数超过上限视为图配置错误。

use tracing::Instrument;

use crate::core::{PipelineError, SharedState};
use crate::workflow::graph::StageGraph;
use crate::workflow::types::*;

/// 默认最大状态转移次数
pub const DEFAULT_MAX_TRANSITIONS: usize = 10_000;

/// 流水线引擎
pub struct PipelineEngine {
    graph: StageGraph,
    max_transitions: usize,
}

impl PipelineEngine {
    pub fn new(graph: StageGraph) -> Self {
        Self {
            graph,
            max_transitions: DEFAULT_MAX_TRANSITIONS,
        }
    }

    pub fn with_max_transitions(mut self, max_transitions: usize) -> Self {
        self.max_transitions = max_transitions;
        self
    }

    /// 以 user_prompt 初始化共享状态并运行到结束
    pub async fn run(&self, user_prompt: &str) -> Result<SharedState, PipelineError> {
        let run_id = uuid::Uuid::new_v4().to_string();
        let span = tracing::info_span!("pipeline", run_id = %run_id);
        self.drive(SharedState::new(user_prompt)).instrument(span).await
    }

    async fn drive(&self, mut state: SharedState) -> Result<SharedState, PipelineError> {
        let mut current = self.graph.entry();
        let mut transitions = 0usize;
        tracing::info!(entry = %current, "pipeline started");

        loop {
            if transitions >= self.max_transitions {
                return Err(GraphError::TransitionLimit(self.max_transitions).into());
            }
            transitions += 1;

            let stage = self.graph.stage(current)?;
            let update = stage
                .run(&state)
                .instrument(tracing::info_span!("stage", node = %current))
                .await
                .map_err(|e| {
                    tracing::error!(node = %current, error = %e, "stage failed");
                    e
                })?;
            state.merge(current, update)?;

            match self.graph.next(current, &state)? {
                Next::Node(next) => {
                    tracing::debug!(from = %current, to = %next, phase = ?state.phase(), "transition");
                    current = next;
                }
                Next::End => {
                    tracing::info!(transitions, "pipeline finished");
                    return Ok(state);
                }
            }
        }
    }
}
