//! 阶段图
//!
//! 每个节点恰有一条出边（无条件或条件）；引擎从入口节点开始，按出边决定下一步。

use std::collections::HashMap;
use std::sync::Arc;

use crate::core::SharedState;
use crate::workflow::types::*;

/// 已校验的阶段图，由 GraphBuilder 构建
pub struct StageGraph {
    pub(crate) entry: NodeId,
    pub(crate) stages: HashMap<NodeId, Arc<dyn Stage>>,
    pub(crate) edges: HashMap<NodeId, Edge>,
}

impl StageGraph {
    pub fn entry(&self) -> NodeId {
        self.entry
    }

    pub fn stage(&self, node: NodeId) -> Result<Arc<dyn Stage>, GraphError> {
        self.stages
            .get(&node)
            .cloned()
            .ok_or(GraphError::UnknownNode(node))
    }

    /// 根据 from 的出边与当前状态决定下一步
    pub fn next(&self, from: NodeId, state: &SharedState) -> Result<Next, GraphError> {
        match self.edges.get(&from) {
            Some(Edge::To(to)) => Ok(Next::Node(*to)),
            Some(Edge::Conditional { router, continue_to }) => match router(state) {
                Route::Continue => Ok(Next::Node(*continue_to)),
                Route::Exit => Ok(Next::End),
            },
            None => Err(GraphError::NoOutgoingEdge(from)),
        }
    }
}

/// Coder 的自环路由：status = DONE 时结束，否则回到 Coder
pub fn route_after_coder(state: &SharedState) -> Route {
    if state.is_done() {
        Route::Exit
    } else {
        Route::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CoderState, StateUpdate, TaskPlan};

    #[test]
    fn test_route_after_coder_loops_until_done() {
        let mut state = SharedState::new("x");
        assert_eq!(route_after_coder(&state), Route::Continue);

        state
            .merge(NodeId::Architect, StateUpdate::with_task_plan(TaskPlan::default()))
            .unwrap();
        let cs = CoderState::new(state.task_plan().unwrap().clone());
        state
            .merge(NodeId::Coder, StateUpdate::with_coder_state(cs.clone()))
            .unwrap();
        assert_eq!(route_after_coder(&state), Route::Continue);

        state.merge(NodeId::Coder, StateUpdate::default().done()).unwrap();
        assert_eq!(route_after_coder(&state), Route::Exit);
    }

    #[test]
    fn test_node_display() {
        assert_eq!(NodeId::Planner.to_string(), "planner");
        assert_eq!(NodeId::Architect.to_string(), "architect");
        assert_eq!(NodeId::Coder.to_string(), "coder");
    }
}
