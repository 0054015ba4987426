//! 工作流类型定义
//!
//! 节点、边、路由结果与阶段 trait。图只有三个节点，Coder 通过条件边自环直到 status = DONE。

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::{PipelineError, SharedState, StateUpdate};

/// 图节点标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeId {
    Planner,
    Architect,
    Coder,
}

impl NodeId {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeId::Planner => "planner",
            NodeId::Architect => "architect",
            NodeId::Coder => "coder",
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 条件边的路由结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// 走 continue_to 指向的节点
    Continue,
    /// 结束运行
    Exit,
}

/// 路由函数：只读共享状态
pub type Router = fn(&SharedState) -> Route;

/// 出边
#[derive(Clone, Copy)]
pub enum Edge {
    /// 无条件边
    To(NodeId),
    /// 条件边：router 返回 Continue 时走 continue_to，Exit 时结束
    Conditional { router: Router, continue_to: NodeId },
}

/// 引擎下一步
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Next {
    Node(NodeId),
    End,
}

/// 图构建与执行错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("Graph has no entry node")]
    MissingEntry,
    #[error("Unknown node: {0}")]
    UnknownNode(NodeId),
    #[error("Node registered twice: {0}")]
    DuplicateNode(NodeId),
    #[error("Node {0} already has an outgoing edge")]
    DuplicateEdge(NodeId),
    #[error("Node {0} has no outgoing edge")]
    NoOutgoingEdge(NodeId),
    #[error("Transition limit reached ({0})")]
    TransitionLimit(usize),
}

/// 流水线阶段：读取共享状态，返回部分更新
#[async_trait]
pub trait Stage: Send + Sync {
    /// 该阶段对应的节点
    fn node(&self) -> NodeId;

    async fn run(&self, state: &SharedState) -> Result<StateUpdate, PipelineError>;
}
