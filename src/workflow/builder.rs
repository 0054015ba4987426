//! 阶段图构建器
//!
//! 提供流畅的 API 注册节点与边，build 时校验：入口存在、边的两端均已注册、每个节点恰有一条出边。

use std::collections::HashMap;
use std::sync::Arc;

use crate::workflow::graph::StageGraph;
use crate::workflow::types::*;

/// 阶段图构建器
#[derive(Default)]
pub struct GraphBuilder {
    entry: Option<NodeId>,
    stages: HashMap<NodeId, Arc<dyn Stage>>,
    edges: HashMap<NodeId, Edge>,
    errors: Vec<GraphError>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册阶段，节点标识取自 Stage::node
    pub fn node(mut self, stage: Arc<dyn Stage>) -> Self {
        let id = stage.node();
        if self.stages.insert(id, stage).is_some() {
            self.errors.push(GraphError::DuplicateNode(id));
        }
        self
    }

    /// 无条件边
    pub fn edge(self, from: NodeId, to: NodeId) -> Self {
        self.add_edge(from, Edge::To(to))
    }

    /// 条件边：router 返回 Continue 时走 continue_to，否则结束
    pub fn conditional_edge(self, from: NodeId, router: Router, continue_to: NodeId) -> Self {
        self.add_edge(from, Edge::Conditional { router, continue_to })
    }

    /// 设置入口节点
    pub fn entry(mut self, node: NodeId) -> Self {
        self.entry = Some(node);
        self
    }

    fn add_edge(mut self, from: NodeId, edge: Edge) -> Self {
        if self.edges.insert(from, edge).is_some() {
            self.errors.push(GraphError::DuplicateEdge(from));
        }
        self
    }

    /// 校验并构建
    pub fn build(self) -> Result<StageGraph, GraphError> {
        if let Some(err) = self.errors.into_iter().next() {
            return Err(err);
        }
        let entry = self.entry.ok_or(GraphError::MissingEntry)?;
        if !self.stages.contains_key(&entry) {
            return Err(GraphError::UnknownNode(entry));
        }
        for (from, edge) in &self.edges {
            if !self.stages.contains_key(from) {
                return Err(GraphError::UnknownNode(*from));
            }
            let to = match edge {
                Edge::To(to) => to,
                Edge::Conditional { continue_to, .. } => continue_to,
            };
            if !self.stages.contains_key(to) {
                return Err(GraphError::UnknownNode(*to));
            }
        }
        for node in self.stages.keys() {
            if !self.edges.contains_key(node) {
                return Err(GraphError::NoOutgoingEdge(*node));
            }
        }
        Ok(StageGraph {
            entry,
            stages: self.stages,
            edges: self.edges,
        })
    }
}
