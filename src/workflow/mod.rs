//! 工作流模块：Planner → Architect → Coder（自环）阶段图
//!
//! - types：节点、边、阶段 trait
//! - graph：已校验的阶段图与 Coder 路由
//! - builder：流畅的图构建 API
//! - engine：按图驱动阶段并合并共享状态

pub mod builder;
pub mod engine;
pub mod graph;
pub mod types;

pub use builder::GraphBuilder;
pub use engine::{PipelineEngine, DEFAULT_MAX_TRANSITIONS};
pub use graph::{route_after_coder, StageGraph};
pub use types::{Edge, GraphError, Next, NodeId, Route, Router, Stage};
