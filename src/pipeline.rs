//! 流水线装配：Planner → Architect → Coder（自环），入口 run(user_prompt)

use std::sync::Arc;

use crate::config::AppConfig;
use crate::core::{PipelineError, SharedState};
use crate::llm::{create_llm_from_config, LlmClient};
use crate::stages::{ArchitectStage, CoderSettings, CoderStage, PlannerStage};
use crate::tools::ProjectFs;
use crate::workflow::{route_after_coder, GraphBuilder, NodeId, PipelineEngine, StageGraph};

/// 构建三阶段图
pub fn build_graph(
    llm: Arc<dyn LlmClient>,
    fs: Arc<ProjectFs>,
    settings: CoderSettings,
) -> Result<StageGraph, PipelineError> {
    let graph = GraphBuilder::new()
        .node(Arc::new(PlannerStage::new(llm.clone())))
        .node(Arc::new(ArchitectStage::new(llm.clone())))
        .node(Arc::new(CoderStage::new(llm, fs, settings)))
        .entry(NodeId::Planner)
        .edge(NodeId::Planner, NodeId::Architect)
        .edge(NodeId::Architect, NodeId::Coder)
        .conditional_edge(NodeId::Coder, route_after_coder, NodeId::Coder)
        .build()?;
    Ok(graph)
}

/// 代码生成流水线；不在多次运行之间保留状态
pub struct Pipeline {
    engine: PipelineEngine,
    llm: Arc<dyn LlmClient>,
}

impl Pipeline {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        fs: Arc<ProjectFs>,
        settings: CoderSettings,
    ) -> Result<Self, PipelineError> {
        let engine = PipelineEngine::new(build_graph(llm.clone(), fs, settings)?);
        Ok(Self { engine, llm })
    }

    /// 按配置创建 LLM 客户端与项目根目录
    pub fn from_config(cfg: &AppConfig) -> Result<Self, PipelineError> {
        let llm = create_llm_from_config(&cfg.llm)?;
        let fs = Arc::new(ProjectFs::new(&cfg.app.project_root)?);
        tracing::info!(project_root = %fs.root().display(), "project root ready");
        let pipeline = Self::new(llm, fs, cfg.coder.settings())?;
        Ok(pipeline.with_max_transitions(cfg.engine.max_transitions))
    }

    pub fn with_max_transitions(mut self, max_transitions: usize) -> Self {
        self.engine = self.engine.with_max_transitions(max_transitions);
        self
    }

    /// 运行到结束；无论成败都输出客户端累计的 token 用量
    pub async fn run(&self, user_prompt: &str) -> Result<SharedState, PipelineError> {
        let result = self.engine.run(user_prompt).await;
        let (prompt_tokens, completion_tokens, total_tokens) = self.llm.token_usage();
        tracing::info!(
            prompt_tokens,
            completion_tokens,
            total_tokens,
            ok = result.is_ok(),
            "token usage"
        );
        result
    }
}
