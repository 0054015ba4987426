//! Planner 阶段：user_prompt -> Plan

use std::sync::Arc;

use async_trait::async_trait;

use crate::core::{PipelineError, Plan, SharedState, StateUpdate};
use crate::llm::{infer, output_schema_for, LlmClient};
use crate::stages::prompts::planner_prompt;
use crate::stages::require_output;
use crate::workflow::{NodeId, Stage};

pub struct PlannerStage {
    llm: Arc<dyn LlmClient>,
}

impl PlannerStage {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Stage for PlannerStage {
    fn node(&self) -> NodeId {
        NodeId::Planner
    }

    async fn run(&self, state: &SharedState) -> Result<StateUpdate, PipelineError> {
        let prompt = planner_prompt(state.user_prompt());
        let schema = output_schema_for::<Plan>("Plan", "A complete engineering project plan");
        let plan: Plan = require_output(NodeId::Planner, infer(self.llm.as_ref(), &prompt, &schema).await)?;
        tracing::info!(
            name = %plan.name,
            files = plan.files.len(),
            features = plan.features.len(),
            "plan ready"
        );
        Ok(StateUpdate::with_plan(plan))
    }
}
