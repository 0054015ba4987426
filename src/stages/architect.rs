//! Architect 阶段：Plan -> TaskPlan

use std::sync::Arc;

use async_trait::async_trait;

use crate::core::{PipelineError, SharedState, StateUpdate, TaskPlan};
use crate::llm::{infer, output_schema_for, LlmClient};
use crate::stages::prompts::architect_prompt;
use crate::stages::require_output;
use crate::workflow::{NodeId, Stage};

pub struct ArchitectStage {
    llm: Arc<dyn LlmClient>,
}

impl ArchitectStage {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Stage for ArchitectStage {
    fn node(&self) -> NodeId {
        NodeId::Architect
    }

    async fn run(&self, state: &SharedState) -> Result<StateUpdate, PipelineError> {
        let plan = state.plan().ok_or(PipelineError::MissingState {
            field: "plan",
            node: NodeId::Architect,
        })?;
        let prompt = architect_prompt(plan);
        let schema = output_schema_for::<TaskPlan>(
            "TaskPlan",
            "Ordered implementation steps, dependencies first",
        );
        let task_plan: TaskPlan =
            require_output(NodeId::Architect, infer(self.llm.as_ref(), &prompt, &schema).await)?;
        for (i, step) in task_plan.steps().iter().enumerate() {
            tracing::debug!(step = i, filepath = %step.filepath, "planned step");
        }
        tracing::info!(steps = task_plan.len(), "task plan ready");
        Ok(StateUpdate::with_task_plan(task_plan))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Plan;
    use crate::llm::MockLlmClient;
    use serde_json::json;

    fn planned_state() -> SharedState {
        let mut state = SharedState::new("x");
        state
            .merge(
                NodeId::Planner,
                StateUpdate::with_plan(Plan {
                    name: "Counter".into(),
                    description: "counter".into(),
                    techstack: "html".into(),
                    features: vec![],
                    files: vec![],
                }),
            )
            .unwrap();
        state
    }

    #[tokio::test]
    async fn test_architect_keeps_step_order() {
        let mock = Arc::new(MockLlmClient::new().push_structured(Some(json!({
            "implementation_steps": [
                {"filepath": "index.html", "task_description": "markup"},
                {"filepath": "script.js", "task_description": "logic"}
            ]
        }))));
        let update = ArchitectStage::new(mock.clone())
            .run(&planned_state())
            .await
            .unwrap();
        let tp = update.task_plan.unwrap();
        let paths: Vec<_> = tp.steps().iter().map(|s| s.filepath.as_str()).collect();
        assert_eq!(paths, vec!["index.html", "script.js"]);
        assert!(mock.requests()[0].messages[0].content.contains("\"Counter\""));
    }

    #[tokio::test]
    async fn test_missing_plan() {
        let mock = Arc::new(MockLlmClient::new());
        let err = ArchitectStage::new(mock.clone())
            .run(&SharedState::new("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::MissingState { field: "plan", .. }));
        assert_eq!(mock.request_count(), 0);
    }

    #[tokio::test]
    async fn test_null_task_plan_is_planning_failure() {
        let mock = Arc::new(MockLlmClient::new().push_structured(None));
        let err = ArchitectStage::new(mock)
            .run(&planned_state())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::PlanningFailure { stage: NodeId::Architect, .. }
        ));
    }
}
