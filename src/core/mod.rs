//! 核心层：阶段产物、共享状态与错误类型

pub mod artifacts;
pub mod error;
pub mod state;

pub use artifacts::{ImplementationStep, Plan, PlannedFile, TaskPlan};
pub use error::PipelineError;
pub use state::{
    CoderPhase, CoderState, PipelinePhase, RunStatus, SharedState, StateUpdate, StepRecord,
};
