//! 阶段产物：Plan（Planner 输出）与 TaskPlan（Architect 输出）
//!
//! 两者都通过 schemars 生成 JSON Schema，作为结构化输出约束交给 LLM；创建后只读。

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// 计划中的单个文件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PlannedFile {
    /// 文件路径，相对项目根目录，如 index.html、src/app.js
    pub path: String,
    /// 该文件的用途
    pub purpose: String,
}

/// Planner 产出的工程计划
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Plan {
    /// 应用名称
    pub name: String,
    /// 一句话描述要构建的应用
    pub description: String,
    /// 技术栈，如 "html, css, javascript"
    pub techstack: String,
    /// 功能列表
    pub features: Vec<String>,
    /// 需要创建的文件
    pub files: Vec<PlannedFile>,
}

/// 单个实现步骤：目标文件 + 自然语言任务描述
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ImplementationStep {
    /// 要修改的文件路径
    pub filepath: String,
    /// 具体要实现的内容：标识符、事件处理、与前序步骤的集成方式
    pub task_description: String,
}

impl ImplementationStep {
    pub fn new(filepath: impl Into<String>, task_description: impl Into<String>) -> Self {
        Self {
            filepath: filepath.into(),
            task_description: task_description.into(),
        }
    }
}

/// Architect 产出的有序步骤列表；顺序即依赖顺序（被依赖者在前）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TaskPlan {
    /// 按依赖顺序排列的实现步骤
    pub implementation_steps: Vec<ImplementationStep>,
}

impl TaskPlan {
    pub fn new(implementation_steps: Vec<ImplementationStep>) -> Self {
        Self {
            implementation_steps,
        }
    }

    pub fn steps(&self) -> &[ImplementationStep] {
        &self.implementation_steps
    }

    pub fn len(&self) -> usize {
        self.implementation_steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.implementation_steps.is_empty()
    }
}
