//! 工具对话循环
//!
//! system + user -> 模型回合 -> 若有工具调用则逐个执行并把结果作为 tool 消息回写 -> 下一回合；
//! 模型不再调用工具或达到回合上限时结束。文件系统失败（I/O、超时）中止运行，其余工具错误作为结果交还模型。

use crate::core::PipelineError;
use crate::llm::{LlmClient, Message};
use crate::tools::ToolExecutor;

/// Observation 日志预览最大字符数
const OBSERVATION_PREVIEW_CHARS: usize = 200;

/// 一次对话的结果摘要
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DialogueOutcome {
    /// 模型回合数
    pub turns: usize,
    /// 依次执行的工具名
    pub tool_calls: Vec<String>,
    /// 是否因回合上限被截断
    pub budget_exhausted: bool,
}

/// 运行工具对话，最多 max_turns 个模型回合
pub async fn converse(
    llm: &dyn LlmClient,
    executor: &ToolExecutor,
    system_prompt: &str,
    user_prompt: &str,
    max_turns: usize,
) -> Result<DialogueOutcome, PipelineError> {
    let specs = executor.specs();
    let mut messages = vec![Message::system(system_prompt), Message::user(user_prompt)];
    let mut outcome = DialogueOutcome::default();

    loop {
        if outcome.turns >= max_turns {
            tracing::warn!(max_turns, "tool dialogue hit turn limit");
            outcome.budget_exhausted = true;
            break;
        }

        let turn = llm.chat(&messages, &specs).await?;
        outcome.turns += 1;
        messages.push(Message::from_turn(&turn));

        if let Some(text) = &turn.content {
            tracing::debug!(turn = outcome.turns, text = %text, "model reply");
        }
        if !turn.has_tool_calls() {
            break;
        }

        for call in &turn.tool_calls {
            outcome.tool_calls.push(call.name.clone());
            let observation = match executor.execute(&call.name, call.arguments.clone()).await {
                Ok(output) => output,
                Err(e) if e.is_fatal() => return Err(e.into()),
                Err(e) => {
                    tracing::warn!(tool = %call.name, error = %e, "tool call rejected");
                    format!("Error: {e}")
                }
            };
            tracing::debug!(
                tool = %call.name,
                preview = %preview(&observation),
                "observation"
            );
            messages.push(Message::tool_result(call.id.clone(), observation));
        }
    }

    Ok(outcome)
}

fn preview(text: &str) -> String {
    if text.chars().count() > OBSERVATION_PREVIEW_CHARS {
        format!("{}...", text.chars().take(OBSERVATION_PREVIEW_CHARS).collect::<String>())
    } else {
        text.to_string()
    }
}
