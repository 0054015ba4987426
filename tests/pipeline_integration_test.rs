//! 流水线集成测试：Mock LLM + 临时项目目录，驱动完整的 Planner → Architect → Coder 运行

use std::sync::Arc;

use codeforge::core::{PipelineError, PipelinePhase};
use codeforge::llm::{AssistantTurn, MockLlmClient, Role, ToolCall};
use codeforge::stages::{CoderSettings, VerifyMode};
use codeforge::tools::{ProjectFs, WritePolicy};
use codeforge::workflow::NodeId;
use codeforge::Pipeline;
use serde_json::{json, Value};

fn plan_json() -> Value {
    json!({
        "name": "Counter",
        "description": "A click counter",
        "techstack": "html, css, javascript",
        "features": ["increment", "reset"],
        "files": [
            {"path": "index.html", "purpose": "markup"},
            {"path": "style.css", "purpose": "styles"},
            {"path": "script.js", "purpose": "behaviour"}
        ]
    })
}

fn task_plan_json(paths: &[&str]) -> Value {
    let steps: Vec<Value> = paths
        .iter()
        .map(|p| json!({"filepath": p, "task_description": format!("implement {p}")}))
        .collect();
    json!({ "implementation_steps": steps })
}

fn write_call(id: &str, path: &str, content: &str) -> AssistantTurn {
    AssistantTurn::calls(vec![ToolCall::new(
        id,
        "write_file",
        json!({"path": path, "content": content}),
    )])
}

fn pipeline(mock: Arc<MockLlmClient>, settings: CoderSettings) -> (tempfile::TempDir, Arc<ProjectFs>, Pipeline) {
    let dir = tempfile::tempdir().unwrap();
    let fs = Arc::new(ProjectFs::new(dir.path().join("generated_project")).unwrap());
    let pipeline = Pipeline::new(mock, fs.clone(), settings).unwrap();
    (dir, fs, pipeline)
}

#[tokio::test]
async fn test_single_step_run_writes_index_html() {
    let mock = Arc::new(
        MockLlmClient::new()
            .push_structured(Some(plan_json()))
            .push_structured(Some(task_plan_json(&["index.html"])))
            .push_turn(write_call("c1", "index.html", "<button id=\"inc\">+</button>"))
            .push_turn(AssistantTurn::text("Saved index.html")),
    );
    let (_dir, fs, pipeline) = pipeline(mock.clone(), CoderSettings::default());

    let state = pipeline.run("Build a click counter").await.unwrap();

    assert!(state.is_done());
    assert_eq!(state.phase(), PipelinePhase::Done);
    assert_eq!(state.user_prompt(), "Build a click counter");
    assert_eq!(state.plan().unwrap().name, "Counter");
    let cs = state.coder_state().unwrap();
    assert_eq!(cs.current_step_idx(), 1);
    assert_eq!(cs.records().len(), 1);
    assert!(cs.records()[0].wrote_target);
    assert_eq!(fs.list(None).unwrap(), vec!["index.html"]);
    assert_eq!(fs.read("index.html").unwrap(), "<button id=\"inc\">+</button>");
    assert_eq!(mock.remaining(), 0);

    let out = serde_json::to_value(&state).unwrap();
    assert_eq!(out["status"], "DONE");
    assert_eq!(out["coder_state"]["current_step_idx"], 1);
}

#[tokio::test]
async fn test_context_accumulates_across_steps() {
    let mock = Arc::new(
        MockLlmClient::new()
            .push_structured(Some(plan_json()))
            .push_structured(Some(task_plan_json(&["index.html", "style.css", "script.js"])))
            .push_turn(write_call("a", "index.html", "<div id=\"count\">0</div>"))
            .push_turn(AssistantTurn::text("ok"))
            .push_turn(write_call("b", "style.css", "#count { font-size: 2rem; }"))
            .push_turn(AssistantTurn::text("ok"))
            .push_turn(write_call("c", "script.js", "let n = 0;"))
            .push_turn(AssistantTurn::text("ok")),
    );
    let (_dir, fs, pipeline) = pipeline(mock.clone(), CoderSettings::default());

    let state = pipeline.run("counter").await.unwrap();
    assert!(state.is_done());
    assert_eq!(fs.list(None).unwrap(), vec!["index.html", "script.js", "style.css"]);

    let requests = mock.requests();
    assert_eq!(requests.len(), 8);
    let task_prompt = |i: usize| {
        let msgs = &requests[i].messages;
        assert_eq!(msgs[0].role, Role::System);
        assert_eq!(msgs[1].role, Role::User);
        msgs[1].content.clone()
    };

    // 第 1 步：上下文为空
    let first = task_prompt(2);
    assert!(first.starts_with("=== EXISTING PROJECT FILES ==="));
    assert!(!first.contains("--- "));

    // 第 2 步：只包含 index.html
    let second = task_prompt(4);
    assert!(second.contains("--- index.html ---\n<div id=\"count\">0</div>"));
    assert!(!second.contains("--- style.css ---"));

    // 第 3 步：按顺序包含 index.html 与 style.css
    let third = task_prompt(6);
    let html = third.find("--- index.html ---").unwrap();
    let css = third.find("--- style.css ---").unwrap();
    assert!(html < css);
    assert!(third.contains("#count { font-size: 2rem; }"));
    assert!(!third.contains("--- script.js ---"));
    assert!(third.contains("Path: script.js"));

    // 每次对话都只暴露四个工具
    assert_eq!(
        requests[2].tools,
        vec!["get_current_directory", "list_files", "read_file", "write_file"]
    );

    let steps: Vec<usize> = state
        .coder_state()
        .unwrap()
        .records()
        .iter()
        .map(|r| r.step)
        .collect();
    assert_eq!(steps, vec![0, 1, 2]);
}

#[tokio::test]
async fn test_empty_task_plan_completes_immediately() {
    let mock = Arc::new(
        MockLlmClient::new()
            .push_structured(Some(plan_json()))
            .push_structured(Some(task_plan_json(&[]))),
    );
    let (_dir, fs, pipeline) = pipeline(mock.clone(), CoderSettings::default());

    let state = pipeline.run("nothing to do").await.unwrap();
    assert!(state.is_done());
    assert_eq!(state.coder_state().unwrap().current_step_idx(), 0);
    assert_eq!(mock.request_count(), 2);
    assert!(fs.list(None).unwrap().is_empty());
}

#[tokio::test]
async fn test_null_plan_stops_before_architect() {
    let mock = Arc::new(
        MockLlmClient::new()
            .push_structured(None)
            .push_structured(Some(task_plan_json(&["index.html"])))
            .push_turn(write_call("a", "index.html", "x")),
    );
    let (_dir, fs, pipeline) = pipeline(mock.clone(), CoderSettings::default());

    let err = pipeline.run("anything").await.unwrap_err();
    assert!(matches!(
        err,
        PipelineError::PlanningFailure { stage: NodeId::Planner, .. }
    ));
    assert_eq!(mock.request_count(), 1);
    assert!(fs.list(None).unwrap().is_empty());
}

#[tokio::test]
async fn test_null_task_plan_stops_before_coder() {
    let mock = Arc::new(
        MockLlmClient::new()
            .push_structured(Some(plan_json()))
            .push_structured(Some(Value::Null)),
    );
    let (_dir, fs, pipeline) = pipeline(mock.clone(), CoderSettings::default());

    let err = pipeline.run("anything").await.unwrap_err();
    assert!(matches!(
        err,
        PipelineError::PlanningFailure { stage: NodeId::Architect, .. }
    ));
    assert_eq!(mock.request_count(), 2);
    assert!(fs.list(None).unwrap().is_empty());
}

#[tokio::test]
async fn test_silent_step_still_advances() {
    let mock = Arc::new(
        MockLlmClient::new()
            .push_structured(Some(plan_json()))
            .push_structured(Some(task_plan_json(&["index.html", "script.js"])))
            .push_turn(AssistantTurn::text("Here is the HTML you asked for"))
            .push_turn(write_call("b", "script.js", "let n = 0;"))
            .push_turn(AssistantTurn::text("done")),
    );
    let (_dir, fs, pipeline) = pipeline(mock, CoderSettings::default());

    let state = pipeline.run("counter").await.unwrap();
    let records = state.coder_state().unwrap().records();
    assert_eq!(records.len(), 2);
    assert!(!records[0].wrote_target);
    assert!(records[1].wrote_target);
    assert_eq!(fs.list(None).unwrap(), vec!["script.js"]);
}

#[tokio::test]
async fn test_strict_verification_aborts_run() {
    let mock = Arc::new(
        MockLlmClient::new()
            .push_structured(Some(plan_json()))
            .push_structured(Some(task_plan_json(&["index.html", "script.js"])))
            .push_turn(AssistantTurn::text("no tools today")),
    );
    let settings = CoderSettings {
        verify: VerifyMode::Strict,
        ..CoderSettings::default()
    };
    let (_dir, _fs, pipeline) = pipeline(mock.clone(), settings);

    let err = pipeline.run("counter").await.unwrap_err();
    assert!(matches!(err, PipelineError::TargetNotWritten { step: 0, .. }));
    assert_eq!(mock.request_count(), 3);
}

#[tokio::test]
async fn test_target_only_policy_rejects_other_files() {
    let mock = Arc::new(
        MockLlmClient::new()
            .push_structured(Some(plan_json()))
            .push_structured(Some(task_plan_json(&["index.html"])))
            .push_turn(write_call("a", "script.js", "sneaky"))
            .push_turn(write_call("b", "index.html", "<p>ok</p>"))
            .push_turn(AssistantTurn::text("done")),
    );
    let settings = CoderSettings {
        write_policy: WritePolicy::TargetOnly,
        ..CoderSettings::default()
    };
    let (_dir, fs, pipeline) = pipeline(mock.clone(), settings);

    let state = pipeline.run("counter").await.unwrap();
    assert!(state.is_done());
    assert_eq!(fs.list(None).unwrap(), vec!["index.html"]);

    // 拒绝信息作为工具结果交还模型
    let after_denied = &mock.requests()[3].messages;
    let denied = after_denied.last().unwrap();
    assert_eq!(denied.role, Role::Tool);
    assert!(denied.content.starts_with("Error: Write denied"));
}

#[tokio::test]
async fn test_escape_attempt_is_reported_not_fatal() {
    let mock = Arc::new(
        MockLlmClient::new()
            .push_structured(Some(plan_json()))
            .push_structured(Some(task_plan_json(&["index.html"])))
            .push_turn(write_call("a", "../outside.html", "x"))
            .push_turn(write_call("b", "index.html", "<p>ok</p>"))
            .push_turn(AssistantTurn::text("done")),
    );
    let (dir, fs, pipeline) = pipeline(mock, CoderSettings::default());

    let state = pipeline.run("counter").await.unwrap();
    assert!(state.is_done());
    assert!(!dir.path().join("outside.html").exists());
    assert_eq!(fs.list(None).unwrap(), vec!["index.html"]);
}

#[tokio::test]
async fn test_tool_round_budget_truncates_step() {
    let list = || AssistantTurn::calls(vec![ToolCall::new("l", "list_files", json!({}))]);
    let mock = Arc::new(
        MockLlmClient::new()
            .push_structured(Some(plan_json()))
            .push_structured(Some(task_plan_json(&["index.html"])))
            .push_turn(list())
            .push_turn(list())
            .push_turn(list()),
    );
    let settings = CoderSettings {
        max_tool_rounds: 2,
        ..CoderSettings::default()
    };
    let (_dir, _fs, pipeline) = pipeline(mock.clone(), settings);

    let state = pipeline.run("counter").await.unwrap();
    let record = &state.coder_state().unwrap().records()[0];
    assert!(record.budget_exhausted);
    assert_eq!(record.model_turns, 2);
    assert_eq!(mock.remaining(), 1);
}

#[tokio::test]
async fn test_each_run_starts_fresh() {
    let mock = Arc::new(
        MockLlmClient::new()
            .push_structured(Some(plan_json()))
            .push_structured(Some(task_plan_json(&[])))
            .push_structured(Some(plan_json()))
            .push_structured(Some(task_plan_json(&[]))),
    );
    let (_dir, _fs, pipeline) = pipeline(mock.clone(), CoderSettings::default());

    let first = pipeline.run("one").await.unwrap();
    let second = pipeline.run("two").await.unwrap();
    assert_eq!(first.user_prompt(), "one");
    assert_eq!(second.user_prompt(), "two");
    assert!(second.is_done());
    assert_eq!(mock.request_count(), 4);
}
