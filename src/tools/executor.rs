//! 工具执行器
//!
//! 持有 ToolRegistry 与超时，execute(tool_name, args) 在超时内调用 registry.execute；
//! 每次调用输出结构化审计日志（JSON）。

use std::time::{Duration, Instant};

use tokio::time::timeout;

use crate::llm::ToolSpec;
use crate::tools::{ToolError, ToolRegistry};

/// 工具执行器：对每次调用施加超时并记录审计日志
pub struct ToolExecutor {
    registry: ToolRegistry,
    timeout: Duration,
}

impl ToolExecutor {
    pub fn new(registry: ToolRegistry, timeout: Duration) -> Self {
        Self { registry, timeout }
    }

    /// 执行指定工具；超时返回 ToolError::Timeout；输出 JSON 审计日志
    pub async fn execute(&self, tool_name: &str, args: serde_json::Value) -> Result<String, ToolError> {
        let start = Instant::now();
        let args_preview = args_preview(&args);
        let result = timeout(self.timeout, self.registry.execute(tool_name, args))
            .await
            .unwrap_or_else(|_| Err(ToolError::Timeout(tool_name.to_string())));

        let audit = serde_json::json!({
            "event": "tool_audit",
            "tool": tool_name,
            "ok": result.is_ok(),
            "outcome": outcome(&result),
            "duration_ms": start.elapsed().as_millis() as u64,
            "args_preview": args_preview,
        });
        tracing::info!(audit = %audit, "tool");
        result
    }

    pub fn specs(&self) -> Vec<ToolSpec> {
        self.registry.specs()
    }
}

/// 审计日志中的结果分类
fn outcome(result: &Result<String, ToolError>) -> &'static str {
    match result {
        Ok(_) => "ok",
        Err(ToolError::Timeout(_)) => "timeout",
        Err(e) if e.is_fatal() => "failed",
        Err(_) => "rejected",
    }
}

fn args_preview(args: &serde_json::Value) -> String {
    let s = args.to_string();
    if s.chars().count() > 200 {
        format!("{}...", s.chars().take(200).collect::<String>())
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::Tool;
    use async_trait::async_trait;
    use serde_json::{json, Value};

    struct SlowTool;

    #[async_trait]
    impl Tool for SlowTool {
        fn name(&self) -> &str {
            "slow"
        }

        fn description(&self) -> &str {
            "sleeps"
        }

        async fn execute(&self, _args: Value) -> Result<String, ToolError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok("late".to_string())
        }
    }

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "echo"
        }

        async fn execute(&self, args: Value) -> Result<String, ToolError> {
            Ok(args["text"].as_str().unwrap_or_default().to_string())
        }
    }

    #[tokio::test]
    async fn test_timeout_is_reported_and_recorded() {
        let mut registry = ToolRegistry::new();
        registry.register(SlowTool);
        let executor = ToolExecutor::new(registry, Duration::from_millis(20));

        let result = executor.execute("slow", json!({})).await;
        assert_eq!(outcome(&result), "timeout");
        let err = result.unwrap_err();
        assert!(matches!(err, ToolError::Timeout(_)));
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_outcome_classification() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool);
        let executor = ToolExecutor::new(registry, Duration::from_secs(1));

        let ok = executor.execute("echo", json!({"text": "a"})).await;
        assert_eq!(outcome(&ok), "ok");
        assert_eq!(ok.unwrap(), "a");

        let missing = executor.execute("missing", json!({})).await;
        assert_eq!(outcome(&missing), "rejected");

        let io: Result<String, ToolError> = Err(ToolError::io(
            "a.txt",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        ));
        assert_eq!(outcome(&io), "failed");
    }

    #[test]
    fn test_args_preview_truncates() {
        let long = json!({ "content": "x".repeat(500) });
        let preview = args_preview(&long);
        assert!(preview.ends_with("..."));
        assert_eq!(preview.chars().count(), 203);
    }
}
