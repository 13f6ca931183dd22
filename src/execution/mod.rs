//! Tool execution
//!
//! Looks tools up, runs them, times them and logs every call.
//! A failing or unknown tool yields an invocation record, never an error.

use crate::audit::ToolLog;
use crate::models::ToolInput;
use crate::tools::ToolRegistry;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Success,
    Failed,
    Skipped,
}

/// Observation of one tool call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub invocation_id: Uuid,
    pub tool_name: String,
    pub input: Value,
    pub output: Value,
    pub status: ExecutionStatus,
    pub execution_time_ms: u64,
    pub created_at: DateTime<Utc>,
}

impl ToolInvocation {
    pub fn succeeded(&self) -> bool {
        self.status == ExecutionStatus::Success
    }

    /// The `formatted` text block a tool produced, if any
    pub fn formatted(&self) -> Option<&str> {
        self.output.get("formatted").and_then(Value::as_str)
    }
}

pub struct ToolExecutor {
    registry: ToolRegistry,
    log: Arc<ToolLog>,
}

impl ToolExecutor {
    pub fn new(registry: ToolRegistry, log: Arc<ToolLog>) -> Self {
        Self { registry, log }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn log(&self) -> &Arc<ToolLog> {
        &self.log
    }

    pub async fn run(&self, tool_name: &str, parameters: Value) -> ToolInvocation {
        let start = Instant::now();

        let input = ToolInput {
            tool_name: tool_name.to_string(),
            parameters: parameters.clone(),
        };

        let (status, output) = match self.registry.require(tool_name) {
            Ok(tool) => match tool.execute(&input).await {
                Ok(output) => (ExecutionStatus::Success, output.data),
                Err(e) => {
                    warn!(tool_name = %tool_name, error = %e, "Tool execution failed");
                    (ExecutionStatus::Failed, json!({ "error": e.to_string() }))
                }
            },
            Err(e) => {
                warn!(tool_name = %tool_name, "Tool not registered");
                (ExecutionStatus::Skipped, json!({ "error": e.to_string() }))
            }
        };

        let execution_time_ms = start.elapsed().as_millis() as u64;
        debug!(tool_name = %tool_name, ?status, execution_time_ms, "Tool invocation finished");

        self.log
            .record(tool_name, parameters.clone(), log_output(&status, &output))
            .await;

        ToolInvocation {
            invocation_id: Uuid::new_v4(),
            tool_name: tool_name.to_string(),
            input: parameters,
            output,
            status,
            execution_time_ms,
            created_at: Utc::now(),
        }
    }
}

/// Compact output for the log: drop bulky text, keep counts and flags
fn log_output(status: &ExecutionStatus, output: &Value) -> Value {
    match output.as_object() {
        Some(map) => {
            let mut compact = map.clone();
            compact.remove("formatted");
            compact.remove("content");
            compact.insert("status".to_string(), json!(status));
            Value::Object(compact)
        }
        None => json!({ "status": status, "output": output }),
    }
}
