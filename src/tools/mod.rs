//! Tool trait and registry
//!
//! Tools are deterministic operations over the shared document store.
//! Every call goes through the `ToolExecutor`, which logs it.

pub mod calculator;
pub mod documents;

use crate::error::AssistantError;
use crate::models::{ToolInput, ToolOutput};
use crate::retrieval::SharedStore;
use crate::Result;
use std::collections::BTreeMap;
use std::sync::Arc;

pub use calculator::CalculatorTool;
pub use documents::{DocumentReaderTool, DocumentSearchTool, DocumentStatisticsTool};

/// Trait for a single tool (deterministic execution)
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    async fn execute(&self, input: &ToolInput) -> Result<ToolOutput>;
}

/// Tool registry for looking up and executing tools
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
        }
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn require(&self, name: &str) -> Result<Arc<dyn Tool>> {
        self.get(name)
            .ok_or_else(|| AssistantError::ToolNotFound(name.to_string()))
    }

    /// Registered tool names, sorted
    pub fn list(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    pub fn describe(&self) -> Vec<(&'static str, &'static str)> {
        self.tools
            .values()
            .map(|tool| (tool.name(), tool.description()))
            .collect()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Format an amount as `$1,234.56`
pub fn format_amount(amount: f64) -> String {
    let sign = if amount < 0.0 { "-" } else { "" };
    let fixed = format!("{:.2}", amount.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    format!("{}${}.{}", sign, grouped, cents)
}

/// Create the default registry: document search, reader, statistics and calculator.
pub fn create_default_registry(store: SharedStore) -> ToolRegistry {
    let mut registry = ToolRegistry::new();

    registry.register(Arc::new(DocumentSearchTool::new(store.clone())));
    registry.register(Arc::new(DocumentReaderTool::new(store.clone())));
    registry.register(Arc::new(DocumentStatisticsTool::new(store)));
    registry.register(Arc::new(CalculatorTool));

    registry
}
