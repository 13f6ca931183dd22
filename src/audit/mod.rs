//! Tool usage log
//!
//! Every tool invocation is recorded as a timestamped JSON entry and the
//! whole log is rewritten to disk after each entry.

use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolLogEntry {
    pub timestamp: DateTime<Utc>,
    pub tool_name: String,
    pub input: Value,
    pub output: Value,
}

/// Tool usage storage with automatic persistence
pub struct ToolLog {
    entries: Arc<RwLock<Vec<ToolLogEntry>>>,
    log_file: Option<PathBuf>,
}

impl ToolLog {
    /// Log kept in memory only
    pub fn in_memory() -> Self {
        Self {
            entries: Arc::new(RwLock::new(Vec::new())),
            log_file: None,
        }
    }

    /// Log persisted under `logs_dir`: `session_<id>.json` when a session id is
    /// given, otherwise `tool_usage_<YYYYmmdd_HHMMSS>.json`.
    pub fn persistent(logs_dir: &Path, session_id: Option<&str>) -> Result<Self> {
        std::fs::create_dir_all(logs_dir)?;

        let file_name = match session_id {
            Some(id) => format!("session_{}.json", id),
            None => format!("tool_usage_{}.json", Utc::now().format("%Y%m%d_%H%M%S")),
        };

        Ok(Self {
            entries: Arc::new(RwLock::new(Vec::new())),
            log_file: Some(logs_dir.join(file_name)),
        })
    }

    pub fn log_file(&self) -> Option<&Path> {
        self.log_file.as_deref()
    }

    /// Record one invocation and persist the log
    pub async fn record(&self, tool_name: &str, input: Value, output: Value) -> ToolLogEntry {
        let entry = ToolLogEntry {
            timestamp: Utc::now(),
            tool_name: tool_name.to_string(),
            input,
            output,
        };

        let mut entries = self.entries.write().await;
        entries.push(entry.clone());

        if let Some(path) = &self.log_file {
            if let Err(e) = write_entries(path, &entries).await {
                warn!(path = %path.display(), error = %e, "Failed to auto-save tool log");
            }
        }

        entry
    }

    pub async fn entries(&self) -> Vec<ToolLogEntry> {
        self.entries.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Write a copy of the log to an explicit path
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        let entries = self.entries.read().await;
        write_entries(path, &entries).await
    }
}

impl Default for ToolLog {
    fn default() -> Self {
        Self::in_memory()
    }
}

async fn write_entries(path: &Path, entries: &[ToolLogEntry]) -> Result<()> {
    let json = serde_json::to_vec_pretty(entries)?;
    tokio::fs::write(path, json).await?;
    Ok(())
}
