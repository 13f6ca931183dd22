//! Environment-driven configuration
//!
//! Binaries call `dotenv::dotenv()` first, so values may come from a `.env` file.

use crate::error::AssistantError;
use crate::retrieval::DEFAULT_KEYWORD_LIMIT;
use crate::Result;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_HISTORY_WINDOW: usize = 20;

#[derive(Debug, Clone)]
pub struct AssistantConfig {
    /// Directory holding one JSON file per session
    pub sessions_dir: PathBuf,
    /// Directory receiving tool usage logs
    pub logs_dir: PathBuf,
    pub api_port: u16,
    /// Messages kept in a session's history after each turn
    pub history_window: usize,
    /// Result cap for keyword searches issued by the assistant
    pub keyword_limit: usize,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            sessions_dir: PathBuf::from("./sessions"),
            logs_dir: PathBuf::from("./logs"),
            api_port: DEFAULT_PORT,
            history_window: DEFAULT_HISTORY_WINDOW,
            keyword_limit: DEFAULT_KEYWORD_LIMIT,
        }
    }
}

impl AssistantConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let sessions_dir = env::var("DOC_ASSISTANT_SESSIONS_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.sessions_dir);

        let logs_dir = env::var("DOC_ASSISTANT_LOGS_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.logs_dir);

        let api_port = match env::var("PORT").or_else(|_| env::var("API_PORT")) {
            Ok(raw) => parse_var("PORT", &raw)?,
            Err(_) => defaults.api_port,
        };

        let history_window = match env::var("DOC_ASSISTANT_HISTORY_WINDOW") {
            Ok(raw) => parse_var("DOC_ASSISTANT_HISTORY_WINDOW", &raw)?,
            Err(_) => defaults.history_window,
        };

        let keyword_limit = match env::var("DOC_ASSISTANT_KEYWORD_LIMIT") {
            Ok(raw) => parse_var("DOC_ASSISTANT_KEYWORD_LIMIT", &raw)?,
            Err(_) => defaults.keyword_limit,
        };

        Ok(Self {
            sessions_dir,
            logs_dir,
            api_port,
            history_window,
            keyword_limit,
        })
    }
}

fn parse_var<T: FromStr>(name: &str, raw: &str) -> Result<T> {
    raw.trim().parse().map_err(|_| {
        AssistantError::Config(format!("{} has an invalid value: {:?}", name, raw))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AssistantConfig::default();
        assert_eq!(config.api_port, 8080);
        assert_eq!(config.keyword_limit, 3);
        assert_eq!(config.sessions_dir, PathBuf::from("./sessions"));
    }

    #[test]
    fn test_parse_var() {
        let port: u16 = parse_var("PORT", " 9090 ").unwrap();
        assert_eq!(port, 9090);

        let bad: Result<u16> = parse_var("PORT", "not-a-port");
        assert!(matches!(bad, Err(AssistantError::Config(_))));
    }
}
