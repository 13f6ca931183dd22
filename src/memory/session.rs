//! Session persistence
//!
//! One pretty-printed JSON file per session under the sessions directory.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::AssistantError;
use crate::memory::store::ConversationHistory;
use crate::Result;

const MAX_SESSION_ID_LEN: usize = 128;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    pub session_id: String,
    pub user_id: String,
    #[serde(default)]
    pub history: ConversationHistory,
    /// Active document ids, first-seen order, no duplicates
    #[serde(default)]
    pub document_context: Vec<String>,
    #[serde(default)]
    pub conversation_summary: String,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl SessionState {
    pub fn new(session_id: String, user_id: String) -> Self {
        let now = Utc::now();
        Self {
            session_id,
            user_id,
            history: ConversationHistory::new(),
            document_context: Vec::new(),
            conversation_summary: String::new(),
            created_at: now,
            last_updated: now,
        }
    }

    /// Merge ids into the active document context, keeping first-seen order
    pub fn merge_documents<'a>(&mut self, ids: impl IntoIterator<Item = &'a String>) {
        for id in ids {
            if !self.document_context.contains(id) {
                self.document_context.push(id.clone());
            }
        }
    }

    pub fn touch(&mut self) {
        self.last_updated = Utc::now();
    }
}

/// Reject ids that could escape the sessions directory
pub fn validate_session_id(session_id: &str) -> Result<()> {
    let valid = !session_id.is_empty()
        && session_id.len() <= MAX_SESSION_ID_LEN
        && session_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

    if valid {
        Ok(())
    } else {
        Err(AssistantError::InvalidSessionId(session_id.to_string()))
    }
}

/// File-backed session storage
#[derive(Debug, Clone)]
pub struct SessionStore {
    root: PathBuf,
}

impl SessionStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, session_id: &str) -> Result<PathBuf> {
        validate_session_id(session_id)?;
        Ok(self.root.join(format!("{}.json", session_id)))
    }

    pub async fn exists(&self, session_id: &str) -> Result<bool> {
        let path = self.path_for(session_id)?;
        Ok(tokio::fs::try_exists(&path).await?)
    }

    pub async fn load(&self, session_id: &str) -> Result<SessionState> {
        let path = self.path_for(session_id)?;

        let raw = match tokio::fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AssistantError::SessionNotFound(session_id.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        serde_json::from_slice(&raw).map_err(|e| {
            AssistantError::SessionError(format!("Corrupt session file {}: {}", path.display(), e))
        })
    }

    pub async fn save(&self, session: &SessionState) -> Result<()> {
        let path = self.path_for(&session.session_id)?;
        let json = serde_json::to_vec_pretty(session)?;
        tokio::fs::write(&path, json).await?;
        debug!(session_id = %session.session_id, path = %path.display(), "Session saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::store::{ConversationMessage, MessageRole};

    #[test]
    fn test_validate_session_id() {
        assert!(validate_session_id("demo_user-1").is_ok());
        assert!(validate_session_id("6f1c8a0e-0000-4000-8000-000000000000").is_ok());
        assert!(validate_session_id("").is_err());
        assert!(validate_session_id("../etc/passwd").is_err());
        assert!(validate_session_id("a b").is_err());
    }

    #[test]
    fn test_merge_documents_dedupes() {
        let mut session = SessionState::new("s1".into(), "u1".into());
        let first = vec!["INV-001".to_string(), "CON-001".to_string()];
        let second = vec!["CON-001".to_string(), "CLM-001".to_string()];
        session.merge_documents(&first);
        session.merge_documents(&second);
        assert_eq!(session.document_context, vec!["INV-001", "CON-001", "CLM-001"]);
    }

    #[tokio::test]
    async fn test_save_load_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("sessions")).unwrap();

        assert!(!store.exists("s1").await.unwrap());
        assert!(matches!(
            store.load("s1").await,
            Err(AssistantError::SessionNotFound(_))
        ));

        let mut session = SessionState::new("s1".into(), "demo_user".into());
        session.history.add_message(ConversationMessage::new(
            MessageRole::User,
            "hello".into(),
            None,
        ));
        session.conversation_summary = "greeting".into();
        store.save(&session).await.unwrap();

        assert!(store.exists("s1").await.unwrap());
        let loaded = store.load("s1").await.unwrap();
        assert_eq!(loaded.user_id, "demo_user");
        assert_eq!(loaded.history.message_count(), 1);
        assert_eq!(loaded.conversation_summary, "greeting");
    }

    #[tokio::test]
    async fn test_corrupt_and_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path()).unwrap();

        std::fs::write(dir.path().join("broken.json"), b"{not json").unwrap();
        assert!(matches!(
            store.load("broken").await,
            Err(AssistantError::SessionError(_))
        ));
        assert!(matches!(
            store.exists("../x").await,
            Err(AssistantError::InvalidSessionId(_))
        ));
    }
}
