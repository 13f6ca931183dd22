//! Conversation history storage
//!
//! Stores and manages conversation messages with timestamps and metadata

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use uuid::Uuid;

/// Role of a message sender
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

/// A single message in the conversation history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub message_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub role: MessageRole,
    pub content: String,
    /// Approximate token count
    pub token_count: usize,
    /// Intent or handler that produced the message (qa, summarization, ...)
    pub message_type: Option<String>,
    /// Document ids referenced by this message
    #[serde(default)]
    pub document_ids: Vec<String>,
}

impl ConversationMessage {
    pub fn new(role: MessageRole, content: String, message_type: Option<String>) -> Self {
        let token_count = (content.len() + 3) / 4;

        Self {
            message_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            role,
            content,
            token_count,
            message_type,
            document_ids: Vec::new(),
        }
    }

    pub fn with_documents(mut self, document_ids: Vec<String>) -> Self {
        self.document_ids = document_ids;
        self
    }
}

/// Ordered conversation for one session
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationHistory {
    messages: VecDeque<ConversationMessage>,
    total_tokens: usize,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_message(&mut self, message: ConversationMessage) {
        self.total_tokens += message.token_count;
        self.messages.push_back(message);
    }

    pub fn messages(&self) -> impl Iterator<Item = &ConversationMessage> {
        self.messages.iter()
    }

    /// N most recent messages, newest first
    pub fn recent_messages(
        &self,
        count: usize,
    ) -> impl DoubleEndedIterator<Item = &ConversationMessage> {
        self.messages.iter().rev().take(count)
    }

    /// N most recent messages from `role`, oldest first
    pub fn recent_by_role(&self, role: MessageRole, count: usize) -> Vec<&ConversationMessage> {
        let mut picked: Vec<&ConversationMessage> = self
            .messages
            .iter()
            .rev()
            .filter(|m| m.role == role)
            .take(count)
            .collect();
        picked.reverse();
        picked
    }

    pub fn total_tokens(&self) -> usize {
        self.total_tokens
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    fn recompute_total_tokens(&mut self) {
        self.total_tokens = self.messages.iter().map(|m| m.token_count).sum();
    }

    /// Transcript of the `count` most recent messages, oldest first
    pub fn get_formatted_context(&self, count: usize) -> String {
        let mut context = String::new();
        context.push_str("## Conversation History\n\n");

        for msg in self.recent_messages(count).rev() {
            let role_str = match msg.role {
                MessageRole::User => "**User**",
                MessageRole::Assistant => "**Assistant**",
            };

            context.push_str(&format!(
                "{}: {} ({})\n\n",
                role_str,
                msg.content,
                msg.timestamp.format("%H:%M:%S")
            ));
        }

        context
    }

    /// Drop the oldest messages until at most `keep_count` remain
    pub fn trim_to_recent(&mut self, keep_count: usize) {
        while self.messages.len() > keep_count {
            self.messages.pop_front();
        }
        self.recompute_total_tokens();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversation_message_creation() {
        let msg = ConversationMessage::new(
            MessageRole::User,
            "What is the total for INV-002?".to_string(),
            Some("qa".to_string()),
        )
        .with_documents(vec!["INV-002".to_string()]);
        assert_eq!(msg.role, MessageRole::User);
        assert!(msg.token_count > 0);
        assert_eq!(msg.document_ids, vec!["INV-002".to_string()]);
    }

    #[test]
    fn test_conversation_history() {
        let mut history = ConversationHistory::new();

        history.add_message(ConversationMessage::new(
            MessageRole::User,
            "Summarize all contracts".to_string(),
            None,
        ));
        history.add_message(ConversationMessage::new(
            MessageRole::Assistant,
            "CON-001 is a 12 month service agreement...".to_string(),
            Some("summarization".to_string()),
        ));

        assert_eq!(history.message_count(), 2);
        assert!(history.total_tokens() > 0);
        assert_eq!(history.recent_by_role(MessageRole::User, 5).len(), 1);
        assert_eq!(history.recent_by_role(MessageRole::Assistant, 5)[0].message_type.as_deref(), Some("summarization"));

        let transcript = history.get_formatted_context(1);
        assert!(transcript.contains("**Assistant**: CON-001"));
        assert!(!transcript.contains("Summarize all contracts"));
    }

    #[test]
    fn test_trim_to_recent() {
        let mut history = ConversationHistory::new();

        for i in 0..10 {
            history.add_message(ConversationMessage::new(
                MessageRole::User,
                format!("Question {}", i),
                None,
            ));
        }

        let before = history.total_tokens();
        history.trim_to_recent(5);
        assert_eq!(history.message_count(), 5);
        assert!(history.total_tokens() < before);
        assert_eq!(history.messages().next().unwrap().content, "Question 5");

        let recent: Vec<_> = history.recent_by_role(MessageRole::User, 2);
        assert_eq!(recent[0].content, "Question 8");
        assert_eq!(recent[1].content, "Question 9");

        history.trim_to_recent(0);
        assert!(history.is_empty());
        assert_eq!(history.total_tokens(), 0);
    }
}
