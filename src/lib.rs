//! Document Assistant
//!
//! A conversational assistant over a small collection of business documents
//! (invoices, contracts, claims) that:
//! - Answers questions about specific documents or amount criteria
//! - Summarizes documents by id, category or session context
//! - Runs safe arithmetic and aggregates over document amounts
//! - Persists sessions and logs every tool call
//!
//! TURN:
//! INPUT → CLASSIFY → HANDLE → UPDATE MEMORY → SAVE

pub mod agent;
pub mod api;
pub mod audit;
pub mod classifier;
pub mod config;
pub mod error;
pub mod execution;
pub mod memory;
pub mod models;
pub mod retrieval;
pub mod tools;

pub use error::Result;

// Re-export common types
pub use agent::DocumentAssistant;
pub use classifier::IntentClassifier;
pub use config::AssistantConfig;
pub use models::*;
pub use retrieval::{DocumentStore, SearchRequest, SearchType, SharedStore};
