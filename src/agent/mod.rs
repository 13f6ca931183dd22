//! Document assistant - one conversational turn
//!
//! INPUT → CLASSIFY → HANDLE (qa | summarize | calculate) → UPDATE MEMORY → SAVE

use crate::audit::ToolLog;
use crate::classifier::{mentioned_doc_ids, IntentClassifier};
use crate::config::AssistantConfig;
use crate::execution::{ToolExecutor, ToolInvocation};
use crate::memory::{ConversationMessage, MessageRole, SessionState, SessionStore};
use crate::models::{
    AnswerResponse, CalculationResponse, IntentType, SummarizationResponse, TurnResponse,
    UpdateMemoryResponse, UserIntent,
};
use crate::retrieval::{derive_amount, SharedStore};
use crate::tools::calculator::Aggregate;
use crate::tools::{create_default_registry, format_amount};
use crate::Result;
use chrono::Utc;
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

const MAX_KEY_POINTS_PER_DOCUMENT: usize = 5;
const SUMMARY_RECENT_REQUESTS: usize = 3;

lazy_static! {
    static ref EXPRESSION: Regex = Regex::new(
        r"[-+(]*\$?\d[\d,.]*\)*(?:(?:\s*(?:\*\*|[+*/%^×])\s*|\s+-\s+)[-+(]*\$?\d[\d,.]*\)*)+"
    )
    .expect("expression pattern is valid");
}

const HELP_TEXT: &str = "I can answer questions about the documents, summarize them, \
and run calculations over their amounts. Try \"What's the total in INV-002?\", \
\"Summarize all contracts\" or \"Calculate the sum of all invoice totals\".";

/// What a handler produced for one turn
struct HandlerOutcome {
    response: String,
    tools_used: Vec<String>,
    sources: Vec<String>,
    details: Value,
}

impl HandlerOutcome {
    fn new() -> Self {
        Self {
            response: String::new(),
            tools_used: Vec::new(),
            sources: Vec::new(),
            details: Value::Null,
        }
    }

    fn track(&mut self, invocation: &ToolInvocation) {
        if !self.tools_used.contains(&invocation.tool_name) {
            self.tools_used.push(invocation.tool_name.clone());
        }
    }

    fn add_source(&mut self, doc_id: &str) {
        if !self.sources.iter().any(|s| s == doc_id) {
            self.sources.push(doc_id.to_string());
        }
    }
}

/// Calculator call a calculation request resolves to
struct CalculationPlan {
    parameters: Value,
    /// Human-readable form of what is computed
    expression: String,
    explanation: String,
}

pub struct DocumentAssistant {
    store: SharedStore,
    executor: ToolExecutor,
    sessions: SessionStore,
    config: AssistantConfig,
}

impl DocumentAssistant {
    pub fn new(
        store: SharedStore,
        executor: ToolExecutor,
        sessions: SessionStore,
        config: AssistantConfig,
    ) -> Self {
        Self {
            store,
            executor,
            sessions,
            config,
        }
    }

    /// Wire the default tools, a persistent tool log and file-backed sessions
    pub fn from_config(config: AssistantConfig, store: SharedStore) -> Result<Self> {
        let log = Arc::new(ToolLog::persistent(&config.logs_dir, None)?);
        let executor = ToolExecutor::new(create_default_registry(store.clone()), log);
        let sessions = SessionStore::new(config.sessions_dir.clone())?;

        Ok(Self::new(store, executor, sessions, config))
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn executor(&self) -> &ToolExecutor {
        &self.executor
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Resume `session_id` if it exists on disk, otherwise start a new session.
    pub async fn start_session(
        &self,
        user_id: &str,
        session_id: Option<&str>,
    ) -> Result<SessionState> {
        if let Some(id) = session_id {
            if self.sessions.exists(id).await? {
                info!(session_id = %id, "Resumed session");
                return self.sessions.load(id).await;
            }
        }

        let id = session_id
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let session = SessionState::new(id, user_id.to_string());
        self.sessions.save(&session).await?;

        info!(session_id = %session.session_id, user_id = %user_id, "Started new session");
        Ok(session)
    }

    pub async fn process_message(&self, session_id: &str, text: &str) -> Result<TurnResponse> {
        let mut session = self.sessions.load(session_id).await?;
        let mut actions_taken = vec!["classify_intent".to_string()];

        let intent = IntentClassifier::classify(text);
        info!(
            session_id = %session_id,
            intent = %intent.intent_type,
            confidence = intent.confidence,
            "Classified message"
        );

        let outcome = match intent.intent_type {
            IntentType::Qa => {
                actions_taken.push("qa_agent".to_string());
                self.answer_question(text, &intent).await
            }
            IntentType::Summarization => {
                actions_taken.push("summarization_agent".to_string());
                self.summarize(text, &session).await
            }
            IntentType::Calculation => {
                actions_taken.push("calculation_agent".to_string());
                self.calculate(text).await
            }
            IntentType::Unknown => {
                actions_taken.push("unknown_handler".to_string());
                let mut outcome = HandlerOutcome::new();
                outcome.response = HELP_TEXT.to_string();
                outcome
            }
        };

        let memory = self.update_memory(&mut session, text, &intent, &outcome);
        actions_taken.push("update_memory".to_string());
        self.sessions.save(&session).await?;

        debug!(
            session_id = %session_id,
            tools_used = ?outcome.tools_used,
            sources = ?outcome.sources,
            "Turn completed"
        );

        Ok(TurnResponse {
            session_id: session.session_id,
            response: outcome.response,
            intent,
            tools_used: outcome.tools_used,
            sources: outcome.sources,
            actions_taken,
            summary: memory.summary,
            details: outcome.details,
        })
    }

    /// Listing used by the `/docs` command
    pub async fn list_documents(&self) -> String {
        let store = self.store.read().await;
        let mut out = String::new();

        for record in store.records() {
            out.push_str(&format!("ID: {}\n", record.doc_id));
            out.push_str(&format!("Title: {}\n", record.title));
            out.push_str(&format!("Type: {}\n", record.doc_type));
            if let Some(amount) = derive_amount(&record.metadata) {
                out.push_str(&format!("Amount: {}\n", format_amount(amount)));
            }
            out.push_str(&"-".repeat(40));
            out.push('\n');
        }

        out
    }

    // =============================
    // Handlers
    // =============================

    async fn answer_question(&self, text: &str, intent: &UserIntent) -> HandlerOutcome {
        let mut outcome = HandlerOutcome::new();
        let mut parts = Vec::new();

        let ids = mentioned_doc_ids(text);
        if ids.is_empty() {
            let invocation = self
                .executor
                .run(
                    "document_search",
                    json!({
                        "query": text,
                        "search_type": "auto",
                        "limit": self.config.keyword_limit,
                    }),
                )
                .await;
            outcome.track(&invocation);
            for doc_id in result_ids(&invocation) {
                outcome.add_source(&doc_id);
            }
            parts.push(invocation_text(&invocation));
        } else {
            for doc_id in &ids {
                let invocation = self
                    .executor
                    .run("document_reader", json!({ "doc_id": doc_id }))
                    .await;
                outcome.track(&invocation);
                if invocation.output["found"] == json!(true) {
                    outcome.add_source(doc_id);
                }
                parts.push(invocation_text(&invocation));
            }
        }

        let confidence = if outcome.sources.is_empty() {
            0.0
        } else {
            intent.confidence
        };

        let answer = AnswerResponse {
            question: text.to_string(),
            answer: parts.join("\n\n"),
            sources: outcome.sources.clone(),
            confidence,
            timestamp: Utc::now(),
        };

        outcome.response = answer.answer.clone();
        outcome.details = json!(answer);
        outcome
    }

    async fn summarize(&self, text: &str, session: &SessionState) -> HandlerOutcome {
        let mut outcome = HandlerOutcome::new();
        let targets = self.resolve_targets(text, session, &mut outcome).await;

        let mut original_length = 0;
        let mut key_points = Vec::new();
        let mut sections = Vec::new();

        for doc_id in &targets {
            let invocation = self
                .executor
                .run("document_reader", json!({ "doc_id": doc_id }))
                .await;
            outcome.track(&invocation);

            let Some(content) = invocation.output.get("content").and_then(Value::as_str) else {
                continue;
            };
            outcome.add_source(doc_id);
            original_length += content.chars().count();

            let points = extract_key_points(content);
            let title = invocation.output["title"].as_str().unwrap_or("Untitled");
            let mut header = format!("{} ({})", doc_id, title);
            if let Some(amount) = invocation.output["amount"].as_f64() {
                header.push_str(&format!(", amount {}", format_amount(amount)));
            }

            let mut section = format!("{}:\n", header);
            for point in &points {
                section.push_str(&format!("  - {}\n", point));
            }
            sections.push(section);
            key_points.extend(points.into_iter().map(|p| format!("{}: {}", doc_id, p)));
        }

        let summary = if sections.is_empty() {
            "No matching documents to summarize.".to_string()
        } else {
            format!(
                "Summary of {} document(s):\n\n{}",
                sections.len(),
                sections.join("\n")
            )
        };

        let response = SummarizationResponse {
            original_length,
            summary: summary.clone(),
            key_points,
            document_ids: outcome.sources.clone(),
            timestamp: Utc::now(),
        };

        outcome.response = summary;
        outcome.details = json!(response);
        outcome
    }

    async fn calculate(&self, text: &str) -> HandlerOutcome {
        let mut outcome = HandlerOutcome::new();

        let plan = match EXPRESSION.find(text) {
            Some(m) => {
                let expression = m.as_str().trim().to_string();
                CalculationPlan {
                    parameters: json!({ "expression": expression }),
                    expression,
                    explanation: "Evaluated the arithmetic expression in the request".to_string(),
                }
            }
            None => match self.plan_aggregate(text, &mut outcome).await {
                Some(plan) => plan,
                None => {
                    outcome.response =
                        "No document amounts found to calculate with.".to_string();
                    return outcome;
                }
            },
        };
        let CalculationPlan {
            parameters,
            expression,
            explanation,
        } = plan;

        let invocation = self.executor.run("calculator", parameters).await;
        outcome.track(&invocation);

        let Some(result) = invocation.output["result"].as_f64() else {
            outcome.response = format!("Could not calculate {}: {}", expression, invocation_text(&invocation));
            return outcome;
        };

        let units = (!outcome.sources.is_empty()).then(|| "USD".to_string());
        let rendered = match units {
            Some(_) => format_amount(result),
            None => result.to_string(),
        };

        let response = CalculationResponse {
            expression: expression.clone(),
            result,
            explanation: explanation.clone(),
            units,
            timestamp: Utc::now(),
        };

        outcome.response = format!("{}\n{} = {}", explanation, expression, rendered);
        outcome.details = json!(response);
        outcome
    }

    // =============================
    // Helpers
    // =============================

    /// Documents a request is about: explicit ids, category words,
    /// the session's active documents, then a keyword search.
    async fn resolve_targets(
        &self,
        text: &str,
        session: &SessionState,
        outcome: &mut HandlerOutcome,
    ) -> Vec<String> {
        let ids = mentioned_doc_ids(text);
        if !ids.is_empty() {
            return ids;
        }

        let categories = self.mentioned_categories(text).await;
        if !categories.is_empty() {
            let mut found = Vec::new();
            for category in categories {
                let invocation = self
                    .executor
                    .run(
                        "document_search",
                        json!({ "query": text, "search_type": "type", "doc_type": category }),
                    )
                    .await;
                outcome.track(&invocation);
                found.extend(result_ids(&invocation));
            }
            return found;
        }

        if !session.document_context.is_empty() {
            return session.document_context.clone();
        }

        let invocation = self
            .executor
            .run(
                "document_search",
                json!({ "query": text, "search_type": "keyword", "limit": self.config.keyword_limit }),
            )
            .await;
        outcome.track(&invocation);
        result_ids(&invocation)
    }

    async fn mentioned_categories(&self, text: &str) -> Vec<String> {
        let lower = text.to_lowercase();
        self.store
            .read()
            .await
            .categories()
            .into_iter()
            .filter(|category| lower.contains(category.as_str()))
            .collect()
    }

    /// Sum or average over the amounts of the documents in scope. The values go
    /// to the calculator as a list, so the number of documents is unbounded.
    async fn plan_aggregate(
        &self,
        text: &str,
        outcome: &mut HandlerOutcome,
    ) -> Option<CalculationPlan> {
        let lower = text.to_lowercase();
        let aggregate = if lower.contains("average") || lower.contains("mean") {
            Aggregate::Average
        } else {
            Aggregate::Sum
        };

        let ids = mentioned_doc_ids(text);
        let categories = self.mentioned_categories(text).await;

        let mut amounts: Vec<(String, f64)> = Vec::new();
        if !ids.is_empty() {
            for doc_id in ids {
                let invocation = self
                    .executor
                    .run("document_reader", json!({ "doc_id": doc_id }))
                    .await;
                outcome.track(&invocation);
                if let Some(amount) = invocation.output["amount"].as_f64() {
                    amounts.push((doc_id, amount));
                }
            }
        } else {
            let requests: Vec<Value> = if categories.is_empty() {
                vec![json!({ "query": text, "search_type": "all" })]
            } else {
                categories
                    .iter()
                    .map(|c| json!({ "query": text, "search_type": "type", "doc_type": c }))
                    .collect()
            };

            for request in requests {
                let invocation = self.executor.run("document_search", request).await;
                outcome.track(&invocation);
                amounts.extend(result_amounts(&invocation));
            }
        }

        if amounts.is_empty() {
            return None;
        }

        for (doc_id, _) in &amounts {
            outcome.add_source(doc_id);
        }

        let values: Vec<f64> = amounts.iter().map(|(_, a)| *a).collect();
        let sum = values
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(" + ");
        let (expression, label) = match aggregate {
            Aggregate::Sum => (sum, "Sum"),
            Aggregate::Average => (format!("({}) / {}", sum, values.len()), "Average"),
        };

        let explanation = format!(
            "{} of the amounts in {}",
            label,
            outcome.sources.join(", ")
        );

        Some(CalculationPlan {
            parameters: json!({ "operation": aggregate, "values": values }),
            expression,
            explanation,
        })
    }

    fn update_memory(
        &self,
        session: &mut SessionState,
        text: &str,
        intent: &UserIntent,
        outcome: &HandlerOutcome,
    ) -> UpdateMemoryResponse {
        let kind = Some(intent.intent_type.to_string());

        session.history.add_message(ConversationMessage::new(
            MessageRole::User,
            text.to_string(),
            kind.clone(),
        ));
        session.history.add_message(
            ConversationMessage::new(MessageRole::Assistant, outcome.response.clone(), kind)
                .with_documents(outcome.sources.clone()),
        );
        session.merge_documents(&outcome.sources);

        let recent: Vec<&str> = session
            .history
            .recent_by_role(MessageRole::User, SUMMARY_RECENT_REQUESTS)
            .into_iter()
            .map(|m| m.content.as_str())
            .collect();

        let mut summary = format!("Recent requests: {}.", recent.join(" | "));
        if !session.document_context.is_empty() {
            summary.push_str(&format!(
                " Active documents: {}.",
                session.document_context.join(", ")
            ));
        }

        session.conversation_summary = summary.clone();
        session.history.trim_to_recent(self.config.history_window);
        session.touch();

        UpdateMemoryResponse {
            summary,
            document_ids: outcome.sources.clone(),
        }
    }
}

fn invocation_text(invocation: &ToolInvocation) -> String {
    invocation
        .formatted()
        .map(str::to_string)
        .or_else(|| invocation.output["error"].as_str().map(|e| format!("Error: {}", e)))
        .unwrap_or_default()
}

fn result_ids(invocation: &ToolInvocation) -> Vec<String> {
    invocation.output["documents"]
        .as_array()
        .map(|docs| {
            docs.iter()
                .filter_map(|d| d["doc_id"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

fn result_amounts(invocation: &ToolInvocation) -> Vec<(String, f64)> {
    invocation.output["documents"]
        .as_array()
        .map(|docs| {
            docs.iter()
                .filter_map(|d| Some((d["doc_id"].as_str()?.to_string(), d["amount"].as_f64()?)))
                .collect()
        })
        .unwrap_or_default()
}

/// Lines of the form "Label: value", trimmed of list markers
fn extract_key_points(content: &str) -> Vec<String> {
    content
        .lines()
        .map(|line| line.trim().trim_start_matches("- ").trim())
        .filter(|line| {
            line.split_once(':')
                .map_or(false, |(label, value)| !label.is_empty() && !value.trim().is_empty())
        })
        .take(MAX_KEY_POINTS_PER_DOCUMENT)
        .map(str::to_string)
        .collect()
}
