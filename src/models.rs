//! Core data models for the document assistant

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::ConversionError;

//
// ================= Metadata =================
//

/// A single metadata value. Numbers, calendar dates, or free text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum MetadataValue {
    Number(f64),
    Date(NaiveDate),
    Text(String),
}

impl MetadataValue {
    /// Read the value as a number. Text is parsed after trimming; dates never convert.
    pub fn as_number(&self) -> std::result::Result<f64, ConversionError> {
        let parsed = match self {
            MetadataValue::Number(n) => Some(*n),
            MetadataValue::Text(s) => s.trim().parse::<f64>().ok(),
            MetadataValue::Date(_) => None,
        };

        match parsed {
            Some(n) if n.is_finite() => Ok(n),
            _ => Err(ConversionError {
                value: self.to_string(),
            }),
        }
    }
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                write!(f, "{}", *n as i64)
            }
            MetadataValue::Number(n) => write!(f, "{}", n),
            MetadataValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            MetadataValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<f64> for MetadataValue {
    fn from(value: f64) -> Self {
        MetadataValue::Number(value)
    }
}

impl From<i64> for MetadataValue {
    fn from(value: i64) -> Self {
        MetadataValue::Number(value as f64)
    }
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        MetadataValue::Text(value.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        MetadataValue::Text(value)
    }
}

impl From<NaiveDate> for MetadataValue {
    fn from(value: NaiveDate) -> Self {
        MetadataValue::Date(value)
    }
}

pub type Metadata = BTreeMap<String, MetadataValue>;

//
// ================= Documents =================
//

/// One stored document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Record {
    pub doc_id: String,
    pub title: String,
    pub content: String,
    /// Category label such as "invoice", "contract" or "claim"
    pub doc_type: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Record {
    pub fn new(
        doc_id: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
        doc_type: impl Into<String>,
    ) -> Self {
        Self {
            doc_id: doc_id.into(),
            title: title.into(),
            content: content.into(),
            doc_type: doc_type.into(),
            metadata: Metadata::new(),
        }
    }

    pub fn with_metadata(mut self, key: &str, value: impl Into<MetadataValue>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}

/// Scored projection of a record, built fresh for every query
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    pub doc_id: String,
    pub content: String,
    /// Record metadata merged with `title` and `doc_type`
    pub metadata: Metadata,
    pub relevance_score: f64,
}

impl SearchResult {
    pub fn title(&self) -> Option<String> {
        self.metadata.get("title").map(|v| v.to_string())
    }

    pub fn doc_type(&self) -> Option<String> {
        self.metadata.get("doc_type").map(|v| v.to_string())
    }
}

/// Aggregate view over the whole collection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreStatistics {
    pub total_documents: usize,
    pub documents_with_amounts: usize,
    pub total_amount: f64,
    pub average_amount: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_amount: Option<f64>,
    pub document_types: BTreeMap<String, usize>,
}

//
// ================= Tool I/O =================
//

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInput {
    pub tool_name: String,
    pub parameters: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutput {
    pub success: bool,
    pub data: serde_json::Value,
    pub error: Option<String>,
}

//
// ================= Intent =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum IntentType {
    Qa,
    Summarization,
    Calculation,
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserIntent {
    pub intent_type: IntentType,
    /// Share of the winning signal in all matched signals, 0.0..=1.0
    pub confidence: f32,
    pub reasoning: String,
}

//
// ================= Handler Responses =================
//

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerResponse {
    pub question: String,
    pub answer: String,
    pub sources: Vec<String>,
    pub confidence: f32,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarizationResponse {
    pub original_length: usize,
    pub summary: String,
    pub key_points: Vec<String>,
    pub document_ids: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalculationResponse {
    pub expression: String,
    pub result: f64,
    pub explanation: String,
    pub units: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateMemoryResponse {
    pub summary: String,
    pub document_ids: Vec<String>,
}

/// Everything a caller gets back for one processed message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnResponse {
    pub session_id: String,
    pub response: String,
    pub intent: UserIntent,
    pub tools_used: Vec<String>,
    pub sources: Vec<String>,
    pub actions_taken: Vec<String>,
    pub summary: String,
    /// Structured handler payload (answer, summary or calculation)
    pub details: serde_json::Value,
}

impl fmt::Display for IntentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IntentType::Qa => "qa",
            IntentType::Summarization => "summarization",
            IntentType::Calculation => "calculation",
            IntentType::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_value_conversion() {
        assert_eq!(MetadataValue::from(69300_i64).as_number(), Ok(69300.0));
        assert_eq!(MetadataValue::from(" 2450.5 ").as_number(), Ok(2450.5));
        assert!(MetadataValue::from("Under Review").as_number().is_err());

        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        assert!(MetadataValue::from(date).as_number().is_err());
    }

    #[test]
    fn test_metadata_value_display() {
        assert_eq!(MetadataValue::from(180000_i64).to_string(), "180000");
        assert_eq!(MetadataValue::from(12.5).to_string(), "12.5");
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(MetadataValue::from(date).to_string(), "2024-03-01");
    }

    #[test]
    fn test_metadata_value_untagged_json() {
        let values: Vec<MetadataValue> =
            serde_json::from_str(r#"[214500, "2024-03-01", "Global Corp"]"#).unwrap();
        assert_eq!(values[0], MetadataValue::Number(214500.0));
        assert!(matches!(values[1], MetadataValue::Date(_)));
        assert_eq!(values[2], MetadataValue::Text("Global Corp".to_string()));
    }
}
