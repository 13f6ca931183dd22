//! Intent Classifier
//!
//! Classifies user inputs as one of:
//! - Qa: questions about specific documents or facts ("what's the total in INV-001?")
//! - Summarization: overviews of one or more documents ("summarize all contracts")
//! - Calculation: arithmetic or aggregates over amounts ("sum of all invoice totals")
//! - Unknown: nothing recognisable

use lazy_static::lazy_static;
use regex::Regex;

use crate::models::{IntentType, UserIntent};

/// Static keyword lists, zero allocation
const CALCULATION_KEYWORDS: &[&str] = &[
    "calculate", "compute", "sum of", "the sum", "add up", "average", "mean", "difference",
    "subtract", "multiply", "divide", "percentage", "how much in total", "combined",
];

const SUMMARIZATION_KEYWORDS: &[&str] = &[
    "summarize", "summarise", "summary", "overview", "recap", "brief",
    "key points", "highlights", "outline", "tl;dr",
];

const QA_KEYWORDS: &[&str] = &[
    "what", "which", "who", "when", "where", "how", "is there", "are there",
    "find", "show", "list", "search", "tell me", "look up",
    "invoice", "contract", "claim", "document",
];

lazy_static! {
    static ref ARITHMETIC: Regex =
        Regex::new(r"\d[\d,.]*\s*[+*/^%×]\s*\(?\$?\d|\d[\d,.]*\s+[-x]\s+\(?\$?\d")
            .expect("arithmetic pattern is valid");
    /// Letter prefix, dash, digits: INV-001, CON-42, LEASE-2024
    static ref DOC_ID: Regex =
        Regex::new(r"\b[A-Z]{2,10}-\d{1,8}\b").expect("doc id pattern is valid");
}

/// Weight of an inline arithmetic expression relative to a single keyword hit
const ARITHMETIC_WEIGHT: usize = 3;

/// Intent classifier
pub struct IntentClassifier;

impl IntentClassifier {
    /// Classify free text into an intent with a confidence and a short reason
    pub fn classify(text: &str) -> UserIntent {
        let lower = text.to_lowercase();

        let mut calculation = count_hits(&lower, CALCULATION_KEYWORDS);
        if ARITHMETIC.is_match(&lower) {
            calculation += ARITHMETIC_WEIGHT;
        }

        let summarization = count_hits(&lower, SUMMARIZATION_KEYWORDS);

        let mut qa = count_hits(&lower, QA_KEYWORDS);
        if lower.trim_end().ends_with('?') {
            qa += 1;
        }
        if DOC_ID.is_match(&text.to_uppercase()) {
            qa += 1;
        }

        let total = calculation + summarization + qa;
        if total == 0 {
            return UserIntent {
                intent_type: IntentType::Unknown,
                confidence: 0.0,
                reasoning: "No question, summary or calculation cues found".to_string(),
            };
        }

        // Ties resolve calculation > summarization > qa
        let (intent_type, score, reason) = if calculation > 0
            && calculation >= summarization
            && calculation >= qa
        {
            (IntentType::Calculation, calculation, "calculation cues")
        } else if summarization > 0 && summarization >= qa {
            (IntentType::Summarization, summarization, "summarization cues")
        } else {
            (IntentType::Qa, qa, "question cues")
        };

        UserIntent {
            intent_type,
            confidence: score as f32 / total as f32,
            reasoning: format!(
                "Matched {} {} (calculation={}, summarization={}, qa={})",
                score, reason, calculation, summarization, qa
            ),
        }
    }
}

fn count_hits(text: &str, keywords: &[&str]) -> usize {
    keywords.iter().filter(|kw| text.contains(**kw)).count()
}

/// Document identifiers ("INV-001", "LEASE-2024") mentioned in text, upper-cased,
/// first occurrence order
pub fn mentioned_doc_ids(text: &str) -> Vec<String> {
    let upper = text.to_uppercase();
    let mut ids: Vec<String> = Vec::new();
    for m in DOC_ID.find_iter(&upper) {
        let id = m.as_str().to_string();
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    ids
}
