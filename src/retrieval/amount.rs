//! Monetary amounts: derivation from metadata and natural-language amount queries

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::models::Metadata;

/// Metadata keys probed for a record's amount, highest priority first.
pub const AMOUNT_FIELDS: &[&str] = &["total", "amount", "value", "total_amount", "total_value"];

pub const DEFAULT_EXACT_TOLERANCE: f64 = 0.01;
pub const DEFAULT_APPROXIMATE_PERCENT: f64 = 10.0;

/// Widening applied to the smallest/largest amount when no cue is present
const FALLBACK_LOWER_FACTOR: f64 = 0.9;
const FALLBACK_UPPER_FACTOR: f64 = 1.1;

lazy_static! {
    static ref AMOUNT_PATTERN: Regex =
        Regex::new(r"\$?(\d+(?:,\d{3})*(?:\.\d{2})?)").expect("amount pattern is valid");
}

/// First present, numerically convertible value among [`AMOUNT_FIELDS`].
///
/// Values that fail conversion are skipped rather than reported.
pub fn derive_amount(metadata: &Metadata) -> Option<f64> {
    AMOUNT_FIELDS
        .iter()
        .filter_map(|field| metadata.get(*field))
        .find_map(|value| value.as_number().ok())
}

/// All amount tokens in `text`, in order of appearance.
pub fn extract_amounts(text: &str) -> Vec<f64> {
    AMOUNT_PATTERN
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .filter_map(|m| m.as_str().replace(',', "").parse::<f64>().ok())
        .filter(|amount| amount.is_finite())
        .collect()
}

/// Comparison families recognised in free text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmountCue {
    Greater,
    Less,
    Between,
    Approximate,
    Exact,
}

/// Cue families in evaluation order. The first family with a phrase present
/// in the text decides the comparison.
pub const CUE_TABLE: &[(AmountCue, &[&str])] = &[
    (AmountCue::Greater, &["over", "above", "more than", "greater than", ">"]),
    (AmountCue::Less, &["under", "below", "less than", "<"]),
    (AmountCue::Between, &["between", "range", "from"]),
    (AmountCue::Approximate, &["around", "about", "approximately", "roughly", "~"]),
    (AmountCue::Exact, &["exactly", "exact", "precisely", "="]),
];

impl AmountCue {
    /// Detect the first cue family present in already lower-cased text.
    pub fn detect(text_lower: &str) -> Option<Self> {
        CUE_TABLE
            .iter()
            .find(|(_, phrases)| phrases.iter().any(|p| text_lower.contains(p)))
            .map(|(cue, _)| *cue)
    }
}

/// The store operation a free-text amount query resolves to
#[derive(Debug, Clone, PartialEq)]
pub enum AmountQuery {
    Range { min: Option<f64>, max: Option<f64> },
    Approximate { target: f64 },
    Exact { target: f64 },
    Keyword { query: String },
}

impl AmountQuery {
    /// Resolve free text into a concrete query.
    pub fn parse(text: &str) -> Self {
        let lower = text.to_lowercase();
        let amounts = extract_amounts(text);

        let resolved = AmountCue::detect(&lower).and_then(|cue| match (cue, amounts.as_slice()) {
            (AmountCue::Greater, [first, ..]) => Some(AmountQuery::Range {
                min: Some(*first),
                max: None,
            }),
            (AmountCue::Less, [first, ..]) => Some(AmountQuery::Range {
                min: None,
                max: Some(*first),
            }),
            (AmountCue::Between, [a, b, ..]) => Some(AmountQuery::Range {
                min: Some(a.min(*b)),
                max: Some(a.max(*b)),
            }),
            (AmountCue::Approximate, [first, ..]) => {
                Some(AmountQuery::Approximate { target: *first })
            }
            (AmountCue::Exact, [first, ..]) => Some(AmountQuery::Exact { target: *first }),
            _ => None,
        });

        if let Some(query) = resolved {
            return query;
        }

        if amounts.is_empty() {
            return AmountQuery::Keyword {
                query: text.to_string(),
            };
        }

        let smallest = amounts.iter().copied().fold(f64::INFINITY, f64::min);
        let largest = amounts.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        AmountQuery::Range {
            min: Some(smallest * FALLBACK_LOWER_FACTOR),
            max: Some(largest * FALLBACK_UPPER_FACTOR),
        }
    }
}
