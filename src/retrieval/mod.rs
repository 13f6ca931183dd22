//! In-memory document store and query engine
//!
//! Holds a small set of records and answers keyword, category and
//! amount queries against them. Query operations never fail: an empty
//! vector means "no results", a missing identifier is `None`.

pub mod amount;
pub mod seed;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::models::{Record, SearchResult, StoreStatistics};
pub use amount::{
    derive_amount, extract_amounts, AmountCue, AmountQuery, AMOUNT_FIELDS,
    DEFAULT_APPROXIMATE_PERCENT, DEFAULT_EXACT_TOLERANCE,
};

/// Result cap used when a keyword search is issued without an explicit limit
pub const DEFAULT_KEYWORD_LIMIT: usize = 3;

const TITLE_WEIGHT: f64 = 2.0;
const CONTENT_OCCURRENCE_WEIGHT: f64 = 0.5;
const METADATA_WEIGHT: f64 = 1.0;

/// Words that route an `auto` search to the amount dispatcher
const AMOUNT_HINTS: &[&str] = &[
    "over", "under", "above", "below", "between", "around", "exactly", "$",
];

/// Store shared between the API server and the tools. Single writer, many readers.
pub type SharedStore = Arc<RwLock<DocumentStore>>;

/// Owns the record collection. Iteration order is insertion order.
#[derive(Debug, Clone, Default)]
pub struct DocumentStore {
    records: Vec<Record>,
    index: HashMap<String, usize>,
}

impl DocumentStore {
    pub fn new(seed: impl IntoIterator<Item = Record>) -> Self {
        let mut store = Self::default();
        for record in seed {
            store.insert(record);
        }
        store
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_sample_documents() -> Self {
        Self::new(seed::sample_documents())
    }

    pub fn into_shared(self) -> SharedStore {
        Arc::new(RwLock::new(self))
    }

    /// Add a record, replacing any record with the same identifier in place.
    pub fn insert(&mut self, record: Record) {
        match self.index.get(&record.doc_id) {
            Some(&position) => {
                debug!(doc_id = %record.doc_id, "Replacing document");
                self.records[position] = record;
            }
            None => {
                debug!(doc_id = %record.doc_id, "Inserting document");
                self.index.insert(record.doc_id.clone(), self.records.len());
                self.records.push(record);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Raw records, in insertion order
    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.records.iter()
    }

    /// Distinct categories in order of first appearance
    pub fn categories(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.records
            .iter()
            .filter(|r| seen.insert(r.doc_type.to_lowercase()))
            .map(|r| r.doc_type.to_lowercase())
            .collect()
    }

    pub fn get_by_id(&self, doc_id: &str) -> Option<SearchResult> {
        self.index
            .get(doc_id)
            .map(|&position| project(&self.records[position], 1.0))
    }

    pub fn all(&self) -> Vec<SearchResult> {
        self.records.iter().map(|r| project(r, 1.0)).collect()
    }

    /// Keyword search ranked by title, body and metadata matches.
    pub fn by_keyword(&self, query: &str, limit: usize) -> Vec<SearchResult> {
        let query_lower = query.to_lowercase();
        let tokens: Vec<&str> = query_lower.split_whitespace().collect();

        let mut results: Vec<SearchResult> = self
            .records
            .iter()
            .filter_map(|record| {
                let score = keyword_score(record, &tokens);
                (score > 0.0).then(|| project(record, score))
            })
            .collect();

        // Stable: equal scores keep insertion order
        results.sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));
        results.truncate(limit);

        debug!(query = %query, matches = results.len(), "Keyword search");
        results
    }

    pub fn by_category(&self, doc_type: &str) -> Vec<SearchResult> {
        let wanted = doc_type.to_lowercase();
        self.records
            .iter()
            .filter(|r| r.doc_type.to_lowercase() == wanted)
            .map(|r| project(r, 1.0))
            .collect()
    }

    /// Records whose derived amount lies in `[min, max]`, largest amount first.
    pub fn by_amount_range(&self, min: Option<f64>, max: Option<f64>) -> Vec<SearchResult> {
        let mut matched: Vec<(f64, SearchResult)> = self
            .records
            .iter()
            .filter_map(|record| {
                let amount = derive_amount(&record.metadata)?;
                let above_min = min.map_or(true, |m| amount >= m);
                let below_max = max.map_or(true, |m| amount <= m);
                (above_min && below_max).then(|| (amount, project(record, 1.0)))
            })
            .collect();

        matched.sort_by(|(a, _), (b, _)| b.total_cmp(a));

        debug!(?min, ?max, matches = matched.len(), "Amount range search");
        matched.into_iter().map(|(_, result)| result).collect()
    }

    pub fn by_exact_amount(&self, target: f64, tolerance: f64) -> Vec<SearchResult> {
        self.records
            .iter()
            .filter(|record| {
                derive_amount(&record.metadata)
                    .map_or(false, |amount| (amount - target).abs() <= tolerance)
            })
            .map(|r| project(r, 1.0))
            .collect()
    }

    /// Records within `percent` of `target`, scored 1.0 at the target down to 0.0
    /// at the window edge.
    pub fn by_approximate_amount(&self, target: f64, percent: f64) -> Vec<SearchResult> {
        let tolerance = (target * percent / 100.0).abs();
        if !target.is_finite() || !tolerance.is_finite() {
            return Vec::new();
        }
        let window = (target - tolerance)..=(target + tolerance);

        let mut results: Vec<SearchResult> = self
            .records
            .iter()
            .filter_map(|record| {
                let amount = derive_amount(&record.metadata)?;
                if !window.contains(&amount) {
                    return None;
                }
                let score = if tolerance > 0.0 {
                    1.0 - (amount - target).abs() / tolerance
                } else {
                    1.0
                };
                Some(project(record, score))
            })
            .collect();

        results.sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));
        results
    }

    /// Natural-language amount search ("over $50,000", "around 25000", ...)
    pub fn by_amount_query(&self, text: &str) -> Vec<SearchResult> {
        let query = AmountQuery::parse(text);
        debug!(text = %text, ?query, "Dispatching amount query");
        self.execute_amount_query(&query)
    }

    pub fn execute_amount_query(&self, query: &AmountQuery) -> Vec<SearchResult> {
        match query {
            AmountQuery::Range { min, max } => self.by_amount_range(*min, *max),
            AmountQuery::Approximate { target } => {
                self.by_approximate_amount(*target, DEFAULT_APPROXIMATE_PERCENT)
            }
            AmountQuery::Exact { target } => self.by_exact_amount(*target, DEFAULT_EXACT_TOLERANCE),
            AmountQuery::Keyword { query } => self.by_keyword(query, DEFAULT_KEYWORD_LIMIT),
        }
    }

    /// Answer a query descriptor: free text plus optional structured filters.
    pub fn search(&self, request: &SearchRequest) -> Vec<SearchResult> {
        let limit = request.limit.unwrap_or(DEFAULT_KEYWORD_LIMIT);

        match (request.search_type, request.doc_type.as_deref()) {
            (SearchType::All, _) => self.all(),
            (SearchType::Keyword, _) => self.by_keyword(&request.query, limit),
            (SearchType::Type, Some(doc_type)) => {
                let mut results = self.by_category(doc_type);
                if request.has_amount_criteria() {
                    let allowed: HashSet<String> = self
                        .structured_amount_search(request)
                        .into_iter()
                        .map(|r| r.doc_id)
                        .collect();
                    results.retain(|r| allowed.contains(&r.doc_id));
                }
                results
            }
            (SearchType::Amount | SearchType::AmountRange, _) => {
                self.structured_amount_search(request)
            }
            (SearchType::Type, None) | (SearchType::Auto, _) => {
                self.auto_search(&request.query, limit)
            }
        }
    }

    fn structured_amount_search(&self, request: &SearchRequest) -> Vec<SearchResult> {
        match (request.comparison, request.amount) {
            (Some(Comparison::Over), Some(amount)) => return self.by_amount_range(Some(amount), None),
            (Some(Comparison::Under), Some(amount)) => return self.by_amount_range(None, Some(amount)),
            (Some(Comparison::Exact), Some(amount)) => {
                return self.by_exact_amount(amount, DEFAULT_EXACT_TOLERANCE)
            }
            (Some(Comparison::Approximate), Some(amount)) => {
                return self.by_approximate_amount(amount, DEFAULT_APPROXIMATE_PERCENT)
            }
            _ => {}
        }

        if request.min_amount.is_some() || request.max_amount.is_some() {
            return self.by_amount_range(request.min_amount, request.max_amount);
        }

        self.by_amount_query(&request.query)
    }

    /// Guess the search kind from the text alone.
    fn auto_search(&self, query: &str, limit: usize) -> Vec<SearchResult> {
        let lower = query.to_lowercase();

        if AMOUNT_HINTS.iter().any(|hint| lower.contains(hint)) {
            return self.by_amount_query(query);
        }

        if let Some(category) = self
            .categories()
            .into_iter()
            .find(|category| lower.contains(category.as_str()))
        {
            return self.by_category(&category);
        }

        self.by_keyword(query, limit)
    }

    pub fn statistics(&self) -> StoreStatistics {
        let mut document_types: BTreeMap<String, usize> = BTreeMap::new();
        let mut amounts = Vec::new();

        for record in &self.records {
            *document_types.entry(record.doc_type.clone()).or_insert(0) += 1;
            if let Some(amount) = derive_amount(&record.metadata) {
                amounts.push(amount);
            }
        }

        let total_amount: f64 = amounts.iter().sum();
        let average_amount = if amounts.is_empty() {
            0.0
        } else {
            total_amount / amounts.len() as f64
        };

        StoreStatistics {
            total_documents: self.records.len(),
            documents_with_amounts: amounts.len(),
            total_amount,
            average_amount,
            min_amount: amounts.iter().copied().reduce(f64::min),
            max_amount: amounts.iter().copied().reduce(f64::max),
            document_types,
        }
    }
}

/// Relevance of one record for the lower-cased query tokens
fn keyword_score(record: &Record, tokens: &[&str]) -> f64 {
    let title = record.title.to_lowercase();
    let content = record.content.to_lowercase();
    let metadata: Vec<String> = record
        .metadata
        .values()
        .map(|v| v.to_string().to_lowercase())
        .collect();

    tokens
        .iter()
        .map(|token| {
            let mut score = 0.0;
            if title.contains(token) {
                score += TITLE_WEIGHT;
            }
            score += content.matches(token).count() as f64 * CONTENT_OCCURRENCE_WEIGHT;
            score += metadata.iter().filter(|v| v.contains(token)).count() as f64 * METADATA_WEIGHT;
            score
        })
        .sum()
}

fn project(record: &Record, relevance_score: f64) -> SearchResult {
    let mut metadata = record.metadata.clone();
    metadata
        .entry("title".to_string())
        .or_insert_with(|| record.title.clone().into());
    metadata
        .entry("doc_type".to_string())
        .or_insert_with(|| record.doc_type.clone().into());

    SearchResult {
        doc_id: record.doc_id.clone(),
        content: record.content.clone(),
        metadata,
        relevance_score,
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchType {
    #[default]
    Keyword,
    Type,
    Amount,
    AmountRange,
    All,
    Auto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    Over,
    Under,
    Between,
    Exact,
    Approximate,
}

/// Query descriptor accepted by [`DocumentStore::search`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub search_type: SearchType,
    #[serde(default)]
    pub doc_type: Option<String>,
    #[serde(default)]
    pub min_amount: Option<f64>,
    #[serde(default)]
    pub max_amount: Option<f64>,
    #[serde(default)]
    pub comparison: Option<Comparison>,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>, search_type: SearchType) -> Self {
        Self {
            query: query.into(),
            search_type,
            ..Self::default()
        }
    }

    fn has_amount_criteria(&self) -> bool {
        self.comparison.is_some() || self.min_amount.is_some() || self.max_amount.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MetadataValue;

    fn ids(results: &[SearchResult]) -> Vec<&str> {
        results.iter().map(|r| r.doc_id.as_str()).collect()
    }

    fn amount_record(id: &str, amount: f64) -> Record {
        Record::new(id, format!("Record {}", id), "body", "invoice").with_metadata("amount", amount)
    }

    #[test]
    fn test_get_by_id() {
        let store = DocumentStore::with_sample_documents();
        let result = store.get_by_id("CLM-001").unwrap();
        assert_eq!(result.doc_id, "CLM-001");
        assert_eq!(result.relevance_score, 1.0);
        assert_eq!(result.title().as_deref(), Some("Insurance Claim #78901"));
        assert_eq!(result.doc_type().as_deref(), Some("claim"));
        assert!(store.get_by_id("NOPE-404").is_none());
    }

    #[test]
    fn test_insert_replaces_existing() {
        let mut store = DocumentStore::with_sample_documents();
        let before = store.len();
        store.insert(Record::new("INV-002", "Replacement", "new body", "invoice"));

        assert_eq!(store.len(), before);
        assert_eq!(store.get_by_id("INV-002").unwrap().content, "new body");
        // Replacement keeps its position
        assert_eq!(ids(&store.all())[3], "INV-002");
    }

    #[test]
    fn test_all_scores_are_one() {
        let store = DocumentStore::with_sample_documents();
        let all = store.all();
        assert_eq!(all.len(), 5);
        assert!(all.iter().all(|r| r.relevance_score == 1.0));
    }

    #[test]
    fn test_keyword_scoring() {
        let store = DocumentStore::new(vec![
            Record::new("A", "Alpha report", "nothing here", "note"),
            Record::new("B", "Other", "alpha alpha", "note"),
            Record::new("C", "Other", "nothing", "note").with_metadata("tag", "ALPHA-tag"),
            Record::new("D", "Other", "beta", "note"),
        ]);

        let results = store.by_keyword("alpha", 10);
        assert_eq!(ids(&results), vec!["A", "B", "C"]);
        assert_eq!(results[0].relevance_score, 2.0);
        assert_eq!(results[1].relevance_score, 1.0);
        assert_eq!(results[2].relevance_score, 1.0);
    }

    #[test]
    fn test_keyword_ordering_and_limit() {
        let store = DocumentStore::with_sample_documents();
        let results = store.by_keyword("invoice services", 10);

        assert!(!results.is_empty());
        assert!(results.iter().all(|r| r.relevance_score > 0.0));
        assert!(results
            .windows(2)
            .all(|w| w[0].relevance_score >= w[1].relevance_score));

        let limited = store.by_keyword("invoice services", 2);
        assert_eq!(limited.len(), 2);
        assert_eq!(ids(&limited), ids(&results[..2]));
    }

    #[test]
    fn test_keyword_ties_keep_insertion_order() {
        let store = DocumentStore::new(vec![
            Record::new("X", "same", "", "note"),
            Record::new("Y", "same", "", "note"),
        ]);
        assert_eq!(ids(&store.by_keyword("same", 5)), vec!["X", "Y"]);
        assert!(store.by_keyword("   ", 5).is_empty());
    }

    #[test]
    fn test_by_category_case_insensitive() {
        let store = DocumentStore::with_sample_documents();
        assert_eq!(
            ids(&store.by_category("INVOICE")),
            vec!["INV-001", "INV-002", "INV-003"]
        );
        assert!(store.by_category("receipt").is_empty());
    }

    #[test]
    fn test_amount_range() {
        let store = DocumentStore::with_sample_documents();

        assert_eq!(
            ids(&store.by_amount_range(Some(50000.0), None)),
            vec!["INV-003", "CON-001", "INV-002"]
        );
        assert_eq!(ids(&store.by_amount_range(None, Some(10000.0))), vec!["CLM-001"]);
        assert_eq!(
            ids(&store.by_amount_range(Some(20000.0), Some(80000.0))),
            vec!["INV-002"]
        );

        // No bounds: everything that has an amount, INV-001 has none
        let unbounded = store.by_amount_range(None, None);
        assert_eq!(unbounded.len(), 4);
        assert!(!ids(&unbounded).contains(&"INV-001"));
    }

    #[test]
    fn test_amount_range_inclusive_bounds() {
        let store = DocumentStore::new(vec![amount_record("A", 100.0), amount_record("B", 300.0)]);
        assert_eq!(ids(&store.by_amount_range(Some(100.0), Some(300.0))), vec!["B", "A"]);
    }

    #[test]
    fn test_exact_amount() {
        let store = DocumentStore::new(vec![
            amount_record("HIT", 100000.0),
            amount_record("MISS", 100000.02),
        ]);
        assert_eq!(
            ids(&store.by_exact_amount(100000.0, DEFAULT_EXACT_TOLERANCE)),
            vec!["HIT"]
        );
    }

    #[test]
    fn test_approximate_amount() {
        let store = DocumentStore::new(vec![
            amount_record("LOW", 90000.0),
            amount_record("MID", 100000.0),
            amount_record("HIGH", 110000.0),
            amount_record("OUT", 111000.0),
        ]);
        let results = store.by_approximate_amount(100000.0, 10.0);

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].doc_id, "MID");
        assert!((results[0].relevance_score - 1.0).abs() < 1e-9);
        assert!(results[1].relevance_score.abs() < 1e-9);
        assert!(results[2].relevance_score.abs() < 1e-9);
        assert!(!ids(&results).contains(&"OUT"));
    }

    #[test]
    fn test_approximate_zero_target() {
        let store = DocumentStore::new(vec![amount_record("ZERO", 0.0), amount_record("ONE", 1.0)]);
        let results = store.by_approximate_amount(0.0, 10.0);
        assert_eq!(ids(&results), vec!["ZERO"]);
        assert_eq!(results[0].relevance_score, 1.0);
    }

    #[test]
    fn test_approximate_non_finite_target_matches_nothing() {
        let store = DocumentStore::with_sample_documents();
        assert!(store.by_approximate_amount(f64::NAN, 10.0).is_empty());
        assert!(store.by_approximate_amount(f64::INFINITY, 10.0).is_empty());
        assert!(store.by_approximate_amount(25000.0, f64::NAN).is_empty());

        let results = store.by_amount_query(&format!("around {}", "9".repeat(400)));
        assert!(results.iter().all(|r| r.relevance_score.is_finite()));
    }

    #[test]
    fn test_amount_query_symbol_cues() {
        let store = DocumentStore::with_sample_documents();
        assert_eq!(
            store.by_amount_query("> $50,000"),
            store.by_amount_range(Some(50000.0), None)
        );
        assert_eq!(ids(&store.by_amount_query("< 10000")), vec!["CLM-001"]);
        assert_eq!(ids(&store.by_amount_query("~ $70,000")), vec!["INV-002"]);
        assert_eq!(ids(&store.by_amount_query("= 2450")), vec!["CLM-001"]);
    }

    #[test]
    fn test_unconvertible_amount_is_absent() {
        let store = DocumentStore::new(vec![
            Record::new("BAD", "Bad", "", "claim").with_metadata("amount", "n/a"),
            amount_record("GOOD", 5.0),
        ]);
        assert_eq!(ids(&store.by_amount_range(None, None)), vec!["GOOD"]);
        assert_eq!(store.statistics().documents_with_amounts, 1);
    }

    #[test]
    fn test_amount_query_dispatch_matches_direct_calls() {
        let store = DocumentStore::with_sample_documents();

        assert_eq!(
            store.by_amount_query("over $50,000"),
            store.by_amount_range(Some(50000.0), None)
        );
        assert_eq!(
            store.by_amount_query("under $10,000"),
            store.by_amount_range(None, Some(10000.0))
        );
        assert_eq!(
            store.by_amount_query("between $20,000 and $80,000"),
            store.by_amount_range(Some(20000.0), Some(80000.0))
        );
        assert_eq!(
            store.by_amount_query("around $25,000"),
            store.by_approximate_amount(25000.0, 10.0)
        );
    }

    #[test]
    fn test_amount_query_keyword_fallback() {
        let store = DocumentStore::with_sample_documents();
        let results = store.by_amount_query("Global Corp");
        assert_eq!(results[0].doc_id, "INV-003");
    }

    #[test]
    fn test_statistics() {
        let store = DocumentStore::new(vec![amount_record("A", 100.0), amount_record("B", 300.0)]);
        let stats = store.statistics();

        assert_eq!(stats.total_documents, 2);
        assert_eq!(stats.documents_with_amounts, 2);
        assert_eq!(stats.total_amount, 400.0);
        assert_eq!(stats.average_amount, 200.0);
        assert_eq!(stats.min_amount, Some(100.0));
        assert_eq!(stats.max_amount, Some(300.0));
        assert_eq!(stats.document_types.get("invoice"), Some(&2));
    }

    #[test]
    fn test_statistics_without_amounts() {
        let store = DocumentStore::new(vec![Record::new("A", "t", "c", "note")]);
        let stats = store.statistics();
        assert_eq!(stats.average_amount, 0.0);
        assert_eq!(stats.min_amount, None);
        assert_eq!(DocumentStore::empty().statistics().total_documents, 0);
    }

    #[test]
    fn test_search_descriptor() {
        let store = DocumentStore::with_sample_documents();

        let all = store.search(&SearchRequest::new("", SearchType::All));
        assert_eq!(all.len(), 5);

        let mut typed = SearchRequest::new("", SearchType::Type);
        typed.doc_type = Some("invoice".to_string());
        typed.comparison = Some(Comparison::Over);
        typed.amount = Some(100000.0);
        assert_eq!(ids(&store.search(&typed)), vec!["INV-003"]);

        let mut between = SearchRequest::new("", SearchType::AmountRange);
        between.min_amount = Some(1000.0);
        between.max_amount = Some(100000.0);
        assert_eq!(ids(&store.search(&between)), vec!["INV-002", "CLM-001"]);

        let auto_amount = store.search(&SearchRequest::new("documents over $150,000", SearchType::Auto));
        assert_eq!(ids(&auto_amount), vec!["INV-003", "CON-001"]);

        let auto_type = store.search(&SearchRequest::new("show me the contracts", SearchType::Auto));
        assert_eq!(ids(&auto_type), vec!["CON-001"]);
    }

    #[test]
    fn test_search_request_json_defaults() {
        let request: SearchRequest =
            serde_json::from_str(r#"{"query": "acme"}"#).unwrap();
        assert_eq!(request.search_type, SearchType::Keyword);
        assert!(request.comparison.is_none());

        let request: SearchRequest = serde_json::from_str(
            r#"{"query": "", "search_type": "amount_range", "comparison": "approximate", "amount": 70000}"#,
        )
        .unwrap();
        assert_eq!(request.search_type, SearchType::AmountRange);
        assert_eq!(request.comparison, Some(Comparison::Approximate));
    }

    #[tokio::test]
    async fn test_shared_store_sees_inserts() {
        let shared = DocumentStore::empty().into_shared();
        shared
            .write()
            .await
            .insert(Record::new("N-1", "New", "c", "note").with_metadata("total", MetadataValue::from(7_i64)));

        let store = shared.read().await;
        assert_eq!(store.by_exact_amount(7.0, DEFAULT_EXACT_TOLERANCE).len(), 1);
    }
}
