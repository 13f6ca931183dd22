//! Document tools backed by the shared store

use serde_json::{json, Value};

use crate::error::AssistantError;
use crate::models::{SearchResult, StoreStatistics, ToolInput, ToolOutput};
use crate::retrieval::{derive_amount, SearchRequest, SharedStore};
use crate::tools::{format_amount, Tool};
use crate::Result;

const PREVIEW_CHARS: usize = 200;

fn ensure_object_parameters(input: &ToolInput) -> Result<()> {
    if input.parameters.is_object() {
        Ok(())
    } else {
        Err(AssistantError::InvalidToolInput(
            "tool_input must be a JSON object".to_string(),
        ))
    }
}

fn result_summary(result: &SearchResult) -> Value {
    json!({
        "doc_id": result.doc_id,
        "title": result.title(),
        "doc_type": result.doc_type(),
        "amount": derive_amount(&result.metadata),
        "relevance_score": result.relevance_score,
    })
}

/// Human-readable listing of a result set
pub fn format_results(results: &[SearchResult]) -> String {
    if results.is_empty() {
        return "No documents found matching your search criteria.".to_string();
    }

    let mut out = format!("Found {} document(s):\n\n", results.len());
    for (i, result) in results.iter().enumerate() {
        out.push_str(&format!("Document {} (ID: {}):\n", i + 1, result.doc_id));
        out.push_str(&format!(
            "Title: {}\n",
            result.title().unwrap_or_else(|| "Unknown".to_string())
        ));
        out.push_str(&format!(
            "Type: {}\n",
            result.doc_type().unwrap_or_else(|| "Unknown".to_string())
        ));
        if let Some(amount) = derive_amount(&result.metadata) {
            out.push_str(&format!("Amount: {}\n", format_amount(amount)));
        }
        out.push_str(&format!("Relevance Score: {:.2}\n", result.relevance_score));

        let preview: String = result.content.chars().take(PREVIEW_CHARS).collect();
        out.push_str(&format!("Preview: {}...\n", preview.trim()));
        out.push_str(&"-".repeat(50));
        out.push('\n');
    }
    out
}

/// Human-readable collection statistics
pub fn format_statistics(stats: &StoreStatistics) -> String {
    let mut out = String::from("DOCUMENT COLLECTION STATISTICS:\n\n");
    out.push_str(&format!("Total Documents: {}\n", stats.total_documents));
    out.push_str(&format!(
        "Documents with Amounts: {}\n",
        stats.documents_with_amounts
    ));
    out.push_str("\nDocument Types:\n");

    for (doc_type, count) in &stats.document_types {
        out.push_str(&format!("  - {}: {}\n", capitalize(doc_type), count));
    }

    if let (Some(min), Some(max)) = (stats.min_amount, stats.max_amount) {
        out.push_str("\nFinancial Summary:\n");
        out.push_str(&format!("  - Total Amount: {}\n", format_amount(stats.total_amount)));
        out.push_str(&format!(
            "  - Average Amount: {}\n",
            format_amount(stats.average_amount)
        ));
        out.push_str(&format!("  - Minimum Amount: {}\n", format_amount(min)));
        out.push_str(&format!("  - Maximum Amount: {}\n", format_amount(max)));
    }

    out
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

pub struct DocumentSearchTool {
    store: SharedStore,
}

impl DocumentSearchTool {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl Tool for DocumentSearchTool {
    fn name(&self) -> &'static str {
        "document_search"
    }

    fn description(&self) -> &'static str {
        "Search documents by keyword, type, amount comparison or amount range"
    }

    async fn execute(&self, input: &ToolInput) -> Result<ToolOutput> {
        ensure_object_parameters(input)?;

        let request: SearchRequest = serde_json::from_value(input.parameters.clone())
            .map_err(|e| AssistantError::InvalidToolInput(format!("Invalid search request: {}", e)))?;

        let results = self.store.read().await.search(&request);

        Ok(ToolOutput {
            success: true,
            data: json!({
                "results_count": results.len(),
                "documents": results.iter().map(result_summary).collect::<Vec<_>>(),
                "formatted": format_results(&results),
            }),
            error: None,
        })
    }
}

pub struct DocumentReaderTool {
    store: SharedStore,
}

impl DocumentReaderTool {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl Tool for DocumentReaderTool {
    fn name(&self) -> &'static str {
        "document_reader"
    }

    fn description(&self) -> &'static str {
        "Read the full content of a document by its ID (e.g. INV-001)"
    }

    async fn execute(&self, input: &ToolInput) -> Result<ToolOutput> {
        let doc_id = input
            .parameters
            .get("doc_id")
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                AssistantError::InvalidToolInput("Expected 'doc_id' in tool_input".to_string())
            })?;

        let Some(document) = self.store.read().await.get_by_id(doc_id) else {
            return Ok(ToolOutput {
                success: true,
                data: json!({
                    "found": false,
                    "doc_id": doc_id,
                    "formatted": format!("Document with ID {} not found.", doc_id),
                }),
                error: None,
            });
        };

        let amount = derive_amount(&document.metadata);
        let amount_line = amount
            .map(|a| format!("\nAmount: {}", format_amount(a)))
            .unwrap_or_default();

        Ok(ToolOutput {
            success: true,
            data: json!({
                "found": true,
                "doc_id": document.doc_id,
                "title": document.title(),
                "doc_type": document.doc_type(),
                "amount": amount,
                "content": document.content,
                "formatted": format!("Document {}:{}\n\n{}", doc_id, amount_line, document.content),
            }),
            error: None,
        })
    }
}

pub struct DocumentStatisticsTool {
    store: SharedStore,
}

impl DocumentStatisticsTool {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl Tool for DocumentStatisticsTool {
    fn name(&self) -> &'static str {
        "document_statistics"
    }

    fn description(&self) -> &'static str {
        "Document counts, amount totals, averages and extremes"
    }

    async fn execute(&self, _input: &ToolInput) -> Result<ToolOutput> {
        let stats = self.store.read().await.statistics();

        Ok(ToolOutput {
            success: true,
            data: json!({
                "formatted": format_statistics(&stats),
                "stats": stats,
            }),
            error: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retrieval::DocumentStore;

    fn store() -> SharedStore {
        DocumentStore::with_sample_documents().into_shared()
    }

    fn input(name: &str, parameters: Value) -> ToolInput {
        ToolInput {
            tool_name: name.to_string(),
            parameters,
        }
    }

    #[tokio::test]
    async fn test_search_tool_amount_comparison() {
        let tool = DocumentSearchTool::new(store());
        let output = tool
            .execute(&input(
                "document_search",
                json!({"query": "", "search_type": "amount", "comparison": "over", "amount": 50000}),
            ))
            .await
            .unwrap();

        assert_eq!(output.data["results_count"], json!(3));
        assert_eq!(output.data["documents"][0]["doc_id"], json!("INV-003"));
        let formatted = output.data["formatted"].as_str().unwrap();
        assert!(formatted.starts_with("Found 3 document(s):"));
        assert!(formatted.contains("Amount: $214,500.00"));
    }

    #[tokio::test]
    async fn test_search_tool_empty_and_invalid() {
        let tool = DocumentSearchTool::new(store());
        let output = tool
            .execute(&input("document_search", json!({"query": "zebra"})))
            .await
            .unwrap();
        assert_eq!(output.data["results_count"], json!(0));
        assert_eq!(
            output.data["formatted"],
            json!("No documents found matching your search criteria.")
        );

        let bad = tool
            .execute(&input("document_search", json!({"search_type": "sideways"})))
            .await;
        assert!(matches!(bad, Err(AssistantError::InvalidToolInput(_))));

        let not_object = tool.execute(&input("document_search", json!("text"))).await;
        assert!(not_object.is_err());
    }

    #[tokio::test]
    async fn test_reader_tool() {
        let tool = DocumentReaderTool::new(store());

        let found = tool
            .execute(&input("document_reader", json!({"doc_id": "CON-001"})))
            .await
            .unwrap();
        assert_eq!(found.data["found"], json!(true));
        assert!(found.data["formatted"]
            .as_str()
            .unwrap()
            .starts_with("Document CON-001:\nAmount: $180,000.00"));

        let missing = tool
            .execute(&input("document_reader", json!({"doc_id": "XYZ-999"})))
            .await
            .unwrap();
        assert_eq!(missing.data["found"], json!(false));
    }

    #[test]
    fn test_statistics_tool_blocking() {
        let tool = DocumentStatisticsTool::new(store());
        let output = tokio_test::block_on(tool.execute(&input("document_statistics", json!({}))))
            .unwrap();

        assert_eq!(output.data["stats"]["total_documents"], json!(5));
        assert_eq!(output.data["stats"]["documents_with_amounts"], json!(4));
        let formatted = output.data["formatted"].as_str().unwrap();
        assert!(formatted.contains("  - Invoice: 3"));
        assert!(formatted.contains("Total Amount: $466,250.00"));
    }
}
