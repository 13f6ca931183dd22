use doc_assistant::{
    agent::DocumentAssistant, api::start_server, config::AssistantConfig,
    retrieval::DocumentStore,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AssistantConfig::from_env()?;
    let api_port = config.api_port;

    info!("Document Assistant - API Server");
    info!("Port: {}", api_port);
    info!("Sessions: {}", config.sessions_dir.display());
    info!("Tool logs: {}", config.logs_dir.display());

    let store = DocumentStore::with_sample_documents().into_shared();
    let assistant = Arc::new(DocumentAssistant::from_config(config, store.clone())?);

    info!("Assistant initialized with {} documents", store.read().await.len());

    start_server(store, assistant, api_port).await?;

    Ok(())
}
