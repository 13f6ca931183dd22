use doc_assistant::{agent::DocumentAssistant, config::AssistantConfig, retrieval::DocumentStore};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

const HELP: &str = "Commands:
  /help     show this message
  /docs     list the available documents
  /history  show the most recent messages of this session
  /quit     leave

Anything else is sent to the assistant, for example:
  What's the total amount in invoice INV-002?
  Summarize all contracts
  Calculate the sum of all invoice totals";

const HISTORY_LINES: usize = 10;

/// Usage: assistant [user_id] [session_id]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AssistantConfig::from_env()?;
    let mut args = std::env::args().skip(1);
    let user_id = args.next().unwrap_or_else(|| "demo_user".to_string());
    let session_id = args.next();

    let store = DocumentStore::with_sample_documents().into_shared();
    let assistant = DocumentAssistant::from_config(config, store)?;
    let session = assistant
        .start_session(&user_id, session_id.as_deref())
        .await?;

    info!(session_id = %session.session_id, user_id = %user_id, "Assistant ready");
    println!("Document Assistant (session {})", session.session_id);
    println!("Type /help for commands.\n");

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();

        match input {
            "" => continue,
            "/quit" | "/exit" => break,
            "/help" => {
                println!("{}\n\nTools:", HELP);
                for (name, description) in assistant.executor().registry().describe() {
                    println!("  {:<20} {}", name, description);
                }
                println!();
            }
            "/docs" => println!("{}", assistant.list_documents().await),
            "/history" => {
                let current = assistant.sessions().load(&session.session_id).await?;
                println!("{}", current.history.get_formatted_context(HISTORY_LINES));
            }
            text => match assistant.process_message(&session.session_id, text).await {
                Ok(turn) => {
                    println!("\n{}\n", turn.response);
                    if !turn.tools_used.is_empty() {
                        println!("(intent: {}, tools: {})\n", turn.intent.intent_type, turn.tools_used.join(", "));
                    }
                }
                Err(e) => eprintln!("Error: {}\n", e),
            },
        }
    }

    println!(
        "Session {} saved under {}.",
        session.session_id,
        assistant.sessions().root().display()
    );
    Ok(())
}
