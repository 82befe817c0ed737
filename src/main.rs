mod assistant;
mod chat;
mod config;
mod llm;

use anyhow::Result;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::assistant::CompletionClient;
use crate::chat::ChatSession;
use crate::config::Config;
use crate::llm::GeminiClient;

fn print_help() {
    println!(
        "\
qtalk v{}

A terminal learning assistant backed by a hosted text-generation API.

USAGE:
    qtalk [OPTIONS] [CONFIG_PATH]

ARGUMENTS:
    CONFIG_PATH    Path to TOML configuration file [default: config/qtalk.toml]

OPTIONS:
    -h, --help       Print this help message and exit
    -V, --version    Print version and exit

ENVIRONMENT VARIABLES:
    Variables are referenced in the config file via ${{VAR_NAME}} syntax.

    RUST_LOG          Log level filter for tracing
                      (e.g. debug, qtalk=debug,warn)
    GEMINI_API_KEY    API key for the generation endpoint
                      (from https://aistudio.google.com/)

EXAMPLES:
    qtalk                         # uses config/qtalk.toml
    qtalk ~/.config/qtalk.toml    # custom config path
    RUST_LOG=debug qtalk          # with debug logging",
        env!("CARGO_PKG_VERSION"),
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    // Handle --help / --version before anything else
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--version" | "-V" => {
                println!("qtalk v{}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            _ => {}
        }
    }

    // Logs go to stderr so they don't interleave with the chat on stdout
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("qtalk=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config/qtalk.toml".to_string());

    info!("Loading configuration from {config_path}");
    let config = Config::load(&config_path)?;

    let gemini = GeminiClient::new(config.llm.clone())?;
    let client = CompletionClient::new(Box::new(gemini), &config.assistant);
    info!("LLM: {}", client.description());
    info!("Fallback policy: {:?}", config.assistant.fallback_policy);

    if config.llm.probe_on_start {
        info!("Probing generation API...");
        if let Err(e) = client.probe().await {
            warn!("Generation API is not answering yet: {e}");
        }
    }

    println!("Q-Talk v{}, your quantum learning assistant", env!("CARGO_PKG_VERSION"));
    println!("Type /help for commands.\n");

    ChatSession::new(&config, client, std::io::stdout())
        .run()
        .await
}
