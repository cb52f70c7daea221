//! Codeloom server binary: environment loading, tracing, startup wiring.

use clap::Parser;
use codeloom_agent::{Orchestrator, SessionManager};
use codeloom_core::ServerConfig;
use codeloom_gateway::{start_server, AppState};
use codeloom_llm::{OpenRouterProvider, TurnAdapter};
use codeloom_store::SessionStore;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "codeloom", about = "Backend for an interactive AI coding assistant")]
struct Args {
    /// Port to listen on (overrides PORT)
    #[arg(long)]
    port: Option<u16>,

    /// SQLite database path (overrides CODELOOM_DB)
    #[arg(long)]
    db: Option<PathBuf>,

    /// Default working directory for new sessions (overrides PROJECT_ROOT)
    #[arg(long)]
    project_root: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let mut config = ServerConfig::from_env();
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(db) = args.db {
        config.db_path = db;
    }
    if let Some(root) = args.project_root {
        config.project_root = root;
    }

    let api_key = config
        .openrouter_api_key
        .clone()
        .ok_or_else(|| anyhow::anyhow!("OPENROUTER_API_KEY not set"))?;

    let store = Arc::new(SessionStore::open(&config.db_path)?);
    let registry = codeloom_tools::build_default_catalog().await?;

    let provider = Arc::new(OpenRouterProvider::new(api_key));
    let adapter = TurnAdapter::new(provider, Some(config.max_tokens));
    let orchestrator = Arc::new(Orchestrator::new(
        adapter,
        registry.clone(),
        store.clone(),
        config.model.clone(),
    ));
    let manager = Arc::new(SessionManager::new(store.clone()));

    tracing::info!(
        "Registered tools: {}",
        registry.names().join(", ")
    );

    let state = AppState {
        manager,
        orchestrator,
        registry,
        store,
        config: Arc::new(config),
    };

    start_server(state).await
}
