use clap::Parser;
use r2d2::Pool;
use std::sync::Arc;
use tracing::{error, info};

use nl_teller::config::{AppConfig, CliArgs};
use nl_teller::db::bootstrap;
use nl_teller::db::pool::BankDbConnectionManager;
use nl_teller::llm::LlmManager;
use nl_teller::util::logging::init_tracing;
use nl_teller::web;
use nl_teller::web::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Parse command line arguments
    let args = CliArgs::parse();

    // Load configuration
    let config = match AppConfig::new(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    init_tracing(config.debug);

    // Initialize database connection pool. r2d2 has one hard cap, so the
    // overflow headroom folds into max_size.
    info!("Initializing DuckDB connection pool");
    let manager = match BankDbConnectionManager::open(&config.database.url) {
        Ok(manager) => manager,
        Err(e) => {
            error!("Failed to open database {}: {}", config.database.url, e);
            return Err(e.into());
        }
    };
    let pool = Pool::builder()
        .max_size(config.database.pool_size + config.database.max_overflow)
        .min_idle(Some(config.database.pool_size))
        .build(manager)?;

    // Create the banking tables and seed the demo dataset
    info!("Bootstrapping banking schema");
    if let Err(e) = bootstrap::initialize(&pool) {
        error!("Failed to bootstrap database: {}", e);
        return Err(e.into());
    }

    // Initialize the LLM backend; a missing key fails the boot
    info!("Initializing LLM backend: {}", config.llm.backend);
    let llm = match LlmManager::new(&config.llm) {
        Ok(llm) => llm,
        Err(e) => {
            error!("Failed to initialize LLM backend: {}", e);
            return Err(e.into());
        }
    };

    // Create application state
    let app_state = Arc::new(AppState::new(config.clone(), pool, llm));

    // Start the web server
    info!(
        "Starting nl-teller server on {}:{}",
        config.web.host, config.web.port
    );
    match web::run_server(config.web, app_state).await {
        Ok(_) => info!("Server stopped gracefully"),
        Err(e) => {
            error!("Server error: {}", e);
            return Err(std::io::Error::other(e.to_string()).into());
        }
    }

    Ok(())
}
