use finance_assistant::{
    advice::GeminiAdvisor,
    api::{start_server, ApiState},
    classifier::IntentClassifier,
    config::AppConfig,
    storage::InMemoryFinanceStore,
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenv::dotenv().ok();

    let config = AppConfig::from_env()?;

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    if config.gemini_api_key.is_empty() {
        warn!("GEMINI_API_KEY not set; chat questions will get an error reply");
    }

    info!("Personal Finance Assistant - API Server");
    info!("Port: {}", config.port);

    let tables = config.keyword_tables()?;
    if let Some(path) = &config.keyword_tables_path {
        info!("Keyword tables loaded from {}", path.display());
    }

    // Create components
    let classifier = Arc::new(IntentClassifier::new(tables)?);
    let store = Arc::new(InMemoryFinanceStore::new());
    let advisor = Arc::new(GeminiAdvisor::new(
        config.gemini_api_key.clone(),
        &config.gemini_model,
    )?);

    let state = ApiState::new(store, classifier, advisor);

    info!("Components initialized, starting API server");

    start_server(state, config.port).await?;

    Ok(())
}
