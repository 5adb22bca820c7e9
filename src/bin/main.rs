//! Offline classifier console
//!
//! Classifies each argument (or each stdin line when no arguments are
//! given) and prints the result as one JSON object per line.

use chrono::Utc;
use finance_assistant::{classifier::IntentClassifier, config::AppConfig};
use std::io::{self, BufRead};
use tracing::debug;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    let config = AppConfig::from_env()?;

    // Initialize tracing (stderr keeps stdout pure JSON)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .with_writer(io::stderr)
        .init();
    let classifier = IntentClassifier::new(config.keyword_tables()?)?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let utterances: Vec<String> = if args.is_empty() {
        io::stdin().lock().lines().collect::<Result<_, _>>()?
    } else {
        args
    };

    for utterance in utterances.iter().filter(|u| !u.trim().is_empty()) {
        let result = classifier.classify(utterance, Utc::now());
        debug!(intent = result.intent_name(), "Classified");

        let line = serde_json::json!({
            "utterance": utterance,
            "result": result,
        });
        println!("{}", line);
    }

    Ok(())
}
