//! Advice service for the chat assistant
//!
//! The chat orchestrator only sees the `AdviceService` trait: a question
//! (plus optional spending totals) goes in, advice text comes out.
//! `GeminiAdvisor` is the production implementation and keeps one
//! long-lived reqwest::Client for connection pooling.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info};

use crate::error::TrackerError;
use crate::Result;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Totals passed alongside a question
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdviceContext {
    pub expenses: f64,
    pub budget: f64,
}

#[async_trait]
pub trait AdviceService: Send + Sync {
    async fn get_advice(&self, question: &str, context: Option<AdviceContext>) -> Result<String>;
}

/// Reusable Gemini client (connection-pooled)
pub struct GeminiAdvisor {
    client: Client,
    api_key: String,
    endpoint: String,
}

impl GeminiAdvisor {
    pub fn new(api_key: String, model: &str) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .build()?;

        Ok(Self {
            client,
            api_key,
            endpoint: format!("{}/{}:generateContent", GEMINI_BASE_URL, model),
        })
    }
}

#[async_trait]
impl AdviceService for GeminiAdvisor {
    async fn get_advice(&self, question: &str, context: Option<AdviceContext>) -> Result<String> {
        if self.api_key.is_empty() {
            return Err(TrackerError::AdviceError(
                "GEMINI_API_KEY not configured".to_string(),
            ));
        }

        let url = format!("{}?key={}", self.endpoint, self.api_key);

        let request = GeminiRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: build_user_prompt(question, context),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.4,
                top_p: 0.9,
                top_k: 40,
                max_output_tokens: 1024,
            },
            system_instruction: SystemInstruction {
                parts: vec![Part {
                    text: SYSTEM_PROMPT.to_string(),
                }],
            },
        };

        info!("Requesting financial advice from Gemini");

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("Gemini API request failed: {}", e);
                TrackerError::AdviceError(format!("Gemini API error: {}", e))
            })?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Gemini API error response: {}", error_text);
            return Err(TrackerError::AdviceError(format!(
                "Gemini API error: {}",
                error_text
            )));
        }

        let gemini_response: GeminiResponse = response.json().await.map_err(|e| {
            error!("Failed to parse Gemini response: {}", e);
            TrackerError::AdviceError(format!("Gemini parse error: {}", e))
        })?;

        first_candidate_text(gemini_response)
    }
}

const SYSTEM_PROMPT: &str = r#"You are a personal finance advisor. Give practical advice about personal finance, budgeting and managing spending.

Guidelines:
- Answer in the same language as the question
- Use dashes (-) for key points
- Separate sections with a blank line
- Highlight the important numbers and recommendations
- Finish with one short piece of advice"#;

/// Question plus either the user's totals or a note that there are none
fn build_user_prompt(question: &str, context: Option<AdviceContext>) -> String {
    let info = match context {
        Some(ctx) => format!(
            "Monthly spending: {:.2}, Budget: {:.2}",
            ctx.expenses, ctx.budget
        ),
        None => "No financial information yet".to_string(),
    };

    format!("Question: {}\nContext: {}", question, info)
}

fn first_candidate_text(response: GeminiResponse) -> Result<String> {
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| TrackerError::AdviceError("No response from Gemini API".to_string()))?;

    let text = candidate
        .content
        .parts
        .into_iter()
        .next()
        .map(|p| p.text)
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(TrackerError::AdviceError(
            "Empty response from Gemini".to_string(),
        ));
    }

    Ok(text)
}

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
    system_instruction: SystemInstruction,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: i32,
    max_output_tokens: i32,
}

#[derive(Debug, Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}
