//! Expense field extraction
//!
//! An ordered list of utterance patterns is tried in sequence and the first
//! one that yields a usable amount and description wins. Patterns capture
//! by name (`amount`, `description`, optional `thousands`) so each can put
//! its fields in whatever order the phrasing uses.

use chrono::{DateTime, Utc};
use regex::{Captures, Regex};
use thiserror::Error;
use tracing::debug;

use super::keywords::KeywordTables;
use crate::models::ExpenseCandidate;
use crate::Result;

const AMOUNT: &str = r"(?P<amount>\d[\d,]*(?:\.\d+)?)";
const THOUSANDS: &str = r"(?:\s*(?P<thousands>thousand|nghìn|ngàn|k)\b)?";
const CURRENCY: &str = r"(?:\s*(?:đồng|dollars?|usd|vnd|đ)\b)?";
const DOLLAR: &str = r"(?:\$\s*)?";
const VERBS: &str = r"(?:chi tiêu|spent|spend|paid|pay|bought|chi|trả|tiêu|mua)";
const PREPOSITIONS: &str = r"(?:on|for|cho|vào)";
const COST_WORDS: &str = r"(?:cost me|costs?|was|hết|mất|giá)";

/// Leading words that make a description read as a question, not a purchase
const QUESTION_LEADS: &[&str] = &[
    "how", "what", "why", "when", "where", "which", "who", "whom", "should", "can",
    "could", "would", "will", "shall", "might", "is", "are", "do", "does", "did",
    "làm sao", "làm thế nào", "thế nào", "tại sao", "vì sao", "có nên", "nên",
    "bao nhiêu", "có thể", "sao",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionError {
    #[error(
        "I couldn't read that as an expense. Try an amount, a preposition and what it was for, \
         e.g. \"spent 50 on food\" or \"chi 50k cho ăn trưa\"."
    )]
    NoPatternMatched,
}

struct ExpensePattern {
    name: &'static str,
    regex: Regex,
}

/// Ordered pattern list; first successful pattern wins
pub struct ExpenseExtractor {
    patterns: Vec<ExpensePattern>,
}

impl ExpenseExtractor {
    pub fn new() -> Result<Self> {
        let specs = [
            // "spent 50 on food", "chi 50k cho ăn trưa"
            (
                "verb_amount_first",
                format!(r"(?i)\b{VERBS}\s+{DOLLAR}{AMOUNT}{THOUSANDS}{CURRENCY}\s+{PREPOSITIONS}\s+(?P<description>.+)$"),
            ),
            // "paid rent 500", "spent on taxi 12"
            (
                "verb_description_first",
                format!(r"(?i)\b{VERBS}\s+(?:{PREPOSITIONS}\s+)?(?P<description>\D+?)\s+{DOLLAR}{AMOUNT}{THOUSANDS}{CURRENCY}\s*[.!]?\s*$"),
            ),
            // "50 for lunch", "$12 on parking"
            (
                "amount_preposition",
                format!(r"(?i)^\s*{DOLLAR}{AMOUNT}{THOUSANDS}{CURRENCY}\s+{PREPOSITIONS}\s+(?P<description>.+)$"),
            ),
            // "lunch cost 12", "cà phê hết 30k"
            (
                "description_cost_amount",
                format!(r"(?i)^\s*(?P<description>\D+?)\s*{COST_WORDS}\s*{DOLLAR}{AMOUNT}{THOUSANDS}{CURRENCY}\s*[.!]?\s*$"),
            ),
            // "50k mì", "12 dollars parking"
            (
                "amount_description",
                format!(r"(?i)^\s*{DOLLAR}{AMOUNT}{THOUSANDS}{CURRENCY}\s+(?P<description>\D.*)$"),
            ),
            // "coffee $5"
            (
                "description_dollar_amount",
                format!(r"(?i)^\s*(?P<description>\D+?)\s+\${AMOUNT}{THOUSANDS}\s*[.!]?\s*$"),
            ),
            // "phở 45k", "taxi 20 dollars"
            (
                "description_marked_amount",
                format!(r"(?i)^\s*(?P<description>\D+?)\s+{AMOUNT}\s*(?:(?P<thousands>thousand|nghìn|ngàn|k)\b{CURRENCY}|(?:đồng|dollars?|usd|vnd|đ)\b)\s*[.!]?\s*$"),
            ),
        ];

        let mut patterns = Vec::with_capacity(specs.len());
        for (name, source) in specs {
            patterns.push(ExpensePattern {
                name,
                regex: Regex::new(&source)?,
            });
        }

        Ok(Self { patterns })
    }

    /// Extract a complete expense or report why nothing matched
    pub fn extract(
        &self,
        utterance: &str,
        tables: &KeywordTables,
        now: DateTime<Utc>,
    ) -> std::result::Result<ExpenseCandidate, ExtractionError> {
        let text = utterance.trim();

        if text.ends_with('?') {
            return Err(ExtractionError::NoPatternMatched);
        }

        for pattern in &self.patterns {
            let Some(caps) = pattern.regex.captures(text) else {
                continue;
            };

            let Some(amount) = amount_from(&caps) else {
                debug!(pattern = pattern.name, "Amount token did not parse, trying next pattern");
                continue;
            };

            let Some(description) = caps
                .name("description")
                .and_then(|m| normalize_description(m.as_str()))
            else {
                continue;
            };

            if reads_as_question(&description) {
                debug!(pattern = pattern.name, "Description reads as a question, trying next pattern");
                continue;
            }

            debug!(pattern = pattern.name, amount, "Expense pattern matched");

            let category = tables.resolve_category(text, &description);

            return Ok(ExpenseCandidate {
                amount,
                category,
                description,
                date: now.date_naive(),
            });
        }

        Err(ExtractionError::NoPatternMatched)
    }
}

fn amount_from(caps: &Captures<'_>) -> Option<f64> {
    let token = caps.name("amount")?.as_str();
    let thousands = caps.name("thousands").is_some();
    parse_amount(token, thousands)
}

/// Parse an amount token: commas are grouping separators, a thousands
/// suffix multiplies by 1000. Non-positive or non-finite values are rejected.
pub fn parse_amount(token: &str, thousands: bool) -> Option<f64> {
    let cleaned: String = token.chars().filter(|c| *c != ',').collect();
    let value: f64 = cleaned.parse().ok()?;

    let value = if thousands { value * 1000.0 } else { value };

    (value.is_finite() && value > 0.0).then_some(value)
}

fn reads_as_question(description: &str) -> bool {
    let lowered = description.to_lowercase();
    let lowered = lowered.trim_start();
    QUESTION_LEADS.iter().any(|lead| {
        lowered
            .strip_prefix(lead)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with([' ', '\'', ',', ':']))
    })
}

/// Trim, drop trailing sentence punctuation, uppercase the first letter only
pub fn normalize_description(raw: &str) -> Option<String> {
    let trimmed = raw
        .trim()
        .trim_end_matches(['.', '!', '?', ','])
        .trim();

    let mut chars = trimmed.chars();
    let first = chars.next()?;

    let mut out: String = first.to_uppercase().collect();
    out.push_str(chars.as_str());
    Some(out)
}
