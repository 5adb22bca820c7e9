//! Intent Classifier
//!
//! Classifies a chat utterance as one of:
//! - Expense: a purchase to record (amount, category, description, date)
//! - Investment: a request for investment advice, with parsed parameters
//! - General: anything else, forwarded verbatim to the advice service
//!
//! Resolution order is fixed: expense vocabulary beats investment vocabulary,
//! and General is the fallback when expense extraction fails.

pub mod expense;
pub mod investment;
pub mod keywords;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::models::ClassificationResult;
use crate::Result;

pub use expense::{ExpenseExtractor, ExtractionError};
pub use investment::InvestmentExtractor;
pub use keywords::{CategoryKeywords, KeywordTables};

/// Rule-based intent classifier; pure and safe to share across tasks
pub struct IntentClassifier {
    tables: KeywordTables,
    expense: ExpenseExtractor,
    investment: InvestmentExtractor,
}

impl IntentClassifier {
    pub fn new(tables: KeywordTables) -> Result<Self> {
        Ok(Self {
            tables,
            expense: ExpenseExtractor::new()?,
            investment: InvestmentExtractor::new()?,
        })
    }

    pub fn with_default_tables() -> Result<Self> {
        Self::new(KeywordTables::default())
    }

    pub fn tables(&self) -> &KeywordTables {
        &self.tables
    }

    /// Classify one utterance; `now` supplies the default expense date
    pub fn classify(&self, utterance: &str, now: DateTime<Utc>) -> ClassificationResult {
        let lowered = utterance.to_lowercase();

        if self.tables.has_expense_keyword(&lowered) {
            debug!("Expense vocabulary present, investment branch skipped");
            return self.expense_or_general(utterance, now);
        }

        if self.tables.has_investment_keyword(&lowered) {
            return ClassificationResult::Investment(self.investment.extract(&lowered));
        }

        self.expense_or_general(utterance, now)
    }

    fn expense_or_general(&self, utterance: &str, now: DateTime<Utc>) -> ClassificationResult {
        match self.expense.extract(utterance, &self.tables, now) {
            Ok(candidate) => ClassificationResult::Expense(candidate),
            Err(reason) => {
                debug!(%reason, "No expense pattern matched, treating as general query");
                ClassificationResult::General
            }
        }
    }
}
