//! Personal Finance Assistant
//!
//! A personal finance tracker with a chat assistant that:
//! - Records expenses and budgets per user
//! - Aggregates spending by category against budgets
//! - Classifies chat messages as an expense to record, an investment
//!   question, or a general question for the advice service
//! - Extracts amount, category, description and date from free text
//!
//! CHAT FLOW:
//! MESSAGE → CLASSIFY → (RECORD EXPENSE | ASK ADVICE) → REPLY

pub mod advice;
pub mod api;
pub mod auth;
pub mod chat;
pub mod classifier;
pub mod config;
pub mod error;
pub mod formatter;
pub mod models;
pub mod storage;
pub mod summary;

pub use error::Result;

// Re-export common types
pub use classifier::{IntentClassifier, KeywordTables};
pub use models::*;
