//! Core data models for the finance assistant

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::TrackerError;

//
// ================= Enums =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ExpenseCategory {
    Housing,
    Transportation,
    Food,
    Utilities,
    Insurance,
    Healthcare,
    Entertainment,
    Other,
}

impl ExpenseCategory {
    /// Every category in declaration order
    pub const ALL: [ExpenseCategory; 8] = [
        ExpenseCategory::Housing,
        ExpenseCategory::Transportation,
        ExpenseCategory::Food,
        ExpenseCategory::Utilities,
        ExpenseCategory::Insurance,
        ExpenseCategory::Healthcare,
        ExpenseCategory::Entertainment,
        ExpenseCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExpenseCategory::Housing => "Housing",
            ExpenseCategory::Transportation => "Transportation",
            ExpenseCategory::Food => "Food",
            ExpenseCategory::Utilities => "Utilities",
            ExpenseCategory::Insurance => "Insurance",
            ExpenseCategory::Healthcare => "Healthcare",
            ExpenseCategory::Entertainment => "Entertainment",
            ExpenseCategory::Other => "Other",
        }
    }
}

impl FromStr for ExpenseCategory {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        ExpenseCategory::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| TrackerError::Validation(format!("Unknown category: {}", s)))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TimeHorizon {
    ShortTerm,
    #[default]
    MediumTerm,
    LongTerm,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RiskTolerance {
    Conservative,
    #[default]
    Moderate,
    Aggressive,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BudgetPeriod {
    #[default]
    Monthly,
    Yearly,
}

//
// ================= Classification =================
//

/// A fully extracted expense, ready to be handed to the store
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseCandidate {
    pub amount: f64,
    pub category: ExpenseCategory,
    pub description: String,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct InvestmentParameters {
    pub amount: f64,
    pub time_horizon: TimeHorizon,
    pub risk_tolerance: RiskTolerance,
}

/// Outcome of classifying one utterance; exactly one intent per message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "intent", content = "data", rename_all = "snake_case")]
pub enum ClassificationResult {
    Expense(ExpenseCandidate),
    Investment(InvestmentParameters),
    General,
}

impl ClassificationResult {
    pub fn intent_name(&self) -> &'static str {
        match self {
            ClassificationResult::Expense(_) => "expense",
            ClassificationResult::Investment(_) => "investment",
            ClassificationResult::General => "general",
        }
    }
}

//
// ================= Stored Entities =================
//

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub display_name: String,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub display_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Budget {
    pub id: i64,
    pub user_id: i64,
    pub category: ExpenseCategory,
    pub amount: f64,
    pub period: BudgetPeriod,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBudget {
    pub category: ExpenseCategory,
    pub amount: f64,
    #[serde(default)]
    pub period: BudgetPeriod,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BudgetUpdate {
    pub category: Option<ExpenseCategory>,
    pub amount: Option<f64>,
    pub period: Option<BudgetPeriod>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: i64,
    pub user_id: i64,
    pub amount: f64,
    pub category: ExpenseCategory,
    pub description: String,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewExpense {
    pub amount: f64,
    pub category: ExpenseCategory,
    pub description: String,
    pub date: NaiveDate,
}

impl From<ExpenseCandidate> for NewExpense {
    fn from(candidate: ExpenseCandidate) -> Self {
        Self {
            amount: candidate.amount,
            category: candidate.category,
            description: candidate.description,
            date: candidate.date,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExpenseUpdate {
    pub amount: Option<f64>,
    pub category: Option<ExpenseCategory>,
    pub description: Option<String>,
    pub date: Option<NaiveDate>,
}

//
// ================= Display =================
//

impl fmt::Display for ExpenseCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl fmt::Display for TimeHorizon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TimeHorizon::ShortTerm => "short-term",
            TimeHorizon::MediumTerm => "medium-term",
            TimeHorizon::LongTerm => "long-term",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for RiskTolerance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RiskTolerance::Conservative => "conservative",
            RiskTolerance::Moderate => "moderate",
            RiskTolerance::Aggressive => "aggressive",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for BudgetPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BudgetPeriod::Monthly => "monthly",
            BudgetPeriod::Yearly => "yearly",
        };
        write!(f, "{}", s)
    }
}
