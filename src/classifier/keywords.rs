//! Keyword tables consulted by the classifier
//!
//! Tables are plain data: built once (defaults or a JSON file) and handed to
//! the classifier. Every list is checked by lowercase substring containment,
//! and category lists are consulted in their declared order.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::models::ExpenseCategory;
use crate::Result;

/// Keywords attached to one category
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryKeywords {
    pub category: ExpenseCategory,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KeywordTables {
    /// Expense vocabulary; overrides investment vocabulary when both appear
    pub expense_keywords: Vec<String>,
    pub investment_keywords: Vec<String>,
    /// First pass, matched against the extracted description only
    pub categories: Vec<CategoryKeywords>,
    /// Second pass, matched against utterance + description
    pub context_rules: Vec<CategoryKeywords>,
}

impl KeywordTables {
    /// Parse tables from JSON, lowercasing every keyword
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let tables: KeywordTables = serde_json::from_str(raw)?;
        Ok(tables.normalized())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    fn normalized(mut self) -> Self {
        let lower = |list: &mut Vec<String>| {
            for kw in list.iter_mut() {
                *kw = kw.trim().to_lowercase();
            }
            list.retain(|kw| !kw.is_empty());
        };

        lower(&mut self.expense_keywords);
        lower(&mut self.investment_keywords);
        for entry in self
            .categories
            .iter_mut()
            .chain(self.context_rules.iter_mut())
        {
            lower(&mut entry.keywords);
        }
        self
    }

    /// `text` must already be lowercase
    pub fn has_expense_keyword(&self, text: &str) -> bool {
        contains_any(text, &self.expense_keywords)
    }

    /// `text` must already be lowercase
    pub fn has_investment_keyword(&self, text: &str) -> bool {
        contains_any(text, &self.investment_keywords)
    }

    /// Two-pass category lookup; `Other` when nothing matches
    pub fn resolve_category(&self, utterance: &str, description: &str) -> ExpenseCategory {
        let desc = description.to_lowercase();
        if let Some(category) = first_match(&self.categories, &desc) {
            return category;
        }

        let combined = format!("{} {}", utterance, description).to_lowercase();
        first_match(&self.context_rules, &combined).unwrap_or(ExpenseCategory::Other)
    }
}

fn contains_any(text: &str, keywords: &[String]) -> bool {
    keywords.iter().any(|kw| text.contains(kw.as_str()))
}

fn first_match(table: &[CategoryKeywords], text: &str) -> Option<ExpenseCategory> {
    table
        .iter()
        .find(|entry| contains_any(text, &entry.keywords))
        .map(|entry| entry.category)
}

fn entry(category: ExpenseCategory, keywords: &[&str]) -> CategoryKeywords {
    CategoryKeywords {
        category,
        keywords: keywords.iter().map(|kw| kw.to_string()).collect(),
    }
}

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|kw| kw.to_string()).collect()
}

impl Default for KeywordTables {
    fn default() -> Self {
        use ExpenseCategory::*;

        Self {
            expense_keywords: words(&[
                "spend", "spent", "expense", "cost", "payment", "bill",
                "chi tiêu", "chi phí", "hóa đơn", "thanh toán",
            ]),
            investment_keywords: words(&[
                "invest", "savings", "portfolio", "stock market",
                "đầu tư", "tiết kiệm", "chứng khoán", "cổ phiếu",
            ]),
            categories: vec![
                entry(Housing, &[
                    "rent", "mortgage", "apartment", "house", "property", "lease",
                    "landlord", "housing", "tiền nhà", "thuê nhà", "căn hộ", "chung cư",
                ]),
                entry(Transportation, &[
                    "gas", "fuel", "car", "taxi", "uber", "lyft", "public transport",
                    "bus", "train", "metro", "subway", "parking", "maintenance",
                    "transport", "xăng", "xe buýt", "gửi xe", "đi xe",
                ]),
                entry(Food, &[
                    "food", "groceries", "restaurant", "dinner", "lunch", "breakfast",
                    "takeout", "delivery", "coffee", "meal", "eat", "dining", "grocery",
                    "đồ ăn", "ăn sáng", "ăn trưa", "ăn tối", "cơm", "phở", "bún",
                    "cà phê", "nhà hàng",
                ]),
                entry(Utilities, &[
                    "electricity", "water", "gas bill", "internet", "phone", "mobile",
                    "cable", "streaming", "netflix", "spotify", "utility",
                    "tiền điện", "tiền nước", "điện thoại", "wifi",
                ]),
                entry(Insurance, &[
                    "insurance", "health insurance", "car insurance", "home insurance",
                    "life insurance", "bảo hiểm",
                ]),
                entry(Healthcare, &[
                    "doctor", "hospital", "pharmacy", "medicine", "drug", "clinic",
                    "dentist", "optical", "health", "medical", "bệnh viện", "thuốc",
                    "khám bệnh",
                ]),
                entry(Entertainment, &[
                    "movie", "cinema", "game", "concert", "music", "hobby", "sports",
                    "gym", "fitness", "party", "bar", "alcohol", "entertain",
                    "xem phim", "karaoke", "du lịch",
                ]),
            ],
            context_rules: vec![
                entry(Housing, &["rent", "apartment", "mortgage", "tiền nhà"]),
                entry(Transportation, &[
                    "fuel", "taxi", "uber", "lyft", "grab", "gojek", "commute", "xe ôm",
                ]),
                entry(Food, &[
                    "meal", "drink", "snack", "juice", "tea", "trà sữa", "ăn", "uống",
                ]),
                entry(Utilities, &["bill", "subscription", "electric", "hóa đơn", "điện", "nước"]),
                entry(Insurance, &["insurance", "premium", "bảo hiểm"]),
                entry(Healthcare, &["medical", "pharmacy", "pill", "hospital", "thuốc"]),
                entry(Entertainment, &[
                    "netflix", "streaming", "beer", "wine", "liquor", "ticket", "phim",
                ]),
            ],
        }
    }
}
