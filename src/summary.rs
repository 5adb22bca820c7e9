//! Aggregated spending for the dashboard and the advice context

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::advice::AdviceContext;
use crate::models::{Budget, Expense, ExpenseCategory};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CategoryTotal {
    pub category: ExpenseCategory,
    pub spent: f64,
    pub budgeted: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SpendingSummary {
    pub total_expenses: f64,
    pub total_budget: f64,
    pub remaining_budget: f64,
    /// Categories with spending or a budget, in category order
    pub by_category: Vec<CategoryTotal>,
}

impl SpendingSummary {
    pub fn compute(expenses: &[Expense], budgets: &[Budget]) -> Self {
        let mut totals: BTreeMap<ExpenseCategory, (f64, f64)> = BTreeMap::new();

        for expense in expenses {
            totals.entry(expense.category).or_default().0 += expense.amount;
        }
        for budget in budgets {
            totals.entry(budget.category).or_default().1 += budget.amount;
        }

        let total_expenses: f64 = expenses.iter().map(|e| e.amount).sum();
        let total_budget: f64 = budgets.iter().map(|b| b.amount).sum();

        Self {
            total_expenses,
            total_budget,
            remaining_budget: total_budget - total_expenses,
            by_category: totals
                .into_iter()
                .map(|(category, (spent, budgeted))| CategoryTotal {
                    category,
                    spent,
                    budgeted,
                })
                .collect(),
        }
    }

    pub fn advice_context(&self) -> AdviceContext {
        AdviceContext {
            expenses: self.total_expenses,
            budget: self.total_budget,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BudgetPeriod;
    use chrono::NaiveDate;

    fn expense(id: i64, category: ExpenseCategory, amount: f64) -> Expense {
        Expense {
            id,
            user_id: 1,
            amount,
            category,
            description: "x".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        }
    }

    #[test]
    fn test_compute() {
        let expenses = vec![
            expense(1, ExpenseCategory::Food, 20.0),
            expense(2, ExpenseCategory::Housing, 800.0),
            expense(3, ExpenseCategory::Food, 5.5),
        ];
        let budgets = vec![
            Budget {
                id: 4,
                user_id: 1,
                category: ExpenseCategory::Food,
                amount: 300.0,
                period: BudgetPeriod::Monthly,
            },
            Budget {
                id: 5,
                user_id: 1,
                category: ExpenseCategory::Entertainment,
                amount: 100.0,
                period: BudgetPeriod::Monthly,
            },
        ];

        let summary = SpendingSummary::compute(&expenses, &budgets);
        assert_eq!(summary.total_expenses, 825.5);
        assert_eq!(summary.total_budget, 400.0);
        assert_eq!(summary.remaining_budget, -425.5);

        let categories: Vec<_> = summary.by_category.iter().map(|c| c.category).collect();
        assert_eq!(
            categories,
            vec![
                ExpenseCategory::Housing,
                ExpenseCategory::Food,
                ExpenseCategory::Entertainment
            ]
        );
        assert_eq!(summary.by_category[1].spent, 25.5);
        assert_eq!(summary.by_category[1].budgeted, 300.0);
        assert_eq!(summary.by_category[2].spent, 0.0);

        let ctx = summary.advice_context();
        assert_eq!(ctx.expenses, 825.5);
        assert_eq!(ctx.budget, 400.0);
    }

    #[test]
    fn test_empty() {
        let summary = SpendingSummary::compute(&[], &[]);
        assert_eq!(summary.total_expenses, 0.0);
        assert!(summary.by_category.is_empty());
    }
}
