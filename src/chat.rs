//! Chat orchestration
//!
//! Classifies each message, then either records the expense or asks the
//! advice service (with the user's current totals). Failures downstream are
//! turned into a conversational error reply; they never end the session.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::advice::{AdviceContext, AdviceService};
use crate::classifier::IntentClassifier;
use crate::formatter::format_advice;
use crate::models::{ClassificationResult, Expense, ExpenseCandidate, InvestmentParameters};
use crate::storage::FinanceStore;
use crate::summary::SpendingSummary;

const ADVICE_UNAVAILABLE: &str =
    "Sorry, I can't give financial advice right now. Please try again later.";

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReplyKind {
    Expense,
    Advice,
    Error,
}

/// Reply appended to the chat transcript
#[derive(Debug, Clone, Serialize)]
pub struct ChatReply {
    pub kind: ReplyKind,
    pub intent: &'static str,
    pub response: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expense: Option<Expense>,
}

pub struct ChatOrchestrator {
    classifier: Arc<IntentClassifier>,
    store: Arc<dyn FinanceStore>,
    advisor: Arc<dyn AdviceService>,
}

impl ChatOrchestrator {
    pub fn new(
        classifier: Arc<IntentClassifier>,
        store: Arc<dyn FinanceStore>,
        advisor: Arc<dyn AdviceService>,
    ) -> Self {
        Self {
            classifier,
            store,
            advisor,
        }
    }

    pub async fn handle(&self, user_id: i64, message: &str, now: DateTime<Utc>) -> ChatReply {
        let classification = self.classifier.classify(message, now);
        let intent = classification.intent_name();
        info!(user_id, intent, "Chat message classified");

        match classification {
            ClassificationResult::Expense(candidate) => {
                self.record_expense(user_id, candidate).await
            }
            ClassificationResult::Investment(params) => {
                let question = investment_question(message, &params);
                self.ask(user_id, intent, &question).await
            }
            ClassificationResult::General => self.ask(user_id, intent, message).await,
        }
    }

    async fn record_expense(&self, user_id: i64, candidate: ExpenseCandidate) -> ChatReply {
        match self.store.create_expense(user_id, candidate.into()).await {
            Ok(expense) => {
                info!(user_id, expense_id = expense.id, "Expense recorded from chat");
                ChatReply {
                    kind: ReplyKind::Expense,
                    intent: "expense",
                    response: format!(
                        "Added expense: {} - {:.2} ({}) on {}",
                        expense.description, expense.amount, expense.category, expense.date
                    ),
                    expense: Some(expense),
                }
            }
            Err(e) => {
                warn!(user_id, "Could not add expense from chat: {}", e);
                ChatReply {
                    kind: ReplyKind::Error,
                    intent: "expense",
                    response: format!("Could not add expense: {}", e),
                    expense: None,
                }
            }
        }
    }

    async fn ask(&self, user_id: i64, intent: &'static str, question: &str) -> ChatReply {
        let context = self.totals(user_id).await;

        match self.advisor.get_advice(question, context).await {
            Ok(answer) => ChatReply {
                kind: ReplyKind::Advice,
                intent,
                response: format_advice(&answer),
                expense: None,
            },
            Err(e) => {
                warn!(user_id, "Advice service failed: {}", e);
                ChatReply {
                    kind: ReplyKind::Error,
                    intent,
                    response: ADVICE_UNAVAILABLE.to_string(),
                    expense: None,
                }
            }
        }
    }

    /// Current totals, or no context when the store can't be read
    async fn totals(&self, user_id: i64) -> Option<AdviceContext> {
        let expenses = self.store.list_expenses(user_id).await;
        let budgets = self.store.list_budgets(user_id).await;

        match (expenses, budgets) {
            (Ok(expenses), Ok(budgets)) => {
                Some(SpendingSummary::compute(&expenses, &budgets).advice_context())
            }
            (Err(e), _) | (_, Err(e)) => {
                warn!(user_id, "Totals unavailable, asking without context: {}", e);
                None
            }
        }
    }
}

fn investment_question(message: &str, params: &InvestmentParameters) -> String {
    format!(
        "{}\n\nInvestment parameters: amount {:.0}, time horizon {}, risk tolerance {}",
        message, params.amount, params.time_horizon, params.risk_tolerance
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TrackerError;
    use crate::models::{BudgetPeriod, ExpenseCategory, NewBudget};
    use crate::storage::InMemoryFinanceStore;
    use crate::Result;
    use chrono::TimeZone;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingAdvisor {
        calls: Mutex<Vec<(String, Option<AdviceContext>)>>,
    }

    #[async_trait::async_trait]
    impl AdviceService for RecordingAdvisor {
        async fn get_advice(&self, question: &str, context: Option<AdviceContext>) -> Result<String> {
            self.calls
                .lock()
                .unwrap()
                .push((question.to_string(), context));
            Ok("  Keep a buffer.\n\n\n  - Save 20%  \n".to_string())
        }
    }

    struct FailingAdvisor;

    #[async_trait::async_trait]
    impl AdviceService for FailingAdvisor {
        async fn get_advice(&self, _: &str, _: Option<AdviceContext>) -> Result<String> {
            Err(TrackerError::AdviceError("network down".to_string()))
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 4, 12, 0, 0).unwrap()
    }

    fn orchestrator(
        store: Arc<InMemoryFinanceStore>,
        advisor: Arc<dyn AdviceService>,
    ) -> ChatOrchestrator {
        ChatOrchestrator::new(
            Arc::new(IntentClassifier::with_default_tables().unwrap()),
            store,
            advisor,
        )
    }

    #[tokio::test]
    async fn test_expense_message_is_recorded() {
        let store = Arc::new(InMemoryFinanceStore::new());
        let advisor = Arc::new(RecordingAdvisor::default());
        let chat = orchestrator(store.clone(), advisor.clone());

        let reply = chat.handle(7, "spent 50 on food", now()).await;

        assert_eq!(reply.kind, ReplyKind::Expense);
        let expense = reply.expense.unwrap();
        assert_eq!(expense.amount, 50.0);
        assert_eq!(expense.category, ExpenseCategory::Food);
        assert_eq!(expense.date, now().date_naive());
        assert!(reply.response.starts_with("Added expense: Food - 50.00 (Food)"));

        assert_eq!(store.list_expenses(7).await.unwrap().len(), 1);
        assert!(advisor.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_general_question_gets_totals_and_formatting() {
        let store = Arc::new(InMemoryFinanceStore::new());
        store
            .create_budget(
                7,
                NewBudget {
                    category: ExpenseCategory::Food,
                    amount: 400.0,
                    period: BudgetPeriod::Monthly,
                },
            )
            .await
            .unwrap();
        let advisor = Arc::new(RecordingAdvisor::default());
        let chat = orchestrator(store.clone(), advisor.clone());

        chat.handle(7, "spent 25 on lunch", now()).await;
        let reply = chat.handle(7, "how can I cut back?", now()).await;

        assert_eq!(reply.kind, ReplyKind::Advice);
        assert_eq!(reply.intent, "general");
        assert_eq!(reply.response, "Keep a buffer.\n\n- Save 20%");

        let calls = advisor.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "how can I cut back?");
        assert_eq!(
            calls[0].1,
            Some(AdviceContext {
                expenses: 25.0,
                budget: 400.0
            })
        );
    }

    #[tokio::test]
    async fn test_investment_question_is_enriched() {
        let store = Arc::new(InMemoryFinanceStore::new());
        let advisor = Arc::new(RecordingAdvisor::default());
        let chat = orchestrator(store, advisor.clone());

        let reply = chat
            .handle(3, "invest 10 million, long term, aggressive", now())
            .await;
        assert_eq!(reply.intent, "investment");

        let calls = advisor.calls.lock().unwrap();
        assert!(calls[0].0.contains(
            "Investment parameters: amount 10000000, time horizon long-term, risk tolerance aggressive"
        ));
    }

    #[tokio::test]
    async fn test_advice_failure_becomes_error_reply() {
        let store = Arc::new(InMemoryFinanceStore::new());
        let chat = orchestrator(store, Arc::new(FailingAdvisor));

        let reply = chat.handle(1, "what is an index fund?", now()).await;
        assert_eq!(reply.kind, ReplyKind::Error);
        assert_eq!(reply.response, ADVICE_UNAVAILABLE);
    }
}
