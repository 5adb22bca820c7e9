//! Persistence layer
//!
//! Users, budgets and expenses keyed by one auto-incrementing id shared by
//! every entity type. Budgets and expenses are scoped by their owning user:
//! touching another user's entity reads as `NotFound`.

use crate::error::TrackerError;
use crate::models::{
    Budget, BudgetUpdate, Expense, ExpenseUpdate, NewBudget, NewExpense, NewUser, User,
};
use crate::Result;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Trait for finance persistence
#[async_trait::async_trait]
pub trait FinanceStore: Send + Sync {
    async fn create_user(&self, user: NewUser) -> Result<User>;
    async fn get_user(&self, id: i64) -> Result<Option<User>>;
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;
    async fn update_user(
        &self,
        id: i64,
        display_name: Option<String>,
        password_hash: Option<String>,
    ) -> Result<User>;

    async fn list_budgets(&self, owner: i64) -> Result<Vec<Budget>>;
    async fn create_budget(&self, owner: i64, budget: NewBudget) -> Result<Budget>;
    async fn update_budget(&self, owner: i64, id: i64, update: BudgetUpdate) -> Result<Budget>;
    async fn delete_budget(&self, owner: i64, id: i64) -> Result<()>;

    async fn list_expenses(&self, owner: i64) -> Result<Vec<Expense>>;
    async fn create_expense(&self, owner: i64, expense: NewExpense) -> Result<Expense>;
    async fn update_expense(&self, owner: i64, id: i64, update: ExpenseUpdate) -> Result<Expense>;
    async fn delete_expense(&self, owner: i64, id: i64) -> Result<()>;
}

/// In-memory store
pub struct InMemoryFinanceStore {
    users: Arc<RwLock<BTreeMap<i64, User>>>,
    budgets: Arc<RwLock<BTreeMap<i64, Budget>>>,
    expenses: Arc<RwLock<BTreeMap<i64, Expense>>>,
    next_id: AtomicI64,
}

impl InMemoryFinanceStore {
    pub fn new() -> Self {
        Self {
            users: Arc::new(RwLock::new(BTreeMap::new())),
            budgets: Arc::new(RwLock::new(BTreeMap::new())),
            expenses: Arc::new(RwLock::new(BTreeMap::new())),
            next_id: AtomicI64::new(1),
        }
    }

    fn allocate_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }
}

impl Default for InMemoryFinanceStore {
    fn default() -> Self {
        Self::new()
    }
}

// =============================
// Validation
// =============================

fn validate_amount(amount: f64) -> Result<()> {
    if amount.is_finite() && amount > 0.0 {
        Ok(())
    } else {
        Err(TrackerError::Validation(format!(
            "Amount must be a positive number, got {}",
            amount
        )))
    }
}

fn validate_description(description: &str) -> Result<()> {
    if description.trim().is_empty() {
        Err(TrackerError::Validation(
            "Description must not be empty".to_string(),
        ))
    } else {
        Ok(())
    }
}

#[async_trait::async_trait]
impl FinanceStore for InMemoryFinanceStore {

    // =============================
    // Users
    // =============================

    async fn create_user(&self, user: NewUser) -> Result<User> {
        let mut users = self.users.write().await;

        if users.values().any(|u| u.username == user.username) {
            return Err(TrackerError::Conflict(format!(
                "Username {} already exists",
                user.username
            )));
        }

        let created = User {
            id: self.allocate_id(),
            username: user.username,
            password_hash: user.password_hash,
            display_name: user.display_name,
        };
        users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_user(&self, id: i64) -> Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users.get(&id).cloned())
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.username == username).cloned())
    }

    async fn update_user(
        &self,
        id: i64,
        display_name: Option<String>,
        password_hash: Option<String>,
    ) -> Result<User> {
        let mut users = self.users.write().await;
        let user = users
            .get_mut(&id)
            .ok_or_else(|| TrackerError::NotFound(format!("User {}", id)))?;

        if let Some(name) = display_name {
            validate_description(&name)?;
            user.display_name = name;
        }
        if let Some(hash) = password_hash {
            user.password_hash = hash;
        }

        Ok(user.clone())
    }

    // =============================
    // Budgets
    // =============================

    async fn list_budgets(&self, owner: i64) -> Result<Vec<Budget>> {
        let budgets = self.budgets.read().await;
        Ok(budgets
            .values()
            .filter(|b| b.user_id == owner)
            .cloned()
            .collect())
    }

    async fn create_budget(&self, owner: i64, budget: NewBudget) -> Result<Budget> {
        validate_amount(budget.amount)?;

        let created = Budget {
            id: self.allocate_id(),
            user_id: owner,
            category: budget.category,
            amount: budget.amount,
            period: budget.period,
        };

        let mut budgets = self.budgets.write().await;
        budgets.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_budget(&self, owner: i64, id: i64, update: BudgetUpdate) -> Result<Budget> {
        if let Some(amount) = update.amount {
            validate_amount(amount)?;
        }

        let mut budgets = self.budgets.write().await;
        let budget = budgets
            .get_mut(&id)
            .filter(|b| b.user_id == owner)
            .ok_or_else(|| TrackerError::NotFound(format!("Budget {}", id)))?;

        if let Some(category) = update.category {
            budget.category = category;
        }
        if let Some(amount) = update.amount {
            budget.amount = amount;
        }
        if let Some(period) = update.period {
            budget.period = period;
        }

        Ok(budget.clone())
    }

    async fn delete_budget(&self, owner: i64, id: i64) -> Result<()> {
        let mut budgets = self.budgets.write().await;
        let owned = budgets.get(&id).is_some_and(|b| b.user_id == owner);
        if !owned {
            return Err(TrackerError::NotFound(format!("Budget {}", id)));
        }

        budgets.remove(&id);
        Ok(())
    }

    // =============================
    // Expenses
    // =============================

    async fn list_expenses(&self, owner: i64) -> Result<Vec<Expense>> {
        let expenses = self.expenses.read().await;
        Ok(expenses
            .values()
            .filter(|e| e.user_id == owner)
            .cloned()
            .collect())
    }

    async fn create_expense(&self, owner: i64, expense: NewExpense) -> Result<Expense> {
        validate_amount(expense.amount)?;
        validate_description(&expense.description)?;

        let created = Expense {
            id: self.allocate_id(),
            user_id: owner,
            amount: expense.amount,
            category: expense.category,
            description: expense.description.trim().to_string(),
            date: expense.date,
        };

        let mut expenses = self.expenses.write().await;
        expenses.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_expense(&self, owner: i64, id: i64, update: ExpenseUpdate) -> Result<Expense> {
        if let Some(amount) = update.amount {
            validate_amount(amount)?;
        }
        if let Some(description) = &update.description {
            validate_description(description)?;
        }

        let mut expenses = self.expenses.write().await;
        let expense = expenses
            .get_mut(&id)
            .filter(|e| e.user_id == owner)
            .ok_or_else(|| TrackerError::NotFound(format!("Expense {}", id)))?;

        if let Some(amount) = update.amount {
            expense.amount = amount;
        }
        if let Some(category) = update.category {
            expense.category = category;
        }
        if let Some(description) = update.description {
            expense.description = description.trim().to_string();
        }
        if let Some(date) = update.date {
            expense.date = date;
        }

        Ok(expense.clone())
    }

    async fn delete_expense(&self, owner: i64, id: i64) -> Result<()> {
        let mut expenses = self.expenses.write().await;
        let owned = expenses.get(&id).is_some_and(|e| e.user_id == owner);
        if !owned {
            return Err(TrackerError::NotFound(format!("Expense {}", id)));
        }

        expenses.remove(&id);
        Ok(())
    }
}
