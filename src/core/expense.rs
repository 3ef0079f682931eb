//! Expense business logic.
//!
//! Expenses are append-only: they are created and deleted, never edited.
//! Amounts arrive as typed text and go through the permissive numeric
//! coercion of [`parse_amount`]; anything that does not parse is rejected
//! before the store is called.

use super::validation::{Check, Form, Rule, parse_amount, validate};
use crate::{
    auth::Session,
    errors::{Error, Result},
    models::{Expense, Record, Timestamp, records_from_snapshot},
    store::{Collection, Direction, DocumentStore, Query},
};
use tracing::info;

/// Raw input of the add-expense form.
#[derive(Debug, Clone, Default)]
pub struct ExpenseForm {
    /// Free-text category
    pub category: String,
    /// Amount as typed
    pub amount: String,
    /// Optional note
    pub description: String,
}

impl Form for ExpenseForm {
    fn field(&self, name: &str) -> Option<&str> {
        match name {
            "category" => Some(&self.category),
            "amount" => Some(&self.amount),
            "description" => Some(&self.description),
            _ => None,
        }
    }
}

const EXPENSE_RULES: &[Rule] = &[
    Rule::new("category", Check::Required, "Category and amount are required."),
    Rule::new("amount", Check::Required, "Category and amount are required."),
    Rule::new("amount", Check::Number, "Amount must be a valid number."),
];

/// Records an expense for `event_id`.
pub async fn add_expense<S: DocumentStore>(
    store: &S,
    session: &Session,
    event_id: &str,
    form: &ExpenseForm,
) -> Result<Expense> {
    session.require_user()?;
    validate(form, EXPENSE_RULES)?;
    let amount = parse_amount(&form.amount)
        .ok_or_else(|| Error::validation("amount", "Amount must be a valid number."))?;

    let mut expense = Expense {
        id: String::new(),
        event_id: event_id.to_string(),
        // Category labels are grouped verbatim, so only surrounding blanks are dropped.
        category: form.category.trim().to_string(),
        amount,
        description: form.description.trim().to_string(),
        created_at: Some(Timestamp::now()),
    };
    expense.id = store
        .add_document(Collection::Expenses, expense.to_fields()?)
        .await?;
    info!(%event_id, expense_id = %expense.id, amount, "Expense added");
    Ok(expense)
}

/// Deletes an expense.
pub async fn delete_expense<S: DocumentStore>(
    store: &S,
    session: &Session,
    expense_id: &str,
) -> Result<()> {
    session.require_user()?;
    store
        .delete_document(Collection::Expenses, expense_id)
        .await?;
    info!(%expense_id, "Expense deleted");
    Ok(())
}

/// Expenses of `event_id`, oldest first.
pub async fn list_expenses<S: DocumentStore>(
    store: &S,
    session: &Session,
    event_id: &str,
) -> Result<Vec<Expense>> {
    session.require_user()?;
    let query = Query::new()
        .eq("eventId", event_id)
        .order_by("createdAt", Direction::Ascending);
    let docs = store.query(Collection::Expenses, &query).await?;
    Ok(records_from_snapshot(&docs))
}
