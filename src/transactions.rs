//! Transaction store. Transactions are only reachable through their owning
//! budget: every operation first re-derives the budget via the owner-scoped
//! lookup, then addresses the transaction by id AND budget_id. A transaction
//! id that exists under a different budget fails exactly like a nonexistent
//! one.

use crate::budgets;
use crate::db;
use crate::error::ApiError;
use crate::users::User;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct Transaction {
    pub id: i64,
    pub budget_id: i64,
    pub category_id: i64,
    pub description: String,
    pub amount: f64,
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

/// Writable fields, nested under the `transaction` key. `budget_id` is taken
/// from the path, never from the body.
#[derive(Debug, Default, Deserialize)]
pub struct TransactionParams {
    pub description: Option<String>,
    pub amount: Option<f64>,
    pub category_id: Option<i64>,
    pub date: Option<NaiveDate>,
}

fn transaction_from_row(row: &Row) -> rusqlite::Result<Transaction> {
    let date: String = row.get(5)?;
    let created_at: String = row.get(6)?;
    Ok(Transaction {
        id: row.get(0)?,
        budget_id: row.get(1)?,
        category_id: row.get(2)?,
        description: row.get(3)?,
        amount: row.get(4)?,
        date: date.parse().map_err(|_| rusqlite::Error::InvalidQuery)?,
        created_at: db::parse_timestamp(&created_at)?,
    })
}

fn validate(
    conn: &Connection,
    description: &str,
    amount: Option<f64>,
    category_id: Option<i64>,
) -> Result<(), ApiError> {
    let mut errors = Vec::new();

    if description.trim().is_empty() {
        errors.push("Description can't be blank".to_string());
    }

    match amount {
        None => errors.push("Amount can't be blank".to_string()),
        Some(amount) if amount <= 0.0 => {
            errors.push("Amount must be greater than 0".to_string());
        }
        Some(_) => {}
    }

    let category_exists = match category_id {
        Some(id) => conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM categories WHERE id = ?1)",
            params![id],
            |row| row.get(0),
        )?,
        None => false,
    };
    if !category_exists {
        errors.push("Category must exist".to_string());
    }

    ApiError::from_messages(errors)
}

pub fn list_transactions(
    conn: &Connection,
    owner: &User,
    budget_id: i64,
) -> Result<Vec<Transaction>, ApiError> {
    let budget = budgets::get_budget(conn, owner, budget_id)?;

    let mut stmt = conn.prepare(
        "SELECT id, budget_id, category_id, description, amount, date, created_at
         FROM transactions
         WHERE budget_id = ?1
         ORDER BY date DESC, id DESC",
    )?;

    let transactions = stmt
        .query_map(params![budget.id], transaction_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(transactions)
}

pub fn create_transaction(
    conn: &Connection,
    owner: &User,
    budget_id: i64,
    tx_params: &TransactionParams,
) -> Result<Transaction, ApiError> {
    let budget = budgets::get_budget(conn, owner, budget_id)?;

    let description = tx_params.description.as_deref().unwrap_or("");
    validate(conn, description, tx_params.amount, tx_params.category_id)?;

    // Original schema carries a plain date column; default to today
    let date = tx_params.date.unwrap_or_else(|| Utc::now().date_naive());

    conn.execute(
        "INSERT INTO transactions (budget_id, category_id, description, amount, date, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            budget.id,
            tx_params.category_id,
            description,
            tx_params.amount,
            date.to_string(),
            db::now_timestamp()
        ],
    )?;

    get_transaction(conn, owner, budget.id, conn.last_insert_rowid())
}

pub fn get_transaction(
    conn: &Connection,
    owner: &User,
    budget_id: i64,
    id: i64,
) -> Result<Transaction, ApiError> {
    let budget = budgets::get_budget(conn, owner, budget_id)?;

    let transaction = conn.query_row(
        "SELECT id, budget_id, category_id, description, amount, date, created_at
         FROM transactions
         WHERE id = ?1 AND budget_id = ?2",
        params![id, budget.id],
        transaction_from_row,
    )?;
    Ok(transaction)
}

pub fn update_transaction(
    conn: &Connection,
    owner: &User,
    budget_id: i64,
    id: i64,
    tx_params: &TransactionParams,
) -> Result<Transaction, ApiError> {
    let current = get_transaction(conn, owner, budget_id, id)?;

    let description = tx_params.description.clone().unwrap_or(current.description);
    let amount = tx_params.amount.unwrap_or(current.amount);
    let category_id = tx_params.category_id.unwrap_or(current.category_id);
    let date = tx_params.date.unwrap_or(current.date);
    validate(conn, &description, Some(amount), Some(category_id))?;

    conn.execute(
        "UPDATE transactions
         SET category_id = ?1, description = ?2, amount = ?3, date = ?4
         WHERE id = ?5 AND budget_id = ?6",
        params![
            category_id,
            description,
            amount,
            date.to_string(),
            id,
            budget_id
        ],
    )?;

    get_transaction(conn, owner, budget_id, id)
}

pub fn delete_transaction(
    conn: &Connection,
    owner: &User,
    budget_id: i64,
    id: i64,
) -> Result<(), ApiError> {
    let budget = budgets::get_budget(conn, owner, budget_id)?;

    let deleted = conn.execute(
        "DELETE FROM transactions WHERE id = ?1 AND budget_id = ?2",
        params![id, budget.id],
    )?;

    if deleted == 0 {
        return Err(ApiError::NotFound);
    }
    Ok(())
}
