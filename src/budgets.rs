//! Budget store. Every operation is scoped to the supplied owner: the SQL
//! always filters on `user_id` together with the id, in one query. A budget
//! owned by someone else and a budget that does not exist produce the same
//! `NotFound`, so existence never leaks across identities.

use crate::db;
use crate::error::ApiError;
use crate::users::User;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct Budget {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub financial_goal: f64,
    pub created_at: DateTime<Utc>,
}

/// Writable fields, as they arrive nested under the `budget` key. Ownership
/// (`user_id`) is never client-writable.
#[derive(Debug, Default, Deserialize)]
pub struct BudgetParams {
    pub name: Option<String>,
    pub financial_goal: Option<f64>,
}

fn budget_from_row(row: &Row) -> rusqlite::Result<Budget> {
    let created_at: String = row.get(4)?;
    Ok(Budget {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        financial_goal: row.get(3)?,
        created_at: db::parse_timestamp(&created_at)?,
    })
}

fn validate(name: &str, financial_goal: Option<f64>) -> Result<(), ApiError> {
    let mut errors = Vec::new();

    if name.trim().is_empty() {
        errors.push("Name can't be blank".to_string());
    }

    match financial_goal {
        None => errors.push("Financial goal is not a number".to_string()),
        Some(goal) if goal < 0.0 => {
            errors.push("Financial goal must be greater than or equal to 0".to_string());
        }
        Some(_) => {}
    }

    ApiError::from_messages(errors)
}

pub fn list_budgets(conn: &Connection, owner: &User) -> Result<Vec<Budget>, ApiError> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, name, financial_goal, created_at
         FROM budgets
         WHERE user_id = ?1
         ORDER BY id",
    )?;

    let budgets = stmt
        .query_map(params![owner.id], budget_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(budgets)
}

pub fn create_budget(
    conn: &Connection,
    owner: &User,
    budget_params: &BudgetParams,
) -> Result<Budget, ApiError> {
    let name = budget_params.name.as_deref().unwrap_or("");
    validate(name, budget_params.financial_goal)?;

    conn.execute(
        "INSERT INTO budgets (user_id, name, financial_goal, created_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            owner.id,
            name,
            budget_params.financial_goal,
            db::now_timestamp()
        ],
    )?;

    get_budget(conn, owner, conn.last_insert_rowid())
}

/// The scoped-lookup primitive: id AND owner in a single query. Every other
/// budget and transaction operation goes through this.
pub fn get_budget(conn: &Connection, owner: &User, id: i64) -> Result<Budget, ApiError> {
    let budget = conn.query_row(
        "SELECT id, user_id, name, financial_goal, created_at
         FROM budgets
         WHERE id = ?1 AND user_id = ?2",
        params![id, owner.id],
        budget_from_row,
    )?;
    Ok(budget)
}

/// Partial update: absent fields keep their stored value, present fields are
/// validated against the merged result before anything is written.
pub fn update_budget(
    conn: &Connection,
    owner: &User,
    id: i64,
    budget_params: &BudgetParams,
) -> Result<Budget, ApiError> {
    let current = get_budget(conn, owner, id)?;

    let name = budget_params.name.clone().unwrap_or(current.name);
    let financial_goal = budget_params.financial_goal.unwrap_or(current.financial_goal);
    validate(&name, Some(financial_goal))?;

    conn.execute(
        "UPDATE budgets SET name = ?1, financial_goal = ?2 WHERE id = ?3 AND user_id = ?4",
        params![name, financial_goal, id, owner.id],
    )?;

    get_budget(conn, owner, id)
}

pub fn delete_budget(conn: &Connection, owner: &User, id: i64) -> Result<(), ApiError> {
    let deleted = conn.execute(
        "DELETE FROM budgets WHERE id = ?1 AND user_id = ?2",
        params![id, owner.id],
    )?;

    if deleted == 0 {
        return Err(ApiError::NotFound);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::setup_database;
    use crate::users::create_user;

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        conn
    }

    fn params_for(name: &str, goal: f64) -> BudgetParams {
        BudgetParams {
            name: Some(name.to_string()),
            financial_goal: Some(goal),
        }
    }

    #[test]
    fn test_create_then_get_round_trips() {
        let conn = test_conn();
        let (alice, _) = create_user(&conn, "alice@example.com").unwrap();

        let created = create_budget(&conn, &alice, &params_for("Groceries", 300.0)).unwrap();
        let fetched = get_budget(&conn, &alice, created.id).unwrap();

        assert_eq!(fetched.id, created.id);
        assert_eq!(fetched.name, "Groceries");
        assert_eq!(fetched.financial_goal, 300.0);
        assert_eq!(fetched.user_id, alice.id);
    }

    #[test]
    fn test_other_user_cannot_see_budget() {
        let conn = test_conn();
        let (alice, _) = create_user(&conn, "alice@example.com").unwrap();
        let (bob, _) = create_user(&conn, "bob@example.com").unwrap();

        let budget = create_budget(&conn, &alice, &params_for("Groceries", 300.0)).unwrap();

        // Indistinguishable from a nonexistent budget
        let result = get_budget(&conn, &bob, budget.id);
        assert!(matches!(result, Err(ApiError::NotFound)));

        let missing = get_budget(&conn, &alice, budget.id + 100);
        assert!(matches!(missing, Err(ApiError::NotFound)));
    }

    #[test]
    fn test_list_only_returns_own_budgets() {
        let conn = test_conn();
        let (alice, _) = create_user(&conn, "alice@example.com").unwrap();
        let (bob, _) = create_user(&conn, "bob@example.com").unwrap();

        create_budget(&conn, &alice, &params_for("Groceries", 300.0)).unwrap();
        create_budget(&conn, &alice, &params_for("Rent", 1200.0)).unwrap();
        create_budget(&conn, &bob, &params_for("Travel", 500.0)).unwrap();

        let alices = list_budgets(&conn, &alice).unwrap();
        assert_eq!(alices.len(), 2);
        assert!(alices.iter().all(|b| b.user_id == alice.id));

        let bobs = list_budgets(&conn, &bob).unwrap();
        assert_eq!(bobs.len(), 1);
        assert_eq!(bobs[0].name, "Travel");
    }

    #[test]
    fn test_negative_goal_rejected_zero_accepted() {
        let conn = test_conn();
        let (alice, _) = create_user(&conn, "alice@example.com").unwrap();

        let err = create_budget(&conn, &alice, &params_for("Groceries", -1.0)).unwrap_err();
        match err {
            ApiError::Validation(errors) => {
                assert_eq!(
                    errors,
                    vec!["Financial goal must be greater than or equal to 0".to_string()]
                );
            }
            other => panic!("expected validation error, got {:?}", other),
        }

        let budget = create_budget(&conn, &alice, &params_for("Groceries", 0.0)).unwrap();
        assert_eq!(budget.financial_goal, 0.0);
    }

    #[test]
    fn test_all_violations_reported_together() {
        let conn = test_conn();
        let (alice, _) = create_user(&conn, "alice@example.com").unwrap();

        let err = create_budget(&conn, &alice, &params_for("  ", -5.0)).unwrap_err();
        match err {
            ApiError::Validation(errors) => {
                assert_eq!(errors.len(), 2);
                assert!(errors.contains(&"Name can't be blank".to_string()));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_goal_rejected_on_create() {
        let conn = test_conn();
        let (alice, _) = create_user(&conn, "alice@example.com").unwrap();

        let params = BudgetParams {
            name: Some("Groceries".to_string()),
            financial_goal: None,
        };
        let err = create_budget(&conn, &alice, &params).unwrap_err();
        match err {
            ApiError::Validation(errors) => {
                assert_eq!(errors, vec!["Financial goal is not a number".to_string()]);
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_partial_update_keeps_absent_fields() {
        let conn = test_conn();
        let (alice, _) = create_user(&conn, "alice@example.com").unwrap();
        let budget = create_budget(&conn, &alice, &params_for("Groceries", 300.0)).unwrap();

        let rename = BudgetParams {
            name: Some("Food".to_string()),
            financial_goal: None,
        };
        let updated = update_budget(&conn, &alice, budget.id, &rename).unwrap();
        assert_eq!(updated.name, "Food");
        assert_eq!(updated.financial_goal, 300.0);
    }

    #[test]
    fn test_update_validates_merged_state() {
        let conn = test_conn();
        let (alice, _) = create_user(&conn, "alice@example.com").unwrap();
        let budget = create_budget(&conn, &alice, &params_for("Groceries", 300.0)).unwrap();

        let bad = BudgetParams {
            name: None,
            financial_goal: Some(-10.0),
        };
        let err = update_budget(&conn, &alice, budget.id, &bad).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        // Nothing was written
        let unchanged = get_budget(&conn, &alice, budget.id).unwrap();
        assert_eq!(unchanged.financial_goal, 300.0);
    }

    #[test]
    fn test_update_scoped_to_owner() {
        let conn = test_conn();
        let (alice, _) = create_user(&conn, "alice@example.com").unwrap();
        let (bob, _) = create_user(&conn, "bob@example.com").unwrap();
        let budget = create_budget(&conn, &alice, &params_for("Groceries", 300.0)).unwrap();

        let result = update_budget(&conn, &bob, budget.id, &params_for("Hijacked", 1.0));
        assert!(matches!(result, Err(ApiError::NotFound)));
    }

    #[test]
    fn test_delete_scoped_to_owner() {
        let conn = test_conn();
        let (alice, _) = create_user(&conn, "alice@example.com").unwrap();
        let (bob, _) = create_user(&conn, "bob@example.com").unwrap();
        let budget = create_budget(&conn, &alice, &params_for("Groceries", 300.0)).unwrap();

        let result = delete_budget(&conn, &bob, budget.id);
        assert!(matches!(result, Err(ApiError::NotFound)));

        delete_budget(&conn, &alice, budget.id).unwrap();
        let gone = get_budget(&conn, &alice, budget.id);
        assert!(matches!(gone, Err(ApiError::NotFound)));
    }

    #[test]
    fn test_user_delete_cascades_to_budgets() {
        let conn = test_conn();
        let (alice, _) = create_user(&conn, "alice@example.com").unwrap();
        let budget = create_budget(&conn, &alice, &params_for("Groceries", 300.0)).unwrap();

        crate::users::delete_user(&conn, "alice@example.com").unwrap();

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM budgets WHERE id = ?1",
                params![budget.id],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 0);
    }
}
