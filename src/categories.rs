//! Category store. Categories are a flat, shared lookup table: any
//! authenticated caller may read or write any category, no ownership scoping.
//! Deletion is restricted while transactions still reference the category.

use crate::db;
use crate::error::ApiError;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CategoryParams {
    pub name: Option<String>,
}

fn category_from_row(row: &Row) -> rusqlite::Result<Category> {
    let created_at: String = row.get(2)?;
    Ok(Category {
        id: row.get(0)?,
        name: row.get(1)?,
        created_at: db::parse_timestamp(&created_at)?,
    })
}

fn validate(name: &str) -> Result<(), ApiError> {
    let mut errors = Vec::new();

    if name.trim().is_empty() {
        errors.push("Name can't be blank".to_string());
    }

    ApiError::from_messages(errors)
}

pub fn list_categories(conn: &Connection) -> Result<Vec<Category>, ApiError> {
    let mut stmt = conn.prepare("SELECT id, name, created_at FROM categories ORDER BY name")?;
    let categories = stmt
        .query_map([], category_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(categories)
}

pub fn create_category(
    conn: &Connection,
    category_params: &CategoryParams,
) -> Result<Category, ApiError> {
    let name = category_params.name.as_deref().unwrap_or("");
    validate(name)?;

    conn.execute(
        "INSERT INTO categories (name, created_at) VALUES (?1, ?2)",
        params![name, db::now_timestamp()],
    )?;

    get_category(conn, conn.last_insert_rowid())
}

pub fn get_category(conn: &Connection, id: i64) -> Result<Category, ApiError> {
    let category = conn.query_row(
        "SELECT id, name, created_at FROM categories WHERE id = ?1",
        params![id],
        category_from_row,
    )?;
    Ok(category)
}

pub fn update_category(
    conn: &Connection,
    id: i64,
    category_params: &CategoryParams,
) -> Result<Category, ApiError> {
    let current = get_category(conn, id)?;

    let name = category_params.name.clone().unwrap_or(current.name);
    validate(&name)?;

    conn.execute(
        "UPDATE categories SET name = ?1 WHERE id = ?2",
        params![name, id],
    )?;

    get_category(conn, id)
}

/// Restrict-delete-if-referenced: a category still in use by any transaction
/// cannot be removed. The check mirrors the RESTRICT rule in the schema but
/// produces a readable message instead of a raw constraint failure.
pub fn delete_category(conn: &Connection, id: i64) -> Result<(), ApiError> {
    get_category(conn, id)?;

    let referenced: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM transactions WHERE category_id = ?1)",
        params![id],
        |row| row.get(0),
    )?;
    if referenced {
        return Err(ApiError::Validation(vec![
            "Category is still referenced by transactions".to_string(),
        ]));
    }

    conn.execute("DELETE FROM categories WHERE id = ?1", params![id])?;
    Ok(())
}
