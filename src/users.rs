//! User store. Users are created through the admin CLI, never through the
//! HTTP API; the API only ever resolves an existing user from a token.

use crate::auth;
use crate::db;
use crate::error::ApiError;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

fn user_from_row(row: &Row) -> rusqlite::Result<User> {
    let created_at: String = row.get(2)?;
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        created_at: db::parse_timestamp(&created_at)?,
    })
}

fn validate_email(conn: &Connection, email: &str) -> Result<(), ApiError> {
    let mut errors = Vec::new();

    if email.trim().is_empty() {
        errors.push("Email can't be blank".to_string());
    } else {
        let taken: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = ?1)",
            params![email],
            |row| row.get(0),
        )?;
        if taken {
            errors.push("Email has already been taken".to_string());
        }
    }

    ApiError::from_messages(errors)
}

/// Create a user and mint their API token. The plaintext token is returned
/// exactly once; only its digest is stored.
pub fn create_user(conn: &Connection, email: &str) -> Result<(User, String), ApiError> {
    validate_email(conn, email)?;

    let token = auth::mint_token();
    conn.execute(
        "INSERT INTO users (email, token_digest, created_at) VALUES (?1, ?2, ?3)",
        params![email, auth::token_digest(&token), db::now_timestamp()],
    )?;

    let user = conn.query_row(
        "SELECT id, email, created_at FROM users WHERE id = ?1",
        params![conn.last_insert_rowid()],
        user_from_row,
    )?;

    Ok((user, token))
}

pub fn find_user_by_email(conn: &Connection, email: &str) -> Result<User, ApiError> {
    let user = conn.query_row(
        "SELECT id, email, created_at FROM users WHERE email = ?1",
        params![email],
        user_from_row,
    )?;
    Ok(user)
}

/// Resolve a stored token digest to its user. The Authorization Gate's only
/// lookup; an unknown digest is simply not found here.
pub fn find_user_by_token_digest(conn: &Connection, digest: &str) -> Result<User, ApiError> {
    let user = conn.query_row(
        "SELECT id, email, created_at FROM users WHERE token_digest = ?1",
        params![digest],
        user_from_row,
    )?;
    Ok(user)
}

pub fn list_users(conn: &Connection) -> Result<Vec<User>, ApiError> {
    let mut stmt = conn.prepare("SELECT id, email, created_at FROM users ORDER BY email")?;
    let users = stmt
        .query_map([], user_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(users)
}

/// Replace the user's token, invalidating the previous one. Returns the new
/// plaintext token.
pub fn rotate_token(conn: &Connection, email: &str) -> Result<String, ApiError> {
    let token = auth::mint_token();
    let updated = conn.execute(
        "UPDATE users SET token_digest = ?1 WHERE email = ?2",
        params![auth::token_digest(&token), email],
    )?;

    if updated == 0 {
        return Err(ApiError::NotFound);
    }
    Ok(token)
}

/// Delete a user. The storage layer cascades through their budgets and those
/// budgets' transactions.
pub fn delete_user(conn: &Connection, email: &str) -> Result<(), ApiError> {
    let deleted = conn.execute("DELETE FROM users WHERE email = ?1", params![email])?;

    if deleted == 0 {
        return Err(ApiError::NotFound);
    }
    Ok(())
}
