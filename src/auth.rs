//! Authorization Gate.
//!
//! A request credential is an opaque bearer token minted by the admin CLI.
//! Only the SHA-256 digest of a token is ever stored, so a database read
//! cannot recover usable credentials. `authenticate` resolves a token to
//! exactly one user or fails with `ApiError::Authentication` before any
//! store is touched.

use crate::error::ApiError;
use crate::users::{self, User};
use rusqlite::Connection;
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Mint a fresh API token. Two v4 UUIDs' worth of randomness, hex-compact.
pub fn mint_token() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

/// Digest used for storage and lookup. Tokens are compared by digest only.
pub fn token_digest(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Extract the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Resolve the request credential to a user identity.
///
/// Every failure mode collapses to `Authentication`: absent header, wrong
/// scheme, unknown token. Callers get a user or a rejection, never a hint
/// about which part failed.
pub fn authenticate(conn: &Connection, authorization: Option<&str>) -> Result<User, ApiError> {
    let token = authorization
        .and_then(bearer_token)
        .ok_or(ApiError::Authentication)?;

    users::find_user_by_token_digest(conn, &token_digest(token)).map_err(|err| match err {
        ApiError::NotFound => ApiError::Authentication,
        other => other,
    })
}
