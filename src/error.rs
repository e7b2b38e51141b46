// Error taxonomy shared by every store and the API surface.
//
// NotFound deliberately covers two cases: the resource does not exist, or it
// exists but belongs to a different user. Handlers must never distinguish the
// two, otherwise a guessed id leaks whether another user owns it.

use std::fmt;

#[derive(Debug)]
pub enum ApiError {
    /// Missing, malformed, or unknown credential. Raised before any store
    /// access.
    Authentication,

    /// Resource absent OR owned by another identity. Always surfaced the same
    /// way.
    NotFound,

    /// One or more field constraints violated. Carries the full set of
    /// messages, not just the first.
    Validation(Vec<String>),

    /// Underlying storage failure.
    Database(rusqlite::Error),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Authentication => write!(f, "authentication required"),
            ApiError::NotFound => write!(f, "resource not found"),
            ApiError::Validation(errors) => write!(f, "validation failed: {}", errors.join(", ")),
            ApiError::Database(err) => write!(f, "database error: {}", err),
        }
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApiError::Database(err) => Some(err),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for ApiError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            // Scoped lookups use query_row; an empty result IS the not-found
            // case, so every store gets the uniform mapping for free.
            rusqlite::Error::QueryReturnedNoRows => ApiError::NotFound,
            other => ApiError::Database(other),
        }
    }
}

impl ApiError {
    /// Build a validation error from collected messages, if any.
    pub fn from_messages(errors: Vec<String>) -> Result<(), ApiError> {
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(errors))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_rows_maps_to_not_found() {
        let err: ApiError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, ApiError::NotFound));
    }

    #[test]
    fn test_from_messages_empty_is_ok() {
        assert!(ApiError::from_messages(Vec::new()).is_ok());
    }

    #[test]
    fn test_from_messages_collects_all() {
        let result = ApiError::from_messages(vec![
            "Name can't be blank".to_string(),
            "Financial goal must be greater than or equal to 0".to_string(),
        ]);

        match result {
            Err(ApiError::Validation(errors)) => assert_eq!(errors.len(), 2),
            other => panic!("expected validation error, got {:?}", other),
        }
    }
}
