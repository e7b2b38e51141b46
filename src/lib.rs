// budgetbook - Core Library
// Exposes the stores and the authorization gate for use in the CLI, the API
// server, and tests.

pub mod auth;
pub mod budgets;
pub mod categories;
pub mod db;
pub mod error;
pub mod transactions;
pub mod users;

// Re-export commonly used types
pub use auth::{authenticate, bearer_token, mint_token, token_digest};
pub use budgets::{
    create_budget, delete_budget, get_budget, list_budgets, update_budget, Budget, BudgetParams,
};
pub use categories::{
    create_category, delete_category, get_category, list_categories, update_category, Category,
    CategoryParams,
};
pub use db::{open_database, setup_database};
pub use error::ApiError;
pub use transactions::{
    create_transaction, delete_transaction, get_transaction, list_transactions,
    update_transaction, Transaction, TransactionParams,
};
pub use users::{
    create_user, delete_user, find_user_by_email, find_user_by_token_digest, list_users,
    rotate_token, User,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Database path from the environment, with a local default.
pub fn database_path() -> std::path::PathBuf {
    std::env::var("BUDGETBOOK_DB")
        .unwrap_or_else(|_| "budgetbook.db".to_string())
        .into()
}
