// budgetbook - REST API server
//
// Token-authenticated CRUD over budgets, nested transactions, and shared
// categories. Every handler authenticates first, then calls the store with
// the resolved identity; ownership failures surface as the same 401 as a
// missing resource, so nothing leaks about what exists.

use anyhow::Result;
use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tower_http::cors::CorsLayer;

use budgetbook::{
    auth, budgets, categories, database_path, db, transactions, users::User, ApiError,
    BudgetParams, CategoryParams, TransactionParams,
};

/// Shared application state
#[derive(Clone)]
struct AppState {
    db: Arc<Mutex<Connection>>,
}

/// Error body shared by every failure response
#[derive(Serialize)]
struct ErrorBody {
    errors: Vec<String>,
}

// Creation/update payloads nest the writable fields under a singular resource
// key. The key itself may be absent; validation then reports every missing
// field instead of the transport rejecting the body.
#[derive(Deserialize)]
struct BudgetPayload {
    #[serde(default)]
    budget: BudgetParams,
}

#[derive(Deserialize)]
struct TransactionPayload {
    #[serde(default)]
    transaction: TransactionParams,
}

#[derive(Deserialize)]
struct CategoryPayload {
    #[serde(default)]
    category: CategoryParams,
}

fn error_response(err: ApiError) -> Response {
    match err {
        // Missing resources and other users' resources are reported exactly
        // like a bad credential
        ApiError::Authentication | ApiError::NotFound => (
            StatusCode::UNAUTHORIZED,
            Json(ErrorBody {
                errors: vec!["Unauthorized".to_string()],
            }),
        )
            .into_response(),
        ApiError::Validation(errors) => {
            (StatusCode::UNPROCESSABLE_ENTITY, Json(ErrorBody { errors })).into_response()
        }
        ApiError::Database(err) => {
            log::error!("database error: {}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody {
                    errors: vec!["Internal server error".to_string()],
                }),
            )
                .into_response()
        }
    }
}

fn authenticate_request(conn: &Connection, headers: &HeaderMap) -> Result<User, ApiError> {
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    auth::authenticate(conn, authorization)
}

// ============================================================================
// Budget handlers
// ============================================================================

/// GET /api/v1/budgets
async fn list_budgets(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let conn = state.db.lock().unwrap();
    let user = match authenticate_request(&conn, &headers) {
        Ok(user) => user,
        Err(err) => return error_response(err),
    };

    match budgets::list_budgets(&conn, &user) {
        Ok(list) => (StatusCode::OK, Json(list)).into_response(),
        Err(err) => error_response(err),
    }
}

/// POST /api/v1/budgets
async fn create_budget(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<BudgetPayload>,
) -> Response {
    let conn = state.db.lock().unwrap();
    let user = match authenticate_request(&conn, &headers) {
        Ok(user) => user,
        Err(err) => return error_response(err),
    };

    match budgets::create_budget(&conn, &user, &payload.budget) {
        Ok(budget) => (StatusCode::CREATED, Json(budget)).into_response(),
        Err(err) => error_response(err),
    }
}

/// GET /api/v1/budgets/:budget_id
async fn show_budget(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(budget_id): Path<i64>,
) -> Response {
    let conn = state.db.lock().unwrap();
    let user = match authenticate_request(&conn, &headers) {
        Ok(user) => user,
        Err(err) => return error_response(err),
    };

    match budgets::get_budget(&conn, &user, budget_id) {
        Ok(budget) => (StatusCode::OK, Json(budget)).into_response(),
        Err(err) => error_response(err),
    }
}

/// PUT/PATCH /api/v1/budgets/:budget_id
async fn update_budget(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(budget_id): Path<i64>,
    Json(payload): Json<BudgetPayload>,
) -> Response {
    let conn = state.db.lock().unwrap();
    let user = match authenticate_request(&conn, &headers) {
        Ok(user) => user,
        Err(err) => return error_response(err),
    };

    match budgets::update_budget(&conn, &user, budget_id, &payload.budget) {
        Ok(budget) => (StatusCode::OK, Json(budget)).into_response(),
        Err(err) => error_response(err),
    }
}

/// DELETE /api/v1/budgets/:budget_id
async fn destroy_budget(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(budget_id): Path<i64>,
) -> Response {
    let conn = state.db.lock().unwrap();
    let user = match authenticate_request(&conn, &headers) {
        Ok(user) => user,
        Err(err) => return error_response(err),
    };

    match budgets::delete_budget(&conn, &user, budget_id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(err),
    }
}

// ============================================================================
// Transaction handlers (nested under a budget)
// ============================================================================

/// GET /api/v1/budgets/:budget_id/transactions
async fn list_transactions(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(budget_id): Path<i64>,
) -> Response {
    let conn = state.db.lock().unwrap();
    let user = match authenticate_request(&conn, &headers) {
        Ok(user) => user,
        Err(err) => return error_response(err),
    };

    match transactions::list_transactions(&conn, &user, budget_id) {
        Ok(list) => (StatusCode::OK, Json(list)).into_response(),
        Err(err) => error_response(err),
    }
}

/// POST /api/v1/budgets/:budget_id/transactions
async fn create_transaction(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(budget_id): Path<i64>,
    Json(payload): Json<TransactionPayload>,
) -> Response {
    let conn = state.db.lock().unwrap();
    let user = match authenticate_request(&conn, &headers) {
        Ok(user) => user,
        Err(err) => return error_response(err),
    };

    match transactions::create_transaction(&conn, &user, budget_id, &payload.transaction) {
        Ok(tx) => (StatusCode::CREATED, Json(tx)).into_response(),
        Err(err) => error_response(err),
    }
}

/// GET /api/v1/budgets/:budget_id/transactions/:id
async fn show_transaction(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((budget_id, id)): Path<(i64, i64)>,
) -> Response {
    let conn = state.db.lock().unwrap();
    let user = match authenticate_request(&conn, &headers) {
        Ok(user) => user,
        Err(err) => return error_response(err),
    };

    match transactions::get_transaction(&conn, &user, budget_id, id) {
        Ok(tx) => (StatusCode::OK, Json(tx)).into_response(),
        Err(err) => error_response(err),
    }
}

/// PUT/PATCH /api/v1/budgets/:budget_id/transactions/:id
async fn update_transaction(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((budget_id, id)): Path<(i64, i64)>,
    Json(payload): Json<TransactionPayload>,
) -> Response {
    let conn = state.db.lock().unwrap();
    let user = match authenticate_request(&conn, &headers) {
        Ok(user) => user,
        Err(err) => return error_response(err),
    };

    match transactions::update_transaction(&conn, &user, budget_id, id, &payload.transaction) {
        Ok(tx) => (StatusCode::OK, Json(tx)).into_response(),
        Err(err) => error_response(err),
    }
}

/// DELETE /api/v1/budgets/:budget_id/transactions/:id
async fn destroy_transaction(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((budget_id, id)): Path<(i64, i64)>,
) -> Response {
    let conn = state.db.lock().unwrap();
    let user = match authenticate_request(&conn, &headers) {
        Ok(user) => user,
        Err(err) => return error_response(err),
    };

    match transactions::delete_transaction(&conn, &user, budget_id, id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(err),
    }
}

// ============================================================================
// Category handlers (shared, unscoped)
// ============================================================================

/// GET /api/v1/categories
async fn list_categories(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let conn = state.db.lock().unwrap();
    if let Err(err) = authenticate_request(&conn, &headers) {
        return error_response(err);
    }

    match categories::list_categories(&conn) {
        Ok(list) => (StatusCode::OK, Json(list)).into_response(),
        Err(err) => error_response(err),
    }
}

/// POST /api/v1/categories
async fn create_category(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CategoryPayload>,
) -> Response {
    let conn = state.db.lock().unwrap();
    if let Err(err) = authenticate_request(&conn, &headers) {
        return error_response(err);
    }

    match categories::create_category(&conn, &payload.category) {
        Ok(category) => (StatusCode::CREATED, Json(category)).into_response(),
        Err(err) => error_response(err),
    }
}

/// GET /api/v1/categories/:id
async fn show_category(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response {
    let conn = state.db.lock().unwrap();
    if let Err(err) = authenticate_request(&conn, &headers) {
        return error_response(err);
    }

    match categories::get_category(&conn, id) {
        Ok(category) => (StatusCode::OK, Json(category)).into_response(),
        Err(err) => error_response(err),
    }
}

/// PUT/PATCH /api/v1/categories/:id
async fn update_category(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(payload): Json<CategoryPayload>,
) -> Response {
    let conn = state.db.lock().unwrap();
    if let Err(err) = authenticate_request(&conn, &headers) {
        return error_response(err);
    }

    match categories::update_category(&conn, id, &payload.category) {
        Ok(category) => (StatusCode::OK, Json(category)).into_response(),
        Err(err) => error_response(err),
    }
}

/// DELETE /api/v1/categories/:id
async fn destroy_category(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response {
    let conn = state.db.lock().unwrap();
    if let Err(err) = authenticate_request(&conn, &headers) {
        return error_response(err);
    }

    match categories::delete_category(&conn, id) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(err),
    }
}

/// GET /api/health - unauthenticated liveness check
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok", "version": budgetbook::VERSION }))
}

// ============================================================================
// Main Server
// ============================================================================

fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/budgets", get(list_budgets).post(create_budget))
        .route(
            "/budgets/:budget_id",
            get(show_budget)
                .put(update_budget)
                .patch(update_budget)
                .delete(destroy_budget),
        )
        .route(
            "/budgets/:budget_id/transactions",
            get(list_transactions).post(create_transaction),
        )
        .route(
            "/budgets/:budget_id/transactions/:id",
            get(show_transaction)
                .put(update_transaction)
                .patch(update_transaction)
                .delete(destroy_transaction),
        )
        .route("/categories", get(list_categories).post(create_category))
        .route(
            "/categories/:id",
            get(show_category)
                .put(update_category)
                .patch(update_category)
                .delete(destroy_category),
        )
        .with_state(state);

    Router::new()
        .route("/api/health", get(health_check))
        .nest("/api/v1", api_routes)
        .layer(CorsLayer::permissive())
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let db_path = database_path();
    let conn = db::open_database(&db_path)?;
    db::setup_database(&conn)?;
    log::info!("database ready at {}", db_path.display());

    let state = AppState {
        db: Arc::new(Mutex::new(conn)),
    };

    let addr = std::env::var("BUDGETBOOK_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    log::info!("budgetbook {} listening on {}", budgetbook::VERSION, addr);

    axum::serve(listener, build_router(state)).await?;

    Ok(())
}
