use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{AccountSummary, Deposit, DepositRequest};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/deposit", post(add_deposit))
        .route("/:id", get(account_summary))
        .route("/:id/deposits", get(list_deposits))
}

pub async fn account_summary(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<AccountSummary>, AppError> {
    info!("GET /api/account/{} - Computing account summary", user_id);
    Ok(Json(state.accounts.get_account_summary(user_id).await?))
}

pub async fn add_deposit(
    State(state): State<AppState>,
    Json(data): Json<DepositRequest>,
) -> Result<(StatusCode, Json<Deposit>), AppError> {
    info!("POST /api/account/deposit - {} for user {}", data.amount, data.user_id);
    let deposit = state.accounts.add_deposit(data).await?;
    Ok((StatusCode::CREATED, Json(deposit)))
}

pub async fn list_deposits(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<Deposit>>, AppError> {
    info!("GET /api/account/{}/deposits - Listing deposits", user_id);
    Ok(Json(state.accounts.list_deposits(user_id).await?))
}
