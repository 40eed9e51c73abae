use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use tracing::{error, info};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{AddBuyRequest, Holding, HoldingWithStock, PortfolioResponse};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(add_buy))
        .route("/:id", get(list_holdings))
        .route("/:id", delete(remove_stock))
        .route("/analysis/:id", get(portfolio_analysis))
}

pub async fn add_buy(
    State(state): State<AppState>,
    Json(data): Json<AddBuyRequest>,
) -> Result<(StatusCode, Json<Holding>), AppError> {
    info!("POST /api/portfolio - {} x {} for user {}", data.quantity, data.symbol, data.user_id);
    let holding = state.portfolio.add_buy(data).await.map_err(|e| {
        error!("Failed to record buy: {}", e);
        e
    })?;
    Ok((StatusCode::CREATED, Json(holding)))
}

pub async fn list_holdings(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<HoldingWithStock>>, AppError> {
    info!("GET /api/portfolio/{} - Fetching holdings", user_id);
    Ok(Json(state.portfolio.list_holdings(user_id).await?))
}

pub async fn portfolio_analysis(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<PortfolioResponse>, AppError> {
    info!("GET /api/portfolio/analysis/{} - Analysing portfolio", user_id);
    let analysis = state
        .portfolio
        .get_portfolio_analysis(user_id)
        .await
        .map_err(|e| {
            error!("Failed to analyse portfolio for {}: {}", user_id, e);
            e
        })?;
    Ok(Json(analysis))
}

pub async fn remove_stock(
    State(state): State<AppState>,
    Path(holding_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    info!("DELETE /api/portfolio/{} - Removing holding", holding_id);
    state.portfolio.remove_stock(holding_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
