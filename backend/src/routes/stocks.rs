use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use tracing::{error, info};

use crate::errors::AppError;
use crate::models::{PriceUpdate, Stock, SymbolMatch};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/search/:query", get(search))
        .route("/:symbol", get(get_stock))
        .route("/:symbol/quote", get(fetch_quote))
}

pub async fn fetch_quote(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<PriceUpdate>, AppError> {
    info!("GET /api/stocks/{}/quote - Fetching live quote", symbol);
    let update = state
        .portfolio
        .fetch_and_broadcast(&symbol)
        .await
        .map_err(|e| {
            error!("Failed to fetch quote for {}: {}", symbol, e);
            e
        })?;
    Ok(Json(update))
}

pub async fn get_stock(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<Stock>, AppError> {
    info!("GET /api/stocks/{} - Fetching stock", symbol);
    Ok(Json(state.portfolio.get_stock(&symbol).await?))
}

pub async fn search(
    State(state): State<AppState>,
    Path(query): Path<String>,
) -> Json<Vec<SymbolMatch>> {
    info!("GET /api/stocks/search/{} - Searching symbols", query);
    Json(state.portfolio.search_symbols(&query).await)
}
