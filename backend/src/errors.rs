use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::external::quote_provider::QuoteError;
use crate::models::InvalidSymbol;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("quote unavailable for {0}")]
    QuoteUnavailable(String),
    #[error("quote provider transport error for {symbol}: {message}")]
    Transport { symbol: String, message: String },
    #[error("failed to create stock {symbol}: {reason}")]
    StockCreationFailed { symbol: String, reason: String },
    #[error("holding {0} not found")]
    HoldingNotFound(Uuid),
    #[error("user {0} not found")]
    UserNotFound(Uuid),
    #[error("stock {0} not found")]
    StockNotFound(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl From<QuoteError> for AppError {
    fn from(value: QuoteError) -> Self {
        match value {
            QuoteError::InvalidSymbol(raw) => {
                AppError::Validation(format!("invalid ticker symbol: {:?}", raw))
            }
            QuoteError::Unavailable(symbol) => AppError::QuoteUnavailable(symbol),
            QuoteError::Transport { symbol, message } | QuoteError::Parse { symbol, message } => {
                AppError::Transport { symbol, message }
            }
        }
    }
}

impl From<InvalidSymbol> for AppError {
    fn from(value: InvalidSymbol) -> Self {
        AppError::Validation(value.to_string())
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::HoldingNotFound(_) | AppError::UserNotFound(_) | AppError::StockNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::QuoteUnavailable(_)
            | AppError::Transport { .. }
            | AppError::StockCreationFailed { .. } => StatusCode::BAD_GATEWAY,
            AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Store(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
