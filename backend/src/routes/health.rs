use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};
use tracing::debug;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(health))
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    debug!("GET /health - Health check");
    Json(json!({
        "status": "ok",
        "quote_calls_this_minute": state.quotes.calls_this_minute(),
        "quote_call_budget": state.quotes.call_budget(),
        "live_topics": state.broadcaster.topic_count(),
    }))
}
