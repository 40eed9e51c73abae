use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::models::Symbol;
use crate::services::broadcaster::{stock_topic, Subscription};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/stocks/:symbol", get(subscribe_stock))
}

/// Upgrades to a WebSocket carrying `PriceUpdate` JSON frames for one symbol.
pub async fn subscribe_stock(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Response, AppError> {
    let symbol = Symbol::parse(&symbol)?;
    let subscription = state.broadcaster.subscribe(&stock_topic(symbol.as_str()));
    info!("WS {} - subscriber connected", subscription.topic());
    Ok(ws.on_upgrade(move |socket| stream_updates(socket, subscription)))
}

async fn stream_updates(mut socket: WebSocket, mut subscription: Subscription) {
    loop {
        tokio::select! {
            update = subscription.recv() => match update {
                Ok(update) => {
                    let frame = match serde_json::to_string(&update) {
                        Ok(frame) => frame,
                        Err(e) => {
                            warn!("Failed to encode update for {}: {}", subscription.topic(), e);
                            continue;
                        }
                    };
                    if socket.send(Message::Text(frame)).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("WS {} lagged, skipped {} updates", subscription.topic(), skipped);
                }
                Err(RecvError::Closed) => break,
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                Some(Ok(_)) => {}
            },
        }
    }
    info!("WS {} - subscriber disconnected", subscription.topic());
}
