use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use crate::routes::{accounts, health, portfolio, stocks, topics};
use crate::state::AppState;

pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::<AppState>::new()
        .nest("/health", health::router())
        .nest("/api/portfolio", portfolio::router())
        .nest("/api/account", accounts::router())
        .nest("/api/stocks", stocks::router())
        .nest("/topic", topics::router())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{dec, Harness};
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app(harness: &Harness) -> Router {
        create_app(AppState {
            portfolio: harness.portfolio.clone(),
            accounts: harness.accounts.clone(),
            quotes: harness.quotes.clone(),
            broadcaster: harness.broadcaster.clone(),
        })
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let harness = Harness::new();
        let (status, body) = send(app(&harness), get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["quote_call_budget"], 60);
    }

    #[tokio::test]
    async fn test_buy_then_remove_over_http() {
        let harness = Harness::new();
        let user = harness.user();
        harness.provider.set_quote("XYZ", "150.00");

        let (status, holding) = send(
            app(&harness),
            post_json(
                "/api/portfolio",
                json!({ "user_id": user, "symbol": "XYZ", "quantity": 10, "buy_price": "100.00" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(holding["quantity"], 10);

        let (status, lines) = send(app(&harness), get(&format!("/api/portfolio/{}", user))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(lines[0]["stock"]["symbol"], "XYZ");

        let holding_id = holding["id"].as_str().unwrap().to_string();
        let delete = Request::builder()
            .method("DELETE")
            .uri(format!("/api/portfolio/{}", holding_id))
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(app(&harness), delete).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, body) = send(app(&harness), get("/api/stocks/XYZ")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("XYZ"));
    }

    #[tokio::test]
    async fn test_removing_unknown_holding_is_404() {
        let harness = Harness::new();
        let delete = Request::builder()
            .method("DELETE")
            .uri(format!("/api/portfolio/{}", uuid::Uuid::new_v4()))
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(app(&harness), delete).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unavailable_quote_is_bad_gateway() {
        let harness = Harness::new();
        let (status, body) = send(app(&harness), get("/api/stocks/NOPE/quote")).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body["error"].as_str().unwrap().contains("NOPE"));
    }

    #[tokio::test]
    async fn test_account_summary_over_http() {
        let harness = Harness::new();
        let user = harness.user();

        let (status, _) = send(
            app(&harness),
            post_json(
                "/api/account/deposit",
                json!({ "user_id": user, "amount": "1000.00", "description": "initial" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, summary) = send(app(&harness), get(&format!("/api/account/{}", user))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(summary["total_deposits"], json!(dec("1000.00")));

        let (status, deposits) =
            send(app(&harness), get(&format!("/api/account/{}/deposits", user))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(deposits.as_array().unwrap().len(), 1);

        let (status, _) = send(
            app(&harness),
            get(&format!("/api/account/{}", uuid::Uuid::new_v4())),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
