use axum::{
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use crate::bootstrap::HunterContext;

pub mod openapi;
pub mod routes;

/// Server state
pub struct AppState {
    pub context: HunterContext,
}

/// Build the HTTP router over an already bootstrapped context.
pub fn router(context: HunterContext) -> Router {
    let state = Arc::new(AppState { context });

    Router::new()
        .route("/", get(routes::root))
        .route("/hunters", get(routes::list_hunters).post(routes::create_hunter))
        .route(
            "/hunters/{fragment}",
            get(routes::get_hunter)
                .put(routes::update_hunter)
                .delete(routes::delete_hunter),
        )
        .route(openapi::DOCS_PATH, get(openapi::api_docs))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start_server(addr: SocketAddr, context: HunterContext) -> anyhow::Result<()> {
    let app = router(context);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Starting server on {}", addr);
    println!("🌍 Server running at http://{}", addr);
    println!("📖 API docs at http://{}{}", addr, openapi::DOCS_PATH);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{DocumentRepository, RelationalRepository};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        (status, value)
    }

    async fn app() -> Router {
        router(HunterContext::in_memory().await.unwrap())
    }

    fn gon() -> Value {
        json!({
            "name": "Gon Freecss",
            "age": 12,
            "height": 154,
            "weight": 43,
            "imageUrl": "http://x/gon.png"
        })
    }

    #[tokio::test]
    async fn test_create_find_delete_scenario() {
        let app = app().await;

        let (status, created) = send(&app, "POST", "/hunters", Some(gon())).await;
        assert_eq!(status, StatusCode::CREATED);
        assert!(!created["id"].as_str().unwrap().is_empty());
        assert_eq!(created["name"], "Gon Freecss");
        assert_eq!(created["age"], 12);
        assert_eq!(created["height"], 154.0);
        assert_eq!(created["weight"], 43.0);
        assert_eq!(created["imageUrl"], "http://x/gon.png");

        let (status, found) = send(&app, "GET", "/hunters/gon", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(found, created);

        let (status, confirmation) = send(&app, "DELETE", "/hunters/freecss", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(confirmation["message"].as_str().unwrap().contains("deleted"));

        let (status, missing) = send(&app, "GET", "/hunters/gon", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(missing["error"].is_string());
    }

    #[tokio::test]
    async fn test_list_returns_array() {
        let app = app().await;

        let (status, empty) = send(&app, "GET", "/hunters", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(empty, json!([]));

        send(&app, "POST", "/hunters", Some(gon())).await;
        let (_, listed) = send(&app, "GET", "/hunters", None).await;
        assert_eq!(listed.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_with_missing_fields_is_bad_request() {
        let app = app().await;

        let (status, body) = send(&app, "POST", "/hunters", Some(json!({ "name": "Killua" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("age is required"));

        let (status, body) = send(
            &app,
            "POST",
            "/hunters",
            Some(json!({ "name": "Killua", "age": "twelve" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());

        let (_, listed) = send(&app, "GET", "/hunters", None).await;
        assert_eq!(listed, json!([]));
    }

    #[tokio::test]
    async fn test_partial_update_through_http() {
        let app = app().await;
        send(&app, "POST", "/hunters", Some(gon())).await;

        let (status, updated) = send(&app, "PUT", "/hunters/GON", Some(json!({ "age": 13 }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["age"], 13);
        assert_eq!(updated["name"], "Gon Freecss");

        let (status, _) = send(&app, "PUT", "/hunters/hisoka", Some(json!({ "age": 28 }))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_encoded_fragment_matches() {
        let app = app().await;
        send(&app, "POST", "/hunters", Some(gon())).await;

        let (status, found) = send(&app, "GET", "/hunters/n%20F", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(found["name"], "Gon Freecss");
    }

    #[tokio::test]
    async fn test_undecodable_fragment_is_json_bad_request() {
        let app = app().await;
        send(&app, "POST", "/hunters", Some(gon())).await;

        for method in ["GET", "DELETE"] {
            let (status, body) = send(&app, method, "/hunters/%FF", None).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{}", method);
            assert!(body["error"].as_str().unwrap().contains("name fragment"));
        }

        let (status, body) = send(&app, "PUT", "/hunters/%FF", Some(json!({ "age": 13 }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());

        let (_, listed) = send(&app, "GET", "/hunters", None).await;
        assert_eq!(listed[0]["age"], 12);
    }

    #[tokio::test]
    async fn test_delete_without_match_is_not_found() {
        let app = app().await;
        let (status, body) = send(&app, "DELETE", "/hunters/netero", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Hunter not found");
    }

    #[tokio::test]
    async fn test_handlers_do_not_write_relational_store() {
        let relational = RelationalRepository::in_memory().await.unwrap();
        let context = HunterContext::new(
            Some(DocumentRepository::in_memory().await.unwrap()),
            Some(relational.clone()),
        );
        let app = router(context);

        send(&app, "POST", "/hunters", Some(gon())).await;
        assert_eq!(relational.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_degraded_document_store_is_server_error() {
        let context = HunterContext::new(None, Some(RelationalRepository::in_memory().await.unwrap()));
        let app = router(context);

        let (status, body) = send(&app, "GET", "/hunters", None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error": "Failed to fetch hunters" }));

        let (status, _) = send(&app, "POST", "/hunters", Some(gon())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_root_and_docs() {
        let app = app().await;

        let (status, banner) = send(&app, "GET", "/", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(banner, Value::String("Hunter API running".to_string()));

        let (status, docs) = send(&app, "GET", "/api-docs", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(docs["openapi"], "3.0.0");
    }
}
