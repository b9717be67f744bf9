//! HTTP surface for clubsync-server.
//!
//! REST CRUD per collection, the wholesale sync endpoint, the WebSocket
//! change-event channel, and health/metrics endpoints.

pub mod health;
mod metrics;
mod routes;
mod ws;

use crate::server::ClubServer;
use axum::routing::{get, post, put};
use axum::{Extension, Router};
use std::sync::Arc;

pub use health::HealthStatus;
pub use routes::ApiError;

/// Build the HTTP router with all endpoints.
pub fn build_router(server: Arc<ClubServer>) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/metrics", get(metrics::metrics_handler))
        .route("/api/sync", post(routes::sync_handler))
        .route("/api/events", get(ws::events_handler))
        .route(
            "/api/:collection",
            get(routes::list_handler).post(routes::create_handler),
        )
        .route(
            "/api/:collection/:id",
            put(routes::update_handler).delete(routes::delete_handler),
        )
        .layer(Extension(server))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::storage::{RecordStorage, SqliteStorage};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use sync_types::{ChangeEvent, Collection, RecordId};
    use tower::util::ServiceExt;

    async fn test_server() -> Arc<ClubServer> {
        let storage = SqliteStorage::in_memory().await.unwrap();
        Arc::new(ClubServer::new(Config::default(), storage))
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn member_body(name: &str) -> Value {
        json!({
            "name": name,
            "document": "12345678A",
            "phone": "600111222",
            "email": format!("{}@club.example", name.to_lowercase()),
        })
    }

    #[tokio::test]
    async fn health_endpoint_returns_ok() {
        let app = build_router(test_server().await);

        let response = app.oneshot(get_request("/health")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn metrics_endpoint_returns_ok() {
        let app = build_router(test_server().await);

        let response = app.oneshot(get_request("/metrics")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn list_empty_collection() {
        let app = build_router(test_server().await);

        let response = app.oneshot(get_request("/api/members")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["data"], json!([]));
    }

    #[tokio::test]
    async fn unknown_collection_is_404() {
        let app = build_router(test_server().await);

        let response = app.oneshot(get_request("/api/payments")).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert!(body["error"]
            .as_str()
            .unwrap()
            .contains("unknown collection"));
    }

    #[tokio::test]
    async fn create_stores_and_returns_record() {
        let server = test_server().await;
        let app = build_router(server.clone());

        let response = app
            .oneshot(json_request("POST", "/api/members", member_body("Ana")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["name"], "Ana");
        // Server assigned an id
        assert!(body["data"]["id"].is_string());

        assert_eq!(server.storage().count(Collection::Members).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn create_keeps_client_assigned_id() {
        let app = build_router(test_server().await);
        let id = RecordId::new();

        let mut body = member_body("Ana");
        body["id"] = json!(id.to_string());

        let response = app
            .oneshot(json_request("POST", "/api/members", body))
            .await
            .unwrap();

        let body = body_json(response).await;
        assert_eq!(body["data"]["id"], id.to_string());
    }

    #[tokio::test]
    async fn create_is_idempotent_per_id() {
        let server = test_server().await;
        let id = RecordId::new();

        let mut body = member_body("Ana");
        body["id"] = json!(id.to_string());

        // Redelivery of the same create must not duplicate the record
        for _ in 0..2 {
            let app = build_router(server.clone());
            let response = app
                .oneshot(json_request("POST", "/api/members", body.clone()))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::CREATED);
        }

        assert_eq!(server.storage().count(Collection::Members).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn create_rejects_malformed_body() {
        let app = build_router(test_server().await);

        // Missing required fields
        let response = app
            .oneshot(json_request("POST", "/api/members", json!({"phone": "600"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn create_broadcasts_record_added() {
        let server = test_server().await;
        let mut events = server.subscribe();
        let app = build_router(server.clone());

        app.oneshot(json_request("POST", "/api/members", member_body("Ana")))
            .await
            .unwrap();

        let event = events.try_recv().unwrap();
        match event {
            ChangeEvent::RecordAdded { collection, record } => {
                assert_eq!(collection, Collection::Members);
                assert_eq!(record["name"], "Ana");
            }
            other => panic!("expected RecordAdded, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn update_upserts_under_path_id() {
        let server = test_server().await;
        let id = RecordId::new();

        let app = build_router(server.clone());
        let response = app
            .oneshot(json_request(
                "PUT",
                &format!("/api/members/{}", id),
                member_body("Ana"),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["data"]["id"], id.to_string());

        // Update in place
        let app = build_router(server.clone());
        let response = app
            .oneshot(json_request(
                "PUT",
                &format!("/api/members/{}", id),
                member_body("Ana Maria"),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(server.storage().count(Collection::Members).await.unwrap(), 1);

        let stored = server
            .storage()
            .get(Collection::Members, &id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.payload["name"], "Ana Maria");
    }

    #[tokio::test]
    async fn update_broadcasts_record_changed() {
        let server = test_server().await;
        let mut events = server.subscribe();
        let app = build_router(server.clone());

        app.oneshot(json_request(
            "PUT",
            &format!("/api/members/{}", RecordId::new()),
            member_body("Ana"),
        ))
        .await
        .unwrap();

        assert!(matches!(
            events.try_recv().unwrap(),
            ChangeEvent::RecordChanged { .. }
        ));
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let server = test_server().await;
        let id = RecordId::new();
        server
            .storage()
            .upsert(Collection::Members, id, member_body("Ana"))
            .await
            .unwrap();

        let app = build_router(server.clone());
        let response = app
            .oneshot(json_request(
                "DELETE",
                &format!("/api/members/{}", id),
                json!(null),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["data"]["deleted"], true);

        // Second delete succeeds without deleting anything
        let app = build_router(server.clone());
        let response = app
            .oneshot(json_request(
                "DELETE",
                &format!("/api/members/{}", id),
                json!(null),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["data"]["deleted"], false);
    }

    #[tokio::test]
    async fn delete_broadcasts_only_real_deletions() {
        let server = test_server().await;
        let id = RecordId::new();
        server
            .storage()
            .upsert(Collection::Members, id, member_body("Ana"))
            .await
            .unwrap();

        let mut events = server.subscribe();

        let app = build_router(server.clone());
        app.oneshot(json_request(
            "DELETE",
            &format!("/api/members/{}", id),
            json!(null),
        ))
        .await
        .unwrap();

        assert!(matches!(
            events.try_recv().unwrap(),
            ChangeEvent::RecordDeleted { .. }
        ));

        // Phantom delete broadcasts nothing
        let app = build_router(server.clone());
        app.oneshot(json_request(
            "DELETE",
            &format!("/api/members/{}", id),
            json!(null),
        ))
        .await
        .unwrap();

        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn sync_replaces_collections_and_broadcasts() {
        let server = test_server().await;

        // Pre-existing record the snapshot does not contain
        server
            .storage()
            .upsert(Collection::Members, RecordId::new(), member_body("Old"))
            .await
            .unwrap();

        let mut events = server.subscribe();

        // Snapshot records always carry client-assigned ids
        let mut ana = member_body("Ana");
        ana["id"] = json!(RecordId::new().to_string());
        let mut luis = member_body("Luis");
        luis["id"] = json!(RecordId::new().to_string());

        let snapshot = json!({
            "data": {
                "members": [ana, luis],
                "teams": [],
                "players": [],
                "events": [],
                "friends": [],
            }
        });

        let app = build_router(server.clone());
        let response = app
            .oneshot(json_request("POST", "/api/sync", snapshot))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["data"]["replaced"], 2);

        let members = server.storage().list(Collection::Members).await.unwrap();
        assert_eq!(members.len(), 2);
        assert_eq!(members[0].payload["name"], "Ana");

        assert_eq!(events.try_recv().unwrap(), ChangeEvent::DataSync);
    }

    #[tokio::test]
    async fn sync_rejects_malformed_snapshot() {
        let app = build_router(test_server().await);

        let response = app
            .oneshot(json_request(
                "POST",
                "/api/sync",
                json!({"data": {"members": [{"phone": "600"}]}}),
            ))
            .await
            .unwrap();

        // Missing required member fields fail the body parse
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
