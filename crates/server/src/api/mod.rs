pub mod auth;
pub mod domains;
pub mod error;
pub mod pve;

pub use error::ApiError;

use axum::{extract::State, routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::app_state::AppState;

/// 所有 API 路由（统一入口）
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/pve", pve::pve_routes())
}

/// 完整应用路由：接口 + 静态页面
pub fn app_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let static_files = ServeDir::new(&state.config.public_dir);

    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .merge(auth::auth_routes())
        .merge(domains::domain_routes())
        .nest("/api", api_routes())
        .fallback_service(static_files)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_handler() -> &'static str {
    "OK"
}

async fn metrics_handler(State(state): State<AppState>) -> Result<String, ApiError> {
    state
        .metrics
        .render()
        .map_err(|e| ApiError::Internal(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::domain_service::decrypt_envelope;
    use crate::test_support::{spawn_upstream, test_config};
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
        Json,
    };
    use serde_json::{json, Value};
    use std::path::Path;
    use tower::ServiceExt;

    fn app(data_dir: &Path) -> Router {
        app_router(AppState::new(test_config(data_dir)).unwrap())
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn login_request(body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/login")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn login(app: &Router) -> String {
        let (status, body) =
            send(app, login_request(json!({"username": "box", "password": "purple123"}))).await;
        assert_eq!(status, StatusCode::OK);
        body["sessionKey"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_health() {
        let dir = tempfile::tempdir().unwrap();
        let response = app(dir.path()).oneshot(get_request("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_login_returns_derived_key() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path());

        let key = login(&app).await;
        assert_eq!(
            key,
            crate::auth::derive_session_key("purple123", "salt123", 1000).unwrap()
        );
    }

    #[tokio::test]
    async fn test_login_rejects_bad_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path());

        let (status, body) =
            send(&app, login_request(json!({"username": "box", "password": "nope"}))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], json!(false));

        let (status, body) = send(&app, login_request(json!({"username": "box"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], json!(false));
    }

    #[tokio::test]
    async fn test_status_requires_session() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path());

        let (status, body) = send(&app, get_request("/api/pve/status")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, json!({"success": false, "message": "Unauthorized"}));

        let (status, _) = send(&app, get_request("/api/pve/status?sessionKey=deadbeef")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_status_without_pve_config() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path());
        let key = login(&app).await;

        let (status, body) =
            send(&app, get_request(&format!("/api/pve/status?sessionKey={}", key))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body,
            json!({"success": false, "message": "Proxmox not configured"})
        );
    }

    #[tokio::test]
    async fn test_status_end_to_end() {
        let upstream = Router::new()
            .route(
                "/api2/json/cluster/resources",
                axum::routing::get(|| async {
                    Json(json!({"data": [
                        {"type": "node", "id": "node/pve", "node": "pve", "status": "online",
                         "cpu": 0.25, "maxcpu": 8, "mem": 1024, "maxmem": 4096},
                        {"type": "qemu", "id": "qemu/100", "vmid": 100, "name": "web",
                         "node": "pve", "status": "running"},
                        {"type": "sdn", "id": "sdn/zone1"}
                    ]}))
                }),
            )
            .route(
                "/api2/json/nodes/pve/status",
                axum::routing::get(|| async {
                    Json(json!({"data": {"thermalstate": {"Package.id.0": "61", "Core 0": "58"}}}))
                }),
            );
        let host = spawn_upstream(upstream).await;

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("pve.json"),
            json!({"host": host, "tokenId": "a", "tokenSecret": "b"}).to_string(),
        )
        .unwrap();
        let app = app(dir.path());
        let key = login(&app).await;

        let (status, body) =
            send(&app, get_request(&format!("/api/pve/status?sessionKey={}", key))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], json!(true));

        let data = &body["data"];
        assert_eq!(data["nodes"][0]["name"], json!("pve"));
        assert_eq!(data["nodes"][0]["isRunning"], json!(true));
        assert_eq!(data["nodes"][0]["thermal"]["packageTemp"], json!(61));
        assert_eq!(data["nodes"][0]["thermal"]["coreTemps"], json!([58]));
        assert_eq!(
            data["nodes"][0]["thermalstate"],
            json!({"Package.id.0": "61", "Core 0": "58"})
        );
        assert_eq!(data["vms"][0]["vmId"], json!(100));
        assert_eq!(data["containers"], json!([]));
        assert_eq!(data["storages"], json!([]));
    }

    #[tokio::test]
    async fn test_domains_encrypted_with_session_key() {
        let dir = tempfile::tempdir().unwrap();
        let domains = json!([{"name": "Router", "url": "https://router.lan"}]);
        std::fs::write(dir.path().join("domains.json"), domains.to_string()).unwrap();
        let app = app(dir.path());

        let (status, body) = send(&app, get_request("/domains")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"success": false, "message": "Missing sessionKey"}));

        let (status, body) = send(&app, get_request("/domains?sessionKey=deadbeef")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], json!("Unauthorized"));

        let key = login(&app).await;
        let (status, body) = send(&app, get_request(&format!("/domains?sessionKey={}", key))).await;
        assert_eq!(status, StatusCode::OK);

        let plaintext = decrypt_envelope(body["data"].as_str().unwrap(), &key).unwrap();
        assert_eq!(serde_json::from_slice::<Value>(&plaintext).unwrap(), domains);
    }

    #[tokio::test]
    async fn test_domains_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path());
        let key = login(&app).await;

        let (status, body) = send(&app, get_request(&format!("/domains?sessionKey={}", key))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], json!("Failed to load domains"));
    }

    #[tokio::test]
    async fn test_metrics_after_poll() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path());
        let key = login(&app).await;
        send(&app, get_request(&format!("/api/pve/status?sessionKey={}", key))).await;

        let response = app.clone().oneshot(get_request("/metrics")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains("config_missing"));
    }

    #[tokio::test]
    async fn test_static_fallback() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("public")).unwrap();
        std::fs::write(dir.path().join("public/index.html"), "<h1>dash</h1>").unwrap();
        let app = app(dir.path());

        let response = app.clone().oneshot(get_request("/index.html")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"<h1>dash</h1>");
    }
}
