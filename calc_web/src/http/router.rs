//! Router configuration for the HTTP API and documentation browser.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::docs;
use super::handlers;
use super::state::AppState;

/// Create the application router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/calculators", get(handlers::list_calculators))
        .route("/calculators/{name}", get(handlers::get_calculator))
        .route("/calculate", post(handlers::calculate))
        .route("/docs", get(docs::index))
        .route("/docs/{name}", get(docs::page).post(docs::submit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use calc_core::calculators;
    use calc_core::deps::{DependencyResolver, Environment};
    use calc_core::namespace::Namespace;
    use calc_core::{Registry, Settings};

    fn app() -> Router {
        create_router(AppState::new(Arc::new(Registry::builtin(&Settings::default()))))
    }

    struct NoInstaller;

    impl Environment for NoInstaller {
        fn probe(&self, _module: &str) -> Result<bool, String> {
            Ok(false)
        }

        fn install(&self, _requirements: &[String]) -> Result<(), String> {
            Err("no package installer configured".into())
        }
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let (status, body) = send(app, Request::get(uri).body(Body::empty()).unwrap()).await;
        (status, serde_json::from_slice(&body).unwrap())
    }

    async fn post_json(app: Router, body: Value) -> (StatusCode, Value) {
        let request = Request::post("/calculate")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let (status, body) = send(app, request).await;
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = get_json(app(), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn test_list_calculators() {
        let (status, body) = get_json(app(), "/calculators").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["bmi"], "# BMI Calculator");
        assert_eq!(body["dcct_ifcc"], "# DCCT/IFCC Converter");
    }

    #[tokio::test]
    async fn test_calculator_detail() {
        let (status, body) = get_json(app(), "/calculators/dcct_ifcc").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "dcct_ifcc");
        assert_eq!(body["title"], "# DCCT/IFCC Converter");
        assert_eq!(body["inputs"][1]["enum"], json!(["dcct", "ifcc"]));
        assert_eq!(body["dependencies"], json!([]));

        let (status, body) = get_json(app(), "/calculators/nonexistent_calc").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_calculate_bmi() {
        let (status, body) = post_json(
            app(),
            json!({ "calculator": "bmi", "params": { "weight": 70, "height": 1.75, "unit_system": "metric" } }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"], json!(22.86));
        assert_eq!(body["interpretation"], "Normal");
        assert_eq!(body["metadata"]["calculator_name"], "bmi");
    }

    #[tokio::test]
    async fn test_calculate_errors() {
        let (status, body) = post_json(app(), json!({ "params": {} })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "BAD_REQUEST");

        let (status, _) = post_json(app(), json!({ "calculator": "nonexistent_calc", "params": {} })).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = post_json(
            app(),
            json!({ "calculator": "dcct_ifcc", "params": { "value": 21, "input_unit": "dcct" } }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_INPUT");
        assert!(body["message"].as_str().unwrap().contains("DCCT value must be ≤ 20%"));

        let (status, body) = post_json(app(), json!({ "calculator": "bmi" })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "MISSING_FIELD");
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let request = Request::post("/calculate")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body) = send(app(), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn test_failed_dependency() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("bmi.md"), "+++\n# BMI\n\n[dependencies]\n- foo\n+++\n").unwrap();

        let resolver = Arc::new(DependencyResolver::new(Arc::new(NoInstaller)));
        let mut registry = Registry::new(Namespace::dir_only(dir.path()), resolver);
        for (name, factory) in calculators::builtin() {
            registry.register(name, factory);
        }
        let app = create_router(AppState::new(Arc::new(registry)));

        let (status, body) = post_json(
            app.clone(),
            json!({ "calculator": "bmi", "params": { "weight": 70, "height": 1.75, "unit_system": "metric" } }),
        )
        .await;
        assert_eq!(status, StatusCode::FAILED_DEPENDENCY);
        assert_eq!(body["code"], "DEPENDENCY_ERROR");
        assert_eq!(body["details"], "foo");

        // Listing still works for the undocumented calculator and the one
        // with a missing requirement.
        let (status, body) = get_json(app, "/calculators").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["bmi"], "# BMI");
        assert_eq!(body["dcct_ifcc"], "dcct_ifcc");
    }
}
