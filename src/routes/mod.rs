use axum::{
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::CorsConfig;
use crate::handlers;
use crate::state::AppState;

pub mod health;

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if config.allows_any() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}

/// Create the main router
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors);

    // API routes
    let api_routes = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Department routes
        .route(
            "/departments/",
            get(handlers::department::list_departments).post(handlers::department::create_department),
        )
        .route(
            "/departments/:id",
            get(handlers::department::get_department)
                .patch(handlers::department::update_department)
                .delete(handlers::department::delete_department),
        )
        .route(
            "/departments/:id/employees/",
            post(handlers::employee::create_employee),
        )
        // Employee routes
        .route("/employees/", get(handlers::employee::list_employees))
        // Plan routes
        .route(
            "/plans/",
            get(handlers::plan::list_plans).post(handlers::plan::create_plan),
        )
        .route(
            "/plans/:id",
            get(handlers::plan::get_plan).delete(handlers::plan::delete_plan),
        );

    Router::new()
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::config::Config;
    use crate::db::memory_database;

    async fn app() -> Router {
        create_router(AppState::new(memory_database().await, Config::default()))
    }

    async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn post_department(app: &Router, body: Value) -> i64 {
        let (status, created) = call(app, Method::POST, "/api/v1/departments/", Some(body)).await;
        assert_eq!(status, StatusCode::OK, "{}", created);
        created["id"].as_i64().unwrap()
    }

    #[tokio::test]
    async fn health() {
        let app = app().await;
        let (status, body) = call(&app, Method::GET, "/api/v1/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["name"], "orgchart");
    }

    #[tokio::test]
    async fn subtree_with_employees() {
        let app = app().await;
        let it = post_department(&app, json!({"name": "IT"})).await;
        let backend = post_department(&app, json!({"name": "Backend", "parent_id": it})).await;

        let (status, emp) = call(
            &app,
            Method::POST,
            &format!("/api/v1/departments/{}/employees/", backend),
            Some(json!({"full_name": "Ivan", "position": "Developer"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(emp["department_id"], backend);

        let (status, tree) = call(
            &app,
            Method::GET,
            &format!("/api/v1/departments/{}?depth=2&include_employees=true", it),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(tree["name"], "IT");
        assert_eq!(tree["employees"], json!([]));
        assert_eq!(tree["children"][0]["name"], "Backend");
        assert_eq!(tree["children"][0]["employees"][0]["full_name"], "Ivan");
        assert_eq!(tree["children"][0]["children"], json!([]));

        let (_, tree) = call(
            &app,
            Method::GET,
            &format!("/api/v1/departments/{}?include_employees=false", it),
            None,
        )
        .await;
        assert_eq!(tree["children"][0]["employees"], json!([]));
    }

    #[tokio::test]
    async fn subtree_errors() {
        let app = app().await;
        let it = post_department(&app, json!({"name": "IT"})).await;

        let (status, _) = call(&app, Method::GET, &format!("/api/v1/departments/{}?depth=6", it), None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        let (status, _) = call(&app, Method::GET, &format!("/api/v1/departments/{}?depth=0", it), None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        let (status, _) = call(&app, Method::GET, "/api/v1/departments/99999", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn malformed_requests_are_validation_errors() {
        let app = app().await;
        let it = post_department(&app, json!({"name": "IT"})).await;

        let (status, body) = call(&app, Method::DELETE, &format!("/api/v1/departments/{}?mode=NUKE", it), None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["code"], 422);
        assert_eq!(body["message"], "Validation Error");
        assert!(body["details"].as_str().unwrap().contains("NUKE"));

        let (status, body) = call(&app, Method::GET, &format!("/api/v1/departments/{}?depth=abc", it), None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["code"], 422);

        let (status, body) = call(&app, Method::GET, "/api/v1/departments/abc", None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["code"], 422);

        let (status, body) = call(&app, Method::POST, "/api/v1/departments/", Some(json!({"parent_id": it}))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["code"], 422);

        // department survived the rejected delete
        let (status, _) = call(&app, Method::GET, &format!("/api/v1/departments/{}", it), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn create_conflicts_and_validation() {
        let app = app().await;
        post_department(&app, json!({"name": "IT"})).await;

        let (status, body) = call(&app, Method::POST, "/api/v1/departments/", Some(json!({"name": " IT "}))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], 409);

        let (status, _) = call(&app, Method::POST, "/api/v1/departments/", Some(json!({"name": "  "}))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, _) = call(
            &app,
            Method::POST,
            "/api/v1/departments/",
            Some(json!({"name": "Lost", "parent_id": 31337})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, list) = call(&app, Method::GET, "/api/v1/departments/", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn patch_cycle_and_promotion() {
        let app = app().await;
        let a = post_department(&app, json!({"name": "A"})).await;
        let b = post_department(&app, json!({"name": "B", "parent_id": a})).await;
        let c = post_department(&app, json!({"name": "C", "parent_id": b})).await;

        let uri = format!("/api/v1/departments/{}", a);
        let (status, _) = call(&app, Method::PATCH, &uri, Some(json!({"parent_id": c}))).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = call(&app, Method::PATCH, &uri, Some(json!({}))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, moved) = call(
            &app,
            Method::PATCH,
            &format!("/api/v1/departments/{}", c),
            Some(json!({"parent_id": null})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(moved["parent_id"], Value::Null);
        assert_eq!(moved["name"], "C");

        let (status, _) = call(
            &app,
            Method::PATCH,
            "/api/v1/departments/4040",
            Some(json!({"name": "Nope"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn delete_modes() {
        let app = app().await;
        let a = post_department(&app, json!({"name": "A"})).await;
        let target = post_department(&app, json!({"name": "Target"})).await;
        call(
            &app,
            Method::POST,
            &format!("/api/v1/departments/{}/employees/", a),
            Some(json!({"full_name": "Anna", "position": "Lead", "hired_at": "2023-05-01"})),
        )
        .await;

        let (status, _) = call(&app, Method::DELETE, &format!("/api/v1/departments/{}?mode=REASSIGN", a), None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, body) = call(
            &app,
            Method::DELETE,
            &format!("/api/v1/departments/{}?mode=REASSIGN&reassign_to_department_id={}", a, target),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(body, Value::Null);

        let (_, staff) = call(&app, Method::GET, "/api/v1/employees/", None).await;
        assert_eq!(staff[0]["department_id"], target);
        assert_eq!(staff[0]["hired_at"], "2023-05-01");

        let (status, _) = call(&app, Method::DELETE, &format!("/api/v1/departments/{}", target), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (_, staff) = call(&app, Method::GET, "/api/v1/employees/", None).await;
        assert_eq!(staff, json!([]));

        let (status, _) = call(&app, Method::DELETE, &format!("/api/v1/departments/{}", target), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn employee_under_missing_department() {
        let app = app().await;
        let (status, _) = call(
            &app,
            Method::POST,
            "/api/v1/departments/777/employees/",
            Some(json!({"full_name": "Nobody", "position": "None"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = call(
            &app,
            Method::POST,
            "/api/v1/departments/777/employees/",
            Some(json!({"full_name": " ", "position": "None"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn plans_crud() {
        let app = app().await;
        let (status, created) = call(
            &app,
            Method::POST,
            "/api/v1/plans/",
            Some(json!({"title": "Monthly", "duration_days": 30, "price": "9.99"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(created["status"], "OK");
        let id = created["new_plan"]["id"].as_i64().unwrap();

        let (status, plan) = call(&app, Method::GET, &format!("/api/v1/plans/{}", id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(plan["title"], "Monthly");
        assert_eq!(plan["duration_days"], 30);

        let (_, plans) = call(&app, Method::GET, "/api/v1/plans/", None).await;
        assert_eq!(plans.as_array().unwrap().len(), 1);

        let (status, deleted) = call(&app, Method::DELETE, &format!("/api/v1/plans/{}", id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(deleted["deleted_plan"]["id"], id);

        let (status, _) = call(&app, Method::GET, &format!("/api/v1/plans/{}", id), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = call(&app, Method::DELETE, &format!("/api/v1/plans/{}", id), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = call(
            &app,
            Method::POST,
            "/api/v1/plans/",
            Some(json!({"title": "Broken", "duration_days": 0, "price": "1.00"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }
}
