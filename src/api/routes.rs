use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::handlers;
use super::AppState;
use crate::middleware::{make_span_with_request_id, request_id_middleware};

/// Creates the main API router with all routes
pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        // Discovery
        .route("/categories/:category_id/presets", get(handlers::get_category_presets))
        // Engine
        .route("/browse", post(handlers::browse))
        .route("/recommendations", post(handlers::recommend))
        // Profiles & sessions
        .route("/profiles/:user_id", get(handlers::get_profile))
        .route("/profiles/:user_id/feedback", post(handlers::submit_feedback))
        .route(
            "/profiles/:user_id/sessions/:session_id",
            get(handlers::get_session),
        )
        .route(
            "/profiles/:user_id/sessions/:session_id/steps",
            post(handlers::append_session_step),
        );

    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
    };
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let app = create_router(AppState::default());
        let response = app
            .oneshot(Request::get("/api/v1/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_cors_preflight_is_allowed() {
        let app = create_router(AppState::default());
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/api/v1/browse")
            .header(header::ORIGIN, "http://localhost:5173")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "*"
        );
    }
}
