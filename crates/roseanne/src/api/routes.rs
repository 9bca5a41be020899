//! API route definitions.

use axum::{
    Json, Router,
    extract::Request,
    http::{Method, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::auth::require_admin;

use super::handlers;
use super::state::AppState;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_request(DefaultOnRequest::new().level(Level::DEBUG))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    let public_routes = Router::new()
        .route(
            "/api/auth/login",
            post(handlers::login).fallback(handlers::method_not_allowed),
        )
        .route(
            "/api/auth/verify",
            get(handlers::verify).fallback(handlers::method_not_allowed),
        )
        .route(
            "/api/celebrities",
            get(handlers::get_celebrities)
                .post(handlers::submit_celebrity)
                .fallback(handlers::method_not_allowed),
        )
        .route(
            "/api/votes",
            post(handlers::cast_vote).fallback(handlers::method_not_allowed),
        )
        .route(
            "/api/health",
            get(handlers::health).fallback(handlers::method_not_allowed),
        );

    // Admin routes. The guard wraps only the method handlers, so a wrong
    // method is answered with 405 before any token check.
    let admin = middleware::from_fn_with_state(state.clone(), require_admin);
    let admin_routes = Router::new()
        .route(
            "/api/celebrities/pending",
            get(handlers::list_pending)
                .route_layer(admin.clone())
                .fallback(handlers::method_not_allowed),
        )
        .route(
            "/api/celebrities/approve",
            post(handlers::approve_celebrity)
                .delete(handlers::reject_celebrity)
                .route_layer(admin.clone())
                .fallback(handlers::method_not_allowed),
        )
        .route(
            "/api/bulk-upload",
            post(handlers::bulk_upload)
                .route_layer(admin.clone())
                .fallback(handlers::method_not_allowed),
        )
        .route(
            "/api/init-db",
            post(handlers::init_db)
                .route_layer(admin.clone())
                .fallback(handlers::method_not_allowed),
        )
        .route(
            "/api/test-images",
            get(handlers::test_images)
                .route_layer(admin.clone())
                .fallback(handlers::method_not_allowed),
        )
        .route(
            "/api/fix-image-urls",
            post(handlers::fix_image_urls)
                .route_layer(admin.clone())
                .fallback(handlers::method_not_allowed),
        )
        .route(
            "/api/delete-celebrities",
            post(handlers::delete_celebrities)
                .route_layer(admin)
                .fallback(handlers::method_not_allowed),
        );

    Router::new()
        .merge(public_routes)
        .merge(admin_routes)
        .fallback(not_found)
        .with_state(state)
        .layer(middleware::from_fn(answer_options))
        .layer(build_cors_layer())
        .layer(trace_layer)
}

/// Any-origin CORS for the browser game and admin page.
fn build_cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

/// OPTIONS is answered with an empty 200 before routing or auth.
async fn answer_options(req: Request, next: Next) -> Response {
    if req.method() == Method::OPTIONS {
        return StatusCode::OK.into_response();
    }
    next.run(req).await
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Not found" })))
}
