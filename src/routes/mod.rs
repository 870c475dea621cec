use axum::http::HeaderValue;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post},
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::state::AppState;

pub mod auth;
pub mod dashboard;
pub mod documents;
pub mod health;
pub mod offices;

pub fn create_router(state: AppState) -> Router<()> {
    let cors = if let Some(origins) = state.config.cors_allowed_origin.as_ref() {
        let headers: Vec<HeaderValue> = origins
            .split(',')
            .filter_map(|value| {
                let trimmed = value.trim();
                (!trimmed.is_empty()).then(|| {
                    trimmed
                        .parse::<HeaderValue>()
                        .expect("invalid CORS allowed origin")
                })
            })
            .collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(headers))
            .allow_methods(tower_http::cors::AllowMethods::mirror_request())
            .allow_headers(tower_http::cors::AllowHeaders::mirror_request())
            .allow_credentials(true)
    } else {
        CorsLayer::new()
            .allow_origin(AllowOrigin::mirror_request())
            .allow_methods(tower_http::cors::AllowMethods::mirror_request())
            .allow_headers(tower_http::cors::AllowHeaders::mirror_request())
            .allow_credentials(true)
    };

    let auth_routes = Router::new()
        .route("/login", post(auth::login))
        .route("/me", get(auth::me));

    let documents_routes = Router::new()
        .route("/internal/register", post(documents::register_internal))
        .route("/public/register", post(documents::register_public))
        .route("/pending", get(documents::list_pending))
        .route("/inbox", get(documents::get_inbox))
        .route("/:id/approve", patch(documents::approve_document))
        .route("/:id/reject", patch(documents::reject_document))
        .route("/:id/derive", patch(documents::derive_document))
        .route("/:id/attend", patch(documents::attend_document))
        .route("/:id/history", get(documents::get_full_history));

    let offices_routes = Router::new()
        .route(
            "/",
            get(offices::list_offices).post(offices::create_office),
        )
        .route("/:id/parent", patch(offices::reparent_office));

    Router::new()
        .nest("/api/documents", documents_routes)
        .nest("/api/offices", offices_routes)
        .nest("/api/auth", auth_routes)
        .route("/api/tracking/:code", get(documents::track_by_code))
        .route("/api/dashboard", get(dashboard::get_dashboard))
        .route("/api/health", get(health::health_check))
        .with_state(state)
        .layer(cors)
        .layer(DefaultBodyLimit::max(1024 * 1024 * 32))
}
