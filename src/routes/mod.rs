use std::time::Duration;

use axum::http::HeaderValue;
use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::{auth::AuthenticatedUser, state::AppState};

pub mod comments;
pub mod health;
pub mod sessions;
pub mod users;

pub fn create_router(state: AppState) -> Router<()> {
    let allow_origin = match state.config.cors_allowed_origin.as_ref() {
        Some(origins) => AllowOrigin::list(parse_origins(origins)),
        None => AllowOrigin::mirror_request(),
    };
    let cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true);

    let session_routes = Router::new()
        .route("/session-data", get(sessions::list_sessions))
        .route("/session", get(sessions::get_session))
        .route("/sessions", post(sessions::create_session))
        .route(
            "/session/:sid/comments",
            get(comments::list_comments).post(comments::add_comment),
        )
        .route("/session/:sid/urgency", put(sessions::update_urgency))
        .route("/session/:sid/team", put(sessions::update_team))
        .route("/session/:sid/action", post(sessions::take_action));

    let users_routes = Router::new()
        .route("/", get(users::list_users).post(users::create_user))
        .route("/:id", delete(users::delete_user))
        .route("/:id/roles", get(users::user_roles));

    let protected_state = state.clone();
    let protected_routes = Router::new()
        .nest("/api", session_routes)
        .nest("/api/users", users_routes)
        .layer(middleware::from_extractor_with_state::<AuthenticatedUser, _>(protected_state));

    let timeout = Duration::from_secs(state.config.request_timeout_secs.max(1));

    Router::new()
        .merge(protected_routes)
        .route("/api/health", get(health::health_check))
        .with_state(state)
        .layer(TimeoutLayer::new(timeout))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

fn parse_origins(raw: &str) -> Vec<HeaderValue> {
    raw.split(',')
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .filter_map(|value| match value.parse::<HeaderValue>() {
            Ok(origin) => Some(origin),
            Err(_) => {
                warn!(origin = value, "ignoring invalid CORS allowed origin");
                None
            }
        })
        .collect()
}
