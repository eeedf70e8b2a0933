use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod sync;

use auth::inflight::InFlightState;
use config::Config;
use sync::SyncState;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<Config>,
    pub sync: SyncState,
    pub inflight: InFlightState,
}

impl AppState {
    pub fn new(db: PgPool, config: Arc<Config>) -> Self {
        Self {
            db,
            config,
            sync: SyncState::new(),
            inflight: InFlightState::new(),
        }
    }
}

/// Build the full router. The session guard wraps everything: it resolves
/// the cookie once per request, handles page redirects, and forwards rotated
/// session cookies on every response.
pub fn app(state: AppState) -> Router {
    let pages = Router::new()
        .route("/", get(handlers::pages::index))
        .route("/login", get(handlers::pages::login_page))
        .route("/dashboard", get(handlers::pages::dashboard_page));

    let api = Router::new()
        .route("/api/auth/signup", post(handlers::auth::signup))
        .route("/api/auth/login", post(handlers::auth::login))
        .route("/api/auth/logout", post(handlers::auth::logout))
        .route("/api/auth/me", get(handlers::auth::me))
        .route("/api/dashboard", get(handlers::dashboard::get_dashboard))
        .route("/api/stats/adjust", post(handlers::stats::adjust_stat))
        .route("/api/stats/mood", post(handlers::stats::set_mood))
        .route("/api/meals", post(handlers::meals::create_meal))
        .route("/api/meals", get(handlers::meals::list_meals))
        .route("/api/profile/weight", put(handlers::profile::update_weight));

    let health = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/readyz", get(handlers::health::readyz));

    let cors = CorsLayer::new()
        .allow_origin(
            state
                .config
                .frontend_url
                .parse::<axum::http::HeaderValue>()
                .expect("FRONTEND_URL must be a valid origin"),
        )
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PUT,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::ACCEPT,
        ])
        .allow_credentials(true);

    Router::new()
        .merge(pages)
        .merge(api)
        .merge(health)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::guard::session_guard,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
