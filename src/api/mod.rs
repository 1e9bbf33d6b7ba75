use axum::{
    Json, Router,
    extract::Request,
    http::{HeaderValue, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::auth::{AuthService, SeaOrmAuthService, TokenService, token::bootstrap_signing_key};
use crate::config::Config;
use crate::db::Store;
use crate::proxy::InferenceProxy;
use crate::settings::Settings;

pub mod auth;
pub mod chats;
mod error;
pub mod gateway;
pub mod localllm;
pub mod modelfiles;
mod observability;
pub mod settings;
pub mod system;
mod types;
mod validation;
pub mod users;

pub use error::ApiError;
pub use types::*;

pub struct AppState {
    pub config: Arc<Config>,

    pub store: Store,

    pub settings: Arc<Settings>,

    pub tokens: Arc<TokenService>,

    pub auth: Arc<dyn AuthService>,

    pub proxy: Arc<InferenceProxy>,

    pub start_time: Instant,

    pub prometheus_handle: Option<PrometheusHandle>,
}

/// `settings` must already be attached to `store`; the signing key is read
/// from it once here and stays fixed for the life of the state.
pub async fn create_app_state(
    config: Config,
    store: Store,
    settings: Arc<Settings>,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let secret = bootstrap_signing_key(&settings).await?;
    let tokens = Arc::new(TokenService::new(&secret, settings.clone()));

    let auth: Arc<dyn AuthService> = Arc::new(SeaOrmAuthService::new(
        store.clone(),
        settings.clone(),
        tokens.clone(),
        config.security.clone(),
    ));

    let proxy = Arc::new(InferenceProxy::new(&config.proxy, settings.clone())?);

    Ok(Arc::new(AppState {
        config: Arc::new(config),
        store,
        settings,
        tokens,
        auth,
        proxy,
        start_time: Instant::now(),
        prometheus_handle,
    }))
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors_layer = cors_layer(&state.config.server.cors_allowed_origins);

    let public_routes = Router::new()
        .route("/api/config", get(system::get_app_config))
        .route("/api/health/live", get(system::health_live))
        .route("/api/health/ready", get(system::health_ready));

    Router::new()
        .merge(public_routes)
        .merge(create_protected_router(state.clone()))
        .fallback(not_found)
        .with_state(state)
        .layer(middleware::from_fn(observability::logging_middleware))
        .layer(cors_layer)
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = if origins.iter().any(|o| o == "*") {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> = origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };
    layer.allow_methods(Any).allow_headers(Any)
}

/// Everything behind the authorization gateway. The gateway itself lets the
/// sign-in and sign-up routes through without a token.
fn create_protected_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    let signup_routes = Router::new()
        .route("/api/v1/auths/signup", post(auth::sign_up))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            gateway::require_signup_enabled,
        ));

    let admin_routes = Router::new()
        .route("/api/v1/users/", get(users::list_users))
        .route("/api/v1/users/update/role", post(users::update_role))
        .route("/api/v1/users/{id}", delete(users::delete_user))
        .route(
            "/api/v1/modelfiles/",
            get(modelfiles::list_modelfiles).post(modelfiles::find_by_tag),
        )
        .route("/api/v1/modelfiles/create", post(modelfiles::create_modelfile))
        .route("/api/v1/modelfiles/update", post(modelfiles::update_modelfile))
        .route("/api/v1/modelfiles/{id}", delete(modelfiles::delete_modelfile))
        .route(
            "/api/v1/settings/",
            get(settings::list_settings).post(settings::update_setting),
        )
        .route("/localllm/url/update", post(localllm::update_url))
        .route("/localllm/ollama/api/create", post(localllm::forward))
        .route("/localllm/ollama/api/pull", post(localllm::forward))
        .route("/localllm/ollama/api/delete", delete(localllm::forward))
        .route("/api/v1/db/download/", get(system::download_database))
        .route("/metrics", get(observability::get_metrics))
        .route_layer(middleware::from_fn(gateway::require_admin));

    Router::new()
        .route("/api/v1/auths/", get(auth::session_user))
        .route("/api/v1/auths/signin", post(auth::sign_in))
        .merge(signup_routes)
        .route("/api/v1/users/{id}/update", post(users::update_user))
        .route("/api/v1/chats/", get(chats::list_chats))
        .route("/api/v1/chats/new", post(chats::create_chat))
        .route("/api/v1/chats/tags/all", get(chats::list_tags))
        .route(
            "/api/v1/chats/{id}",
            get(chats::get_chat)
                .post(chats::update_chat)
                .delete(chats::delete_chat),
        )
        .route("/api/v1/chats/{id}/tags", get(chats::list_tags))
        .route("/api/v1/documents/", get(system::empty_collection))
        .route("/api/v1/prompts/", get(system::empty_collection))
        .route("/localllm/url", get(localllm::get_url))
        .route("/localllm/cancel/{id}", get(localllm::cancel))
        .route("/localllm/ollama/api/version", get(localllm::forward))
        .route("/localllm/ollama/api/tags", get(localllm::forward))
        .route("/localllm/ollama/api/generate", post(localllm::forward))
        .route("/localllm/ollama/api/chat", post(localllm::forward))
        .route("/localllm/ollama/api/show", post(localllm::forward))
        .route("/ollama/api/version", get(localllm::forward))
        .route("/ollama/api/tags", get(localllm::forward))
        .route("/ollama/api/chat", post(localllm::forward))
        .route("/ollama/cancel/{id}", get(localllm::cancel))
        .route("/openai/api/models", get(system::openai_models))
        .merge(admin_routes)
        .route_layer(middleware::from_fn_with_state(state, gateway::authenticate))
}

async fn not_found(req: Request) -> Response {
    let message = if req.uri().path().starts_with("/api") {
        "API not found"
    } else {
        "Not found"
    };
    info!(path = %req.uri().path(), "No route matched");
    (StatusCode::NOT_FOUND, Json(ErrorBody::new(message))).into_response()
}
