//! System endpoints: app config, health, the database export and the
//! placeholder collections the web UI polls.

use axum::{
    Json,
    body::Body,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio_util::io::ReaderStream;
use tracing::info;

use super::gateway::CurrentUser;
use super::{ApiError, AppState};
use crate::db::database_file;

pub const APP_NAME: &str = "LLMOS Dashboard";

#[derive(Debug, Clone, Serialize)]
pub struct PromptSuggestion {
    pub title: [&'static str; 2],
    pub content: &'static str,
}

const PROMPT_SUGGESTIONS: &[PromptSuggestion] = &[
    PromptSuggestion {
        title: ["Help me study", "vocabulary for a college entrance exam"],
        content: "Help me study vocabulary: write a sentence for me to fill in the blank, and I'll try to pick the correct option.",
    },
    PromptSuggestion {
        title: ["Give me ideas", "for what to do with my kids' art"],
        content: "What are 5 creative things I could do with my kids' art? I don't want to throw them away, but it's also so much clutter.",
    },
    PromptSuggestion {
        title: ["Tell me a fun fact", "about the Roman Empire"],
        content: "Tell me a random fun fact about the Roman Empire",
    },
    PromptSuggestion {
        title: ["Show me a code snippet", "of a website's sticky header"],
        content: "Show me a code snippet of a website's sticky header in CSS and JavaScript.",
    },
];

#[derive(Debug, Serialize)]
pub struct AppConfigResponse {
    pub status: bool,
    pub name: &'static str,
    pub version: &'static str,
    pub images: bool,
    pub default_models: Option<String>,
    pub default_prompt_suggestions: &'static [PromptSuggestion],
}

/// GET /api/config
pub async fn get_app_config() -> Json<AppConfigResponse> {
    Json(AppConfigResponse {
        status: true,
        name: APP_NAME,
        version: env!("CARGO_PKG_VERSION"),
        images: false,
        default_models: None,
        default_prompt_suggestions: PROMPT_SUGGESTIONS,
    })
}

/// GET /api/v1/documents/ and /api/v1/prompts/
pub async fn empty_collection() -> Json<Vec<Value>> {
    Json(Vec::new())
}

#[derive(Debug, Serialize)]
pub struct OpenAiModelsResponse {
    pub status: bool,
    pub auth: &'static str,
}

/// GET /openai/api/models
pub async fn openai_models() -> Json<OpenAiModelsResponse> {
    Json(OpenAiModelsResponse {
        status: true,
        auth: "true",
    })
}

const DATABASE_EXPORT_NAME: &str = "llmos-dashboard.db";

/// GET /api/v1/db/download/
///
/// Streams the sqlite file behind `general.database_path` as an attachment.
pub async fn download_database(
    State(state): State<Arc<AppState>>,
    CurrentUser(admin): CurrentUser,
) -> Result<Response, ApiError> {
    let Some(path) = database_file(&state.config.general.database_path) else {
        return Err(ApiError::NotFound(
            "Database export is unavailable for in-memory stores".to_string(),
        ));
    };

    let file = tokio::fs::File::open(&path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ApiError::NotFound("Database file not found".to_string())
        } else {
            ApiError::internal(format!("Failed to open database file: {e}"))
        }
    })?;
    let size = file
        .metadata()
        .await
        .map_err(|e| ApiError::internal(format!("Failed to stat database file: {e}")))?
        .len();

    info!(admin_id = %admin.id, path = %path.display(), size, "Database export started");

    Ok((
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (header::CONTENT_LENGTH, size.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{DATABASE_EXPORT_NAME}\""),
            ),
        ],
        Body::from_stream(ReaderStream::new(file)),
    )
        .into_response())
}

#[derive(Debug, Serialize)]
pub struct HealthLiveResponse {
    pub status: &'static str,
    pub uptime_seconds: u64,
}

#[derive(Debug, Serialize)]
pub struct HealthReadyResponse {
    pub ready: bool,
    pub database: bool,
    pub settings_attached: bool,
}

/// GET /api/health/live
pub async fn health_live(State(state): State<Arc<AppState>>) -> Json<HealthLiveResponse> {
    Json(HealthLiveResponse {
        status: "alive",
        uptime_seconds: state.start_time.elapsed().as_secs(),
    })
}

/// GET /api/health/ready
pub async fn health_ready(State(state): State<Arc<AppState>>) -> Response {
    let database = state.store.ping().await.is_ok();
    let settings_attached = state.settings.is_attached();
    let ready = database && settings_attached;

    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(HealthReadyResponse {
            ready,
            database,
            settings_attached,
        }),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_openai_models_shape() {
        let Json(body) = openai_models().await;
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({"status": true, "auth": "true"})
        );
    }

    #[tokio::test]
    async fn test_app_config_shape() {
        let Json(config) = get_app_config().await;
        let body = serde_json::to_value(&config).unwrap();

        assert_eq!(body["status"], true);
        assert_eq!(body["name"], APP_NAME);
        assert_eq!(body["images"], false);
        assert!(body["default_models"].is_null());
        assert_eq!(body["default_prompt_suggestions"].as_array().unwrap().len(), 4);
        assert_eq!(
            body["default_prompt_suggestions"][2]["title"][1],
            "about the Roman Empire"
        );
    }
}
