use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::gateway::CurrentUser;
use super::validation::{ApiJson, parse_id};
use super::{ApiError, AppState, StatusResponse};
use crate::db::Modelfile;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindByTagRequest {
    pub tag_name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateModelfileRequest {
    pub tag_name: String,
    pub modelfile: Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateModelfileRequest {
    pub id: Uuid,
    pub tag_name: String,
    pub modelfile: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelfileResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub tag_name: String,
    pub modelfile: Value,
    pub created_at: String,
}

impl From<Modelfile> for ModelfileResponse {
    fn from(m: Modelfile) -> Self {
        let modelfile =
            serde_json::from_str(&m.modelfile).unwrap_or(Value::String(m.modelfile));
        Self {
            id: m.id,
            user_id: m.user_id,
            tag_name: m.tag_name,
            modelfile,
            created_at: m.created_at,
        }
    }
}

fn validated(tag_name: &str, modelfile: &Value) -> Result<(), ApiError> {
    if tag_name.trim().is_empty() {
        return Err(ApiError::validation("tagName is required"));
    }
    if !modelfile.is_object() {
        return Err(ApiError::validation("modelfile must be a JSON object"));
    }
    Ok(())
}

/// GET /api/v1/modelfiles/
pub async fn list_modelfiles(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ModelfileResponse>>, ApiError> {
    let modelfiles = state.store.list_modelfiles().await?;
    Ok(Json(
        modelfiles.into_iter().map(ModelfileResponse::from).collect(),
    ))
}

/// POST /api/v1/modelfiles/
pub async fn find_by_tag(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<FindByTagRequest>,
) -> Result<Json<ModelfileResponse>, ApiError> {
    let modelfile = state
        .store
        .get_modelfile_by_tag(&payload.tag_name)
        .await?
        .ok_or_else(|| ApiError::not_found("Modelfile", &payload.tag_name))?;
    Ok(Json(modelfile.into()))
}

/// POST /api/v1/modelfiles/create
pub async fn create_modelfile(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    ApiJson(payload): ApiJson<CreateModelfileRequest>,
) -> Result<Json<ModelfileResponse>, ApiError> {
    validated(&payload.tag_name, &payload.modelfile)?;

    let modelfile = state
        .store
        .create_modelfile(
            user.id,
            payload.tag_name.trim(),
            &payload.modelfile.to_string(),
        )
        .await?;

    info!(tag = %modelfile.tag_name, user_id = %user.id, "Modelfile created");
    Ok(Json(modelfile.into()))
}

/// POST /api/v1/modelfiles/update
pub async fn update_modelfile(
    State(state): State<Arc<AppState>>,
    ApiJson(payload): ApiJson<UpdateModelfileRequest>,
) -> Result<Json<ModelfileResponse>, ApiError> {
    validated(&payload.tag_name, &payload.modelfile)?;

    let modelfile = state
        .store
        .update_modelfile(
            payload.id,
            payload.tag_name.trim(),
            &payload.modelfile.to_string(),
        )
        .await?
        .ok_or_else(|| ApiError::not_found("Modelfile", payload.id))?;
    Ok(Json(modelfile.into()))
}

/// DELETE /api/v1/modelfiles/{id}
pub async fn delete_modelfile(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<StatusResponse>, ApiError> {
    let id = parse_id(&id)?;
    if !state.store.delete_modelfile(id).await? {
        return Err(ApiError::not_found("Modelfile", id));
    }
    Ok(Json(StatusResponse::ok()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_validated() {
        assert!(validated("llama:7b", &json!({"title": "Llama"})).is_ok());
        assert!(validated("  ", &json!({})).is_err());
        assert!(validated("llama:7b", &json!("text")).is_err());
    }

    #[test]
    fn test_response_parses_stored_document() {
        let response = ModelfileResponse::from(Modelfile {
            id: Uuid::new_v4(),
            tag_name: "mario".into(),
            modelfile: r#"{"title":"Mario","categories":["fun"]}"#.into(),
            user_id: Uuid::new_v4(),
            created_at: String::new(),
        });
        assert_eq!(response.modelfile["title"], "Mario");

        let body = serde_json::to_value(&response).unwrap();
        assert_eq!(body["tagName"], "mario");
        assert!(body.get("userId").is_some());
    }
}
