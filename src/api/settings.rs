use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use super::gateway::CurrentUser;
use super::validation::{ApiJson, validate_setting_value};
use super::{ApiError, AppState};
use crate::db::SettingRow;
use crate::settings::display_value;

#[derive(Deserialize)]
pub struct UpdateSettingRequest {
    pub name: String,
    #[serde(default)]
    pub value: String,
}

/// Secret values are masked; the row itself keeps the real value.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingResponse {
    pub id: i32,
    pub name: String,
    pub default: String,
    pub value: String,
    pub is_active: bool,
    pub read_only: bool,
    pub created_at: String,
}

impl From<SettingRow> for SettingResponse {
    fn from(row: SettingRow) -> Self {
        Self {
            id: row.id,
            default: display_value(&row.name, &row.default_value),
            value: display_value(&row.name, &row.value),
            name: row.name,
            is_active: row.is_active,
            read_only: row.read_only,
            created_at: row.created_at,
        }
    }
}

async fn setting_responses(state: &AppState) -> Result<Vec<SettingResponse>, ApiError> {
    let rows = state.settings.list_rows().await?;
    Ok(rows.into_iter().map(SettingResponse::from).collect())
}

/// GET /api/v1/settings/
pub async fn list_settings(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<SettingResponse>>, ApiError> {
    Ok(Json(setting_responses(&state).await?))
}

/// POST /api/v1/settings/
pub async fn update_setting(
    State(state): State<Arc<AppState>>,
    CurrentUser(admin): CurrentUser,
    ApiJson(payload): ApiJson<UpdateSettingRequest>,
) -> Result<Json<Vec<SettingResponse>>, ApiError> {
    let name = payload.name.trim();
    if !state.settings.registry().contains(name) {
        return Err(ApiError::not_found("Setting", name));
    }

    if let Some(row) = state.settings.get_row(name).await?
        && row.read_only
    {
        return Err(ApiError::forbidden(format!("setting {name} is read-only")));
    }

    validate_setting_value(name, &payload.value)?;
    state.settings.set(name, &payload.value).await?;

    info!(admin_id = %admin.id, setting = name, "Setting updated");
    Ok(Json(setting_responses(&state).await?))
}
