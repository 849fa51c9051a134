use std::sync::Arc;

use axum::{body::Bytes, extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::errors::{AppError, Operation};
use crate::models::credential::Credential;
use crate::proxy::upstream::RemoteError;
use crate::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionTestRequest {
    #[serde(default)]
    pub access_token: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionTestResponse {
    pub success: bool,
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// The browser-side credential record. `threads`-prefixed keys are what older dashboards send.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsRequest {
    #[serde(default, alias = "threadsAccessToken")]
    pub access_token: Option<String>,
    #[serde(default, alias = "threadsUserId")]
    pub user_id: Option<String>,
}

/// POST /api/threads/test: check a token by asking who it belongs to.
///
/// The token travels in the body here, since the dashboard has not stored it yet.
#[tracing::instrument(skip_all)]
pub async fn test_connection(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<ConnectionTestResponse>, AppError> {
    let request: ConnectionTestRequest =
        serde_json::from_slice(&body).map_err(|e| AppError::ConnectionFailed {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            details: e.to_string(),
        })?;

    let credential = request
        .access_token
        .and_then(Credential::new)
        .ok_or(AppError::MissingCredential)?;

    let identity = state.threads.whoami(&credential).await.map_err(|e| match e {
        RemoteError::Rejected { status, message } => AppError::ConnectionFailed {
            status,
            details: message,
        },
        other => AppError::ConnectionFailed {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            details: other.to_string(),
        },
    })?;

    tracing::info!(user_id = %identity.id, "connection test succeeded");
    Ok(Json(ConnectionTestResponse {
        success: true,
        user_id: identity.id,
        username: identity.username,
    }))
}

/// GET /api/settings: shape of the credential record the dashboard keeps
pub async fn settings_schema() -> Json<Value> {
    Json(json!({
        "schema": {
            "accessToken": "string",
            "userId": "string",
        },
        "note": "settings are kept in the browser's local storage; the relay stores nothing",
    }))
}

/// POST /api/settings: validate a credential record; nothing is persisted server-side
pub async fn save_settings(body: Bytes) -> Result<Json<Value>, AppError> {
    let request: SettingsRequest =
        serde_json::from_slice(&body).map_err(|e| AppError::local(Operation::SaveSettings, e))?;

    if request
        .access_token
        .as_deref()
        .map_or(true, |t| t.trim().is_empty())
    {
        return Err(AppError::InvalidRequest("accessToken is required".into()));
    }

    Ok(Json(json!({
        "success": true,
        "message": "settings accepted (stored in the browser only)",
        "userId": request.user_id,
    })))
}
