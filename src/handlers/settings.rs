// src/handlers/settings.rs

use axum::{extract::State, Json};

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::CurrentWorkspace,
    models::workspace::{UpdateWorkspaceSettingsPayload, Workspace},
};

// GET /api/settings/workspace
#[utoipa::path(
    get,
    path = "/api/settings/workspace",
    tag = "Settings",
    responses(
        (status = 200, description = "Configurações do workspace atual", body = Workspace)
    ),
    security(("api_jwt" = []))
)]
pub async fn get_settings(
    State(app_state): State<AppState>,
    CurrentWorkspace(ctx): CurrentWorkspace,
) -> Result<Json<Workspace>, AppError> {
    Ok(Json(app_state.workspace_service.get_settings(&ctx).await?))
}

// PUT /api/settings/workspace
#[utoipa::path(
    put,
    path = "/api/settings/workspace",
    tag = "Settings",
    request_body = UpdateWorkspaceSettingsPayload,
    responses(
        (status = 200, description = "Configurações atualizadas", body = Workspace),
        (status = 400, description = "Dados inválidos")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_settings(
    State(app_state): State<AppState>,
    CurrentWorkspace(ctx): CurrentWorkspace,
    Json(payload): Json<UpdateWorkspaceSettingsPayload>,
) -> Result<Json<Workspace>, AppError> {
    Ok(Json(app_state.workspace_service.update_settings(&ctx, payload).await?))
}
