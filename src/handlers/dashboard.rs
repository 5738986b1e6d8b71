// src/handlers/dashboard.rs

use axum::{extract::State, Json};

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::CurrentWorkspace,
    models::dashboard::DashboardSummary,
};

// GET /api/dashboard/summary
#[utoipa::path(
    get,
    path = "/api/dashboard/summary",
    tag = "Dashboard",
    responses(
        (status = 200, description = "Totais em aberto, vencidos e pagos do workspace", body = DashboardSummary),
        (status = 401, description = "Não autenticado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_summary(
    State(app_state): State<AppState>,
    CurrentWorkspace(ctx): CurrentWorkspace,
) -> Result<Json<DashboardSummary>, AppError> {
    let summary = app_state.dashboard_service.get_summary(ctx.workspace_id).await?;
    Ok(Json(summary))
}
