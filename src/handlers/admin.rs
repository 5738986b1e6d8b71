// src/handlers/admin.rs

use axum::{
    extract::{Path, State},
    Json,
};

use crate::{
    common::error::AppError,
    config::AppState,
    integrations::{MailDomain, Mailer},
    middleware::auth::RequireAdmin,
};

fn mailer(app_state: &AppState) -> Result<&dyn Mailer, AppError> {
    app_state
        .mailer
        .as_deref()
        .ok_or_else(|| AppError::ProviderError("Provedor de e-mail não configurado".into()))
}

// GET /api/admin/domains
#[utoipa::path(
    get,
    path = "/api/admin/domains",
    tag = "Admin",
    responses(
        (status = 200, description = "Domínios de envio cadastrados no provedor", body = Vec<MailDomain>),
        (status = 403, description = "Apenas administradores")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_domains(
    State(app_state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<Vec<MailDomain>>, AppError> {
    Ok(Json(mailer(&app_state)?.list_domains().await?))
}

// GET /api/admin/domains/{id}
#[utoipa::path(
    get,
    path = "/api/admin/domains/{id}",
    tag = "Admin",
    params(("id" = String, Path, description = "ID do domínio no provedor")),
    responses(
        (status = 200, description = "Domínio", body = MailDomain),
        (status = 403, description = "Apenas administradores")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_domain(
    State(app_state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<String>,
) -> Result<Json<MailDomain>, AppError> {
    Ok(Json(mailer(&app_state)?.get_domain(&id).await?))
}

// POST /api/admin/domains/{id}/verify
#[utoipa::path(
    post,
    path = "/api/admin/domains/{id}/verify",
    tag = "Admin",
    params(("id" = String, Path, description = "ID do domínio no provedor")),
    responses(
        (status = 200, description = "Verificação disparada; status atualizado", body = MailDomain),
        (status = 403, description = "Apenas administradores")
    ),
    security(("api_jwt" = []))
)]
pub async fn verify_domain(
    State(app_state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<String>,
) -> Result<Json<MailDomain>, AppError> {
    let domain = mailer(&app_state)?.verify_domain(&id).await?;
    tracing::info!(admin_id = %admin.id, domain = %domain.name, status = %domain.status, "Verificação de domínio solicitada");
    Ok(Json(domain))
}
