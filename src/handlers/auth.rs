// src/handlers/auth.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::{
        auth::{
            AuthResponse, ChangePasswordPayload, ForgotPasswordPayload, LoginUserPayload,
            RegisterUserPayload, ResetPasswordPayload, SwitchWorkspacePayload, User,
        },
        workspace::WorkspaceSummary,
    },
};

// POST /api/auth/register
#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "Auth",
    request_body = RegisterUserPayload,
    responses(
        (status = 201, description = "Conta e primeiro workspace criados", body = AuthResponse),
        (status = 400, description = "Dados inválidos ou e-mail já cadastrado"),
        (status = 429, description = "Muitas tentativas")
    )
)]
pub async fn register(
    State(app_state): State<AppState>,
    Json(payload): Json<RegisterUserPayload>,
) -> Result<impl IntoResponse, AppError> {
    let token = app_state.auth_service.register_user(payload).await?;
    Ok((StatusCode::CREATED, Json(AuthResponse { token })))
}

// POST /api/auth/login
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    request_body = LoginUserPayload,
    responses(
        (status = 200, description = "Login efetuado", body = AuthResponse),
        (status = 401, description = "Credenciais inválidas"),
        (status = 429, description = "Muitas tentativas")
    )
)]
pub async fn login(
    State(app_state): State<AppState>,
    Json(payload): Json<LoginUserPayload>,
) -> Result<Json<AuthResponse>, AppError> {
    let token = app_state.auth_service.login_user(payload).await?;
    Ok(Json(AuthResponse { token }))
}

// POST /api/auth/forgot-password
#[utoipa::path(
    post,
    path = "/api/auth/forgot-password",
    tag = "Auth",
    request_body = ForgotPasswordPayload,
    responses(
        (status = 200, description = "Se a conta existir, um e-mail foi enviado"),
        (status = 429, description = "Muitas tentativas")
    )
)]
pub async fn forgot_password(
    State(app_state): State<AppState>,
    Json(payload): Json<ForgotPasswordPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    app_state.auth_service.forgot_password(&payload.email).await?;

    Ok(Json(json!({
        "message": "Se existir uma conta com este e-mail, enviaremos um link de redefinição."
    })))
}

// POST /api/auth/reset-password
#[utoipa::path(
    post,
    path = "/api/auth/reset-password",
    tag = "Auth",
    request_body = ResetPasswordPayload,
    responses(
        (status = 200, description = "Senha redefinida"),
        (status = 400, description = "Token inválido ou expirado"),
        (status = 429, description = "Muitas tentativas")
    )
)]
pub async fn reset_password(
    State(app_state): State<AppState>,
    Json(payload): Json<ResetPasswordPayload>,
) -> Result<impl IntoResponse, AppError> {
    app_state.auth_service.reset_password(payload).await?;
    Ok(Json(json!({ "message": "Senha redefinida com sucesso." })))
}

// POST /api/auth/change-password
#[utoipa::path(
    post,
    path = "/api/auth/change-password",
    tag = "Auth",
    request_body = ChangePasswordPayload,
    responses(
        (status = 200, description = "Senha alterada"),
        (status = 401, description = "Senha atual incorreta")
    ),
    security(("api_jwt" = []))
)]
pub async fn change_password(
    State(app_state): State<AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    Json(payload): Json<ChangePasswordPayload>,
) -> Result<impl IntoResponse, AppError> {
    app_state.auth_service.change_password(session.user_id, payload).await?;
    Ok(Json(json!({ "message": "Senha alterada com sucesso." })))
}

// GET /api/users/me
#[utoipa::path(
    get,
    path = "/api/users/me",
    tag = "Users",
    responses(
        (status = 200, description = "Usuário autenticado", body = User),
        (status = 401, description = "Não autenticado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_me(
    State(app_state): State<AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
) -> Result<Json<User>, AppError> {
    let user = app_state.auth_service.me(session.user_id).await?;
    Ok(Json(user))
}

// GET /api/users/me/workspaces
#[utoipa::path(
    get,
    path = "/api/users/me/workspaces",
    tag = "Users",
    responses(
        (status = 200, description = "Workspaces dos quais o usuário é membro", body = Vec<WorkspaceSummary>)
    ),
    security(("api_jwt" = []))
)]
pub async fn get_my_workspaces(
    State(app_state): State<AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
) -> Result<Json<Vec<WorkspaceSummary>>, AppError> {
    let workspaces = app_state.auth_service.my_workspaces(session.user_id).await?;
    Ok(Json(workspaces))
}

// POST /api/users/me/workspace
#[utoipa::path(
    post,
    path = "/api/users/me/workspace",
    tag = "Users",
    request_body = SwitchWorkspacePayload,
    responses(
        (status = 200, description = "Novo token com o workspace selecionado", body = AuthResponse),
        (status = 403, description = "Usuário não é membro do workspace")
    ),
    security(("api_jwt" = []))
)]
pub async fn switch_workspace(
    State(app_state): State<AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    Json(payload): Json<SwitchWorkspacePayload>,
) -> Result<Json<AuthResponse>, AppError> {
    let token = app_state
        .auth_service
        .switch_workspace(&session, payload.workspace_id)
        .await?;
    Ok(Json(AuthResponse { token }))
}
