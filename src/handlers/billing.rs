// src/handlers/billing.rs

use axum::{extract::State, Json};

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::billing::{BillingStatus, SubscriptionActionResponse, UsageReport},
};

// GET /api/billing/status
#[utoipa::path(
    get,
    path = "/api/billing/status",
    tag = "Billing",
    responses(
        (status = 200, description = "Plano, trial e uso de faturas grátis", body = BillingStatus)
    ),
    security(("api_jwt" = []))
)]
pub async fn get_status(
    State(app_state): State<AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
) -> Result<Json<BillingStatus>, AppError> {
    Ok(Json(app_state.entitlement_service.get_billing_status(session.user_id).await?))
}

// POST /api/billing/usage
#[utoipa::path(
    post,
    path = "/api/billing/usage",
    tag = "Billing",
    responses(
        (status = 200, description = "Uso registrado: contadores do trial ou `unlimited`")
    ),
    security(("api_jwt" = []))
)]
pub async fn track_usage(
    State(app_state): State<AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
) -> Result<Json<UsageReport>, AppError> {
    Ok(Json(app_state.entitlement_service.check_and_consume_trial_usage(session.user_id).await?))
}

// POST /api/billing/cancel
#[utoipa::path(
    post,
    path = "/api/billing/cancel",
    tag = "Billing",
    responses(
        (status = 200, description = "Assinatura cancelada", body = SubscriptionActionResponse),
        (status = 400, description = "Nenhuma assinatura ativa"),
        (status = 502, description = "Falha no provedor de pagamento")
    ),
    security(("api_jwt" = []))
)]
pub async fn cancel_subscription(
    State(app_state): State<AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
) -> Result<Json<SubscriptionActionResponse>, AppError> {
    Ok(Json(app_state.entitlement_service.cancel(session.user_id).await?))
}

// POST /api/billing/reactivate
#[utoipa::path(
    post,
    path = "/api/billing/reactivate",
    tag = "Billing",
    responses(
        (status = 200, description = "Assinatura reativada", body = SubscriptionActionResponse),
        (status = 400, description = "Nenhuma assinatura para reativar"),
        (status = 502, description = "Falha no provedor de pagamento")
    ),
    security(("api_jwt" = []))
)]
pub async fn reactivate_subscription(
    State(app_state): State<AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
) -> Result<Json<SubscriptionActionResponse>, AppError> {
    Ok(Json(app_state.entitlement_service.reactivate(session.user_id).await?))
}
