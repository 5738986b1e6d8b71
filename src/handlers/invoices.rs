// src/handlers/invoices.rs

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::CurrentWorkspace,
    models::{
        invoice::{CreateInvoicePayload, Invoice, InvoiceDetail, UpdateStatusPayload},
        payment::Payment,
    },
    services::notification::SendOutcome,
};

// POST /api/invoices
#[utoipa::path(
    post,
    path = "/api/invoices",
    tag = "Invoices",
    request_body = CreateInvoicePayload,
    responses(
        (status = 201, description = "Fatura criada (o link de pagamento pode faltar se o provedor falhar)", body = InvoiceDetail),
        (status = 400, description = "Itens ou sinal inválidos"),
        (status = 402, description = "Período de teste encerrado"),
        (status = 404, description = "Cliente não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_invoice(
    State(app_state): State<AppState>,
    CurrentWorkspace(ctx): CurrentWorkspace,
    Json(payload): Json<CreateInvoicePayload>,
) -> Result<impl IntoResponse, AppError> {
    let detail = app_state.invoice_service.create(&ctx, payload).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

// GET /api/invoices
#[utoipa::path(
    get,
    path = "/api/invoices",
    tag = "Invoices",
    responses(
        (status = 200, description = "Faturas do workspace atual", body = Vec<Invoice>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_invoices(
    State(app_state): State<AppState>,
    CurrentWorkspace(ctx): CurrentWorkspace,
) -> Result<Json<Vec<Invoice>>, AppError> {
    Ok(Json(app_state.invoice_service.list(&ctx).await?))
}

// GET /api/invoices/{id}
#[utoipa::path(
    get,
    path = "/api/invoices/{id}",
    tag = "Invoices",
    params(("id" = Uuid, Path, description = "ID da fatura")),
    responses(
        (status = 200, description = "Fatura com itens e valor do sinal", body = InvoiceDetail),
        (status = 404, description = "Fatura não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_invoice(
    State(app_state): State<AppState>,
    CurrentWorkspace(ctx): CurrentWorkspace,
    Path(id): Path<Uuid>,
) -> Result<Json<InvoiceDetail>, AppError> {
    Ok(Json(app_state.invoice_service.get(&ctx, id).await?))
}

// POST /api/invoices/{id}/status
#[utoipa::path(
    post,
    path = "/api/invoices/{id}/status",
    tag = "Invoices",
    params(("id" = Uuid, Path, description = "ID da fatura")),
    request_body = UpdateStatusPayload,
    responses(
        (status = 200, description = "Status alterado", body = Invoice),
        (status = 400, description = "Transição inválida"),
        (status = 404, description = "Fatura não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_status(
    State(app_state): State<AppState>,
    CurrentWorkspace(ctx): CurrentWorkspace,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusPayload>,
) -> Result<Json<Invoice>, AppError> {
    Ok(Json(app_state.invoice_service.transition(&ctx, id, payload.status).await?))
}

// POST /api/invoices/{id}/send
#[utoipa::path(
    post,
    path = "/api/invoices/{id}/send",
    tag = "Invoices",
    params(("id" = Uuid, Path, description = "ID da fatura")),
    responses(
        (status = 200, description = "Resultado por canal (e-mail e SMS)", body = SendOutcome),
        (status = 404, description = "Fatura não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn send_invoice(
    State(app_state): State<AppState>,
    CurrentWorkspace(ctx): CurrentWorkspace,
    Path(id): Path<Uuid>,
) -> Result<Json<SendOutcome>, AppError> {
    Ok(Json(app_state.invoice_service.send(&ctx, id).await?))
}

// POST /api/invoices/{id}/payment-link
#[utoipa::path(
    post,
    path = "/api/invoices/{id}/payment-link",
    tag = "Invoices",
    params(("id" = Uuid, Path, description = "ID da fatura")),
    responses(
        (status = 200, description = "Fatura com o link de pagamento", body = Invoice),
        (status = 502, description = "Provedor de pagamento indisponível ou não configurado")
    ),
    security(("api_jwt" = []))
)]
pub async fn issue_payment_link(
    State(app_state): State<AppState>,
    CurrentWorkspace(ctx): CurrentWorkspace,
    Path(id): Path<Uuid>,
) -> Result<Json<Invoice>, AppError> {
    Ok(Json(app_state.invoice_service.issue_payment_link(&ctx, id).await?))
}

// GET /api/invoices/{id}/payments
#[utoipa::path(
    get,
    path = "/api/invoices/{id}/payments",
    tag = "Invoices",
    params(("id" = Uuid, Path, description = "ID da fatura")),
    responses(
        (status = 200, description = "Pagamentos recebidos", body = Vec<Payment>),
        (status = 404, description = "Fatura não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_payments(
    State(app_state): State<AppState>,
    CurrentWorkspace(ctx): CurrentWorkspace,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Payment>>, AppError> {
    Ok(Json(app_state.invoice_service.payments(&ctx, id).await?))
}

// GET /api/invoices/{id}/pdf
#[utoipa::path(
    get,
    path = "/api/invoices/{id}/pdf",
    tag = "Invoices",
    params(("id" = Uuid, Path, description = "ID da fatura")),
    responses(
        (status = 200, description = "PDF da fatura", body = Vec<u8>, content_type = "application/pdf"),
        (status = 404, description = "Fatura não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn invoice_pdf(
    State(app_state): State<AppState>,
    CurrentWorkspace(ctx): CurrentWorkspace,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let pdf_bytes = app_state.document_service.generate_invoice_pdf(&ctx, id).await?;

    // Configura os Headers para o navegador baixar ou mostrar o PDF
    let disposition = format!("attachment; filename=\"fatura_{}.pdf\"", id);
    let headers = [
        (header::CONTENT_TYPE, "application/pdf".to_string()),
        (header::CONTENT_DISPOSITION, disposition),
    ];

    Ok((headers, pdf_bytes).into_response())
}
