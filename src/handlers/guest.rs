// src/handlers/guest.rs

use axum::{extract::State, Json};
use serde_json::json;
use validator::Validate;

use crate::{
    common::error::AppError, config::AppState, models::guest::SendGuestInvoicePayload,
    services::guest::price_line_items,
};

// POST /api/guest/send-invoice
// A fatura vem inteira do navegador; nada é gravado no servidor.
#[utoipa::path(
    post,
    path = "/api/guest/send-invoice",
    tag = "Guest",
    request_body = SendGuestInvoicePayload,
    responses(
        (status = 200, description = "E-mail enviado ao cliente"),
        (status = 400, description = "Dados inválidos"),
        (status = 429, description = "Muitas tentativas"),
        (status = 502, description = "Falha no provedor de e-mail")
    )
)]
pub async fn send_guest_invoice(
    State(app_state): State<AppState>,
    Json(mut payload): Json<SendGuestInvoicePayload>,
) -> Result<Json<serde_json::Value>, AppError> {
    payload.validate()?;

    // O total do e-mail sai dos itens, não do valor informado pelo navegador.
    if !payload.invoice.line_items.is_empty() {
        payload.invoice.amount = price_line_items(&mut payload.invoice.line_items);
    }
    app_state.notifier.send_guest_invoice(&payload).await?;

    tracing::info!(invoice_number = %payload.invoice.invoice_number, "📧 Fatura de convidado enviada");
    Ok(Json(json!({ "success": true })))
}
