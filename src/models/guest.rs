// src/models/guest.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

// Faturas de convidado vivem só no armazenamento local do navegador.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum GuestInvoiceStatus {
    Draft,
    Sent,
    Paid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GuestLineItem {
    pub description: String,
    pub quantity: Decimal,
    pub rate: Decimal,
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GuestInvoice {
    pub id: Uuid,
    #[schema(example = "GUEST-001")]
    pub invoice_number: String,
    #[validate(length(min = 1, message = "O nome do cliente é obrigatório."))]
    pub customer_name: String,
    #[validate(email(message = "O e-mail fornecido é inválido."))]
    pub customer_email: String,
    pub description: Option<String>,
    pub amount: Decimal,
    #[schema(value_type = String, format = Date)]
    pub due_date: NaiveDate,
    pub status: GuestInvoiceStatus,
    #[serde(default)]
    pub line_items: Vec<GuestLineItem>,
    pub created_at: DateTime<Utc>,
}

/// Dados informados pelo convidado para criar uma fatura.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewGuestInvoice {
    pub customer_name: String,
    pub customer_email: String,
    pub description: Option<String>,
    pub due_date: NaiveDate,
    pub line_items: Vec<GuestLineItem>,
}

/// Atualização parcial (ex.: draft -> sent depois do envio do e-mail).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestInvoicePatch {
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub status: Option<GuestInvoiceStatus>,
    pub line_items: Option<Vec<GuestLineItem>>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SendGuestInvoicePayload {
    #[validate(nested)]
    pub invoice: GuestInvoice,
    #[validate(length(min = 1, message = "Informe o seu nome."))]
    pub sender_name: String,
    pub message: Option<String>,
}
