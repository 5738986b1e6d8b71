// src/models/invoice.rs

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

// --- Enums ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "invoice_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceStatus {
    Draft,
    Sent,
    Paid,
    Overdue,
    Void,
}

impl InvoiceStatus {
    /// PAID e VOID não saem mais do lugar.
    pub fn is_terminal(self) -> bool {
        matches!(self, InvoiceStatus::Paid | InvoiceStatus::Void)
    }

    /// As arestas permitidas da máquina de estados.
    pub fn can_transition_to(self, next: InvoiceStatus) -> bool {
        use InvoiceStatus::*;
        match (self, next) {
            (Draft, Sent) | (Sent, Paid) | (Sent, Overdue) => true,
            (from, Void) => !from.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            InvoiceStatus::Draft => "DRAFT",
            InvoiceStatus::Sent => "SENT",
            InvoiceStatus::Paid => "PAID",
            InvoiceStatus::Overdue => "OVERDUE",
            InvoiceStatus::Void => "VOID",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "deposit_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DepositType {
    Percentage,
    Fixed,
}

// --- Structs do banco ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: Uuid,
    #[schema(ignore)]
    pub workspace_id: Uuid,
    pub customer_id: Uuid,

    #[schema(example = 12)]
    pub sequence: i32,
    #[schema(example = "INV-0012")]
    pub number: String,

    #[schema(value_type = String, format = Date, example = "2025-03-01")]
    pub issue_date: NaiveDate,
    #[schema(value_type = String, format = Date, example = "2025-03-31")]
    pub due_date: NaiveDate,
    #[schema(example = "USD")]
    pub currency: String,
    pub status: InvoiceStatus,
    pub notes: Option<String>,

    pub payment_link_url: Option<String>,
    #[serde(skip_serializing)]
    #[schema(ignore)]
    pub payment_link_id: Option<String>,

    // Sinal (depósito antecipado)
    pub requires_deposit: bool,
    pub deposit_type: Option<DepositType>,
    #[schema(example = "50.00")]
    pub deposit_value: Option<Decimal>,
    #[schema(value_type = Option<String>, format = Date)]
    pub deposit_due_date: Option<NaiveDate>,

    #[schema(example = "25.50")]
    pub total: Decimal,
    #[schema(ignore)]
    pub created_by: Option<Uuid>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    /// Valor do sinal (apenas informativo: o link de pagamento cobra o total).
    pub fn deposit_amount(&self) -> Option<Decimal> {
        if !self.requires_deposit {
            return None;
        }
        let value = self.deposit_value?;
        let kind = self.deposit_type?;
        Some(Deposit { kind, value, due_date: self.deposit_due_date? }.amount_for(self.total))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceLine {
    pub id: Uuid,
    #[schema(ignore)]
    pub invoice_id: Uuid,
    pub position: i32,
    #[schema(example = "Consultoria (horas)")]
    pub description: String,
    #[schema(example = "2")]
    pub quantity: Decimal,
    #[schema(example = "10.00")]
    pub unit_price: Decimal,
    #[schema(example = "20.00")]
    pub line_total: Decimal,
}

/// Fatura completa com as linhas e o sinal calculado.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceDetail {
    #[serde(flatten)]
    pub invoice: Invoice,
    pub lines: Vec<InvoiceLine>,
    pub deposit_amount: Option<Decimal>,
}

impl InvoiceDetail {
    pub fn new(invoice: Invoice, lines: Vec<InvoiceLine>) -> Self {
        let deposit_amount = invoice.deposit_amount();
        Self { invoice, lines, deposit_amount }
    }
}

// --- Entrada (payloads) ---

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LineItemInput {
    #[schema(example = "Consultoria (horas)")]
    pub description: String,
    #[schema(example = "2")]
    pub quantity: Decimal,
    #[schema(example = "10.00")]
    pub unit_price: Decimal,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DepositInput {
    #[serde(default)]
    pub requires_deposit: bool,
    pub deposit_type: Option<DepositType>,
    pub deposit_value: Option<Decimal>,
    #[schema(value_type = Option<String>, format = Date)]
    pub deposit_due_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvoicePayload {
    pub customer_id: Uuid,
    #[schema(value_type = String, format = Date, example = "2025-03-01")]
    pub issue_date: NaiveDate,
    #[schema(value_type = String, format = Date, example = "2025-03-31")]
    pub due_date: NaiveDate,

    #[validate(length(equal = 3, message = "A moeda deve ter 3 letras (ISO 4217)."))]
    #[schema(example = "USD")]
    pub currency: String,

    pub notes: Option<String>,

    #[validate(length(min = 1, message = "A fatura precisa de pelo menos um item."))]
    pub line_items: Vec<LineItemInput>,

    #[serde(flatten)]
    pub deposit: DepositInput,

    #[serde(default)]
    pub enable_payment_link: bool,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdateStatusPayload {
    pub status: InvoiceStatus,
}

// --- Registros já validados (prontos para persistir) ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deposit {
    pub kind: DepositType,
    pub value: Decimal,
    pub due_date: NaiveDate,
}

impl Deposit {
    pub fn amount_for(&self, total: Decimal) -> Decimal {
        match self.kind {
            DepositType::Percentage => (total * self.value / Decimal::ONE_HUNDRED).round_dp(2),
            DepositType::Fixed => self.value.min(total),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewInvoiceLine {
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

#[derive(Debug, Clone)]
pub struct NewInvoice {
    pub workspace_id: Uuid,
    pub customer_id: Uuid,
    pub created_by: Uuid,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub currency: String,
    pub notes: Option<String>,
    pub lines: Vec<NewInvoiceLine>,
    pub deposit: Option<Deposit>,
    pub total: Decimal,
}

/// Número legível da fatura a partir da sequência do workspace.
pub fn format_invoice_number(sequence: i32) -> String {
    format!("INV-{:04}", sequence)
}

// --- Eventos (entrega / abertura) ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvoiceEventKind {
    EmailSent,
    EmailFailed,
    SmsSent,
    SmsFailed,
    Opened,
}

impl InvoiceEventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            InvoiceEventKind::EmailSent => "email_sent",
            InvoiceEventKind::EmailFailed => "email_failed",
            InvoiceEventKind::SmsSent => "sms_sent",
            InvoiceEventKind::SmsFailed => "sms_failed",
            InvoiceEventKind::Opened => "opened",
        }
    }
}

#[derive(Debug, Clone)]
pub struct InvoiceEvent {
    pub invoice_id: Uuid,
    pub kind: InvoiceEventKind,
    pub detail: Option<String>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn state_machine_allows_only_documented_edges() {
        use InvoiceStatus::*;
        assert!(Draft.can_transition_to(Sent));
        assert!(Sent.can_transition_to(Paid));
        assert!(Sent.can_transition_to(Overdue));
        assert!(Draft.can_transition_to(Void));
        assert!(Overdue.can_transition_to(Void));

        assert!(!Draft.can_transition_to(Paid));
        assert!(!Paid.can_transition_to(Sent));
        assert!(!Paid.can_transition_to(Void));
        assert!(!Void.can_transition_to(Void));
        assert!(!Overdue.can_transition_to(Paid));
        assert!(!Sent.can_transition_to(Sent));
    }

    #[test]
    fn deposit_amounts() {
        let due = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();
        let pct = Deposit { kind: DepositType::Percentage, value: dec("50"), due_date: due };
        assert_eq!(pct.amount_for(dec("25.50")), dec("12.75"));

        let fixed = Deposit { kind: DepositType::Fixed, value: dec("100"), due_date: due };
        assert_eq!(fixed.amount_for(dec("40.00")), dec("40.00"));
        assert_eq!(fixed.amount_for(dec("400.00")), dec("100"));
    }

    #[test]
    fn invoice_numbers_are_zero_padded() {
        assert_eq!(format_invoice_number(7), "INV-0007");
        assert_eq!(format_invoice_number(12345), "INV-12345");
    }
}
