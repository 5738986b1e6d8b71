// src/models/dashboard.rs

use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    #[schema(example = "1500.00")]
    pub outstanding_total: Decimal, // SENT + OVERDUE
    #[schema(example = "300.00")]
    pub overdue_total: Decimal,
    #[schema(example = "4200.00")]
    pub paid_total: Decimal, // Soma dos pagamentos SUCCEEDED
    pub invoice_count: usize,
    pub draft_count: usize,
    pub customer_count: usize,
}
