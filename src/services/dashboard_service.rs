// src/services/dashboard_service.rs

use std::sync::Arc;

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{CustomerStore, InvoiceStore, PaymentStore},
    models::{
        customer::Customer,
        dashboard::DashboardSummary,
        invoice::{Invoice, InvoiceStatus},
        payment::{Payment, PaymentStatus},
    },
};

pub fn summarize(invoices: &[Invoice], payments: &[Payment], customers: &[Customer]) -> DashboardSummary {
    let sum_status = |statuses: &[InvoiceStatus]| -> Decimal {
        invoices
            .iter()
            .filter(|i| statuses.contains(&i.status))
            .map(|i| i.total)
            .sum()
    };

    DashboardSummary {
        outstanding_total: sum_status(&[InvoiceStatus::Sent, InvoiceStatus::Overdue]),
        overdue_total: sum_status(&[InvoiceStatus::Overdue]),
        paid_total: payments
            .iter()
            .filter(|p| p.status == PaymentStatus::Succeeded)
            .map(|p| p.amount)
            .sum(),
        invoice_count: invoices.len(),
        draft_count: invoices.iter().filter(|i| i.status == InvoiceStatus::Draft).count(),
        customer_count: customers.len(),
    }
}

#[derive(Clone)]
pub struct DashboardService {
    invoices: Arc<dyn InvoiceStore>,
    payments: Arc<dyn PaymentStore>,
    customers: Arc<dyn CustomerStore>,
}

impl DashboardService {
    pub fn new(
        invoices: Arc<dyn InvoiceStore>,
        payments: Arc<dyn PaymentStore>,
        customers: Arc<dyn CustomerStore>,
    ) -> Self {
        Self { invoices, payments, customers }
    }

    pub async fn get_summary(&self, workspace_id: Uuid) -> Result<DashboardSummary, AppError> {
        // Leituras independentes: em paralelo.
        let (invoices, payments, customers) = tokio::try_join!(
            self.invoices.list(workspace_id),
            self.payments.list_for_workspace(workspace_id),
            self.customers.list(workspace_id),
        )?;

        Ok(summarize(&invoices, &payments, &customers))
    }
}
