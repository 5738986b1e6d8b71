// src/services/invoice_service.rs

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::{Decimal, RoundingStrategy};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    db::{CustomerStore, InvoiceStore, PaymentStore, WorkspaceStore},
    models::{
        billing::UsageReport,
        invoice::{
            CreateInvoicePayload, Deposit, DepositInput, DepositType, Invoice, InvoiceDetail,
            InvoiceEvent, InvoiceEventKind, InvoiceStatus, LineItemInput, NewInvoice, NewInvoiceLine,
        },
        payment::Payment,
        workspace::WorkspaceContext,
    },
    services::{
        entitlement::EntitlementService,
        notification::{NotificationDispatcher, SendOutcome},
        payment_link::PaymentLinkProvisioner,
        tasks::BackgroundTasks,
    },
};

// Mesma escala das colunas NUMERIC(14, 2).
const MONEY_SCALE: u32 = 2;

/// Valida as linhas e calcula o total exato (Decimal, sem ponto flutuante).
/// Cada linha é arredondada a centavos antes da soma, como fica gravada.
pub fn build_lines(items: &[LineItemInput]) -> Result<(Vec<NewInvoiceLine>, Decimal), AppError> {
    if items.is_empty() {
        return Err(AppError::InvalidLineItem("A fatura precisa de pelo menos um item.".into()));
    }

    let mut lines = Vec::with_capacity(items.len());
    let mut total = Decimal::ZERO;

    for (index, item) in items.iter().enumerate() {
        let position = index + 1;
        let description = item.description.trim();
        if description.is_empty() {
            return Err(AppError::InvalidLineItem(format!("Item {}: a descrição é obrigatória.", position)));
        }
        if item.quantity < Decimal::ONE {
            return Err(AppError::InvalidLineItem(format!(
                "Item {}: a quantidade deve ser no mínimo 1.",
                position
            )));
        }
        if item.unit_price < Decimal::ZERO {
            return Err(AppError::InvalidLineItem(format!(
                "Item {}: o preço unitário não pode ser negativo.",
                position
            )));
        }

        if item.quantity.normalize().scale() > MONEY_SCALE || item.unit_price.normalize().scale() > MONEY_SCALE {
            return Err(AppError::InvalidLineItem(format!(
                "Item {}: quantidade e preço aceitam no máximo duas casas decimais.",
                position
            )));
        }

        let line_total =
            (item.quantity * item.unit_price).round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero);
        total += line_total;
        lines.push(NewInvoiceLine {
            description: description.to_string(),
            quantity: item.quantity,
            unit_price: item.unit_price,
            line_total,
        });
    }

    Ok((lines, total))
}

/// Regras do sinal. `None` quando a fatura não exige sinal.
pub fn validate_deposit(input: &DepositInput) -> Result<Option<Deposit>, AppError> {
    if !input.requires_deposit {
        return Ok(None);
    }

    let kind = input
        .deposit_type
        .ok_or_else(|| AppError::InvalidDeposit("Informe o tipo do sinal.".into()))?;
    let value = input
        .deposit_value
        .ok_or_else(|| AppError::InvalidDeposit("Informe o valor do sinal.".into()))?;

    match kind {
        DepositType::Percentage if value <= Decimal::ZERO || value > Decimal::ONE_HUNDRED => {
            return Err(AppError::InvalidDeposit(
                "O percentual do sinal deve ser maior que 0 e no máximo 100.".into(),
            ));
        }
        DepositType::Fixed if value <= Decimal::ZERO => {
            return Err(AppError::InvalidDeposit("O valor do sinal deve ser maior que zero.".into()));
        }
        _ => {}
    }

    let due_date = input
        .deposit_due_date
        .ok_or_else(|| AppError::InvalidDeposit("Informe a data de vencimento do sinal.".into()))?;

    Ok(Some(Deposit { kind, value, due_date }))
}

#[derive(Clone)]
pub struct InvoiceService {
    invoices: Arc<dyn InvoiceStore>,
    customers: Arc<dyn CustomerStore>,
    payments: Arc<dyn PaymentStore>,
    workspaces: Arc<dyn WorkspaceStore>,
    entitlements: EntitlementService,
    payment_links: PaymentLinkProvisioner,
    notifier: NotificationDispatcher,
    tasks: BackgroundTasks,
}

impl InvoiceService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        invoices: Arc<dyn InvoiceStore>,
        customers: Arc<dyn CustomerStore>,
        payments: Arc<dyn PaymentStore>,
        workspaces: Arc<dyn WorkspaceStore>,
        entitlements: EntitlementService,
        payment_links: PaymentLinkProvisioner,
        notifier: NotificationDispatcher,
        tasks: BackgroundTasks,
    ) -> Self {
        Self { invoices, customers, payments, workspaces, entitlements, payment_links, notifier, tasks }
    }

    pub async fn create(
        &self,
        ctx: &WorkspaceContext,
        payload: CreateInvoicePayload,
    ) -> Result<InvoiceDetail, AppError> {
        payload.validate()?;
        let (lines, total) = build_lines(&payload.line_items)?;
        let deposit = validate_deposit(&payload.deposit)?;

        self.entitlements.ensure_can_create(ctx.user_id).await?;

        // Cliente de outro workspace é tratado como inexistente.
        self.customers
            .find(ctx.workspace_id, payload.customer_id)
            .await?
            .ok_or(AppError::NotFound("Cliente"))?;

        let mut detail = self
            .invoices
            .create(NewInvoice {
                workspace_id: ctx.workspace_id,
                customer_id: payload.customer_id,
                created_by: ctx.user_id,
                issue_date: payload.issue_date,
                due_date: payload.due_date,
                currency: payload.currency.to_uppercase(),
                notes: payload.notes,
                lines,
                deposit,
                total,
            })
            .await?;

        tracing::info!(
            invoice_id = %detail.invoice.id,
            workspace_id = %ctx.workspace_id,
            number = %detail.invoice.number,
            "🧾 Fatura criada"
        );

        // 1. Uso do trial: em segundo plano, não pode derrubar a criação.
        let entitlements = self.entitlements.clone();
        let user_id = ctx.user_id;
        self.tasks.spawn("trial_usage", async move {
            let report = entitlements.check_and_consume_trial_usage(user_id).await?;
            if let UsageReport::Trial { free_invoices_used, trial_expired, .. } = report {
                tracing::info!(user_id = %user_id, free_invoices_used, trial_expired, "Uso do trial registrado");
            }
            Ok(())
        });

        // 2. Link de pagamento: se falhar a fatura fica sem link (dá para tentar de novo).
        if payload.enable_payment_link {
            match self.payment_links.provision(ctx.workspace_id, detail.invoice.id).await {
                Ok(invoice) => detail = InvoiceDetail::new(invoice, detail.lines),
                Err(e) => tracing::warn!(
                    invoice_id = %detail.invoice.id,
                    workspace_id = %ctx.workspace_id,
                    error = %e,
                    "⚠️ Fatura criada sem link de pagamento"
                ),
            }
        }

        Ok(detail)
    }

    pub async fn get(&self, ctx: &WorkspaceContext, id: Uuid) -> Result<InvoiceDetail, AppError> {
        self.invoices
            .find(ctx.workspace_id, id)
            .await?
            .ok_or(AppError::NotFound("Fatura"))
    }

    pub async fn list(&self, ctx: &WorkspaceContext) -> Result<Vec<Invoice>, AppError> {
        self.invoices.list(ctx.workspace_id).await
    }

    pub async fn payments(&self, ctx: &WorkspaceContext, id: Uuid) -> Result<Vec<Payment>, AppError> {
        self.get(ctx, id).await?;
        self.payments.list_for_invoice(ctx.workspace_id, id).await
    }

    /// Aplica uma transição da máquina de estados.
    pub async fn transition(
        &self,
        ctx: &WorkspaceContext,
        id: Uuid,
        to: InvoiceStatus,
    ) -> Result<Invoice, AppError> {
        let current = self.get(ctx, id).await?.invoice;
        let from = current.status;

        if !from.can_transition_to(to) {
            return Err(AppError::InvalidTransition { from, to });
        }

        // Compare-and-swap: se alguém mudou o status no meio, a transição é recusada.
        let updated = self
            .invoices
            .update_status(ctx.workspace_id, id, from, to)
            .await?
            .ok_or(AppError::InvalidTransition { from, to })?;

        tracing::info!(invoice_id = %id, from = %from, to = %to, "Status da fatura alterado");
        Ok(updated)
    }

    /// Reemite o link de pagamento (depois de uma falha na criação, por exemplo).
    pub async fn issue_payment_link(&self, ctx: &WorkspaceContext, id: Uuid) -> Result<Invoice, AppError> {
        let invoice = self.get(ctx, id).await?.invoice;
        if invoice.status.is_terminal() {
            return Err(AppError::InvalidTransition { from: invoice.status, to: invoice.status });
        }
        self.payment_links.provision(ctx.workspace_id, id).await
    }

    /// Envia por e-mail/SMS. Rascunho enviado com sucesso passa para SENT.
    pub async fn send(&self, ctx: &WorkspaceContext, id: Uuid) -> Result<SendOutcome, AppError> {
        let detail = self.get(ctx, id).await?;
        if detail.invoice.status == InvoiceStatus::Void {
            return Err(AppError::InvalidTransition { from: InvoiceStatus::Void, to: InvoiceStatus::Sent });
        }

        let customer = self
            .customers
            .find(ctx.workspace_id, detail.invoice.customer_id)
            .await?
            .ok_or(AppError::NotFound("Cliente"))?;
        let workspace = self
            .workspaces
            .find_by_id(ctx.workspace_id)
            .await?
            .ok_or(AppError::NotFound("Workspace"))?;

        let outcome = self.notifier.send_invoice(&workspace, &customer, &detail).await;

        if outcome.any_succeeded() && detail.invoice.status == InvoiceStatus::Draft {
            self.invoices
                .update_status(ctx.workspace_id, id, InvoiceStatus::Draft, InvoiceStatus::Sent)
                .await?;
        }
        if !outcome.any_succeeded() {
            tracing::warn!(invoice_id = %id, "⚠️ Nenhum canal conseguiu entregar a fatura");
        }

        Ok(outcome)
    }

    /// Abertura do e-mail (pixel). Nunca falha: id inválido ou desconhecido só é ignorado.
    pub fn record_open(&self, raw_invoice_id: &str, ip: Option<String>, user_agent: Option<String>) {
        let Ok(invoice_id) = Uuid::parse_str(raw_invoice_id) else {
            tracing::debug!(raw_invoice_id, "Pixel de abertura com id inválido");
            return;
        };

        let invoices = self.invoices.clone();
        self.tasks.spawn("record_open", async move {
            let event = InvoiceEvent {
                invoice_id,
                kind: InvoiceEventKind::Opened,
                detail: None,
                ip,
                user_agent,
                at: Utc::now(),
            };
            if !invoices.record_event(event).await? {
                tracing::debug!(invoice_id = %invoice_id, "Pixel de abertura para fatura inexistente");
            }
            Ok(())
        });
    }
}
