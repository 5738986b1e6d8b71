// src/db/invoice_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::invoice::{
        format_invoice_number, Invoice, InvoiceDetail, InvoiceEvent, InvoiceLine, InvoiceStatus,
        NewInvoice,
    },
};

#[async_trait]
pub trait InvoiceStore: Send + Sync {
    /// Persiste fatura + linhas (tudo ou nada) com o próximo número do workspace.
    async fn create(&self, invoice: NewInvoice) -> Result<InvoiceDetail, AppError>;

    async fn find(&self, workspace_id: Uuid, id: Uuid) -> Result<Option<InvoiceDetail>, AppError>;

    async fn list(&self, workspace_id: Uuid) -> Result<Vec<Invoice>, AppError>;

    /// Troca o status somente se o atual ainda for `from` (compare-and-swap).
    async fn update_status(
        &self,
        workspace_id: Uuid,
        id: Uuid,
        from: InvoiceStatus,
        to: InvoiceStatus,
    ) -> Result<Option<Invoice>, AppError>;

    /// Grava o link de pagamento apenas se ainda não existir um.
    /// `None` quando outra requisição gravou primeiro.
    async fn set_payment_link(
        &self,
        workspace_id: Uuid,
        id: Uuid,
        url: &str,
        link_id: &str,
    ) -> Result<Option<Invoice>, AppError>;

    /// Registra evento de entrega/abertura. `false` se a fatura não existe.
    async fn record_event(&self, event: InvoiceEvent) -> Result<bool, AppError>;
}

#[derive(Clone)]
pub struct InvoiceRepository {
    pool: PgPool,
}

impl InvoiceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InvoiceStore for InvoiceRepository {
    async fn create(&self, new_invoice: NewInvoice) -> Result<InvoiceDetail, AppError> {
        // --- INÍCIO DA TRANSAÇÃO ---
        let mut tx = self.pool.begin().await?;

        // 1. Próxima sequência do workspace (upsert trava a linha do contador)
        let sequence: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO invoice_counters (workspace_id, last_sequence)
            VALUES ($1, 1)
            ON CONFLICT (workspace_id)
            DO UPDATE SET last_sequence = invoice_counters.last_sequence + 1
            RETURNING last_sequence
            "#,
        )
        .bind(new_invoice.workspace_id)
        .fetch_one(&mut *tx)
        .await?;

        // 2. Cabeçalho da fatura
        let deposit = new_invoice.deposit;
        let invoice = sqlx::query_as::<_, Invoice>(
            r#"
            INSERT INTO invoices (
                workspace_id, customer_id, sequence, number,
                issue_date, due_date, currency, status, notes,
                requires_deposit, deposit_type, deposit_value, deposit_due_date,
                total, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, 'DRAFT', $8, $9, $10, $11, $12, $13, $14)
            RETURNING *
            "#,
        )
        .bind(new_invoice.workspace_id)
        .bind(new_invoice.customer_id)
        .bind(sequence)
        .bind(format_invoice_number(sequence))
        .bind(new_invoice.issue_date)
        .bind(new_invoice.due_date)
        .bind(&new_invoice.currency)
        .bind(&new_invoice.notes)
        .bind(deposit.is_some())
        .bind(deposit.map(|d| d.kind))
        .bind(deposit.map(|d| d.value))
        .bind(deposit.map(|d| d.due_date))
        .bind(new_invoice.total)
        .bind(new_invoice.created_by)
        .fetch_one(&mut *tx)
        .await?;

        // 3. Linhas, na ordem recebida
        let mut lines = Vec::with_capacity(new_invoice.lines.len());
        for (position, line) in new_invoice.lines.iter().enumerate() {
            let saved = sqlx::query_as::<_, InvoiceLine>(
                r#"
                INSERT INTO invoice_lines (invoice_id, position, description, quantity, unit_price, line_total)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING *
                "#,
            )
            .bind(invoice.id)
            .bind(position as i32)
            .bind(&line.description)
            .bind(line.quantity)
            .bind(line.unit_price)
            .bind(line.line_total)
            .fetch_one(&mut *tx)
            .await?;
            lines.push(saved);
        }

        tx.commit().await?;
        // --- FIM DA TRANSAÇÃO ---

        Ok(InvoiceDetail::new(invoice, lines))
    }

    async fn find(&self, workspace_id: Uuid, id: Uuid) -> Result<Option<InvoiceDetail>, AppError> {
        let invoice = sqlx::query_as::<_, Invoice>(
            "SELECT * FROM invoices WHERE id = $1 AND workspace_id = $2",
        )
        .bind(id)
        .bind(workspace_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(invoice) = invoice else {
            return Ok(None);
        };

        let lines = sqlx::query_as::<_, InvoiceLine>(
            "SELECT * FROM invoice_lines WHERE invoice_id = $1 ORDER BY position ASC",
        )
        .bind(invoice.id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(InvoiceDetail::new(invoice, lines)))
    }

    async fn list(&self, workspace_id: Uuid) -> Result<Vec<Invoice>, AppError> {
        let invoices = sqlx::query_as::<_, Invoice>(
            "SELECT * FROM invoices WHERE workspace_id = $1 ORDER BY sequence DESC",
        )
        .bind(workspace_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(invoices)
    }

    async fn update_status(
        &self,
        workspace_id: Uuid,
        id: Uuid,
        from: InvoiceStatus,
        to: InvoiceStatus,
    ) -> Result<Option<Invoice>, AppError> {
        let invoice = sqlx::query_as::<_, Invoice>(
            r#"
            UPDATE invoices
            SET status = $4, updated_at = NOW()
            WHERE id = $1 AND workspace_id = $2 AND status = $3
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(workspace_id)
        .bind(from)
        .bind(to)
        .fetch_optional(&self.pool)
        .await?;
        Ok(invoice)
    }

    async fn set_payment_link(
        &self,
        workspace_id: Uuid,
        id: Uuid,
        url: &str,
        link_id: &str,
    ) -> Result<Option<Invoice>, AppError> {
        let invoice = sqlx::query_as::<_, Invoice>(
            r#"
            UPDATE invoices
            SET payment_link_url = $3, payment_link_id = $4, updated_at = NOW()
            WHERE id = $1 AND workspace_id = $2 AND payment_link_url IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(workspace_id)
        .bind(url)
        .bind(link_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(invoice)
    }

    async fn record_event(&self, event: InvoiceEvent) -> Result<bool, AppError> {
        // INSERT ... SELECT: id desconhecido simplesmente não insere nada
        let result = sqlx::query(
            r#"
            INSERT INTO invoice_events (invoice_id, kind, detail, ip, user_agent, created_at)
            SELECT id, $2, $3, $4, $5, $6 FROM invoices WHERE id = $1
            "#,
        )
        .bind(event.invoice_id)
        .bind(event.kind.as_str())
        .bind(&event.detail)
        .bind(&event.ip)
        .bind(&event.user_agent)
        .bind(event.at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
