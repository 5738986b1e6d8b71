// src/db/payment_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{common::error::AppError, models::payment::Payment};

#[async_trait]
pub trait PaymentStore: Send + Sync {
    async fn list_for_invoice(&self, workspace_id: Uuid, invoice_id: Uuid) -> Result<Vec<Payment>, AppError>;

    async fn list_for_workspace(&self, workspace_id: Uuid) -> Result<Vec<Payment>, AppError>;
}

#[derive(Clone)]
pub struct PaymentRepository {
    pool: PgPool,
}

impl PaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PaymentStore for PaymentRepository {
    async fn list_for_invoice(&self, workspace_id: Uuid, invoice_id: Uuid) -> Result<Vec<Payment>, AppError> {
        // O JOIN garante que a fatura pertence ao workspace
        let payments = sqlx::query_as::<_, Payment>(
            r#"
            SELECT p.*
            FROM payments p
            JOIN invoices i ON i.id = p.invoice_id
            WHERE p.invoice_id = $1 AND i.workspace_id = $2
            ORDER BY p.created_at DESC
            "#,
        )
        .bind(invoice_id)
        .bind(workspace_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(payments)
    }

    async fn list_for_workspace(&self, workspace_id: Uuid) -> Result<Vec<Payment>, AppError> {
        let payments = sqlx::query_as::<_, Payment>(
            r#"
            SELECT p.*
            FROM payments p
            JOIN invoices i ON i.id = p.invoice_id
            WHERE i.workspace_id = $1
            ORDER BY p.created_at DESC
            "#,
        )
        .bind(workspace_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(payments)
    }
}
