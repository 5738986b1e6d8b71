// src/db/customer_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::customer::{Customer, CustomerPayload},
};

// Toda leitura/escrita leva o workspace_id: não existe acesso entre workspaces.
#[async_trait]
pub trait CustomerStore: Send + Sync {
    async fn create(&self, workspace_id: Uuid, payload: &CustomerPayload) -> Result<Customer, AppError>;

    async fn list(&self, workspace_id: Uuid) -> Result<Vec<Customer>, AppError>;

    async fn find(&self, workspace_id: Uuid, id: Uuid) -> Result<Option<Customer>, AppError>;

    async fn update(
        &self,
        workspace_id: Uuid,
        id: Uuid,
        payload: &CustomerPayload,
    ) -> Result<Option<Customer>, AppError>;

    /// Grava o ID do cliente no provedor, se ainda não houver um.
    async fn set_provider_customer_id(
        &self,
        workspace_id: Uuid,
        id: Uuid,
        provider_customer_id: &str,
    ) -> Result<(), AppError>;
}

#[derive(Clone)]
pub struct CustomerRepository {
    pool: PgPool,
}

impl CustomerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CustomerStore for CustomerRepository {
    async fn create(&self, workspace_id: Uuid, payload: &CustomerPayload) -> Result<Customer, AppError> {
        let customer = sqlx::query_as::<_, Customer>(
            r#"
            INSERT INTO customers (
                workspace_id, business_name, contact_name, email, phone,
                address_line1, address_line2, city, state, postal_code, country,
                customer_type, tax_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING *
            "#,
        )
        .bind(workspace_id)
        .bind(&payload.business_name)
        .bind(&payload.contact_name)
        .bind(&payload.email)
        .bind(&payload.phone)
        .bind(&payload.address_line1)
        .bind(&payload.address_line2)
        .bind(&payload.city)
        .bind(&payload.state)
        .bind(&payload.postal_code)
        .bind(&payload.country)
        .bind(payload.customer_type)
        .bind(&payload.tax_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(customer)
    }

    async fn list(&self, workspace_id: Uuid) -> Result<Vec<Customer>, AppError> {
        let customers = sqlx::query_as::<_, Customer>(
            "SELECT * FROM customers WHERE workspace_id = $1 ORDER BY business_name ASC",
        )
        .bind(workspace_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(customers)
    }

    async fn find(&self, workspace_id: Uuid, id: Uuid) -> Result<Option<Customer>, AppError> {
        let customer = sqlx::query_as::<_, Customer>(
            "SELECT * FROM customers WHERE id = $1 AND workspace_id = $2",
        )
        .bind(id)
        .bind(workspace_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(customer)
    }

    async fn update(
        &self,
        workspace_id: Uuid,
        id: Uuid,
        payload: &CustomerPayload,
    ) -> Result<Option<Customer>, AppError> {
        let customer = sqlx::query_as::<_, Customer>(
            r#"
            UPDATE customers SET
                business_name = $3, contact_name = $4, email = $5, phone = $6,
                address_line1 = $7, address_line2 = $8, city = $9, state = $10,
                postal_code = $11, country = $12, customer_type = $13, tax_id = $14,
                updated_at = NOW()
            WHERE id = $1 AND workspace_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(workspace_id)
        .bind(&payload.business_name)
        .bind(&payload.contact_name)
        .bind(&payload.email)
        .bind(&payload.phone)
        .bind(&payload.address_line1)
        .bind(&payload.address_line2)
        .bind(&payload.city)
        .bind(&payload.state)
        .bind(&payload.postal_code)
        .bind(&payload.country)
        .bind(payload.customer_type)
        .bind(&payload.tax_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(customer)
    }

    async fn set_provider_customer_id(
        &self,
        workspace_id: Uuid,
        id: Uuid,
        provider_customer_id: &str,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE customers
            SET provider_customer_id = $3, updated_at = NOW()
            WHERE id = $1 AND workspace_id = $2 AND provider_customer_id IS NULL
            "#,
        )
        .bind(id)
        .bind(workspace_id)
        .bind(provider_customer_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
