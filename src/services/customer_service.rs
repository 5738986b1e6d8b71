// src/services/customer_service.rs

use std::sync::Arc;

use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    db::CustomerStore,
    models::{
        customer::{Customer, CustomerPayload},
        workspace::WorkspaceContext,
    },
};

#[derive(Clone)]
pub struct CustomerService {
    customers: Arc<dyn CustomerStore>,
}

impl CustomerService {
    pub fn new(customers: Arc<dyn CustomerStore>) -> Self {
        Self { customers }
    }

    pub async fn create(&self, ctx: &WorkspaceContext, payload: CustomerPayload) -> Result<Customer, AppError> {
        payload.validate()?;
        let customer = self.customers.create(ctx.workspace_id, &payload).await?;
        tracing::info!(customer_id = %customer.id, workspace_id = %ctx.workspace_id, "Cliente criado");
        Ok(customer)
    }

    pub async fn list(&self, ctx: &WorkspaceContext) -> Result<Vec<Customer>, AppError> {
        self.customers.list(ctx.workspace_id).await
    }

    pub async fn get(&self, ctx: &WorkspaceContext, id: Uuid) -> Result<Customer, AppError> {
        self.customers
            .find(ctx.workspace_id, id)
            .await?
            .ok_or(AppError::NotFound("Cliente"))
    }

    pub async fn update(
        &self,
        ctx: &WorkspaceContext,
        id: Uuid,
        payload: CustomerPayload,
    ) -> Result<Customer, AppError> {
        payload.validate()?;
        self.customers
            .update(ctx.workspace_id, id, &payload)
            .await?
            .ok_or(AppError::NotFound("Cliente"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryDb;

    #[tokio::test]
    async fn customers_are_scoped_to_the_workspace() {
        let db = MemoryDb::new();
        let service = CustomerService::new(db.clone());
        let a = WorkspaceContext { user_id: Uuid::new_v4(), workspace_id: Uuid::new_v4(), workspace_name: "A".into() };
        let b = WorkspaceContext { user_id: Uuid::new_v4(), workspace_id: Uuid::new_v4(), workspace_name: "B".into() };

        let payload = CustomerPayload { business_name: "Padaria".into(), ..Default::default() };
        let created = service.create(&a, payload.clone()).await.unwrap();

        assert_eq!(service.list(&a).await.unwrap().len(), 1);
        assert!(service.list(&b).await.unwrap().is_empty());
        assert!(matches!(service.get(&b, created.id).await, Err(AppError::NotFound(_))));
        assert!(matches!(service.update(&b, created.id, payload).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn rejects_invalid_email() {
        let db = MemoryDb::new();
        let service = CustomerService::new(db.clone());
        let ctx = WorkspaceContext { user_id: Uuid::new_v4(), workspace_id: Uuid::new_v4(), workspace_name: "A".into() };

        let payload = CustomerPayload {
            business_name: "Padaria".into(),
            email: Some("nao-e-email".into()),
            ..Default::default()
        };
        assert!(matches!(service.create(&ctx, payload).await, Err(AppError::ValidationError(_))));
    }
}
