// src/services/workspace_service.rs

use std::sync::Arc;

use validator::Validate;

use crate::{
    common::error::AppError,
    db::WorkspaceStore,
    models::workspace::{UpdateWorkspaceSettingsPayload, Workspace, WorkspaceContext},
    services::payment_link::PaymentLinkProvisioner,
};

#[derive(Clone)]
pub struct WorkspaceService {
    workspaces: Arc<dyn WorkspaceStore>,
    payment_links: PaymentLinkProvisioner,
}

impl WorkspaceService {
    pub fn new(workspaces: Arc<dyn WorkspaceStore>, payment_links: PaymentLinkProvisioner) -> Self {
        Self { workspaces, payment_links }
    }

    pub async fn get_settings(&self, ctx: &WorkspaceContext) -> Result<Workspace, AppError> {
        self.workspaces
            .find_by_id(ctx.workspace_id)
            .await?
            .ok_or(AppError::NotFound("Workspace"))
    }

    pub async fn update_settings(
        &self,
        ctx: &WorkspaceContext,
        payload: UpdateWorkspaceSettingsPayload,
    ) -> Result<Workspace, AppError> {
        payload.validate()?;
        let workspace = self.workspaces.update_settings(ctx.workspace_id, &payload).await?;

        // Credenciais novas: o cliente em cache não vale mais.
        if payload.touches_billing_credentials() {
            self.payment_links.invalidate(ctx.workspace_id);
            tracing::info!(workspace_id = %ctx.workspace_id, "Credenciais do Square atualizadas");
        }
        Ok(workspace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::invoice::CreateInvoicePayload,
        testing::TestApp,
    };

    #[tokio::test]
    async fn changing_credentials_drops_the_cached_client() {
        let app = TestApp::new();
        let (user, ws) = app.seed_account("cfg@test.com");
        app.db.seed_billing_credentials(ws.id, "sq-antigo");
        let customer = app.db.seed_customer(ws.id, "Padaria", None, None);
        let ctx = WorkspaceContext { user_id: user.id, workspace_id: ws.id, workspace_name: ws.name.clone() };

        let body: CreateInvoicePayload = serde_json::from_value(serde_json::json!({
            "customerId": customer.id,
            "issueDate": "2025-03-01",
            "dueDate": "2025-03-31",
            "currency": "USD",
            "lineItems": [{ "description": "Bolo", "quantity": 1, "unitPrice": 10 }],
            "enablePaymentLink": true
        }))
        .unwrap();
        let detail = app.state.invoice_service.create(&ctx, body).await.unwrap();
        assert!(detail.invoice.payment_link_url.is_some());

        let service = &app.state.workspace_service;
        service
            .update_settings(&ctx, UpdateWorkspaceSettingsPayload { company_name: Some("Nova".into()), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(app.factory.builds(), 1);
        assert_eq!(service.payment_links.cached_clients(), 1);

        let updated = service
            .update_settings(
                &ctx,
                UpdateWorkspaceSettingsPayload { square_access_token: Some("sq-novo".into()), ..Default::default() },
            )
            .await
            .unwrap();
        assert_eq!(updated.company_name.as_deref(), Some("Nova"));
        assert_eq!(updated.square_access_token.as_deref(), Some("sq-novo"));
        assert_eq!(service.payment_links.cached_clients(), 0);
    }
}
