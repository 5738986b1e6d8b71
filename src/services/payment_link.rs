// src/services/payment_link.rs

use std::{collections::BTreeMap, sync::Arc};

use moka::sync::Cache;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{CustomerStore, InvoiceStore, WorkspaceStore},
    integrations::{PaymentLinkRequest, PaymentProvider, PaymentProviderFactory},
    models::{
        customer::Customer,
        invoice::Invoice,
        workspace::{BillingCredentials, Workspace},
    },
    services::tasks::BackgroundTasks,
};

/// Cache limitado de clientes do provedor, um por workspace.
///
/// Entradas são reconstruídas se as credenciais mudaram e podem ser invalidadas
/// explicitamente. A capacidade é garantida pelo `moka`.
pub struct ProviderCache {
    entries: Cache<Uuid, (BillingCredentials, Arc<dyn PaymentProvider>)>,
}

impl ProviderCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Cache::builder().max_capacity(capacity.max(1) as u64).build(),
        }
    }

    pub fn get_or_build(
        &self,
        workspace_id: Uuid,
        credentials: &BillingCredentials,
        factory: &dyn PaymentProviderFactory,
    ) -> Arc<dyn PaymentProvider> {
        if let Some((cached, client)) = self.entries.get(&workspace_id) {
            if cached == *credentials {
                return client;
            }
        }

        let client = factory.build(credentials);
        self.entries.insert(workspace_id, (credentials.clone(), client.clone()));
        client
    }

    pub fn invalidate(&self, workspace_id: Uuid) {
        self.entries.invalidate(&workspace_id);
        tracing::debug!(workspace_id = %workspace_id, "Cliente do provedor removido do cache");
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.run_pending_tasks();
        self.entries.entry_count() as usize
    }
}

/// Emite o link de pagamento de uma fatura no Square do workspace.
#[derive(Clone)]
pub struct PaymentLinkProvisioner {
    invoices: Arc<dyn InvoiceStore>,
    customers: Arc<dyn CustomerStore>,
    workspaces: Arc<dyn WorkspaceStore>,
    factory: Arc<dyn PaymentProviderFactory>,
    cache: Arc<ProviderCache>,
    tasks: BackgroundTasks,
}

impl PaymentLinkProvisioner {
    pub fn new(
        invoices: Arc<dyn InvoiceStore>,
        customers: Arc<dyn CustomerStore>,
        workspaces: Arc<dyn WorkspaceStore>,
        factory: Arc<dyn PaymentProviderFactory>,
        cache_capacity: usize,
        tasks: BackgroundTasks,
    ) -> Self {
        Self {
            invoices,
            customers,
            workspaces,
            factory,
            cache: Arc::new(ProviderCache::new(cache_capacity)),
            tasks,
        }
    }

    /// Chamado quando o workspace troca as credenciais do Square.
    pub fn invalidate(&self, workspace_id: Uuid) {
        self.cache.invalidate(workspace_id);
    }

    #[cfg(test)]
    pub fn cached_clients(&self) -> usize {
        self.cache.len()
    }

    /// Garante que a fatura tenha link. Idempotente: se já existe, devolve como está.
    pub async fn provision(&self, workspace_id: Uuid, invoice_id: Uuid) -> Result<Invoice, AppError> {
        let invoice = self
            .invoices
            .find(workspace_id, invoice_id)
            .await?
            .ok_or(AppError::NotFound("Fatura"))?
            .invoice;

        if invoice.payment_link_url.is_some() {
            return Ok(invoice);
        }

        let workspace = self
            .workspaces
            .find_by_id(workspace_id)
            .await?
            .ok_or(AppError::NotFound("Workspace"))?;
        let credentials = workspace.billing_credentials().ok_or_else(|| {
            AppError::ProviderError(format!("Workspace {} sem credenciais do Square", workspace_id))
        })?;
        let customer = self
            .customers
            .find(workspace_id, invoice.customer_id)
            .await?
            .ok_or(AppError::NotFound("Cliente"))?;

        let client = self.cache.get_or_build(workspace_id, &credentials, self.factory.as_ref());
        let request = link_request(&workspace, &invoice, &credentials);
        let link = client.create_payment_link(&request).await?;

        let saved = match self
            .invoices
            .set_payment_link(workspace_id, invoice_id, &link.url, &link.id)
            .await?
        {
            Some(saved) => saved,
            // Outra requisição gravou primeiro: vale o link que já está no banco.
            None => self
                .invoices
                .find(workspace_id, invoice_id)
                .await?
                .ok_or(AppError::NotFound("Fatura"))?
                .invoice,
        };

        tracing::info!(
            invoice_id = %invoice_id,
            workspace_id = %workspace_id,
            "🔗 Link de pagamento emitido"
        );

        self.sync_customer(client, customer);
        Ok(saved)
    }

    // Cadastro do cliente no Square em segundo plano; falha só vai para o log.
    fn sync_customer(&self, client: Arc<dyn PaymentProvider>, customer: Customer) {
        if customer.provider_customer_id.is_some() {
            return;
        }

        let customers = self.customers.clone();
        self.tasks.spawn("provider_customer_sync", async move {
            let created = client
                .create_customer(&customer.business_name, customer.email.as_deref())
                .await?;
            customers
                .set_provider_customer_id(customer.workspace_id, customer.id, &created.id)
                .await?;
            tracing::info!(customer_id = %customer.id, "Cliente sincronizado com o Square");
            Ok(())
        });
    }
}

fn link_request(workspace: &Workspace, invoice: &Invoice, credentials: &BillingCredentials) -> PaymentLinkRequest {
    let mut metadata = BTreeMap::new();
    metadata.insert("invoice_id".to_string(), invoice.id.to_string());
    metadata.insert("invoice_number".to_string(), invoice.number.clone());
    metadata.insert("workspace_id".to_string(), workspace.id.to_string());

    PaymentLinkRequest {
        // O sinal é só informativo: o link cobra o total.
        amount: invoice.total,
        currency: invoice.currency.clone(),
        location_id: credentials.location_id.clone(),
        name: format!("{} - {}", workspace.display_name(), invoice.number),
        // Mesma chave em toda tentativa da mesma fatura.
        idempotency_key: format!("invoice-{}", invoice.id),
        metadata,
    }
}
