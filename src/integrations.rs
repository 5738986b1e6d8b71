// src/integrations.rs
//
// Contratos dos provedores externos (pagamento, e-mail, SMS). O núcleo só
// conhece estas traits; as implementações HTTP ficam nos submódulos.

use std::{collections::BTreeMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{common::error::AppError, models::workspace::BillingCredentials};

pub mod resend;
pub mod square;
pub mod twilio;

// =============================================================================
//  PAGAMENTOS
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct PaymentLinkRequest {
    pub amount: Decimal,
    pub currency: String,
    pub location_id: String,
    pub name: String,
    pub idempotency_key: String,
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentLink {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderCustomer {
    pub id: String,
}

#[async_trait]
pub trait PaymentProvider: Send + Sync {
    async fn create_payment_link(&self, request: &PaymentLinkRequest) -> Result<PaymentLink, AppError>;

    async fn create_customer(&self, name: &str, email: Option<&str>) -> Result<ProviderCustomer, AppError>;

    async fn cancel_subscription(&self, subscription_id: &str) -> Result<(), AppError>;

    async fn resume_subscription(&self, subscription_id: &str) -> Result<(), AppError>;
}

/// Monta um cliente do provedor a partir das credenciais de um workspace.
pub trait PaymentProviderFactory: Send + Sync {
    fn build(&self, credentials: &BillingCredentials) -> Arc<dyn PaymentProvider>;
}

// =============================================================================
//  E-MAIL
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html: String,
    pub reply_to: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailReceipt {
    pub id: Option<String>,
}

/// Domínio de envio configurado no provedor de e-mail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MailDomain {
    pub id: String,
    pub name: String,
    pub status: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default, alias = "created_at")]
    pub created_at: Option<String>,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<MailReceipt, AppError>;

    async fn list_domains(&self) -> Result<Vec<MailDomain>, AppError>;

    async fn get_domain(&self, id: &str) -> Result<MailDomain, AppError>;

    async fn verify_domain(&self, id: &str) -> Result<MailDomain, AppError>;
}

// =============================================================================
//  SMS
// =============================================================================

#[async_trait]
pub trait SmsSender: Send + Sync {
    /// Retorna o ID da mensagem no provedor.
    async fn send(&self, to: &str, body: &str) -> Result<String, AppError>;
}

/// Converte uma resposta HTTP de erro em `ProviderError`, guardando o corpo para o log.
pub(crate) async fn provider_error(provider: &str, response: reqwest::Response) -> AppError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    AppError::ProviderError(format!("{} respondeu {}: {}", provider, status, body))
}

/// Cliente HTTP compartilhado pelas integrações.
pub fn http_client() -> Result<reqwest::Client, AppError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(15))
        .build()
        .map_err(|e| AppError::internal(format!("Falha ao criar cliente HTTP: {}", e)))
}
