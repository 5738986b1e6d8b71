// src/integrations/square.rs

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::{prelude::ToPrimitive, Decimal};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use super::{
    provider_error, PaymentLink, PaymentLinkRequest, PaymentProvider, PaymentProviderFactory,
    ProviderCustomer,
};
use crate::{common::error::AppError, models::workspace::BillingCredentials};

const SQUARE_VERSION: &str = "2024-01-18";
const PRODUCTION_URL: &str = "https://connect.squareup.com";
const SANDBOX_URL: &str = "https://connect.squareupsandbox.com";

#[derive(Clone)]
pub struct SquareClient {
    http: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl SquareClient {
    pub fn new(http: reqwest::Client, access_token: &str, environment: &str) -> Self {
        let base_url = if environment.eq_ignore_ascii_case("production") {
            PRODUCTION_URL
        } else {
            SANDBOX_URL
        };

        Self {
            http,
            base_url: base_url.to_string(),
            access_token: access_token.to_string(),
        }
    }

    async fn post(&self, path: &str, body: serde_json::Value) -> Result<reqwest::Response, AppError> {
        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.access_token)
            .header("Square-Version", SQUARE_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::ProviderError(format!("Square indisponível: {}", e)))?;

        if !response.status().is_success() {
            return Err(provider_error("Square", response).await);
        }
        Ok(response)
    }
}

/// Valor em centavos, como o Square espera.
pub fn to_minor_units(amount: Decimal) -> Result<i64, AppError> {
    (amount * Decimal::ONE_HUNDRED)
        .round()
        .to_i64()
        .ok_or_else(|| AppError::ProviderError(format!("Valor fora do intervalo: {}", amount)))
}

#[derive(Deserialize)]
struct PaymentLinkEnvelope {
    payment_link: SquarePaymentLink,
}

#[derive(Deserialize)]
struct SquarePaymentLink {
    id: String,
    url: String,
}

#[derive(Deserialize)]
struct CustomerEnvelope {
    customer: SquareCustomer,
}

#[derive(Deserialize)]
struct SquareCustomer {
    id: String,
}

#[async_trait]
impl PaymentProvider for SquareClient {
    async fn create_payment_link(&self, request: &PaymentLinkRequest) -> Result<PaymentLink, AppError> {
        // O Square não tem metadata no quick_pay: vai na nota do pagamento.
        let note = request
            .metadata
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(";");

        let body = json!({
            "idempotency_key": request.idempotency_key,
            "quick_pay": {
                "name": request.name,
                "price_money": {
                    "amount": to_minor_units(request.amount)?,
                    "currency": request.currency.to_uppercase(),
                },
                "location_id": request.location_id,
            },
            "payment_note": note,
        });

        let envelope: PaymentLinkEnvelope = self
            .post("/v2/online-checkout/payment-links", body)
            .await?
            .json()
            .await
            .map_err(|e| AppError::ProviderError(format!("Resposta inválida do Square: {}", e)))?;

        Ok(PaymentLink {
            id: envelope.payment_link.id,
            url: envelope.payment_link.url,
        })
    }

    async fn create_customer(&self, name: &str, email: Option<&str>) -> Result<ProviderCustomer, AppError> {
        let body = json!({
            "idempotency_key": Uuid::new_v4().to_string(),
            "company_name": name,
            "email_address": email,
        });

        let envelope: CustomerEnvelope = self
            .post("/v2/customers", body)
            .await?
            .json()
            .await
            .map_err(|e| AppError::ProviderError(format!("Resposta inválida do Square: {}", e)))?;

        Ok(ProviderCustomer { id: envelope.customer.id })
    }

    async fn cancel_subscription(&self, subscription_id: &str) -> Result<(), AppError> {
        self.post(&format!("/v2/subscriptions/{}/cancel", subscription_id), json!({}))
            .await?;
        Ok(())
    }

    async fn resume_subscription(&self, subscription_id: &str) -> Result<(), AppError> {
        self.post(&format!("/v2/subscriptions/{}/resume", subscription_id), json!({}))
            .await?;
        Ok(())
    }
}

/// Fábrica usada pelo provisionador de links (um cliente por workspace).
#[derive(Clone)]
pub struct SquareClientFactory {
    http: reqwest::Client,
}

impl SquareClientFactory {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

impl PaymentProviderFactory for SquareClientFactory {
    fn build(&self, credentials: &BillingCredentials) -> Arc<dyn PaymentProvider> {
        Arc::new(SquareClient::new(
            self.http.clone(),
            &credentials.access_token,
            &credentials.environment,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_to_cents() {
        assert_eq!(to_minor_units("25.50".parse().unwrap()).unwrap(), 2550);
        assert_eq!(to_minor_units("0.005".parse().unwrap()).unwrap(), 0);
        assert_eq!(to_minor_units("19.999".parse().unwrap()).unwrap(), 2000);
    }
}
