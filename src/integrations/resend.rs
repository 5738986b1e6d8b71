// src/integrations/resend.rs

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::{provider_error, EmailMessage, MailDomain, MailReceipt, Mailer};
use crate::common::error::AppError;

const RESEND_API: &str = "https://api.resend.com";

#[derive(Clone)]
pub struct ResendMailer {
    http: reqwest::Client,
    api_key: String,
}

impl ResendMailer {
    pub fn new(http: reqwest::Client, api_key: &str) -> Self {
        Self {
            http,
            api_key: api_key.to_string(),
        }
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, AppError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(provider_error("Resend", response).await)
        }
    }

    fn unavailable(e: reqwest::Error) -> AppError {
        AppError::ProviderError(format!("Resend indisponível: {}", e))
    }

    fn invalid(e: reqwest::Error) -> AppError {
        AppError::ProviderError(format!("Resposta inválida do Resend: {}", e))
    }
}

#[derive(Deserialize)]
struct SendResponse {
    id: Option<String>,
}

#[derive(Deserialize)]
struct DomainList {
    data: Vec<MailDomain>,
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, message: &EmailMessage) -> Result<MailReceipt, AppError> {
        let mut body = json!({
            "from": message.from,
            "to": [message.to],
            "subject": message.subject,
            "html": message.html,
        });
        if let Some(reply_to) = &message.reply_to {
            body["reply_to"] = json!(reply_to);
        }

        let response = self
            .http
            .post(format!("{}/emails", RESEND_API))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(Self::unavailable)?;

        let sent: SendResponse = Self::check(response).await?.json().await.map_err(Self::invalid)?;
        Ok(MailReceipt { id: sent.id })
    }

    async fn list_domains(&self) -> Result<Vec<MailDomain>, AppError> {
        let response = self
            .http
            .get(format!("{}/domains", RESEND_API))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(Self::unavailable)?;

        let list: DomainList = Self::check(response).await?.json().await.map_err(Self::invalid)?;
        Ok(list.data)
    }

    async fn get_domain(&self, id: &str) -> Result<MailDomain, AppError> {
        let response = self
            .http
            .get(format!("{}/domains/{}", RESEND_API, id))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(Self::unavailable)?;

        Self::check(response).await?.json().await.map_err(Self::invalid)
    }

    async fn verify_domain(&self, id: &str) -> Result<MailDomain, AppError> {
        let response = self
            .http
            .post(format!("{}/domains/{}/verify", RESEND_API, id))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(Self::unavailable)?;
        Self::check(response).await?;

        // O verify só confirma o pedido; o status atualizado vem do GET.
        self.get_domain(id).await
    }
}
