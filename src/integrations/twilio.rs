// src/integrations/twilio.rs

use async_trait::async_trait;
use serde::Deserialize;

use super::{provider_error, SmsSender};
use crate::common::error::AppError;

#[derive(Clone)]
pub struct TwilioSms {
    http: reqwest::Client,
    account_sid: String,
    auth_token: String,
    from_number: String,
}

impl TwilioSms {
    pub fn new(http: reqwest::Client, account_sid: &str, auth_token: &str, from_number: &str) -> Self {
        Self {
            http,
            account_sid: account_sid.to_string(),
            auth_token: auth_token.to_string(),
            from_number: from_number.to_string(),
        }
    }
}

#[derive(Deserialize)]
struct MessageResponse {
    sid: String,
}

#[async_trait]
impl SmsSender for TwilioSms {
    async fn send(&self, to: &str, body: &str) -> Result<String, AppError> {
        let url = format!(
            "https://api.twilio.com/2010-04-01/Accounts/{}/Messages.json",
            self.account_sid
        );

        let response = self
            .http
            .post(url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[("To", to), ("From", self.from_number.as_str()), ("Body", body)])
            .send()
            .await
            .map_err(|e| AppError::ProviderError(format!("Twilio indisponível: {}", e)))?;

        if !response.status().is_success() {
            return Err(provider_error("Twilio", response).await);
        }

        let message: MessageResponse = response
            .json()
            .await
            .map_err(|e| AppError::ProviderError(format!("Resposta inválida do Twilio: {}", e)))?;
        Ok(message.sid)
    }
}
