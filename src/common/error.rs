// src/common/error.rs

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::models::invoice::InvoiceStatus;

// Nosso tipo de erro, com `thiserror` para melhor ergonomia.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Item de fatura inválido: {0}")]
    InvalidLineItem(String),

    #[error("Configuração de sinal inválida: {0}")]
    InvalidDeposit(String),

    #[error("Transição de status inválida: {from:?} -> {to:?}")]
    InvalidTransition { from: InvoiceStatus, to: InvoiceStatus },

    #[error("Sessão ausente")]
    Unauthenticated,

    #[error("Acesso negado")]
    Unauthorized,

    // Todo usuário precisa de pelo menos uma membership: isto é integridade de dados.
    #[error("Nenhum workspace resolvido para o usuário {0}")]
    NoWorkspace(uuid::Uuid),

    #[error("{0} não encontrado")]
    NotFound(&'static str),

    #[error("Assinatura necessária")]
    SubscriptionRequired,

    #[error("Nenhuma assinatura ativa")]
    NoActiveSubscription,

    #[error("Limite de {limit} faturas de convidado atingido")]
    GuestLimitReached { limit: u32 },

    #[error("Falha no provedor externo: {0}")]
    ProviderError(String),

    #[error("Limite de requisições excedido")]
    RateLimited { retry_after: u64, reset_at: i64 },

    #[error("E-mail já existe")]
    EmailAlreadyExists,

    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("Token inválido")]
    InvalidToken,

    #[error("Token de redefinição inválido ou expirado")]
    InvalidResetToken,

    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    // `anyhow::Error` é ótimo para capturar o contexto do erro.
    #[error("Erro interno do servidor: {0}")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl AppError {
    pub fn internal(message: impl std::fmt::Display) -> Self {
        AppError::InternalServerError(anyhow::anyhow!("{}", message))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_)
            | AppError::InvalidLineItem(_)
            | AppError::InvalidDeposit(_)
            | AppError::InvalidTransition { .. }
            | AppError::NoActiveSubscription
            | AppError::EmailAlreadyExists
            | AppError::InvalidResetToken => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated | AppError::InvalidCredentials | AppError::InvalidToken => {
                StatusCode::UNAUTHORIZED
            }
            AppError::Unauthorized => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::SubscriptionRequired | AppError::GuestLimitReached { .. } => {
                StatusCode::PAYMENT_REQUIRED
            }
            AppError::ProviderError(_) => StatusCode::BAD_GATEWAY,
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = match &self {
            // Retorna todos os detalhes da validação, campo a campo.
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                json!({
                    "error": "Um ou mais campos são inválidos.",
                    "details": details,
                })
            }
            AppError::InvalidLineItem(msg) => json!({
                "error": "Item de fatura inválido.",
                "details": { "lineItems": [msg] },
            }),
            AppError::InvalidDeposit(msg) => json!({
                "error": "Configuração de sinal inválida.",
                "details": { "deposit": [msg] },
            }),
            AppError::InvalidTransition { from, to } => json!({
                "error": format!("Não é possível mudar o status de {} para {}.", from, to),
            }),
            AppError::EmailAlreadyExists => json!({
                "error": "Este e-mail já está em uso.",
                "details": { "email": ["Este e-mail já está em uso."] },
            }),
            AppError::RateLimited { retry_after, reset_at } => {
                let body = Json(json!({
                    "error": "Too Many Requests",
                    "message": format!("Muitas tentativas. Tente novamente em {} segundos.", retry_after),
                    "retryAfter": retry_after,
                }));
                let mut response = (status, body).into_response();
                let headers = response.headers_mut();
                if let Ok(value) = HeaderValue::from_str(&retry_after.to_string()) {
                    headers.insert(header::RETRY_AFTER, value);
                }
                headers.insert("x-ratelimit-remaining", HeaderValue::from_static("0"));
                if let Ok(value) = HeaderValue::from_str(&reset_at.to_string()) {
                    headers.insert("x-ratelimit-reset", value);
                }
                return response;
            }
            AppError::Unauthenticated | AppError::InvalidToken => {
                json!({ "error": "Token de autenticação inválido ou ausente." })
            }
            AppError::InvalidCredentials => json!({ "error": "E-mail ou senha inválidos." }),
            AppError::Unauthorized => json!({ "error": "Você não tem permissão para esta ação." }),
            // Mesma resposta para "não existe" e "existe em outro workspace".
            AppError::NotFound(what) => json!({ "error": format!("{} não encontrado.", what) }),
            AppError::SubscriptionRequired => json!({
                "error": "Seu período de teste terminou. Assine um plano para continuar criando faturas.",
            }),
            AppError::GuestLimitReached { limit } => json!({
                "error": format!("Você já criou {} faturas sem conta. Cadastre-se para continuar.", limit),
            }),
            AppError::NoActiveSubscription => json!({ "error": "Nenhuma assinatura ativa encontrada." }),
            AppError::InvalidResetToken => json!({ "error": "Link de redefinição inválido ou expirado." }),
            AppError::ProviderError(detail) => {
                tracing::error!(detail = %detail, "Falha no provedor externo");
                json!({ "error": "Não foi possível concluir a operação. Tente novamente." })
            }
            AppError::NoWorkspace(user_id) => {
                tracing::error!(user_id = %user_id, "🔥 Usuário sem workspace: integridade de dados violada");
                json!({ "error": "Ocorreu um erro inesperado." })
            }
            // Todos os outros erros (DatabaseError, InternalServerError...) viram 500.
            e => {
                tracing::error!("Erro Interno do Servidor: {}", e);
                json!({ "error": "Ocorreu um erro inesperado." })
            }
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limited_response_carries_retry_headers() {
        let response = AppError::RateLimited { retry_after: 42, reset_at: 1_700_000_000 }.into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "42");
        assert_eq!(response.headers()["x-ratelimit-remaining"], "0");
        assert_eq!(response.headers()["x-ratelimit-reset"], "1700000000");
    }

    #[test]
    fn maps_domain_errors_to_status_codes() {
        assert_eq!(AppError::NotFound("Fatura").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::InvalidDeposit("x".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::Unauthorized.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::ProviderError("down".into()).status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            AppError::NoWorkspace(uuid::Uuid::nil()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
