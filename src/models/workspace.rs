// src/models/workspace.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

// ---
// 1. Workspace (O "Tenant")
// ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    pub id: Uuid,
    #[schema(example = "Souza Design")]
    pub name: String,
    #[schema(example = "souza-design")]
    pub slug: String,

    // Credenciais do provedor de pagamento (nunca saem na API)
    #[serde(skip_serializing)]
    #[schema(ignore)]
    pub square_access_token: Option<String>,
    pub square_location_id: Option<String>,
    pub square_environment: Option<String>,

    // Perfil da empresa (vai no PDF e no e-mail)
    pub company_name: Option<String>,
    pub company_email: Option<String>,
    pub company_phone: Option<String>,
    pub company_address: Option<String>,
    pub tax_id: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Workspace {
    /// Credenciais completas do Square, se o workspace configurou.
    pub fn billing_credentials(&self) -> Option<BillingCredentials> {
        match (&self.square_access_token, &self.square_location_id) {
            (Some(token), Some(location)) if !token.is_empty() && !location.is_empty() => {
                Some(BillingCredentials {
                    access_token: token.clone(),
                    location_id: location.clone(),
                    environment: self
                        .square_environment
                        .clone()
                        .unwrap_or_else(|| "sandbox".to_string()),
                })
            }
            _ => None,
        }
    }

    /// Nome exibido para o cliente final.
    pub fn display_name(&self) -> &str {
        self.company_name.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BillingCredentials {
    pub access_token: String,
    pub location_id: String,
    pub environment: String,
}

// ---
// 2. Membership (A "Ponte" Usuário-Workspace)
// ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "membership_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MembershipRole {
    Owner,
    Admin,
    Member,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Membership {
    pub id: Uuid,
    pub user_id: Uuid,
    pub workspace_id: Uuid,
    pub role: MembershipRole,
    pub created_at: DateTime<Utc>,
}

/// Workspace listado para o usuário (com o papel dele).
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceSummary {
    pub id: Uuid,
    pub name: String,
    pub role: MembershipRole,
    pub joined_at: DateTime<Utc>,
}

/// O contexto resolvido para a requisição: (usuário, workspace atual).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceContext {
    pub user_id: Uuid,
    pub workspace_id: Uuid,
    pub workspace_name: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateWorkspaceSettingsPayload {
    #[validate(length(min = 1, message = "O nome não pode ser vazio."))]
    pub name: Option<String>,
    pub company_name: Option<String>,
    #[validate(email(message = "O e-mail fornecido é inválido."))]
    pub company_email: Option<String>,
    pub company_phone: Option<String>,
    pub company_address: Option<String>,
    pub tax_id: Option<String>,

    pub square_access_token: Option<String>,
    pub square_location_id: Option<String>,
    #[schema(example = "production")]
    pub square_environment: Option<String>,
}

impl UpdateWorkspaceSettingsPayload {
    pub fn touches_billing_credentials(&self) -> bool {
        self.square_access_token.is_some()
            || self.square_location_id.is_some()
            || self.square_environment.is_some()
    }
}

/// Gera o slug base a partir do nome ("Souza Design" -> "souza-design").
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_dash = true;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    let trimmed = slug.trim_end_matches('-');
    if trimmed.is_empty() {
        "workspace".to_string()
    } else {
        trimmed.to_string()
    }
}
