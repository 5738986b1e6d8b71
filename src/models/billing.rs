// src/models/billing.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::models::auth::SubscriptionStatus;

/// Resposta de `GET /api/billing/status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BillingStatus {
    pub status: SubscriptionStatus,
    #[schema(example = "free_trial")]
    pub plan: String,
    pub is_active: bool,
    pub free_invoices_used: u32,
    pub free_invoices_limit: u32,
    pub free_invoices_remaining: u32,
    pub trial_started_at: Option<DateTime<Utc>>,
    pub subscription_expiry: Option<DateTime<Utc>>,
}

/// Resposta de `POST /api/billing/usage`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum UsageReport {
    #[serde(rename_all = "camelCase")]
    Trial {
        success: bool,
        free_invoices_used: u32,
        free_invoices_remaining: u32,
        trial_expired: bool,
    },
    Unlimited { success: bool, unlimited: bool },
}

impl UsageReport {
    pub fn unlimited() -> Self {
        UsageReport::Unlimited { success: true, unlimited: true }
    }

    pub fn trial_expired(&self) -> bool {
        matches!(self, UsageReport::Trial { trial_expired: true, .. })
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionActionResponse {
    pub success: bool,
    pub status: SubscriptionStatus,
}
