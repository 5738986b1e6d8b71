// src/services/entitlement.rs

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::UserStore,
    integrations::PaymentProvider,
    models::{
        auth::{SubscriptionStatus, User},
        billing::{BillingStatus, SubscriptionActionResponse, UsageReport},
    },
};

/// Regra de acesso: assinatura ativa e não vencida, ou trial com faturas sobrando.
pub fn is_active(user: &User, now: DateTime<Utc>) -> bool {
    match user.subscription_status {
        // Vencimento é checado na leitura (não existe varredura em segundo plano).
        SubscriptionStatus::Active => user.subscription_expiry.is_none_or(|expiry| expiry > now),
        SubscriptionStatus::Trial => !user.trial_counter().is_exhausted(),
        SubscriptionStatus::TrialExpired | SubscriptionStatus::Canceled => false,
    }
}

fn plan_name(status: SubscriptionStatus) -> &'static str {
    match status {
        SubscriptionStatus::Trial => "free_trial",
        SubscriptionStatus::Active => "pro",
        SubscriptionStatus::TrialExpired => "expired",
        SubscriptionStatus::Canceled => "canceled",
    }
}

pub fn billing_status(user: &User, now: DateTime<Utc>) -> BillingStatus {
    let counter = user.trial_counter();
    BillingStatus {
        status: user.subscription_status,
        plan: plan_name(user.subscription_status).to_string(),
        is_active: is_active(user, now),
        free_invoices_used: counter.used,
        free_invoices_limit: counter.limit,
        free_invoices_remaining: counter.remaining(),
        trial_started_at: user.trial_started_at,
        subscription_expiry: user.subscription_expiry,
    }
}

#[derive(Clone)]
pub struct EntitlementService {
    users: Arc<dyn UserStore>,
    // Conta Square da plataforma (assinaturas). `None` desativa cancel/reactivate.
    platform: Option<Arc<dyn PaymentProvider>>,
}

impl EntitlementService {
    pub fn new(users: Arc<dyn UserStore>, platform: Option<Arc<dyn PaymentProvider>>) -> Self {
        Self { users, platform }
    }

    async fn user(&self, user_id: Uuid) -> Result<User, AppError> {
        self.users.find_by_id(user_id).await?.ok_or(AppError::NotFound("Usuário"))
    }

    /// Conta uma fatura criada contra o trial.
    ///
    /// O incremento e a eventual troca para `trial_expired` são um único write na
    /// store. Quem não está em trial (inclusive quem acabou de expirar) recebe
    /// `unlimited`, então `trialExpired: true` aparece só na chamada que cruza o teto.
    pub async fn check_and_consume_trial_usage(&self, user_id: Uuid) -> Result<UsageReport, AppError> {
        match self.users.increment_trial_usage(user_id).await? {
            Some(usage) => {
                let consumption = usage.previous.consume().map_err(|reached| {
                    tracing::warn!(user_id = %user_id, limit = reached.limit, "Trial já estava esgotado");
                    AppError::SubscriptionRequired
                })?;
                if consumption.crossed_limit {
                    tracing::info!(user_id = %user_id, used = consumption.counter.used, "Trial esgotado");
                }
                Ok(UsageReport::Trial {
                    success: true,
                    free_invoices_used: consumption.counter.used,
                    free_invoices_remaining: consumption.counter.remaining(),
                    trial_expired: consumption.crossed_limit,
                })
            }
            None => {
                // Distingue "não está em trial" de "usuário não existe".
                self.user(user_id).await?;
                Ok(UsageReport::unlimited())
            }
        }
    }

    pub async fn get_billing_status(&self, user_id: Uuid) -> Result<BillingStatus, AppError> {
        let user = self.user(user_id).await?;
        Ok(billing_status(&user, Utc::now()))
    }

    /// Barreira da criação de faturas.
    pub async fn ensure_can_create(&self, user_id: Uuid) -> Result<(), AppError> {
        let user = self.user(user_id).await?;
        if !is_active(&user, Utc::now()) {
            tracing::info!(user_id = %user_id, status = ?user.subscription_status, "Criação de fatura bloqueada");
            return Err(AppError::SubscriptionRequired);
        }
        Ok(())
    }

    pub async fn cancel(&self, user_id: Uuid) -> Result<SubscriptionActionResponse, AppError> {
        self.change_subscription(user_id, SubscriptionStatus::Canceled).await
    }

    pub async fn reactivate(&self, user_id: Uuid) -> Result<SubscriptionActionResponse, AppError> {
        self.change_subscription(user_id, SubscriptionStatus::Active).await
    }

    // Provedor primeiro; o status local só muda se ele confirmar.
    async fn change_subscription(
        &self,
        user_id: Uuid,
        target: SubscriptionStatus,
    ) -> Result<SubscriptionActionResponse, AppError> {
        let user = self.user(user_id).await?;
        let subscription_id = user.subscription_id.as_deref().ok_or(AppError::NoActiveSubscription)?;

        let provider = self
            .platform
            .as_ref()
            .ok_or_else(|| AppError::ProviderError("Provedor de assinaturas não configurado".into()))?;

        match target {
            SubscriptionStatus::Canceled => provider.cancel_subscription(subscription_id).await?,
            _ => provider.resume_subscription(subscription_id).await?,
        }

        self.users.set_subscription_status(user_id, target).await?;
        tracing::info!(user_id = %user_id, status = ?target, "Assinatura atualizada");

        Ok(SubscriptionActionResponse { success: true, status: target })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeProvider, MemoryDb};
    use chrono::Duration;

    fn service(db: &Arc<MemoryDb>, platform: Arc<FakeProvider>) -> EntitlementService {
        EntitlementService::new(db.clone(), Some(platform))
    }

    #[tokio::test]
    async fn crossing_the_trial_limit_expires_exactly_once() {
        let db = MemoryDb::new();
        let user = db.seed_user("trial@test.com", None);
        db.update_user(user.id, |u| u.free_invoices_used = 2);
        let engine = service(&db, FakeProvider::new());

        let report = engine.check_and_consume_trial_usage(user.id).await.unwrap();
        assert_eq!(
            report,
            UsageReport::Trial {
                success: true,
                free_invoices_used: 3,
                free_invoices_remaining: 0,
                trial_expired: true,
            }
        );
        let stored = db.user(user.id).unwrap();
        assert_eq!(stored.free_invoices_used, 3);
        assert_eq!(stored.subscription_status, SubscriptionStatus::TrialExpired);

        // Depois do cruzamento não há mais contagem nem novo "trialExpired".
        let again = engine.check_and_consume_trial_usage(user.id).await.unwrap();
        assert!(!again.trial_expired());
        assert_eq!(db.user(user.id).unwrap().free_invoices_used, 3);

        assert!(matches!(engine.ensure_can_create(user.id).await, Err(AppError::SubscriptionRequired)));
    }

    #[tokio::test]
    async fn exhausted_trial_is_refused_and_expired() {
        let db = MemoryDb::new();
        let user = db.seed_user("limite@test.com", None);
        db.update_user(user.id, |u| u.free_invoices_used = 3);
        let engine = service(&db, FakeProvider::new());

        let result = engine.check_and_consume_trial_usage(user.id).await;
        assert!(matches!(result, Err(AppError::SubscriptionRequired)));
        assert_eq!(db.user(user.id).unwrap().subscription_status, SubscriptionStatus::TrialExpired);
    }

    #[tokio::test]
    async fn active_users_are_unlimited() {
        let db = MemoryDb::new();
        let user = db.seed_user("pro@test.com", None);
        db.update_user(user.id, |u| u.subscription_status = SubscriptionStatus::Active);
        let engine = service(&db, FakeProvider::new());

        for _ in 0..2 {
            let report = engine.check_and_consume_trial_usage(user.id).await.unwrap();
            assert_eq!(report, UsageReport::unlimited());
        }
        assert_eq!(db.user(user.id).unwrap().free_invoices_used, 0);
    }

    #[tokio::test]
    async fn concurrent_usage_never_passes_the_limit() {
        let db = MemoryDb::new();
        let user = db.seed_user("corrida@test.com", None);
        let engine = service(&db, FakeProvider::new());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let engine = engine.clone();
                tokio::spawn(async move { engine.check_and_consume_trial_usage(user.id).await })
            })
            .collect();

        let mut expirations = 0;
        for handle in handles {
            if handle.await.unwrap().unwrap().trial_expired() {
                expirations += 1;
            }
        }
        assert_eq!(expirations, 1);
        assert_eq!(db.user(user.id).unwrap().free_invoices_used, 3);
    }

    #[tokio::test]
    async fn billing_status_is_stable_between_reads() {
        let db = MemoryDb::new();
        let user = db.seed_user("leitura@test.com", None);
        db.update_user(user.id, |u| u.free_invoices_used = 1);
        let engine = service(&db, FakeProvider::new());

        let first = engine.get_billing_status(user.id).await.unwrap();
        let second = engine.get_billing_status(user.id).await.unwrap();
        assert_eq!(first.free_invoices_used, second.free_invoices_used);
        assert_eq!(first.free_invoices_remaining, second.free_invoices_remaining);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
        assert!(first.is_active);
        assert_eq!(first.plan, "free_trial");
    }

    #[test]
    fn active_subscription_with_past_expiry_is_inactive() {
        let db = MemoryDb::new();
        let user = db.seed_user("vencido@test.com", None);
        let now = Utc::now();
        db.update_user(user.id, |u| {
            u.subscription_status = SubscriptionStatus::Active;
            u.subscription_expiry = Some(now - Duration::days(1));
        });
        let user = db.user(user.id).unwrap();
        assert!(!is_active(&user, now));
        assert!(is_active(&user, now - Duration::days(2)));
    }

    #[tokio::test]
    async fn cancel_requires_a_subscription() {
        let db = MemoryDb::new();
        let user = db.seed_user("sem@test.com", None);
        let engine = service(&db, FakeProvider::new());

        assert!(matches!(engine.cancel(user.id).await, Err(AppError::NoActiveSubscription)));
    }

    #[tokio::test]
    async fn provider_failure_leaves_local_status_untouched() {
        let db = MemoryDb::new();
        let user = db.seed_user("falha@test.com", None);
        db.update_user(user.id, |u| {
            u.subscription_status = SubscriptionStatus::Active;
            u.subscription_id = Some("sub_1".into());
        });
        let engine = service(&db, FakeProvider::failing());

        assert!(matches!(engine.cancel(user.id).await, Err(AppError::ProviderError(_))));
        assert_eq!(db.user(user.id).unwrap().subscription_status, SubscriptionStatus::Active);
    }

    #[tokio::test]
    async fn cancel_then_reactivate_mirrors_the_provider() {
        let db = MemoryDb::new();
        let user = db.seed_user("ciclo@test.com", None);
        db.update_user(user.id, |u| {
            u.subscription_status = SubscriptionStatus::Active;
            u.subscription_id = Some("sub_9".into());
        });
        let platform = FakeProvider::new();
        let engine = service(&db, platform.clone());

        let canceled = engine.cancel(user.id).await.unwrap();
        assert_eq!(canceled.status, SubscriptionStatus::Canceled);
        assert_eq!(db.user(user.id).unwrap().subscription_status, SubscriptionStatus::Canceled);

        engine.reactivate(user.id).await.unwrap();
        assert_eq!(db.user(user.id).unwrap().subscription_status, SubscriptionStatus::Active);
        assert_eq!(*platform.canceled.lock(), vec!["sub_9".to_string()]);
        assert_eq!(*platform.resumed.lock(), vec!["sub_9".to_string()]);
    }
}
