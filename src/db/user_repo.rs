// src/db/user_repo.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{counter::CappedCounter, error::AppError},
    models::{
        auth::{SubscriptionStatus, User},
        workspace::{slugify, Workspace},
    },
};

/// Dados de uma conta nova: usuário + primeiro workspace.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub workspace_name: String,
    pub free_invoices_limit: i32,
}

/// Contador do trial como estava antes do incremento atômico. A regra de
/// consumo em si fica no `CappedCounter::consume`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrialUsage {
    pub previous: CappedCounter,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError>;

    /// Cria usuário, workspace e a membership de dono numa única transação.
    /// Slug repetido ganha sufixo (`-2`, `-3`...) em vez de erro.
    async fn create_account(&self, account: NewAccount) -> Result<(User, Workspace), AppError>;

    async fn update_password(&self, user_id: Uuid, password_hash: &str) -> Result<(), AppError>;

    async fn create_reset_token(
        &self,
        user_id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AppError>;

    /// Consome o token e grava a nova senha atomicamente. Retorna o dono do token.
    async fn reset_password(
        &self,
        token_hash: &str,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Uuid, AppError>;

    /// Persiste o consumo de uma fatura do trial num único write, virando o status
    /// para `trial_expired` ao atingir o limite. `None` se o usuário não está em trial.
    async fn increment_trial_usage(&self, user_id: Uuid) -> Result<Option<TrialUsage>, AppError>;

    async fn set_subscription_status(
        &self,
        user_id: Uuid,
        status: SubscriptionStatus,
    ) -> Result<(), AppError>;
}

// O repositório de usuários, responsável por todas as interações com a tabela 'users'
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for UserRepository {
    // Busca um usuário pelo seu e-mail (sem diferenciar maiúsculas)
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let maybe_user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(maybe_user)
    }

    // Busca um usuário pelo seu ID
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let maybe_user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(maybe_user)
    }

    async fn create_account(&self, account: NewAccount) -> Result<(User, Workspace), AppError> {
        // --- INÍCIO DA TRANSAÇÃO ---
        let mut tx = self.pool.begin().await?;

        // 1. Workspace. ON CONFLICT DO NOTHING não aborta a transação, então
        //    dá para tentar o próximo sufixo na mesma transação.
        let base_slug = slugify(&account.workspace_name);
        let mut attempt = 1;
        let workspace = loop {
            let slug = if attempt == 1 {
                base_slug.clone()
            } else {
                format!("{}-{}", base_slug, attempt)
            };

            let inserted = sqlx::query_as::<_, Workspace>(
                r#"
                INSERT INTO workspaces (name, slug)
                VALUES ($1, $2)
                ON CONFLICT (slug) DO NOTHING
                RETURNING *
                "#,
            )
            .bind(&account.workspace_name)
            .bind(&slug)
            .fetch_optional(&mut *tx)
            .await?;

            match inserted {
                Some(workspace) => break workspace,
                None => attempt += 1,
            }
        };

        // 2. Usuário, já apontando para o workspace padrão
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password_hash, name, default_workspace_id, free_invoices_limit)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(&account.email)
        .bind(&account.password_hash)
        .bind(&account.name)
        .bind(workspace.id)
        .bind(account.free_invoices_limit)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() && db_err.constraint() == Some("users_email_key") {
                    return AppError::EmailAlreadyExists;
                }
            }
            e.into()
        })?; // Se falhar aqui, o tx sofre rollback automático ao sair do escopo (drop)

        // 3. Membership de dono
        sqlx::query("INSERT INTO memberships (user_id, workspace_id, role) VALUES ($1, $2, 'owner')")
            .bind(user.id)
            .bind(workspace.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        // --- FIM DA TRANSAÇÃO ---

        Ok((user, workspace))
    }

    async fn update_password(&self, user_id: Uuid, password_hash: &str) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE users SET password_hash = $1, updated_at = NOW() WHERE id = $2")
            .bind(password_hash)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Usuário"));
        }
        Ok(())
    }

    async fn create_reset_token(
        &self,
        user_id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO password_reset_tokens (user_id, token_hash, expires_at) VALUES ($1, $2, $3)",
        )
        .bind(user_id)
        .bind(token_hash)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn reset_password(
        &self,
        token_hash: &str,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Uuid, AppError> {
        let mut tx = self.pool.begin().await?;

        // Marca o token como usado; só passa se ainda estiver válido.
        let user_id: Option<Uuid> = sqlx::query_scalar(
            r#"
            UPDATE password_reset_tokens
            SET used_at = $2
            WHERE token_hash = $1 AND used_at IS NULL AND expires_at > $2
            RETURNING user_id
            "#,
        )
        .bind(token_hash)
        .bind(now)
        .fetch_optional(&mut *tx)
        .await?;

        let user_id = user_id.ok_or(AppError::InvalidResetToken)?;

        sqlx::query("UPDATE users SET password_hash = $1, updated_at = NOW() WHERE id = $2")
            .bind(password_hash)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        // Invalida os outros tokens pendentes do mesmo usuário
        sqlx::query("UPDATE password_reset_tokens SET used_at = $2 WHERE user_id = $1 AND used_at IS NULL")
            .bind(user_id)
            .bind(now)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(user_id)
    }

    async fn increment_trial_usage(&self, user_id: Uuid) -> Result<Option<TrialUsage>, AppError> {
        // UPDATE ... RETURNING: incremento e troca de status no mesmo write,
        // sem janela de corrida entre leitura e escrita.
        let row: Option<(i32, i32)> = sqlx::query_as(
            r#"
            UPDATE users
            SET free_invoices_used = free_invoices_used + 1,
                subscription_status = CASE
                    WHEN free_invoices_used + 1 >= free_invoices_limit
                        THEN 'trial_expired'::subscription_status
                    ELSE subscription_status
                END,
                updated_at = NOW()
            WHERE id = $1 AND subscription_status = 'trial'
            RETURNING free_invoices_used - 1, free_invoices_limit
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(used, limit)| TrialUsage {
            previous: CappedCounter::from_db(used, limit),
        }))
    }

    async fn set_subscription_status(
        &self,
        user_id: Uuid,
        status: SubscriptionStatus,
    ) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET subscription_status = $1, updated_at = NOW() WHERE id = $2")
            .bind(status)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
