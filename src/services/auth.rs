// src/services/auth.rs

use std::sync::Arc;

use bcrypt::{hash, verify};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use sha2::{Digest, Sha256};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    db::{NewAccount, UserStore, WorkspaceStore},
    models::{
        auth::{
            ChangePasswordPayload, Claims, LoginUserPayload, RegisterUserPayload, ResetPasswordPayload,
            Session, User,
        },
        workspace::{Workspace, WorkspaceSummary},
    },
    services::notification::NotificationDispatcher,
};

const TOKEN_TTL_DAYS: i64 = 7;
const RESET_TOKEN_TTL_HOURS: i64 = 1;

/// Só o hash do token de redefinição vai para o banco.
pub fn hash_reset_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

fn generate_reset_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    workspaces: Arc<dyn WorkspaceStore>,
    notifier: NotificationDispatcher,
    jwt_secret: String,
    free_invoice_limit: i32,
    bcrypt_cost: u32,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserStore>,
        workspaces: Arc<dyn WorkspaceStore>,
        notifier: NotificationDispatcher,
        jwt_secret: String,
        free_invoice_limit: i32,
    ) -> Self {
        Self {
            users,
            workspaces,
            notifier,
            jwt_secret,
            free_invoice_limit,
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }

    /// Custo menor do bcrypt (os testes não precisam de hash lento).
    pub fn with_bcrypt_cost(mut self, cost: u32) -> Self {
        self.bcrypt_cost = cost;
        self
    }

    async fn hash_password(&self, password: &str) -> Result<String, AppError> {
        // Hashing é CPU-bound: roda fora do runtime assíncrono.
        let password = password.to_owned();
        let cost = self.bcrypt_cost;
        let hashed = tokio::task::spawn_blocking(move || hash(&password, cost))
            .await
            .map_err(|e| anyhow::anyhow!("Falha na task de hashing: {}", e))??;
        Ok(hashed)
    }

    async fn verify_password(&self, password: &str, password_hash: &str) -> Result<bool, AppError> {
        let password = password.to_owned();
        let password_hash = password_hash.to_owned();
        let valid = tokio::task::spawn_blocking(move || verify(&password, &password_hash))
            .await
            .map_err(|e| anyhow::anyhow!("Falha na task de verificação de senha: {}", e))??;
        Ok(valid)
    }

    pub async fn register_user(&self, payload: RegisterUserPayload) -> Result<String, AppError> {
        payload.validate()?;
        let password_hash = self.hash_password(&payload.password).await?;

        let (user, workspace) = self
            .users
            .create_account(NewAccount {
                email: payload.email.trim().to_lowercase(),
                password_hash,
                name: payload.name.trim().to_string(),
                workspace_name: payload.workspace_name.trim().to_string(),
                free_invoices_limit: self.free_invoice_limit,
            })
            .await?;

        tracing::info!(user_id = %user.id, workspace_id = %workspace.id, "👤 Conta criada");
        self.create_token(&user, Some(&workspace))
    }

    pub async fn login_user(&self, payload: LoginUserPayload) -> Result<String, AppError> {
        payload.validate()?;

        let user = self
            .users
            .find_by_email(payload.email.trim())
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        if !self.verify_password(&payload.password, &user.password_hash).await? {
            return Err(AppError::InvalidCredentials);
        }

        // O workspace padrão vai no token; sem ele, o resolver segue a cadeia.
        let workspace = match user.default_workspace_id {
            Some(id) => self.workspaces.find_by_id(id).await?,
            None => None,
        };
        self.create_token(&user, workspace.as_ref())
    }

    pub async fn change_password(&self, user_id: Uuid, payload: ChangePasswordPayload) -> Result<(), AppError> {
        payload.validate()?;
        let user = self.me(user_id).await?;

        if !self.verify_password(&payload.current_password, &user.password_hash).await? {
            return Err(AppError::InvalidCredentials);
        }

        let password_hash = self.hash_password(&payload.new_password).await?;
        self.users.update_password(user_id, &password_hash).await?;
        tracing::info!(user_id = %user_id, "Senha alterada");
        Ok(())
    }

    /// Sempre responde Ok, exista ou não a conta (não revela e-mails cadastrados).
    pub async fn forgot_password(&self, email: &str) -> Result<(), AppError> {
        let Some(user) = self.users.find_by_email(email.trim()).await? else {
            tracing::debug!("Redefinição pedida para e-mail desconhecido");
            return Ok(());
        };

        let token = generate_reset_token();
        let expires_at = Utc::now() + Duration::hours(RESET_TOKEN_TTL_HOURS);
        self.users
            .create_reset_token(user.id, &hash_reset_token(&token), expires_at)
            .await?;

        if let Err(e) = self.notifier.send_password_reset(&user.email, &token).await {
            tracing::error!(user_id = %user.id, error = %e, "🔥 Falha ao enviar e-mail de redefinição");
        }
        Ok(())
    }

    pub async fn reset_password(&self, payload: ResetPasswordPayload) -> Result<(), AppError> {
        payload.validate()?;
        let password_hash = self.hash_password(&payload.new_password).await?;

        let user_id = self
            .users
            .reset_password(&hash_reset_token(payload.token.trim()), &password_hash, Utc::now())
            .await?;

        tracing::info!(user_id = %user_id, "Senha redefinida");
        Ok(())
    }

    /// Troca o workspace atual: devolve um token novo com o workspace embutido.
    pub async fn switch_workspace(&self, session: &Session, workspace_id: Uuid) -> Result<String, AppError> {
        if !self.workspaces.is_member(session.user_id, workspace_id).await? {
            return Err(AppError::Unauthorized);
        }

        let workspace = self
            .workspaces
            .find_by_id(workspace_id)
            .await?
            .ok_or(AppError::NotFound("Workspace"))?;
        let user = self.me(session.user_id).await?;
        self.create_token(&user, Some(&workspace))
    }

    pub async fn me(&self, user_id: Uuid) -> Result<User, AppError> {
        self.users.find_by_id(user_id).await?.ok_or(AppError::NotFound("Usuário"))
    }

    pub async fn my_workspaces(&self, user_id: Uuid) -> Result<Vec<WorkspaceSummary>, AppError> {
        self.workspaces.list_for_user(user_id).await
    }

    pub fn validate_token(&self, token: &str) -> Result<Session, AppError> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &Validation::default(),
        )
        .map_err(|_| AppError::InvalidToken)?;

        Ok(token_data.claims.into())
    }

    fn create_token(&self, user: &User, workspace: Option<&Workspace>) -> Result<String, AppError> {
        let now = Utc::now();
        let expires_at = now + Duration::days(TOKEN_TTL_DAYS);

        let claims = Claims {
            sub: user.id,
            email: user.email.clone(),
            is_admin: user.is_admin,
            workspace_id: workspace.map(|w| w.id),
            workspace_name: workspace.map(|w| w.name.clone()),
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_ref()),
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestApp;

    fn service(app: &TestApp) -> AuthService {
        app.state.auth_service.clone().with_bcrypt_cost(4)
    }

    fn register_payload(email: &str) -> RegisterUserPayload {
        RegisterUserPayload {
            name: "Maria".into(),
            email: email.into(),
            password: "senha-forte-123".into(),
            workspace_name: "Souza Design".into(),
        }
    }

    #[tokio::test]
    async fn register_then_login_carries_the_workspace() {
        let app = TestApp::new();
        let auth = service(&app);

        let token = auth.register_user(register_payload("Maria@Test.com")).await.unwrap();
        let session = auth.validate_token(&token).unwrap();
        assert_eq!(session.email, "maria@test.com");
        assert_eq!(session.workspace_name.as_deref(), Some("Souza Design"));

        let login = auth
            .login_user(LoginUserPayload { email: "maria@test.com".into(), password: "senha-forte-123".into() })
            .await
            .unwrap();
        assert_eq!(auth.validate_token(&login).unwrap().workspace_id, session.workspace_id);

        let wrong = auth
            .login_user(LoginUserPayload { email: "maria@test.com".into(), password: "errada-123".into() })
            .await;
        assert!(matches!(wrong, Err(AppError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn duplicate_email_and_slug() {
        let app = TestApp::new();
        let auth = service(&app);

        auth.register_user(register_payload("a@test.com")).await.unwrap();
        let dup = auth.register_user(register_payload("A@test.com")).await;
        assert!(matches!(dup, Err(AppError::EmailAlreadyExists)));

        // Mesmo nome de empresa: slug ganha sufixo em vez de erro.
        let token = auth.register_user(register_payload("b@test.com")).await.unwrap();
        let session = auth.validate_token(&token).unwrap();
        let workspaces = auth.my_workspaces(session.user_id).await.unwrap();
        assert_eq!(workspaces.len(), 1);
    }

    #[tokio::test]
    async fn reset_token_is_single_use() {
        let app = TestApp::new();
        let auth = service(&app);
        auth.register_user(register_payload("reset@test.com")).await.unwrap();

        auth.forgot_password("reset@test.com").await.unwrap();
        // E-mail desconhecido também responde Ok.
        auth.forgot_password("ninguem@test.com").await.unwrap();

        let sent = app.mailer.sent();
        assert_eq!(sent.len(), 1);
        let token = sent[0]
            .html
            .split("token=")
            .nth(1)
            .and_then(|rest| rest.split('"').next())
            .unwrap()
            .to_string();

        let payload = || ResetPasswordPayload { token: token.clone(), new_password: "nova-senha-456".into() };
        auth.reset_password(payload()).await.unwrap();
        assert!(matches!(auth.reset_password(payload()).await, Err(AppError::InvalidResetToken)));

        auth.login_user(LoginUserPayload { email: "reset@test.com".into(), password: "nova-senha-456".into() })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn switching_requires_membership() {
        let app = TestApp::new();
        let auth = service(&app);
        let (user, _) = app.seed_account("a@test.com");
        let other = app.db.seed_workspace("Outra");
        let session = Session {
            user_id: user.id,
            email: user.email.clone(),
            is_admin: false,
            workspace_id: None,
            workspace_name: None,
        };

        assert!(matches!(auth.switch_workspace(&session, other.id).await, Err(AppError::Unauthorized)));

        app.db.add_membership(user.id, other.id, Utc::now());
        let token = auth.switch_workspace(&session, other.id).await.unwrap();
        assert_eq!(auth.validate_token(&token).unwrap().workspace_id, Some(other.id));
    }

    #[test]
    fn reset_tokens_are_hashed() {
        let hashed = hash_reset_token("abc");
        assert_eq!(hashed.len(), 64);
        assert_ne!(hashed, "abc");
        assert_eq!(hashed, hash_reset_token("abc"));
    }
}
