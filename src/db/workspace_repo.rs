// src/db/workspace_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::workspace::{UpdateWorkspaceSettingsPayload, Workspace, WorkspaceSummary},
};

#[async_trait]
pub trait WorkspaceStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Workspace>, AppError>;

    /// Workspace da membership mais antiga do usuário (created_at ASC).
    async fn oldest_membership_workspace(&self, user_id: Uuid) -> Result<Option<Workspace>, AppError>;

    async fn is_member(&self, user_id: Uuid, workspace_id: Uuid) -> Result<bool, AppError>;

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<WorkspaceSummary>, AppError>;

    async fn update_settings(
        &self,
        workspace_id: Uuid,
        payload: &UpdateWorkspaceSettingsPayload,
    ) -> Result<Workspace, AppError>;
}

#[derive(Clone)]
pub struct WorkspaceRepository {
    pool: PgPool,
}

impl WorkspaceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WorkspaceStore for WorkspaceRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Workspace>, AppError> {
        let workspace = sqlx::query_as::<_, Workspace>("SELECT * FROM workspaces WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(workspace)
    }

    async fn oldest_membership_workspace(&self, user_id: Uuid) -> Result<Option<Workspace>, AppError> {
        let workspace = sqlx::query_as::<_, Workspace>(
            r#"
            SELECT w.*
            FROM memberships m
            JOIN workspaces w ON w.id = m.workspace_id
            WHERE m.user_id = $1
            ORDER BY m.created_at ASC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(workspace)
    }

    /// Verificação de autorização mais importante: o usuário pertence ao workspace?
    async fn is_member(&self, user_id: Uuid, workspace_id: Uuid) -> Result<bool, AppError> {
        // SELECT EXISTS: a consulta mais rápida possível.
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM memberships WHERE user_id = $1 AND workspace_id = $2)",
        )
        .bind(user_id)
        .bind(workspace_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<WorkspaceSummary>, AppError> {
        let workspaces = sqlx::query_as::<_, WorkspaceSummary>(
            r#"
            SELECT w.id, w.name, m.role, m.created_at AS joined_at
            FROM memberships m
            JOIN workspaces w ON w.id = m.workspace_id
            WHERE m.user_id = $1
            ORDER BY m.created_at ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(workspaces)
    }

    async fn update_settings(
        &self,
        workspace_id: Uuid,
        payload: &UpdateWorkspaceSettingsPayload,
    ) -> Result<Workspace, AppError> {
        // COALESCE: campo ausente no payload mantém o valor atual
        let workspace = sqlx::query_as::<_, Workspace>(
            r#"
            UPDATE workspaces SET
                name = COALESCE($2, name),
                company_name = COALESCE($3, company_name),
                company_email = COALESCE($4, company_email),
                company_phone = COALESCE($5, company_phone),
                company_address = COALESCE($6, company_address),
                tax_id = COALESCE($7, tax_id),
                square_access_token = COALESCE($8, square_access_token),
                square_location_id = COALESCE($9, square_location_id),
                square_environment = COALESCE($10, square_environment),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(workspace_id)
        .bind(&payload.name)
        .bind(&payload.company_name)
        .bind(&payload.company_email)
        .bind(&payload.company_phone)
        .bind(&payload.company_address)
        .bind(&payload.tax_id)
        .bind(&payload.square_access_token)
        .bind(&payload.square_location_id)
        .bind(&payload.square_environment)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::NotFound("Workspace"))?;

        Ok(workspace)
    }
}
