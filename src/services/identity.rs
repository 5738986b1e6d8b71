// src/services/identity.rs

use std::sync::Arc;

use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{UserStore, WorkspaceStore},
    models::{
        auth::{Session, User},
        workspace::{Workspace, WorkspaceContext},
    },
};

/// De onde veio o workspace resolvido (útil no log).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkspaceSource {
    Session,
    DefaultWorkspace,
    OldestMembership,
}

/// Resolve a sessão autenticada para um único (usuário, workspace).
///
/// Ordem fixa, o primeiro que existir vence:
/// 1. workspace gravado no token;
/// 2. `default_workspace_id` do usuário;
/// 3. workspace da membership mais antiga.
#[derive(Clone)]
pub struct WorkspaceResolver {
    users: Arc<dyn UserStore>,
    workspaces: Arc<dyn WorkspaceStore>,
}

impl WorkspaceResolver {
    pub fn new(users: Arc<dyn UserStore>, workspaces: Arc<dyn WorkspaceStore>) -> Self {
        Self { users, workspaces }
    }

    pub async fn resolve(&self, session: Option<&Session>) -> Result<WorkspaceContext, AppError> {
        let session = session.ok_or(AppError::Unauthenticated)?;
        let (workspace, source) = self.resolve_workspace(session).await?;

        tracing::debug!(
            user_id = %session.user_id,
            workspace_id = %workspace.id,
            source = ?source,
            "Workspace resolvido"
        );

        Ok(WorkspaceContext {
            user_id: session.user_id,
            workspace_id: workspace.id,
            workspace_name: workspace.name,
        })
    }

    async fn resolve_workspace(&self, session: &Session) -> Result<(Workspace, WorkspaceSource), AppError> {
        if let Some(workspace) = self.existing(session.workspace_id).await? {
            return Ok((workspace, WorkspaceSource::Session));
        }

        let user = self.user(session.user_id).await?;
        if let Some(workspace) = self.existing(user.default_workspace_id).await? {
            return Ok((workspace, WorkspaceSource::DefaultWorkspace));
        }

        if let Some(workspace) = self.workspaces.oldest_membership_workspace(user.id).await? {
            return Ok((workspace, WorkspaceSource::OldestMembership));
        }

        Err(AppError::NoWorkspace(user.id))
    }

    async fn existing(&self, id: Option<Uuid>) -> Result<Option<Workspace>, AppError> {
        match id {
            Some(id) => self.workspaces.find_by_id(id).await,
            None => Ok(None),
        }
    }

    async fn user(&self, user_id: Uuid) -> Result<User, AppError> {
        // Token válido de um usuário que não existe mais: trata como sem sessão.
        self.users.find_by_id(user_id).await?.ok_or(AppError::Unauthenticated)
    }

    /// Exige sessão de administrador. O flag é lido do banco, não do token.
    pub async fn require_admin(&self, session: Option<&Session>) -> Result<User, AppError> {
        let session = session.ok_or(AppError::Unauthenticated)?;
        let user = self.user(session.user_id).await?;
        if !user.is_admin {
            tracing::warn!(user_id = %user.id, "Acesso administrativo negado");
            return Err(AppError::Unauthorized);
        }
        Ok(user)
    }
}
