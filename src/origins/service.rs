use chrono::Utc;
use log::info;
use std::sync::Arc;
use uuid::Uuid;

use super::types::*;
use crate::core::access::{AccessResolver, Caller};
use crate::core::shared::error::{CrmError, CrmResult};
use crate::core::shared::models::{
    normalize_email, Origin, OriginMembership, OriginScope, Role,
};
use crate::core::shared::state::AppState;
use crate::core::store::CrmStore;

pub struct OriginsService {
    store: Arc<dyn CrmStore>,
    access: AccessResolver,
}

impl OriginsService {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: state.store.clone(),
            access: state.access.clone(),
        }
    }

    async fn board(&self, scope: &OriginScope) -> CrmResult<OriginBoard> {
        if matches!(scope, OriginScope::Only(ids) if ids.is_empty()) {
            return Ok(OriginBoard::default());
        }
        Ok(OriginBoard {
            origins: self.store.list_origins(scope).await?,
            stages: self.store.list_stages(scope).await?,
        })
    }

    /// Origins the caller may see with their stages.
    pub async fn visible_board(&self, caller: &Caller) -> CrmResult<OriginBoard> {
        let scope = self.access.origin_scope(caller).await?;
        self.board(&scope).await
    }

    pub async fn full_board(&self, caller: &Caller) -> CrmResult<OriginBoard> {
        AccessResolver::require_role(caller, &[Role::Owner])?;
        self.board(&OriginScope::All).await
    }

    pub async fn create_origin(
        &self,
        caller: &Caller,
        request: CreateOriginRequest,
    ) -> CrmResult<Origin> {
        AccessResolver::require_role(caller, &[Role::Owner])?;
        let name = request.name.trim();
        if name.is_empty() {
            return Err(CrmError::invalid("name is required"));
        }
        let origin = self
            .store
            .insert_origin(Origin {
                id: Uuid::new_v4(),
                name: name.to_string(),
                description: request
                    .description
                    .map(|d| d.trim().to_string())
                    .filter(|d| !d.is_empty()),
                created_at: Utc::now(),
            })
            .await?;
        info!("Origin '{}' ({}) created by {}", origin.name, origin.id, caller.id);
        Ok(origin)
    }

    pub async fn delete_origin(&self, caller: &Caller, origin_id: Uuid) -> CrmResult<()> {
        AccessResolver::require_role(caller, &[Role::Owner])?;
        if !self.store.delete_origin(origin_id).await? {
            return Err(CrmError::not_found("origin"));
        }
        info!("Origin {} deleted by {}", origin_id, caller.id);
        Ok(())
    }

    async fn require_existing_origin(&self, origin_id: Uuid) -> CrmResult<()> {
        match self.store.get_origin(origin_id).await? {
            Some(_) => Ok(()),
            None => Err(CrmError::not_found("origin")),
        }
    }

    pub async fn add_member(
        &self,
        caller: &Caller,
        request: AddMemberRequest,
    ) -> CrmResult<MemberEntry> {
        self.access
            .require_origin_admin(caller, request.origin_id)
            .await?;
        self.require_existing_origin(request.origin_id).await?;

        let account = self
            .store
            .find_account_by_email(&normalize_email(&request.email))
            .await?
            .ok_or_else(|| CrmError::not_found("user"))?;

        let membership = self
            .store
            .upsert_membership(OriginMembership {
                origin_id: request.origin_id,
                user_id: account.id,
                role: request.role,
            })
            .await?;
        info!(
            "{} is now {} of origin {} (by {})",
            account.email, membership.role, membership.origin_id, caller.id
        );
        Ok(MemberEntry {
            user_id: account.id,
            email: account.email,
            role: membership.role,
        })
    }

    /// Removing a membership that does not exist succeeds.
    pub async fn remove_member(
        &self,
        caller: &Caller,
        request: RemoveMemberRequest,
    ) -> CrmResult<()> {
        self.access
            .require_origin_admin(caller, request.origin_id)
            .await?;
        if self
            .store
            .delete_membership(request.origin_id, request.user_id)
            .await?
        {
            info!(
                "{} removed from origin {} by {}",
                request.user_id, request.origin_id, caller.id
            );
        }
        Ok(())
    }

    pub async fn list_members(&self, caller: &Caller, origin_id: Uuid) -> CrmResult<Vec<MemberEntry>> {
        self.access.require_origin_admin(caller, origin_id).await?;
        self.require_existing_origin(origin_id).await?;

        let members = self.store.list_members(origin_id).await?;
        let ids: Vec<Uuid> = members.iter().map(|m| m.user_id).collect();
        let emails = self.store.account_emails(&ids).await?;

        Ok(members
            .into_iter()
            .map(|m| MemberEntry {
                email: emails.get(&m.user_id).cloned().unwrap_or_default(),
                user_id: m.user_id,
                role: m.role,
            })
            .collect())
    }
}
