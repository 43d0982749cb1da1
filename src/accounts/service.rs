use chrono::Utc;
use log::{error, info};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use super::types::*;
use crate::core::access::{AccessResolver, Caller};
use crate::core::shared::error::{CrmError, CrmResult};
use crate::core::shared::models::{normalize_email, Account, NewAccount, Role};
use crate::core::shared::state::AppState;
use crate::core::store::CrmStore;
use crate::security::password::PasswordHasher;

pub struct AccountsService {
    store: Arc<dyn CrmStore>,
    access: AccessResolver,
    passwords: Arc<PasswordHasher>,
}

impl AccountsService {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: state.store.clone(),
            access: state.access.clone(),
            passwords: state.passwords.clone(),
        }
    }

    pub async fn create_user(
        &self,
        caller: &Caller,
        request: CreateUserRequest,
    ) -> CrmResult<Account> {
        AccessResolver::require_role(caller, &[Role::Owner])?;
        let account = self.insert_account(request).await?;
        info!(
            "Account {} ({}) created by {}",
            account.id, account.role, caller.id
        );
        Ok(account)
    }

    /// Creates the configured Owner when no Owner exists yet.
    pub async fn bootstrap_owner(&self, email: &str, password: &str) -> CrmResult<Option<Account>> {
        if !self.store.list_accounts(Some(Role::Owner)).await?.is_empty() {
            return Ok(None);
        }
        let account = self
            .insert_account(CreateUserRequest {
                email: email.to_string(),
                password: password.to_string(),
                role: Role::Owner,
                manager_id: None,
            })
            .await?;
        info!("Bootstrap owner {} created", account.email);
        Ok(Some(account))
    }

    async fn insert_account(&self, request: CreateUserRequest) -> CrmResult<Account> {
        let email = normalize_email(&request.email);
        if email.is_empty() || !email.contains('@') {
            return Err(CrmError::invalid("a valid email is required"));
        }
        if !self.passwords.is_acceptable(&request.password) {
            return Err(CrmError::invalid(format!(
                "password must have at least {} characters",
                self.passwords.min_length()
            )));
        }

        match (request.role, request.manager_id) {
            (Role::Seller, Some(manager_id)) => {
                let manager = self.store.get_account(manager_id).await?;
                if !manager.is_some_and(|m| m.role == Role::Manager) {
                    return Err(CrmError::invalid("manager_id must reference a Manager"));
                }
            }
            (Role::Owner | Role::Manager, Some(_)) => {
                return Err(CrmError::invalid(format!(
                    "{} accounts have no manager",
                    request.role
                )));
            }
            (_, None) => {}
        }

        let password_hash = self.passwords.hash(&request.password).map_err(|e| {
            error!("Failed to hash password: {e}");
            CrmError::StorageFailure(e.to_string())
        })?;

        let account = self
            .store
            .insert_account(NewAccount {
                id: Uuid::new_v4(),
                email,
                password_hash,
                role: request.role,
                manager_id: request.manager_id,
                created_at: Utc::now(),
            })
            .await?;
        Ok(account)
    }

    pub async fn list_all_users(&self, caller: &Caller) -> CrmResult<Vec<UserSummary>> {
        AccessResolver::require_role(caller, &[Role::Owner])?;
        let accounts = self.store.list_accounts(None).await?;
        Ok(accounts.into_iter().map(UserSummary::from).collect())
    }

    pub async fn list_managers(&self, caller: &Caller) -> CrmResult<Vec<AccountRef>> {
        AccessResolver::require_role(caller, &[Role::Owner])?;
        let managers = self.store.list_accounts(Some(Role::Manager)).await?;
        Ok(managers.into_iter().map(AccountRef::from).collect())
    }

    pub async fn list_sellers(&self, caller: &Caller) -> CrmResult<Vec<AccountRef>> {
        AccessResolver::require_role(caller, &[Role::Manager])?;
        let sellers = self.store.list_subordinates(caller.id).await?;
        Ok(sellers.into_iter().map(AccountRef::from).collect())
    }

    /// Batched email lookup limited to accounts the caller may see.
    pub async fn account_emails(
        &self,
        caller: &Caller,
        ids: &[Uuid],
    ) -> CrmResult<HashMap<Uuid, String>> {
        let wanted: Vec<Uuid> = match self.access.visible_account_ids(caller).await? {
            None => ids.to_vec(),
            Some(visible) => ids.iter().copied().filter(|id| visible.contains(id)).collect(),
        };
        Ok(self.store.account_emails(&wanted).await?)
    }
}
