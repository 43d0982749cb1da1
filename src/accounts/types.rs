use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::core::shared::models::{Account, Role};

#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub password: String,
    pub role: Role,
    #[serde(default)]
    pub manager_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateUserResponse {
    pub account: Account,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    pub manager_id: Option<Uuid>,
}

impl From<Account> for UserSummary {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            email: account.email,
            role: account.role,
            manager_id: account.manager_id,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UserListResponse {
    pub users: Vec<UserSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AccountRef {
    pub id: Uuid,
    pub email: String,
}

impl From<Account> for AccountRef {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            email: account.email,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ManagerListResponse {
    pub managers: Vec<AccountRef>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SellerListResponse {
    pub sellers: Vec<AccountRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailLookupRequest {
    pub ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmailLookupResponse {
    pub emails: HashMap<Uuid, String>,
}
