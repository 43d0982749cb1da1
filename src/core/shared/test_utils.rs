use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::core::access::Caller;
use crate::core::config::{AppConfig, AuthSettings};
use crate::core::shared::models::{
    Contact, MembershipRole, NewAccount, Origin, OriginMembership, Role, Stage,
};
use crate::core::shared::state::AppState;
use crate::core::store::MemoryStore;

pub const TEST_SECRET: &str = "unit-test-secret-that-is-long-enough-for-hs256";

pub fn test_config() -> AppConfig {
    AppConfig {
        auth: AuthSettings {
            jwt_secret: TEST_SECRET.to_string(),
            hash_memory_kib: 1024,
            hash_iterations: 1,
            ..AuthSettings::default()
        },
        ..AppConfig::default()
    }
}

pub fn test_state() -> Arc<AppState> {
    let state = AppState::new(test_config(), Arc::new(MemoryStore::new()))
        .expect("Failed to build test state");
    Arc::new(state)
}

pub async fn seed_account(
    state: &AppState,
    email: &str,
    role: Role,
    manager_id: Option<Uuid>,
) -> Caller {
    let account = state
        .store
        .insert_account(NewAccount {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: state
                .passwords
                .hash("password123")
                .expect("Failed to hash"),
            role,
            manager_id,
            created_at: Utc::now(),
        })
        .await
        .expect("Failed to seed account");
    Caller::from_account(&account)
}

pub async fn seed_contact(state: &AppState, owner: &Caller, name: &str) -> Contact {
    state
        .store
        .insert_contact(Contact {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: None,
            phone: None,
            owning_user_id: owner.id,
            manager_id: owner.manager_id,
            stage_id: None,
            created_at: Utc::now(),
        })
        .await
        .expect("Failed to seed contact")
}

pub async fn seed_origin(state: &AppState, name: &str) -> Origin {
    state
        .store
        .insert_origin(Origin {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: None,
            created_at: Utc::now(),
        })
        .await
        .expect("Failed to seed origin")
}

pub async fn seed_stage(state: &AppState, origin_id: Uuid, name: &str, order_num: i32) -> Stage {
    state
        .store
        .insert_stage(Stage {
            id: Uuid::new_v4(),
            origin_id,
            name: name.to_string(),
            color: "#3B82F6".to_string(),
            order_num,
        })
        .await
        .expect("Failed to seed stage")
}

pub async fn seed_membership(state: &AppState, origin_id: Uuid, user: &Caller, role: MembershipRole) {
    state
        .store
        .upsert_membership(OriginMembership {
            origin_id,
            user_id: user.id,
            role,
        })
        .await
        .expect("Failed to seed membership");
}
