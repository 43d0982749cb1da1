//! Persistence seam shared by every feature module.
//!
//! Handlers never talk to a database directly: they go through a
//! [`CrmStore`], which is either the diesel-backed [`PgStore`] or the
//! [`MemoryStore`] used in development mode and in tests. Both enforce the
//! same uniqueness and cascade rules so that behaviour does not depend on
//! the backend.

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "postgres")]
pub mod schema;

use async_trait::async_trait;
use log::error;
use std::collections::HashMap;
use uuid::Uuid;

use crate::core::shared::error::CrmError;
use crate::core::shared::models::{
    Account, Contact, ContactOrigin, ContactScope, NewAccount, Origin, OriginMembership,
    OriginScope, Role, Stage, Tag,
};

pub use memory::MemoryStore;
#[cfg(feature = "postgres")]
pub use postgres::PgStore;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("database connection failed: {0}")]
    Connection(String),
    #[error("query failed: {0}")]
    Query(String),
    #[error("duplicate {0}")]
    Duplicate(String),
    #[error("missing reference: {0}")]
    MissingReference(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl From<StoreError> for CrmError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(what) => CrmError::Conflict(format!("{what} already exists")),
            StoreError::MissingReference(what) => CrmError::NotFound(what),
            StoreError::Connection(msg) | StoreError::Query(msg) => {
                error!("Storage failure: {msg}");
                CrmError::StorageFailure(msg)
            }
        }
    }
}

#[async_trait]
pub trait CrmStore: Send + Sync {
    // Accounts
    async fn insert_account(&self, account: NewAccount) -> StoreResult<Account>;
    async fn get_account(&self, id: Uuid) -> StoreResult<Option<Account>>;
    async fn find_account_by_email(&self, email: &str) -> StoreResult<Option<Account>>;
    async fn password_hash(&self, id: Uuid) -> StoreResult<Option<String>>;
    async fn list_accounts(&self, role: Option<Role>) -> StoreResult<Vec<Account>>;
    /// Sellers whose `manager_id` is `manager_id`.
    async fn list_subordinates(&self, manager_id: Uuid) -> StoreResult<Vec<Account>>;
    /// One round trip for any number of ids; unknown ids are simply absent.
    async fn account_emails(&self, ids: &[Uuid]) -> StoreResult<HashMap<Uuid, String>>;

    // Contacts
    /// Newest first.
    async fn list_contacts(&self, scope: &ContactScope) -> StoreResult<Vec<Contact>>;
    async fn get_contact(&self, id: Uuid) -> StoreResult<Option<Contact>>;
    async fn insert_contact(&self, contact: Contact) -> StoreResult<Contact>;
    async fn update_contact(&self, contact: Contact) -> StoreResult<Option<Contact>>;
    /// Removes the contact with its placements and tag links.
    async fn delete_contact(&self, id: Uuid) -> StoreResult<bool>;
    async fn set_contact_stage(&self, contact_id: Uuid, stage_id: Option<Uuid>)
        -> StoreResult<bool>;

    // Origins
    /// Newest first.
    async fn list_origins(&self, scope: &OriginScope) -> StoreResult<Vec<Origin>>;
    async fn get_origin(&self, id: Uuid) -> StoreResult<Option<Origin>>;
    async fn insert_origin(&self, origin: Origin) -> StoreResult<Origin>;
    /// Removes stages, memberships and placements of the origin and clears
    /// the current stage of every contact that sat in one of its stages.
    async fn delete_origin(&self, id: Uuid) -> StoreResult<bool>;

    // Stages
    /// Ordered by `order_num`.
    async fn list_stages(&self, scope: &OriginScope) -> StoreResult<Vec<Stage>>;
    async fn stages_for_origin(&self, origin_id: Uuid) -> StoreResult<Vec<Stage>>;
    async fn get_stage(&self, id: Uuid) -> StoreResult<Option<Stage>>;
    async fn insert_stage(&self, stage: Stage) -> StoreResult<Stage>;
    /// Deletes the stage, clears it from contacts and applies `renumbered`
    /// to the stages left in its origin, atomically.
    async fn delete_stage(&self, id: Uuid, renumbered: &[(Uuid, i32)]) -> StoreResult<bool>;
    /// Writes every `(stage_id, order_num)` pair of one origin atomically.
    async fn set_stage_orders(&self, origin_id: Uuid, orders: &[(Uuid, i32)]) -> StoreResult<()>;

    // Memberships
    async fn get_membership(
        &self,
        origin_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Option<OriginMembership>>;
    async fn memberships_for_user(&self, user_id: Uuid) -> StoreResult<Vec<OriginMembership>>;
    async fn list_members(&self, origin_id: Uuid) -> StoreResult<Vec<OriginMembership>>;
    /// Inserts or replaces the role of `(origin_id, user_id)`.
    async fn upsert_membership(&self, membership: OriginMembership)
        -> StoreResult<OriginMembership>;
    async fn delete_membership(&self, origin_id: Uuid, user_id: Uuid) -> StoreResult<bool>;

    // Contact placements
    async fn placement_exists(&self, contact_id: Uuid, origin_id: Uuid) -> StoreResult<bool>;
    /// Fails with [`StoreError::Duplicate`] when the pair already exists.
    async fn insert_placement(&self, placement: ContactOrigin) -> StoreResult<()>;
    /// Removes the pair and clears the contact's stage when that stage
    /// belongs to `origin_id`.
    async fn remove_placement(&self, contact_id: Uuid, origin_id: Uuid) -> StoreResult<bool>;
    async fn contacts_in_origin(&self, origin_id: Uuid) -> StoreResult<Vec<Contact>>;

    // Tags
    async fn list_tags(&self) -> StoreResult<Vec<Tag>>;
    async fn get_tag(&self, id: Uuid) -> StoreResult<Option<Tag>>;
    async fn insert_tag(&self, tag: Tag) -> StoreResult<Tag>;
    async fn delete_tag(&self, id: Uuid) -> StoreResult<bool>;
    async fn tag_contact(&self, contact_id: Uuid, tag_id: Uuid) -> StoreResult<()>;
    async fn contact_tags(&self, contact_id: Uuid) -> StoreResult<Vec<Tag>>;
}
