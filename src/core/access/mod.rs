//! Visibility and authorization for every endpoint.
//!
//! [`evaluate`] is the single policy function: given who is asking and the
//! facts about a resource it answers whether the resource is visible and
//! whether it may be changed. [`AccessResolver`] gathers those facts from the
//! store and turns decisions into [`CrmError`]s, so handlers never encode
//! role rules themselves.

use log::warn;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::core::shared::error::{CrmError, CrmResult};
use crate::core::shared::models::{
    Account, Contact, ContactScope, MembershipRole, OriginScope, Role,
};
use crate::core::store::CrmStore;

/// The authenticated account on whose behalf a request runs. Built from the
/// current account row on every request and passed explicitly to services.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Caller {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    pub manager_id: Option<Uuid>,
}

impl Caller {
    pub fn from_account(account: &Account) -> Self {
        Self {
            id: account.id,
            email: account.email.clone(),
            role: account.role,
            manager_id: account.manager_id,
        }
    }

    pub fn is_owner(&self) -> bool {
        self.role == Role::Owner
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessDecision {
    pub visible: bool,
    pub mutable: bool,
}

impl AccessDecision {
    pub const NONE: Self = Self {
        visible: false,
        mutable: false,
    };
    pub const READ_ONLY: Self = Self {
        visible: true,
        mutable: false,
    };
    pub const FULL: Self = Self {
        visible: true,
        mutable: true,
    };

    fn full_if(cond: bool) -> Self {
        if cond {
            Self::FULL
        } else {
            Self::NONE
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceFacts {
    Contact {
        owning_user_id: Uuid,
        owner_role: Role,
        owner_manager_id: Option<Uuid>,
    },
    Origin {
        membership: Option<MembershipRole>,
    },
    Account {
        id: Uuid,
        role: Role,
        manager_id: Option<Uuid>,
    },
}

pub fn evaluate(caller: &Caller, facts: &ResourceFacts) -> AccessDecision {
    if caller.is_owner() {
        return AccessDecision::FULL;
    }

    match (caller.role, facts) {
        (
            Role::Manager,
            ResourceFacts::Contact {
                owning_user_id,
                owner_role,
                owner_manager_id,
            },
        ) => AccessDecision::full_if(
            *owning_user_id == caller.id
                || (*owner_role == Role::Seller && *owner_manager_id == Some(caller.id)),
        ),
        (Role::Seller, ResourceFacts::Contact { owning_user_id, .. }) => {
            AccessDecision::full_if(*owning_user_id == caller.id)
        }

        (Role::Manager, ResourceFacts::Origin { membership }) => {
            AccessDecision::full_if(*membership == Some(MembershipRole::Manager))
        }
        (Role::Seller, ResourceFacts::Origin { membership }) => match membership {
            Some(_) => AccessDecision::READ_ONLY,
            None => AccessDecision::NONE,
        },

        (Role::Manager, ResourceFacts::Account { id, role, manager_id }) => {
            if *id == caller.id || (*role == Role::Seller && *manager_id == Some(caller.id)) {
                AccessDecision::READ_ONLY
            } else {
                AccessDecision::NONE
            }
        }
        (Role::Seller, ResourceFacts::Account { id, .. }) => {
            if *id == caller.id {
                AccessDecision::READ_ONLY
            } else {
                AccessDecision::NONE
            }
        }

        (Role::Owner, _) => AccessDecision::FULL,
    }
}

#[derive(Clone)]
pub struct AccessResolver {
    store: Arc<dyn CrmStore>,
}

impl AccessResolver {
    pub fn new(store: Arc<dyn CrmStore>) -> Self {
        Self { store }
    }

    pub fn require_role(caller: &Caller, allowed: &[Role]) -> CrmResult<()> {
        if allowed.contains(&caller.role) {
            Ok(())
        } else {
            warn!(
                "Role {} of {} is not allowed here (needs one of {:?})",
                caller.role, caller.id, allowed
            );
            Err(CrmError::access_denied(format!(
                "role {} may not perform this operation",
                caller.role
            )))
        }
    }

    async fn contact_facts(&self, contact: &Contact) -> CrmResult<ResourceFacts> {
        let owner = self.store.get_account(contact.owning_user_id).await?;
        Ok(ResourceFacts::Contact {
            owning_user_id: contact.owning_user_id,
            owner_role: owner.as_ref().map_or(Role::Seller, |a| a.role),
            owner_manager_id: owner.and_then(|a| a.manager_id),
        })
    }

    pub async fn contact_access(&self, caller: &Caller, contact: &Contact) -> CrmResult<AccessDecision> {
        let facts = self.contact_facts(contact).await?;
        Ok(evaluate(caller, &facts))
    }

    /// Loads a contact the caller may see. Contacts outside the caller's
    /// scope answer `NotFound` so their existence is not disclosed.
    pub async fn visible_contact(&self, caller: &Caller, contact_id: Uuid) -> CrmResult<Contact> {
        let contact = self
            .store
            .get_contact(contact_id)
            .await?
            .ok_or_else(|| CrmError::not_found("contact"))?;
        if self.contact_access(caller, &contact).await?.visible {
            Ok(contact)
        } else {
            Err(CrmError::not_found("contact"))
        }
    }

    pub async fn mutable_contact(&self, caller: &Caller, contact_id: Uuid) -> CrmResult<Contact> {
        let contact = self
            .store
            .get_contact(contact_id)
            .await?
            .ok_or_else(|| CrmError::not_found("contact"))?;
        let decision = self.contact_access(caller, &contact).await?;
        if !decision.visible {
            return Err(CrmError::not_found("contact"));
        }
        if !decision.mutable {
            warn!("{} may see but not change contact {}", caller.id, contact_id);
            return Err(CrmError::access_denied("contact is read-only for this caller"));
        }
        Ok(contact)
    }

    pub async fn contact_scope(&self, caller: &Caller) -> CrmResult<ContactScope> {
        match caller.role {
            Role::Owner => Ok(ContactScope::All),
            Role::Manager => {
                let mut owners = vec![caller.id];
                owners.extend(
                    self.store
                        .list_subordinates(caller.id)
                        .await?
                        .into_iter()
                        .map(|seller| seller.id),
                );
                Ok(ContactScope::OwnedBy(owners))
            }
            Role::Seller => Ok(ContactScope::OwnedBy(vec![caller.id])),
        }
    }

    pub async fn origin_access(&self, caller: &Caller, origin_id: Uuid) -> CrmResult<AccessDecision> {
        if caller.is_owner() {
            return Ok(AccessDecision::FULL);
        }
        let membership = self
            .store
            .get_membership(origin_id, caller.id)
            .await?
            .map(|m| m.role);
        Ok(evaluate(caller, &ResourceFacts::Origin { membership }))
    }

    pub async fn origin_scope(&self, caller: &Caller) -> CrmResult<OriginScope> {
        if caller.is_owner() {
            return Ok(OriginScope::All);
        }
        let ids = self
            .store
            .memberships_for_user(caller.id)
            .await?
            .into_iter()
            .filter(|m| {
                evaluate(
                    caller,
                    &ResourceFacts::Origin {
                        membership: Some(m.role),
                    },
                )
                .visible
            })
            .map(|m| m.origin_id)
            .collect();
        Ok(OriginScope::Only(ids))
    }

    /// Write guard for origin mutations: Owner always, Manager only with a
    /// Manager membership on the origin.
    pub async fn require_origin_admin(&self, caller: &Caller, origin_id: Uuid) -> CrmResult<()> {
        Self::require_role(caller, &[Role::Owner, Role::Manager])?;
        if self.origin_access(caller, origin_id).await?.mutable {
            Ok(())
        } else {
            warn!("{} has no management rights on origin {}", caller.id, origin_id);
            Err(CrmError::access_denied("no management rights on this origin"))
        }
    }

    /// Checks who a contact may be assigned to. A Manager may hand a contact
    /// to itself or to one of its Sellers, and may only name itself as the
    /// contact's manager.
    pub async fn check_contact_assignment(
        &self,
        caller: &Caller,
        owning_user_id: Uuid,
        manager_id: Option<Uuid>,
    ) -> CrmResult<()> {
        match caller.role {
            Role::Owner => {
                if self.store.get_account(owning_user_id).await?.is_none() {
                    return Err(CrmError::not_found("owning account"));
                }
                if let Some(manager_id) = manager_id {
                    match self.store.get_account(manager_id).await? {
                        Some(manager) if manager.role == Role::Manager => {}
                        Some(_) => {
                            return Err(CrmError::invalid("manager_id must reference a Manager"))
                        }
                        None => return Err(CrmError::not_found("manager account")),
                    }
                }
                Ok(())
            }
            Role::Manager => {
                if owning_user_id != caller.id {
                    let target = self.store.get_account(owning_user_id).await?;
                    let subordinate = target.is_some_and(|account| {
                        evaluate(
                            caller,
                            &ResourceFacts::Account {
                                id: account.id,
                                role: account.role,
                                manager_id: account.manager_id,
                            },
                        )
                        .visible
                    });
                    if !subordinate {
                        warn!(
                            "Manager {} tried to assign a contact to non-subordinate {}",
                            caller.id, owning_user_id
                        );
                        return Err(CrmError::access_denied("seller is not subordinate"));
                    }
                }
                if manager_id.is_some_and(|id| id != caller.id) {
                    warn!("Manager {} tried to set another manager on a contact", caller.id);
                    return Err(CrmError::access_denied("manager_id may only be yourself"));
                }
                Ok(())
            }
            Role::Seller => Err(CrmError::access_denied("sellers may not assign contacts")),
        }
    }

    /// Ids of the accounts the caller may see, or `None` when it sees all.
    pub async fn visible_account_ids(&self, caller: &Caller) -> CrmResult<Option<Vec<Uuid>>> {
        match caller.role {
            Role::Owner => Ok(None),
            Role::Manager => {
                let mut ids = vec![caller.id];
                ids.extend(
                    self.store
                        .list_subordinates(caller.id)
                        .await?
                        .into_iter()
                        .map(|a| a.id),
                );
                Ok(Some(ids))
            }
            Role::Seller => Ok(Some(vec![caller.id])),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::shared::models::{NewAccount, Origin, OriginMembership};
    use crate::core::store::MemoryStore;
    use chrono::Utc;

    fn caller(role: Role) -> Caller {
        Caller {
            id: Uuid::new_v4(),
            email: format!("{}@example.com", role.as_str().to_lowercase()),
            role,
            manager_id: None,
        }
    }

    async fn account(
        store: &MemoryStore,
        id: Uuid,
        role: Role,
        manager_id: Option<Uuid>,
    ) -> Account {
        store
            .insert_account(NewAccount {
                id,
                email: format!("{id}@example.com"),
                password_hash: "h".into(),
                role,
                manager_id,
                created_at: Utc::now(),
            })
            .await
            .unwrap()
    }

    #[test]
    fn test_owner_sees_and_mutates_everything() {
        let owner = caller(Role::Owner);
        let facts = [
            ResourceFacts::Contact {
                owning_user_id: Uuid::new_v4(),
                owner_role: Role::Seller,
                owner_manager_id: None,
            },
            ResourceFacts::Origin { membership: None },
            ResourceFacts::Account {
                id: Uuid::new_v4(),
                role: Role::Manager,
                manager_id: None,
            },
        ];
        for f in &facts {
            assert_eq!(evaluate(&owner, f), AccessDecision::FULL);
        }
    }

    #[test]
    fn test_manager_contact_rules() {
        let manager = caller(Role::Manager);
        let own = ResourceFacts::Contact {
            owning_user_id: manager.id,
            owner_role: Role::Manager,
            owner_manager_id: None,
        };
        let subordinate = ResourceFacts::Contact {
            owning_user_id: Uuid::new_v4(),
            owner_role: Role::Seller,
            owner_manager_id: Some(manager.id),
        };
        let foreign = ResourceFacts::Contact {
            owning_user_id: Uuid::new_v4(),
            owner_role: Role::Seller,
            owner_manager_id: Some(Uuid::new_v4()),
        };
        assert_eq!(evaluate(&manager, &own), AccessDecision::FULL);
        assert_eq!(evaluate(&manager, &subordinate), AccessDecision::FULL);
        assert_eq!(evaluate(&manager, &foreign), AccessDecision::NONE);
    }

    #[test]
    fn test_seller_only_sees_own_contacts() {
        let seller = caller(Role::Seller);
        let own = ResourceFacts::Contact {
            owning_user_id: seller.id,
            owner_role: Role::Seller,
            owner_manager_id: None,
        };
        let other = ResourceFacts::Contact {
            owning_user_id: Uuid::new_v4(),
            owner_role: Role::Seller,
            owner_manager_id: None,
        };
        assert_eq!(evaluate(&seller, &own), AccessDecision::FULL);
        assert_eq!(evaluate(&seller, &other), AccessDecision::NONE);
    }

    #[test]
    fn test_origin_membership_rules() {
        let manager = caller(Role::Manager);
        let seller = caller(Role::Seller);
        let as_manager = ResourceFacts::Origin {
            membership: Some(MembershipRole::Manager),
        };
        let as_seller = ResourceFacts::Origin {
            membership: Some(MembershipRole::Seller),
        };
        assert_eq!(evaluate(&manager, &as_manager), AccessDecision::FULL);
        assert_eq!(evaluate(&manager, &as_seller), AccessDecision::NONE);
        assert_eq!(evaluate(&seller, &as_seller), AccessDecision::READ_ONLY);
        assert_eq!(evaluate(&seller, &as_manager), AccessDecision::READ_ONLY);
        assert_eq!(
            evaluate(&seller, &ResourceFacts::Origin { membership: None }),
            AccessDecision::NONE
        );
    }

    #[tokio::test]
    async fn test_manager_contact_scope_includes_subordinates_only() {
        let store = Arc::new(MemoryStore::new());
        let manager = caller(Role::Manager);
        account(&store, manager.id, Role::Manager, None).await;
        let other_manager = account(&store, Uuid::new_v4(), Role::Manager, None).await;
        let mine = account(&store, Uuid::new_v4(), Role::Seller, Some(manager.id)).await;
        let theirs = account(&store, Uuid::new_v4(), Role::Seller, Some(other_manager.id)).await;

        let resolver = AccessResolver::new(store);
        let scope = resolver.contact_scope(&manager).await.unwrap();

        assert!(scope.includes(manager.id));
        assert!(scope.includes(mine.id));
        assert!(!scope.includes(theirs.id));
        assert!(!scope.includes(other_manager.id));
    }

    #[tokio::test]
    async fn test_assignment_to_foreign_seller_is_denied() {
        let store = Arc::new(MemoryStore::new());
        let manager = caller(Role::Manager);
        account(&store, manager.id, Role::Manager, None).await;
        let subordinate = account(&store, Uuid::new_v4(), Role::Seller, Some(manager.id)).await;
        let stranger = account(&store, Uuid::new_v4(), Role::Seller, None).await;
        let resolver = AccessResolver::new(store);

        assert!(resolver
            .check_contact_assignment(&manager, subordinate.id, Some(manager.id))
            .await
            .is_ok());
        assert!(resolver
            .check_contact_assignment(&manager, manager.id, None)
            .await
            .is_ok());
        assert!(matches!(
            resolver
                .check_contact_assignment(&manager, stranger.id, None)
                .await,
            Err(CrmError::AccessDenied(_))
        ));
        assert!(matches!(
            resolver
                .check_contact_assignment(&manager, subordinate.id, Some(Uuid::new_v4()))
                .await,
            Err(CrmError::AccessDenied(_))
        ));
    }

    #[tokio::test]
    async fn test_origin_admin_requires_manager_membership() {
        let store = Arc::new(MemoryStore::new());
        let manager = caller(Role::Manager);
        account(&store, manager.id, Role::Manager, None).await;
        let origin = store
            .insert_origin(Origin {
                id: Uuid::new_v4(),
                name: "Web Leads".into(),
                description: None,
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        let resolver = AccessResolver::new(store.clone());

        assert!(matches!(
            resolver.require_origin_admin(&manager, origin.id).await,
            Err(CrmError::AccessDenied(_))
        ));

        store
            .upsert_membership(OriginMembership {
                origin_id: origin.id,
                user_id: manager.id,
                role: MembershipRole::Manager,
            })
            .await
            .unwrap();
        assert!(resolver.require_origin_admin(&manager, origin.id).await.is_ok());
        assert!(resolver
            .require_origin_admin(&caller(Role::Owner), origin.id)
            .await
            .is_ok());
    }
}
