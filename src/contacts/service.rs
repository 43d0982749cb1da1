use chrono::Utc;
use log::info;
use std::collections::BTreeSet;
use std::sync::Arc;
use uuid::Uuid;

use super::types::*;
use crate::core::access::{AccessResolver, Caller};
use crate::core::shared::error::{CrmError, CrmResult};
use crate::core::shared::models::{Contact, ContactOrigin, Role};
use crate::core::shared::state::AppState;
use crate::core::store::CrmStore;

const UNKNOWN_EMAIL: &str = "Unknown";

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required_name(name: &str) -> CrmResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CrmError::invalid("name is required"));
    }
    Ok(name.to_string())
}

pub struct ContactsService {
    store: Arc<dyn CrmStore>,
    access: AccessResolver,
}

impl ContactsService {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: state.store.clone(),
            access: state.access.clone(),
        }
    }

    pub async fn list_contacts(&self, caller: &Caller) -> CrmResult<Vec<Contact>> {
        let scope = self.access.contact_scope(caller).await?;
        Ok(self.store.list_contacts(&scope).await?)
    }

    pub async fn list_compact(&self, caller: &Caller) -> CrmResult<Vec<ContactSummary>> {
        let contacts = self.list_contacts(caller).await?;
        Ok(contacts.into_iter().map(ContactSummary::from).collect())
    }

    pub async fn create_contact(
        &self,
        caller: &Caller,
        request: CreateContactRequest,
    ) -> CrmResult<Contact> {
        AccessResolver::require_role(caller, &[Role::Owner, Role::Manager])?;
        let name = required_name(&request.name)?;

        let owning_user_id = request.owning_user_id.unwrap_or(caller.id);
        self.access
            .check_contact_assignment(caller, owning_user_id, request.manager_id)
            .await?;

        let manager_id = match request.manager_id {
            Some(id) => Some(id),
            None => self
                .store
                .get_account(owning_user_id)
                .await?
                .and_then(|owner| owner.manager_id),
        };

        let contact = self
            .store
            .insert_contact(Contact {
                id: Uuid::new_v4(),
                name,
                email: non_blank(request.email),
                phone: non_blank(request.phone),
                owning_user_id,
                manager_id,
                stage_id: None,
                created_at: Utc::now(),
            })
            .await?;
        info!("Contact {} created by {}", contact.id, caller.id);
        Ok(contact)
    }

    pub async fn update_contact(
        &self,
        caller: &Caller,
        request: UpdateContactRequest,
    ) -> CrmResult<Contact> {
        AccessResolver::require_role(caller, &[Role::Owner, Role::Manager])?;
        let existing = self.access.mutable_contact(caller, request.id).await?;
        let name = required_name(&request.name)?;

        let owning_user_id = request.owning_user_id.unwrap_or(existing.owning_user_id);
        self.access
            .check_contact_assignment(caller, owning_user_id, request.manager_id)
            .await?;

        let updated = Contact {
            name,
            email: non_blank(request.email),
            phone: non_blank(request.phone),
            owning_user_id,
            manager_id: request.manager_id,
            ..existing
        };
        self.store
            .update_contact(updated)
            .await?
            .ok_or_else(|| CrmError::not_found("contact"))
    }

    pub async fn delete_contact(&self, caller: &Caller, contact_id: Uuid) -> CrmResult<()> {
        AccessResolver::require_role(caller, &[Role::Owner, Role::Manager])?;
        self.access.mutable_contact(caller, contact_id).await?;
        if !self.store.delete_contact(contact_id).await? {
            return Err(CrmError::not_found("contact"));
        }
        info!("Contact {} deleted by {}", contact_id, caller.id);
        Ok(())
    }

    /// Contacts placed in a visible origin, narrowed to the caller's scope and
    /// labelled with owner emails from one batched lookup.
    pub async fn contacts_in_origin(
        &self,
        caller: &Caller,
        origin_id: Uuid,
    ) -> CrmResult<Vec<OriginContact>> {
        if self.store.get_origin(origin_id).await?.is_none()
            || !self.access.origin_access(caller, origin_id).await?.visible
        {
            return Err(CrmError::not_found("origin"));
        }

        let scope = self.access.contact_scope(caller).await?;
        let contacts: Vec<Contact> = self
            .store
            .contacts_in_origin(origin_id)
            .await?
            .into_iter()
            .filter(|c| scope.includes(c.owning_user_id))
            .collect();

        let owners: Vec<Uuid> = contacts
            .iter()
            .map(|c| c.owning_user_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let emails = self.store.account_emails(&owners).await?;

        Ok(contacts
            .into_iter()
            .map(|c| OriginContact {
                user_email: emails
                    .get(&c.owning_user_id)
                    .cloned()
                    .unwrap_or_else(|| UNKNOWN_EMAIL.to_string()),
                id: c.id,
                name: c.name,
                email: c.email,
                phone: c.phone,
                owning_user_id: c.owning_user_id,
                stage_id: c.stage_id,
            })
            .collect())
    }

    pub async fn add_to_origin(&self, caller: &Caller, request: PlacementRequest) -> CrmResult<()> {
        AccessResolver::require_role(caller, &[Role::Owner, Role::Manager])?;
        self.access
            .require_origin_admin(caller, request.origin_id)
            .await?;
        self.access
            .visible_contact(caller, request.contact_id)
            .await?;
        if self.store.get_origin(request.origin_id).await?.is_none() {
            return Err(CrmError::not_found("origin"));
        }
        if self
            .store
            .placement_exists(request.contact_id, request.origin_id)
            .await?
        {
            return Err(CrmError::conflict("contact is already in this origin"));
        }

        self.store
            .insert_placement(ContactOrigin {
                contact_id: request.contact_id,
                origin_id: request.origin_id,
            })
            .await?;
        info!(
            "Contact {} added to origin {} by {}",
            request.contact_id, request.origin_id, caller.id
        );
        Ok(())
    }

    pub async fn remove_from_origin(
        &self,
        caller: &Caller,
        request: PlacementRequest,
    ) -> CrmResult<()> {
        AccessResolver::require_role(caller, &[Role::Owner, Role::Manager])?;
        self.access
            .require_origin_admin(caller, request.origin_id)
            .await?;
        self.access
            .visible_contact(caller, request.contact_id)
            .await?;
        self.store
            .remove_placement(request.contact_id, request.origin_id)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::shared::models::MembershipRole;
    use crate::core::shared::test_utils::{
        seed_account, seed_contact, seed_membership, seed_origin, seed_stage, test_state,
    };

    fn create(name: &str, owner: Option<Uuid>) -> CreateContactRequest {
        CreateContactRequest {
            name: name.to_string(),
            email: Some(" ana@example.com ".to_string()),
            phone: Some(String::new()),
            owning_user_id: owner,
            manager_id: None,
        }
    }

    #[tokio::test]
    async fn test_seller_cannot_create() {
        let state = test_state();
        let seller = seed_account(&state, "s@example.com", Role::Seller, None).await;
        let service = ContactsService::new(&state);

        let err = service
            .create_contact(&seller, create("Ana", None))
            .await
            .unwrap_err();
        assert!(matches!(err, CrmError::AccessDenied(_)));
    }

    #[tokio::test]
    async fn test_manager_creates_for_subordinate_with_default_manager() {
        let state = test_state();
        let manager = seed_account(&state, "m@example.com", Role::Manager, None).await;
        let seller = seed_account(&state, "s@example.com", Role::Seller, Some(manager.id)).await;
        let service = ContactsService::new(&state);

        let contact = service
            .create_contact(&manager, create("Ana", Some(seller.id)))
            .await
            .unwrap();
        assert_eq!(contact.owning_user_id, seller.id);
        assert_eq!(contact.manager_id, Some(manager.id));
        assert_eq!(contact.email.as_deref(), Some("ana@example.com"));
        assert_eq!(contact.phone, None);
    }

    #[tokio::test]
    async fn test_blank_name_rejected() {
        let state = test_state();
        let owner = seed_account(&state, "o@example.com", Role::Owner, None).await;
        let service = ContactsService::new(&state);

        let err = service
            .create_contact(&owner, create("   ", None))
            .await
            .unwrap_err();
        assert!(matches!(err, CrmError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_manager_update_out_of_scope_is_not_found() {
        let state = test_state();
        let manager = seed_account(&state, "m@example.com", Role::Manager, None).await;
        let stranger = seed_account(&state, "x@example.com", Role::Seller, None).await;
        let contact = seed_contact(&state, &stranger, "Hidden").await;
        let service = ContactsService::new(&state);

        let err = service
            .update_contact(
                &manager,
                UpdateContactRequest {
                    id: contact.id,
                    name: "Renamed".into(),
                    email: None,
                    phone: None,
                    owning_user_id: None,
                    manager_id: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CrmError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_origin_contacts_filtered_and_labelled() {
        let state = test_state();
        let owner = seed_account(&state, "o@example.com", Role::Owner, None).await;
        let manager = seed_account(&state, "m@example.com", Role::Manager, None).await;
        let mine = seed_account(&state, "mine@example.com", Role::Seller, Some(manager.id)).await;
        let other = seed_account(&state, "other@example.com", Role::Seller, None).await;
        let origin = seed_origin(&state, "Web Leads").await;
        seed_membership(&state, origin.id, &manager, MembershipRole::Manager).await;
        let visible = seed_contact(&state, &mine, "Visible").await;
        let hidden = seed_contact(&state, &other, "Hidden").await;
        let service = ContactsService::new(&state);

        for contact in [&visible, &hidden] {
            service
                .add_to_origin(
                    &owner,
                    PlacementRequest {
                        contact_id: contact.id,
                        origin_id: origin.id,
                    },
                )
                .await
                .unwrap();
        }

        let rows = service.contacts_in_origin(&manager, origin.id).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, visible.id);
        assert_eq!(rows[0].user_email, "mine@example.com");

        let all = service.contacts_in_origin(&owner, origin.id).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_add_to_origin_check_order() {
        let state = test_state();
        let owner = seed_account(&state, "o@example.com", Role::Owner, None).await;
        let manager = seed_account(&state, "m@example.com", Role::Manager, None).await;
        let contact = seed_contact(&state, &manager, "Ana").await;
        let origin = seed_origin(&state, "Web Leads").await;
        let service = ContactsService::new(&state);
        let request = PlacementRequest {
            contact_id: contact.id,
            origin_id: origin.id,
        };

        // Manager without membership is stopped by the origin guard.
        let err = service.add_to_origin(&manager, request).await.unwrap_err();
        assert!(matches!(err, CrmError::AccessDenied(_)));

        // Owner with an unknown contact gets NotFound.
        let err = service
            .add_to_origin(
                &owner,
                PlacementRequest {
                    contact_id: Uuid::new_v4(),
                    origin_id: origin.id,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CrmError::NotFound(_)));

        // Owner with an unknown origin gets NotFound.
        let err = service
            .add_to_origin(
                &owner,
                PlacementRequest {
                    contact_id: contact.id,
                    origin_id: Uuid::new_v4(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CrmError::NotFound(_)));

        service.add_to_origin(&owner, request).await.unwrap();
        let err = service.add_to_origin(&owner, request).await.unwrap_err();
        assert!(matches!(err, CrmError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_remove_from_origin_is_idempotent_and_clears_stage() {
        let state = test_state();
        let owner = seed_account(&state, "o@example.com", Role::Owner, None).await;
        let contact = seed_contact(&state, &owner, "Ana").await;
        let origin = seed_origin(&state, "Web Leads").await;
        let stage = seed_stage(&state, origin.id, "New", 0).await;
        let service = ContactsService::new(&state);
        let request = PlacementRequest {
            contact_id: contact.id,
            origin_id: origin.id,
        };

        service.add_to_origin(&owner, request).await.unwrap();
        state
            .store
            .set_contact_stage(contact.id, Some(stage.id))
            .await
            .unwrap();

        service.remove_from_origin(&owner, request).await.unwrap();
        service.remove_from_origin(&owner, request).await.unwrap();

        let contact = state.store.get_contact(contact.id).await.unwrap().unwrap();
        assert_eq!(contact.stage_id, None);
    }
}
