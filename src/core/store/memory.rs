use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{CrmStore, StoreError, StoreResult};
use crate::core::shared::models::{
    Account, Contact, ContactOrigin, ContactScope, NewAccount, Origin, OriginMembership,
    OriginScope, Role, Stage, Tag,
};

#[derive(Default)]
struct Tables {
    accounts: Vec<(Account, String)>,
    contacts: Vec<Contact>,
    origins: Vec<Origin>,
    stages: Vec<Stage>,
    memberships: Vec<OriginMembership>,
    placements: HashSet<ContactOrigin>,
    tags: Vec<Tag>,
    contact_tags: HashSet<(Uuid, Uuid)>,
}

impl Tables {
    fn clear_stage_from_contacts(&mut self, stage_ids: &HashSet<Uuid>) {
        for contact in &mut self.contacts {
            if contact.stage_id.is_some_and(|id| stage_ids.contains(&id)) {
                contact.stage_id = None;
            }
        }
    }

    fn apply_orders(&mut self, orders: &[(Uuid, i32)]) {
        for (stage_id, order_num) in orders {
            if let Some(stage) = self.stages.iter_mut().find(|s| s.id == *stage_id) {
                stage.order_num = *order_num;
            }
        }
    }

    fn orders_are_unique(&self, origin_id: Uuid) -> bool {
        let mut seen = HashSet::new();
        self.stages
            .iter()
            .filter(|s| s.origin_id == origin_id)
            .all(|s| seen.insert(s.order_num))
    }
}

/// Single-process store behind one lock. Every write happens under the
/// write guard, so each trait call is atomic.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first<T: Clone>(rows: &[T], created: impl Fn(&T) -> chrono::DateTime<chrono::Utc>) -> Vec<T> {
    let mut out: Vec<T> = rows.iter().rev().cloned().collect();
    out.sort_by(|a, b| created(b).cmp(&created(a)));
    out
}

#[async_trait]
impl CrmStore for MemoryStore {
    async fn insert_account(&self, account: NewAccount) -> StoreResult<Account> {
        let mut t = self.tables.write().await;
        if t
            .accounts
            .iter()
            .any(|(a, _)| a.email.eq_ignore_ascii_case(&account.email))
        {
            return Err(StoreError::Duplicate("account email".into()));
        }
        if let Some(manager_id) = account.manager_id {
            if !t.accounts.iter().any(|(a, _)| a.id == manager_id) {
                return Err(StoreError::MissingReference("manager account".into()));
            }
        }
        let row = Account {
            id: account.id,
            email: account.email,
            role: account.role,
            manager_id: account.manager_id,
            created_at: account.created_at,
        };
        t.accounts.push((row.clone(), account.password_hash));
        Ok(row)
    }

    async fn get_account(&self, id: Uuid) -> StoreResult<Option<Account>> {
        let t = self.tables.read().await;
        Ok(t.accounts.iter().find(|(a, _)| a.id == id).map(|(a, _)| a.clone()))
    }

    async fn find_account_by_email(&self, email: &str) -> StoreResult<Option<Account>> {
        let t = self.tables.read().await;
        Ok(t
            .accounts
            .iter()
            .find(|(a, _)| a.email.eq_ignore_ascii_case(email))
            .map(|(a, _)| a.clone()))
    }

    async fn password_hash(&self, id: Uuid) -> StoreResult<Option<String>> {
        let t = self.tables.read().await;
        Ok(t.accounts.iter().find(|(a, _)| a.id == id).map(|(_, h)| h.clone()))
    }

    async fn list_accounts(&self, role: Option<Role>) -> StoreResult<Vec<Account>> {
        let t = self.tables.read().await;
        let mut rows: Vec<Account> = t
            .accounts
            .iter()
            .map(|(a, _)| a)
            .filter(|a| role.map_or(true, |r| a.role == r))
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(rows)
    }

    async fn list_subordinates(&self, manager_id: Uuid) -> StoreResult<Vec<Account>> {
        let t = self.tables.read().await;
        let mut rows: Vec<Account> = t
            .accounts
            .iter()
            .map(|(a, _)| a)
            .filter(|a| a.role == Role::Seller && a.manager_id == Some(manager_id))
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(rows)
    }

    async fn account_emails(&self, ids: &[Uuid]) -> StoreResult<HashMap<Uuid, String>> {
        let t = self.tables.read().await;
        Ok(t
            .accounts
            .iter()
            .filter(|(a, _)| ids.contains(&a.id))
            .map(|(a, _)| (a.id, a.email.clone()))
            .collect())
    }

    async fn list_contacts(&self, scope: &ContactScope) -> StoreResult<Vec<Contact>> {
        let t = self.tables.read().await;
        let visible: Vec<Contact> = t
            .contacts
            .iter()
            .filter(|c| scope.includes(c.owning_user_id))
            .cloned()
            .collect();
        Ok(newest_first(&visible, |c| c.created_at))
    }

    async fn get_contact(&self, id: Uuid) -> StoreResult<Option<Contact>> {
        let t = self.tables.read().await;
        Ok(t.contacts.iter().find(|c| c.id == id).cloned())
    }

    async fn insert_contact(&self, contact: Contact) -> StoreResult<Contact> {
        let mut t = self.tables.write().await;
        if !t.accounts.iter().any(|(a, _)| a.id == contact.owning_user_id) {
            return Err(StoreError::MissingReference("owning account".into()));
        }
        t.contacts.push(contact.clone());
        Ok(contact)
    }

    async fn update_contact(&self, contact: Contact) -> StoreResult<Option<Contact>> {
        let mut t = self.tables.write().await;
        if !t.accounts.iter().any(|(a, _)| a.id == contact.owning_user_id) {
            return Err(StoreError::MissingReference("owning account".into()));
        }
        match t.contacts.iter_mut().find(|c| c.id == contact.id) {
            Some(row) => {
                row.name = contact.name;
                row.email = contact.email;
                row.phone = contact.phone;
                row.owning_user_id = contact.owning_user_id;
                row.manager_id = contact.manager_id;
                Ok(Some(row.clone()))
            }
            None => Ok(None),
        }
    }

    async fn delete_contact(&self, id: Uuid) -> StoreResult<bool> {
        let mut t = self.tables.write().await;
        let before = t.contacts.len();
        t.contacts.retain(|c| c.id != id);
        if t.contacts.len() == before {
            return Ok(false);
        }
        t.placements.retain(|p| p.contact_id != id);
        t.contact_tags.retain(|(contact_id, _)| *contact_id != id);
        Ok(true)
    }

    async fn set_contact_stage(
        &self,
        contact_id: Uuid,
        stage_id: Option<Uuid>,
    ) -> StoreResult<bool> {
        let mut t = self.tables.write().await;
        if let Some(stage_id) = stage_id {
            if !t.stages.iter().any(|s| s.id == stage_id) {
                return Err(StoreError::MissingReference("stage".into()));
            }
        }
        match t.contacts.iter_mut().find(|c| c.id == contact_id) {
            Some(contact) => {
                contact.stage_id = stage_id;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_origins(&self, scope: &OriginScope) -> StoreResult<Vec<Origin>> {
        let t = self.tables.read().await;
        let visible: Vec<Origin> = t
            .origins
            .iter()
            .filter(|o| scope.includes(o.id))
            .cloned()
            .collect();
        Ok(newest_first(&visible, |o| o.created_at))
    }

    async fn get_origin(&self, id: Uuid) -> StoreResult<Option<Origin>> {
        let t = self.tables.read().await;
        Ok(t.origins.iter().find(|o| o.id == id).cloned())
    }

    async fn insert_origin(&self, origin: Origin) -> StoreResult<Origin> {
        let mut t = self.tables.write().await;
        t.origins.push(origin.clone());
        Ok(origin)
    }

    async fn delete_origin(&self, id: Uuid) -> StoreResult<bool> {
        let mut t = self.tables.write().await;
        let before = t.origins.len();
        t.origins.retain(|o| o.id != id);
        if t.origins.len() == before {
            return Ok(false);
        }
        let stage_ids: HashSet<Uuid> = t
            .stages
            .iter()
            .filter(|s| s.origin_id == id)
            .map(|s| s.id)
            .collect();
        t.clear_stage_from_contacts(&stage_ids);
        t.stages.retain(|s| s.origin_id != id);
        t.memberships.retain(|m| m.origin_id != id);
        t.placements.retain(|p| p.origin_id != id);
        Ok(true)
    }

    async fn list_stages(&self, scope: &OriginScope) -> StoreResult<Vec<Stage>> {
        let t = self.tables.read().await;
        let mut rows: Vec<Stage> = t
            .stages
            .iter()
            .filter(|s| scope.includes(s.origin_id))
            .cloned()
            .collect();
        rows.sort_by_key(|s| s.order_num);
        Ok(rows)
    }

    async fn stages_for_origin(&self, origin_id: Uuid) -> StoreResult<Vec<Stage>> {
        self.list_stages(&OriginScope::Only(vec![origin_id])).await
    }

    async fn get_stage(&self, id: Uuid) -> StoreResult<Option<Stage>> {
        let t = self.tables.read().await;
        Ok(t.stages.iter().find(|s| s.id == id).cloned())
    }

    async fn insert_stage(&self, stage: Stage) -> StoreResult<Stage> {
        let mut t = self.tables.write().await;
        if !t.origins.iter().any(|o| o.id == stage.origin_id) {
            return Err(StoreError::MissingReference("origin".into()));
        }
        if t
            .stages
            .iter()
            .any(|s| s.origin_id == stage.origin_id && s.order_num == stage.order_num)
        {
            return Err(StoreError::Duplicate("stage position".into()));
        }
        t.stages.push(stage.clone());
        Ok(stage)
    }

    async fn delete_stage(&self, id: Uuid, renumbered: &[(Uuid, i32)]) -> StoreResult<bool> {
        let mut t = self.tables.write().await;
        let Some(origin_id) = t.stages.iter().find(|s| s.id == id).map(|s| s.origin_id) else {
            return Ok(false);
        };
        let snapshot = t.stages.clone();
        t.stages.retain(|s| s.id != id);
        t.apply_orders(renumbered);
        if !t.orders_are_unique(origin_id) {
            t.stages = snapshot;
            return Err(StoreError::Duplicate("stage position".into()));
        }
        t.clear_stage_from_contacts(&HashSet::from([id]));
        Ok(true)
    }

    async fn set_stage_orders(&self, origin_id: Uuid, orders: &[(Uuid, i32)]) -> StoreResult<()> {
        let mut t = self.tables.write().await;
        let snapshot = t.stages.clone();
        for (stage_id, _) in orders {
            if !t
                .stages
                .iter()
                .any(|s| s.id == *stage_id && s.origin_id == origin_id)
            {
                return Err(StoreError::MissingReference("stage".into()));
            }
        }
        t.apply_orders(orders);
        if !t.orders_are_unique(origin_id) {
            t.stages = snapshot;
            return Err(StoreError::Duplicate("stage position".into()));
        }
        Ok(())
    }

    async fn get_membership(
        &self,
        origin_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Option<OriginMembership>> {
        let t = self.tables.read().await;
        Ok(t
            .memberships
            .iter()
            .find(|m| m.origin_id == origin_id && m.user_id == user_id)
            .cloned())
    }

    async fn memberships_for_user(&self, user_id: Uuid) -> StoreResult<Vec<OriginMembership>> {
        let t = self.tables.read().await;
        Ok(t
            .memberships
            .iter()
            .filter(|m| m.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn list_members(&self, origin_id: Uuid) -> StoreResult<Vec<OriginMembership>> {
        let t = self.tables.read().await;
        Ok(t
            .memberships
            .iter()
            .filter(|m| m.origin_id == origin_id)
            .cloned()
            .collect())
    }

    async fn upsert_membership(
        &self,
        membership: OriginMembership,
    ) -> StoreResult<OriginMembership> {
        let mut t = self.tables.write().await;
        if !t.origins.iter().any(|o| o.id == membership.origin_id) {
            return Err(StoreError::MissingReference("origin".into()));
        }
        if !t.accounts.iter().any(|(a, _)| a.id == membership.user_id) {
            return Err(StoreError::MissingReference("account".into()));
        }
        match t
            .memberships
            .iter_mut()
            .find(|m| m.origin_id == membership.origin_id && m.user_id == membership.user_id)
        {
            Some(existing) => existing.role = membership.role,
            None => t.memberships.push(membership.clone()),
        }
        Ok(membership)
    }

    async fn delete_membership(&self, origin_id: Uuid, user_id: Uuid) -> StoreResult<bool> {
        let mut t = self.tables.write().await;
        let before = t.memberships.len();
        t.memberships
            .retain(|m| !(m.origin_id == origin_id && m.user_id == user_id));
        Ok(t.memberships.len() != before)
    }

    async fn placement_exists(&self, contact_id: Uuid, origin_id: Uuid) -> StoreResult<bool> {
        let t = self.tables.read().await;
        Ok(t.placements.contains(&ContactOrigin {
            contact_id,
            origin_id,
        }))
    }

    async fn insert_placement(&self, placement: ContactOrigin) -> StoreResult<()> {
        let mut t = self.tables.write().await;
        if !t.contacts.iter().any(|c| c.id == placement.contact_id) {
            return Err(StoreError::MissingReference("contact".into()));
        }
        if !t.origins.iter().any(|o| o.id == placement.origin_id) {
            return Err(StoreError::MissingReference("origin".into()));
        }
        if !t.placements.insert(placement) {
            return Err(StoreError::Duplicate("contact placement".into()));
        }
        Ok(())
    }

    async fn remove_placement(&self, contact_id: Uuid, origin_id: Uuid) -> StoreResult<bool> {
        let mut t = self.tables.write().await;
        let removed = t.placements.remove(&ContactOrigin {
            contact_id,
            origin_id,
        });
        let origin_stages: HashSet<Uuid> = t
            .stages
            .iter()
            .filter(|s| s.origin_id == origin_id)
            .map(|s| s.id)
            .collect();
        if let Some(contact) = t.contacts.iter_mut().find(|c| c.id == contact_id) {
            if contact.stage_id.is_some_and(|id| origin_stages.contains(&id)) {
                contact.stage_id = None;
            }
        }
        Ok(removed)
    }

    async fn contacts_in_origin(&self, origin_id: Uuid) -> StoreResult<Vec<Contact>> {
        let t = self.tables.read().await;
        let placed: Vec<Contact> = t
            .contacts
            .iter()
            .filter(|c| {
                t.placements.contains(&ContactOrigin {
                    contact_id: c.id,
                    origin_id,
                })
            })
            .cloned()
            .collect();
        Ok(newest_first(&placed, |c| c.created_at))
    }

    async fn list_tags(&self) -> StoreResult<Vec<Tag>> {
        let t = self.tables.read().await;
        let mut rows = t.tags.clone();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }

    async fn get_tag(&self, id: Uuid) -> StoreResult<Option<Tag>> {
        let t = self.tables.read().await;
        Ok(t.tags.iter().find(|tag| tag.id == id).cloned())
    }

    async fn insert_tag(&self, tag: Tag) -> StoreResult<Tag> {
        let mut t = self.tables.write().await;
        if t.tags.iter().any(|existing| existing.name == tag.name) {
            return Err(StoreError::Duplicate("tag".into()));
        }
        t.tags.push(tag.clone());
        Ok(tag)
    }

    async fn delete_tag(&self, id: Uuid) -> StoreResult<bool> {
        let mut t = self.tables.write().await;
        let before = t.tags.len();
        t.tags.retain(|tag| tag.id != id);
        t.contact_tags.retain(|(_, tag_id)| *tag_id != id);
        Ok(t.tags.len() != before)
    }

    async fn tag_contact(&self, contact_id: Uuid, tag_id: Uuid) -> StoreResult<()> {
        let mut t = self.tables.write().await;
        if !t.contacts.iter().any(|c| c.id == contact_id) {
            return Err(StoreError::MissingReference("contact".into()));
        }
        if !t.tags.iter().any(|tag| tag.id == tag_id) {
            return Err(StoreError::MissingReference("tag".into()));
        }
        if !t.contact_tags.insert((contact_id, tag_id)) {
            return Err(StoreError::Duplicate("contact tag".into()));
        }
        Ok(())
    }

    async fn contact_tags(&self, contact_id: Uuid) -> StoreResult<Vec<Tag>> {
        let t = self.tables.read().await;
        let mut rows: Vec<Tag> = t
            .tags
            .iter()
            .filter(|tag| t.contact_tags.contains(&(contact_id, tag.id)))
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::shared::models::MembershipRole;
    use chrono::Utc;

    async fn seed_account(store: &MemoryStore, email: &str, role: Role) -> Account {
        store
            .insert_account(NewAccount {
                id: Uuid::new_v4(),
                email: email.to_string(),
                password_hash: "hash".to_string(),
                role,
                manager_id: None,
                created_at: Utc::now(),
            })
            .await
            .unwrap()
    }

    fn contact_for(owner: Uuid, name: &str) -> Contact {
        Contact {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: None,
            phone: None,
            owning_user_id: owner,
            manager_id: None,
            stage_id: None,
            created_at: Utc::now(),
        }
    }

    fn origin(name: &str) -> Origin {
        Origin {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: None,
            created_at: Utc::now(),
        }
    }

    fn stage(origin_id: Uuid, name: &str, order_num: i32) -> Stage {
        Stage {
            id: Uuid::new_v4(),
            origin_id,
            name: name.to_string(),
            color: "#3B82F6".to_string(),
            order_num,
        }
    }

    #[tokio::test]
    async fn test_duplicate_email_is_rejected() {
        let store = MemoryStore::new();
        seed_account(&store, "a@example.com", Role::Owner).await;
        let err = store
            .insert_account(NewAccount {
                id: Uuid::new_v4(),
                email: "A@example.com".to_string(),
                password_hash: "x".to_string(),
                role: Role::Seller,
                manager_id: None,
                created_at: Utc::now(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
    }

    #[tokio::test]
    async fn test_duplicate_placement_leaves_one_row() {
        let store = MemoryStore::new();
        let owner = seed_account(&store, "o@example.com", Role::Owner).await;
        let contact = store.insert_contact(contact_for(owner.id, "Ana")).await.unwrap();
        let origin = store.insert_origin(origin("Web Leads")).await.unwrap();
        let pair = ContactOrigin {
            contact_id: contact.id,
            origin_id: origin.id,
        };

        store.insert_placement(pair).await.unwrap();
        let err = store.insert_placement(pair).await.unwrap_err();

        assert!(matches!(err, StoreError::Duplicate(_)));
        assert_eq!(store.contacts_in_origin(origin.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_origin_cascades() {
        let store = MemoryStore::new();
        let owner = seed_account(&store, "o@example.com", Role::Owner).await;
        let origin = store.insert_origin(origin("Web Leads")).await.unwrap();
        let new = store.insert_stage(stage(origin.id, "New", 0)).await.unwrap();
        let contact = store.insert_contact(contact_for(owner.id, "Ana")).await.unwrap();
        store
            .insert_placement(ContactOrigin {
                contact_id: contact.id,
                origin_id: origin.id,
            })
            .await
            .unwrap();
        store.set_contact_stage(contact.id, Some(new.id)).await.unwrap();
        store
            .upsert_membership(OriginMembership {
                origin_id: origin.id,
                user_id: owner.id,
                role: MembershipRole::Manager,
            })
            .await
            .unwrap();

        assert!(store.delete_origin(origin.id).await.unwrap());

        assert!(store.stages_for_origin(origin.id).await.unwrap().is_empty());
        assert!(store.list_members(origin.id).await.unwrap().is_empty());
        assert!(!store.placement_exists(contact.id, origin.id).await.unwrap());
        let contact = store.get_contact(contact.id).await.unwrap().unwrap();
        assert_eq!(contact.stage_id, None);
    }

    #[tokio::test]
    async fn test_set_stage_orders_rejects_colliding_positions() {
        let store = MemoryStore::new();
        let origin = store.insert_origin(origin("Pipeline")).await.unwrap();
        let a = store.insert_stage(stage(origin.id, "A", 0)).await.unwrap();
        let b = store.insert_stage(stage(origin.id, "B", 1)).await.unwrap();

        let err = store
            .set_stage_orders(origin.id, &[(a.id, 1)])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));

        store
            .set_stage_orders(origin.id, &[(a.id, 1), (b.id, 0)])
            .await
            .unwrap();
        let names: Vec<String> = store
            .stages_for_origin(origin.id)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["B", "A"]);
    }

    #[tokio::test]
    async fn test_remove_placement_clears_stage_of_that_origin_only() {
        let store = MemoryStore::new();
        let owner = seed_account(&store, "o@example.com", Role::Owner).await;
        let first = store.insert_origin(origin("First")).await.unwrap();
        let second = store.insert_origin(origin("Second")).await.unwrap();
        let s2 = store.insert_stage(stage(second.id, "New", 0)).await.unwrap();
        let contact = store.insert_contact(contact_for(owner.id, "Ana")).await.unwrap();
        for origin_id in [first.id, second.id] {
            store
                .insert_placement(ContactOrigin {
                    contact_id: contact.id,
                    origin_id,
                })
                .await
                .unwrap();
        }
        store.set_contact_stage(contact.id, Some(s2.id)).await.unwrap();

        assert!(store.remove_placement(contact.id, first.id).await.unwrap());
        let kept = store.get_contact(contact.id).await.unwrap().unwrap();
        assert_eq!(kept.stage_id, Some(s2.id));

        assert!(store.remove_placement(contact.id, second.id).await.unwrap());
        let cleared = store.get_contact(contact.id).await.unwrap().unwrap();
        assert_eq!(cleared.stage_id, None);

        assert!(!store.remove_placement(contact.id, second.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_account_emails_skips_unknown_ids() {
        let store = MemoryStore::new();
        let a = seed_account(&store, "a@example.com", Role::Seller).await;
        let emails = store
            .account_emails(&[a.id, Uuid::new_v4()])
            .await
            .unwrap();
        assert_eq!(emails.len(), 1);
        assert_eq!(emails.get(&a.id).map(String::as_str), Some("a@example.com"));
    }
}
