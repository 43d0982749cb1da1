use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::Utc;
use log::info;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::core::access::{AccessResolver, Caller};
use crate::core::shared::error::{CrmError, CrmResult};
use crate::core::shared::extract::{CrmJson, CrmPath};
use crate::core::shared::models::{Role, SuccessResponse, Tag};
use crate::core::shared::state::AppState;
use crate::core::store::CrmStore;

#[derive(Debug, Deserialize)]
pub struct CreateTagRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct TagIdRequest {
    pub id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct TagContactRequest {
    pub contact_id: Uuid,
    pub tag_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct TagResponse {
    pub tag: Tag,
}

#[derive(Debug, Serialize)]
pub struct TagListResponse {
    pub tags: Vec<Tag>,
}

pub struct TagsService {
    store: Arc<dyn CrmStore>,
    access: AccessResolver,
}

impl TagsService {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: state.store.clone(),
            access: state.access.clone(),
        }
    }

    pub async fn list_tags(&self) -> CrmResult<Vec<Tag>> {
        Ok(self.store.list_tags().await?)
    }

    pub async fn create_tag(&self, caller: &Caller, name: &str) -> CrmResult<Tag> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CrmError::invalid("name is required"));
        }
        let tag = self
            .store
            .insert_tag(Tag {
                id: Uuid::new_v4(),
                name: name.to_string(),
                created_by: caller.id,
                created_at: Utc::now(),
            })
            .await?;
        info!("Tag '{}' created by {}", tag.name, caller.id);
        Ok(tag)
    }

    pub async fn delete_tag(&self, caller: &Caller, tag_id: Uuid) -> CrmResult<()> {
        let tag = self
            .store
            .get_tag(tag_id)
            .await?
            .ok_or_else(|| CrmError::not_found("tag"))?;
        if tag.created_by != caller.id {
            AccessResolver::require_role(caller, &[Role::Owner])?;
        }
        self.store.delete_tag(tag_id).await?;
        info!("Tag {} deleted by {}", tag_id, caller.id);
        Ok(())
    }

    pub async fn tag_contact(&self, caller: &Caller, request: &TagContactRequest) -> CrmResult<()> {
        self.access
            .mutable_contact(caller, request.contact_id)
            .await?;
        if self.store.get_tag(request.tag_id).await?.is_none() {
            return Err(CrmError::not_found("tag"));
        }
        self.store
            .tag_contact(request.contact_id, request.tag_id)
            .await?;
        Ok(())
    }

    pub async fn contact_tags(&self, caller: &Caller, contact_id: Uuid) -> CrmResult<Vec<Tag>> {
        self.access.visible_contact(caller, contact_id).await?;
        Ok(self.store.contact_tags(contact_id).await?)
    }
}

pub async fn list_tags_handler(
    State(state): State<Arc<AppState>>,
) -> CrmResult<Json<TagListResponse>> {
    let tags = TagsService::new(&state).list_tags().await?;
    Ok(Json(TagListResponse { tags }))
}

pub async fn create_tag_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    CrmJson(request): CrmJson<CreateTagRequest>,
) -> CrmResult<(StatusCode, Json<TagResponse>)> {
    let tag = TagsService::new(&state)
        .create_tag(&caller, &request.name)
        .await?;
    Ok((StatusCode::CREATED, Json(TagResponse { tag })))
}

pub async fn delete_tag_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    CrmJson(request): CrmJson<TagIdRequest>,
) -> CrmResult<Json<SuccessResponse>> {
    TagsService::new(&state)
        .delete_tag(&caller, request.id)
        .await?;
    Ok(Json(SuccessResponse::OK))
}

pub async fn add_tag_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    CrmJson(request): CrmJson<TagContactRequest>,
) -> CrmResult<Json<SuccessResponse>> {
    TagsService::new(&state)
        .tag_contact(&caller, &request)
        .await?;
    Ok(Json(SuccessResponse::OK))
}

pub async fn contact_tags_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    CrmPath(contact_id): CrmPath<Uuid>,
) -> CrmResult<Json<TagListResponse>> {
    let tags = TagsService::new(&state)
        .contact_tags(&caller, contact_id)
        .await?;
    Ok(Json(TagListResponse { tags }))
}

pub fn configure() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/tags", get(list_tags_handler))
        .route("/api/tags/create", post(create_tag_handler))
        .route("/api/tags/delete", post(delete_tag_handler))
        .route("/api/contacts/add-tag", post(add_tag_handler))
        .route("/api/contacts/tags/:contact_id", get(contact_tags_handler))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::shared::test_utils::{seed_account, seed_contact, test_state};

    #[tokio::test]
    async fn test_duplicate_tag_name_conflicts() {
        let state = test_state();
        let seller = seed_account(&state, "s@example.com", Role::Seller, None).await;
        let service = TagsService::new(&state);

        service.create_tag(&seller, "hot").await.unwrap();
        let err = service.create_tag(&seller, " hot ").await.unwrap_err();
        assert!(matches!(err, CrmError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_only_creator_or_owner_deletes() {
        let state = test_state();
        let owner = seed_account(&state, "o@example.com", Role::Owner, None).await;
        let creator = seed_account(&state, "a@example.com", Role::Seller, None).await;
        let other = seed_account(&state, "b@example.com", Role::Manager, None).await;
        let service = TagsService::new(&state);

        let first = service.create_tag(&creator, "hot").await.unwrap();
        let second = service.create_tag(&creator, "cold").await.unwrap();

        let err = service.delete_tag(&other, first.id).await.unwrap_err();
        assert!(matches!(err, CrmError::AccessDenied(_)));

        service.delete_tag(&creator, first.id).await.unwrap();
        service.delete_tag(&owner, second.id).await.unwrap();
        assert!(service.list_tags().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_tagging_requires_contact_access() {
        let state = test_state();
        let seller = seed_account(&state, "s@example.com", Role::Seller, None).await;
        let other = seed_account(&state, "x@example.com", Role::Seller, None).await;
        let mine = seed_contact(&state, &seller, "Mine").await;
        let theirs = seed_contact(&state, &other, "Theirs").await;
        let service = TagsService::new(&state);
        let tag = service.create_tag(&seller, "hot").await.unwrap();

        let request = TagContactRequest {
            contact_id: mine.id,
            tag_id: tag.id,
        };
        service.tag_contact(&seller, &request).await.unwrap();
        let err = service.tag_contact(&seller, &request).await.unwrap_err();
        assert!(matches!(err, CrmError::Conflict(_)));

        let err = service
            .tag_contact(
                &seller,
                &TagContactRequest {
                    contact_id: theirs.id,
                    tag_id: tag.id,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CrmError::NotFound(_)));

        let tags = service.contact_tags(&seller, mine.id).await.unwrap();
        assert_eq!(tags.len(), 1);
        assert!(service.contact_tags(&seller, theirs.id).await.is_err());
    }
}
