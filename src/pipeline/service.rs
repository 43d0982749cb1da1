use log::info;
use std::sync::Arc;
use uuid::Uuid;

use super::ordering::{assign_order, compact, move_to_index, next_order, ordered_ids};
use super::types::*;
use crate::core::access::{AccessResolver, Caller};
use crate::core::shared::error::{CrmError, CrmResult};
use crate::core::shared::models::Stage;
use crate::core::shared::state::AppState;
use crate::core::store::CrmStore;

pub const DEFAULT_STAGE_COLOR: &str = "#3B82F6";

/// `#rgb` or `#rrggbb`. Also keeps the value inside the `pipeline_stages.color` column.
fn is_hex_color(color: &str) -> bool {
    color.strip_prefix('#').is_some_and(|digits| {
        matches!(digits.len(), 3 | 6) && digits.chars().all(|c| c.is_ascii_hexdigit())
    })
}

pub struct PipelineService {
    store: Arc<dyn CrmStore>,
    access: AccessResolver,
}

impl PipelineService {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: state.store.clone(),
            access: state.access.clone(),
        }
    }

    async fn existing_stage(&self, stage_id: Uuid) -> CrmResult<Stage> {
        self.store
            .get_stage(stage_id)
            .await?
            .ok_or_else(|| CrmError::not_found("stage"))
    }

    async fn admin_origin_stages(&self, caller: &Caller, origin_id: Uuid) -> CrmResult<Vec<Stage>> {
        self.access.require_origin_admin(caller, origin_id).await?;
        if self.store.get_origin(origin_id).await?.is_none() {
            return Err(CrmError::not_found("origin"));
        }
        Ok(self.store.stages_for_origin(origin_id).await?)
    }

    pub async fn create_stage(
        &self,
        caller: &Caller,
        request: CreateStageRequest,
    ) -> CrmResult<Stage> {
        let name = request.name.trim().to_string();
        if name.is_empty() {
            return Err(CrmError::invalid("name is required"));
        }
        let current = self.admin_origin_stages(caller, request.origin_id).await?;

        let color = request
            .color
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| DEFAULT_STAGE_COLOR.to_string());
        if !is_hex_color(&color) {
            return Err(CrmError::invalid("color must be '#' followed by 3 or 6 hex digits"));
        }

        let stage = self
            .store
            .insert_stage(Stage {
                id: Uuid::new_v4(),
                origin_id: request.origin_id,
                name,
                color,
                order_num: next_order(&current),
            })
            .await?;
        info!(
            "Stage '{}' added to origin {} at {} by {}",
            stage.name, stage.origin_id, stage.order_num, caller.id
        );
        Ok(stage)
    }

    pub async fn delete_stage(&self, caller: &Caller, stage_id: Uuid) -> CrmResult<()> {
        let stage = self.existing_stage(stage_id).await?;
        let remaining: Vec<Stage> = self
            .admin_origin_stages(caller, stage.origin_id)
            .await?
            .into_iter()
            .filter(|s| s.id != stage_id)
            .collect();

        if !self
            .store
            .delete_stage(stage_id, &compact(&remaining))
            .await?
        {
            return Err(CrmError::not_found("stage"));
        }
        info!("Stage {} deleted by {}", stage_id, caller.id);
        Ok(())
    }

    /// Rewrites the orders of every stage in the origin. The ids must be
    /// exactly the origin's current stages; anything else changes nothing.
    pub async fn reorder(
        &self,
        caller: &Caller,
        origin_id: Uuid,
        stage_ids: &[Uuid],
    ) -> CrmResult<Vec<Stage>> {
        let current = self.admin_origin_stages(caller, origin_id).await?;
        let orders = assign_order(&current, stage_ids)?;
        self.store.set_stage_orders(origin_id, &orders).await?;
        info!("Stages of origin {} reordered by {}", origin_id, caller.id);
        Ok(self.store.stages_for_origin(origin_id).await?)
    }

    pub async fn move_stage(
        &self,
        caller: &Caller,
        stage_id: Uuid,
        to_index: usize,
    ) -> CrmResult<Vec<Stage>> {
        let stage = self.existing_stage(stage_id).await?;
        let current = self.admin_origin_stages(caller, stage.origin_id).await?;
        let moved = move_to_index(&ordered_ids(&current), stage_id, to_index)?;
        let orders = assign_order(&current, &moved)?;
        self.store.set_stage_orders(stage.origin_id, &orders).await?;
        Ok(self.store.stages_for_origin(stage.origin_id).await?)
    }

    /// Sets the contact's current stage. Only the contact's stage changes;
    /// stage orders are untouched.
    pub async fn move_contact(
        &self,
        caller: &Caller,
        contact_id: Uuid,
        stage_id: Uuid,
    ) -> CrmResult<()> {
        self.access.mutable_contact(caller, contact_id).await?;
        let stage = self.existing_stage(stage_id).await?;
        if !self
            .store
            .placement_exists(contact_id, stage.origin_id)
            .await?
        {
            return Err(CrmError::invalid(
                "contact is not placed in the origin of this stage",
            ));
        }
        if !self.store.set_contact_stage(contact_id, Some(stage_id)).await? {
            return Err(CrmError::not_found("contact"));
        }
        Ok(())
    }
}
