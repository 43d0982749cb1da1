use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::shared::models::Stage;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateStageRequest {
    pub origin_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StageIdRequest {
    pub id: Uuid,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReorderRequest {
    pub origin_id: Uuid,
    pub stage_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MoveStageRequest {
    pub stage_id: Uuid,
    pub to_index: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MoveContactRequest {
    pub contact_id: Uuid,
    pub stage_id: Uuid,
}

#[derive(Debug, Clone, Serialize)]
pub struct StageResponse {
    pub stage: Stage,
}

#[derive(Debug, Clone, Serialize)]
pub struct StageListResponse {
    pub stages: Vec<Stage>,
}
