use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::shared::models::{MembershipRole, Origin, Stage};

#[derive(Debug, Clone, Deserialize)]
pub struct CreateOriginRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OriginIdRequest {
    #[serde(alias = "origin_id")]
    pub id: Uuid,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddMemberRequest {
    pub origin_id: Uuid,
    pub email: String,
    pub role: MembershipRole,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoveMemberRequest {
    pub origin_id: Uuid,
    pub user_id: Uuid,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListMembersRequest {
    pub origin_id: Uuid,
}

#[derive(Debug, Clone, Serialize)]
pub struct OriginResponse {
    pub origin: Origin,
}

/// Origins together with the stages of exactly those origins.
#[derive(Debug, Clone, Default, Serialize)]
pub struct OriginBoard {
    pub origins: Vec<Origin>,
    pub stages: Vec<Stage>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MemberEntry {
    pub user_id: Uuid,
    pub email: String,
    pub role: MembershipRole,
}

#[derive(Debug, Clone, Serialize)]
pub struct MemberResponse {
    pub member: MemberEntry,
}

#[derive(Debug, Clone, Serialize)]
pub struct MemberListResponse {
    pub members: Vec<MemberEntry>,
}
