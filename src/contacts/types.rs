use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::shared::models::Contact;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateContactRequest {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default, alias = "user_id")]
    pub owning_user_id: Option<Uuid>,
    #[serde(default)]
    pub manager_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateContactRequest {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default, alias = "user_id")]
    pub owning_user_id: Option<Uuid>,
    #[serde(default)]
    pub manager_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContactIdRequest {
    pub id: Uuid,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PlacementRequest {
    pub contact_id: Uuid,
    pub origin_id: Uuid,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContactResponse {
    pub contact: Contact,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContactListResponse {
    pub contacts: Vec<Contact>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContactSummary {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl From<Contact> for ContactSummary {
    fn from(contact: Contact) -> Self {
        Self {
            id: contact.id,
            name: contact.name,
            email: contact.email,
            phone: contact.phone,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ContactSummaryListResponse {
    pub contacts: Vec<ContactSummary>,
}

/// A contact row on an origin's board, labelled with its owner's email.
#[derive(Debug, Clone, Serialize)]
pub struct OriginContact {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub owning_user_id: Uuid,
    pub user_email: String,
    pub stage_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OriginContactListResponse {
    pub contacts: Vec<OriginContact>,
}
