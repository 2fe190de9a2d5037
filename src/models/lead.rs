use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{require, require_email, Entity, EntityId, EntityType};
use crate::error::ApiError;

label_enum! {
    LeadSource {
        Website => "Website",
        Referral => "Referral",
        ColdCall => "Cold Call",
        Misc => "Other",
    }
}

label_enum! {
    LeadStatus {
        New => "New",
        Contacted => "Contacted",
        Qualified => "Qualified",
        Lost => "Lost",
    }
}

impl Default for LeadStatus {
    fn default() -> Self {
        Self::New
    }
}

/// A prospect that has not yet become a person or company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EntityId>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    /// Free-text company name, not a relation.
    pub company: Option<String>,
    pub source: Option<LeadSource>,
    #[serde(default)]
    pub status: LeadStatus,
    pub notes: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Entity for Lead {
    const TYPE: EntityType = EntityType::Lead;

    fn id(&self) -> Option<&EntityId> {
        self.id.as_ref()
    }

    fn label(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    fn validate(&self) -> Result<(), ApiError> {
        require("first_name", &self.first_name)?;
        require("last_name", &self.last_name)?;
        require_email("email", &self.email)
    }
}

/// A mail thread synced for a lead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadThread {
    pub id: EntityId,
    pub lead_id: EntityId,
    pub subject: String,
    pub last_message: String,
    #[serde(default)]
    pub status: String,
    pub last_message_at: String,
    pub snippet: Option<String>,
}

/// Result of `POST /leads/{id}/sync-mail`. `message` is shown as is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncMailResponse {
    #[serde(default)]
    pub threads_synced: u32,
    pub message: String,
}
