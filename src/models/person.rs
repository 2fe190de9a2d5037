use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{require, require_email, Entity, EntityId, EntityType};
use crate::error::ApiError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EntityId>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub mobile: Option<String>,
    pub job_title: Option<String>,
    pub department: Option<String>,
    pub company_id: Option<EntityId>,
    #[serde(default)]
    pub is_primary_contact: bool,
    pub notes: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Person {
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: email.into(),
            phone: None,
            mobile: None,
            job_title: None,
            department: None,
            company_id: None,
            is_primary_contact: false,
            notes: None,
            extra: Map::new(),
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    pub fn belongs_to(&self, company: &EntityId) -> bool {
        self.company_id.as_ref() == Some(company)
    }
}

impl Entity for Person {
    const TYPE: EntityType = EntityType::Person;

    fn id(&self) -> Option<&EntityId> {
        self.id.as_ref()
    }

    fn label(&self) -> String {
        self.full_name()
    }

    fn validate(&self) -> Result<(), ApiError> {
        require("first_name", &self.first_name)?;
        require("last_name", &self.last_name)?;
        require_email("email", &self.email)
    }
}
