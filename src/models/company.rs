use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{require, Entity, EntityId, EntityType};
use crate::error::ApiError;

label_enum! {
    Industry {
        Technology => "Technology",
        Software => "Software",
        Manufacturing => "Manufacturing",
        Finance => "Finance",
        Aviation => "Aviation",
        Misc => "Other",
    }
}

label_enum! {
    /// Headcount bracket.
    CompanySize {
        Micro => "1-10",
        Small => "11-50",
        Medium => "51-200",
        Large => "201-500",
        Enterprise => "500+",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EntityId>,
    pub name: String,
    pub domain: Option<String>,
    pub industry: Option<Industry>,
    pub company_size: Option<CompanySize>,
    pub website: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub description: Option<String>,
    /// Address, social links, timestamps and anything newer than this client.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Company {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            domain: None,
            industry: None,
            company_size: None,
            website: None,
            email: None,
            phone: None,
            description: None,
            extra: Map::new(),
        }
    }
}

impl Entity for Company {
    const TYPE: EntityType = EntityType::Company;

    fn id(&self) -> Option<&EntityId> {
        self.id.as_ref()
    }

    fn label(&self) -> String {
        self.name.clone()
    }

    fn validate(&self) -> Result<(), ApiError> {
        require("name", &self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_round_trip_keeps_every_field() {
        let fetched = json!({
            "id": "c1",
            "name": "Acme Corp",
            "domain": "acme.com",
            "industry": "Aviation",
            "company_size": "51-200",
            "website": "www.acme.com",
            "email": null,
            "phone": "+1 555 0100",
            "description": "Rockets",
            "address_city": "Springfield",
            "linkedin": "acme",
            "created_at": "2024-05-01T10:00:00"
        });

        let company: Company = serde_json::from_value(fetched.clone()).unwrap();
        assert_eq!(company.industry, Some(Industry::Aviation));
        assert_eq!(company.extra["address_city"], "Springfield");

        assert_eq!(serde_json::to_value(&company).unwrap(), fetched);
    }

    #[test]
    fn test_new_company_has_no_id() {
        let value = serde_json::to_value(Company::new("Acme Corp")).unwrap();
        assert!(value.get("id").is_none());
        assert_eq!(value["name"], "Acme Corp");
    }

    #[test]
    fn test_name_required() {
        assert!(Company::new("  ").validate().is_err());
        assert!(Company::new("Acme").validate().is_ok());
    }
}
