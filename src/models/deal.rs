use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{require, Entity, EntityId, EntityType};
use crate::error::ApiError;

label_enum! {
    /// Pipeline stage.
    DealStage {
        Qualification => "Qualification",
        Meeting => "Meeting",
        Proposal => "Proposal",
        Negotiation => "Negotiation",
        ClosedWon => "Closed Won",
        ClosedLost => "Closed Lost",
    }
}

impl Default for DealStage {
    fn default() -> Self {
        Self::Qualification
    }
}

impl DealStage {
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::ClosedWon | Self::ClosedLost)
    }
}

pub(crate) fn default_currency() -> String {
    "INR".to_string()
}

fn default_probability() -> u8 {
    20
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deal {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EntityId>,
    pub title: String,
    #[serde(default)]
    pub value: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub stage: DealStage,
    /// Win probability in whole percent, 0 to 100.
    #[serde(default = "default_probability")]
    pub probability: u8,
    pub company_id: Option<EntityId>,
    /// The contact person.
    pub contact_id: Option<EntityId>,
    pub expected_close_date: Option<String>,
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Deal {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: None,
            title: title.into(),
            value: 0.0,
            currency: default_currency(),
            stage: DealStage::default(),
            probability: default_probability(),
            company_id: None,
            contact_id: None,
            expected_close_date: None,
            description: None,
            extra: Map::new(),
        }
    }
}

impl Entity for Deal {
    const TYPE: EntityType = EntityType::Deal;

    fn id(&self) -> Option<&EntityId> {
        self.id.as_ref()
    }

    fn label(&self) -> String {
        self.title.clone()
    }

    fn validate(&self) -> Result<(), ApiError> {
        require("title", &self.title)?;
        if self.probability > 100 {
            return Err(ApiError::Validation(
                "probability: must be between 0 and 100".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_on_create() {
        let deal: Deal = serde_json::from_value(json!({"title": "Big one"})).unwrap();
        assert_eq!(deal.stage, DealStage::Qualification);
        assert_eq!(deal.currency, "INR");
        assert_eq!(deal.value, 0.0);
        assert_eq!(deal.probability, 20);
        assert!(deal.id.is_none());
    }

    #[test]
    fn test_round_trip() {
        let fetched = json!({
            "id": "d1",
            "title": "Fleet renewal",
            "value": 250000.5,
            "currency": "INR",
            "stage": "Negotiation",
            "probability": 60,
            "company_id": "c1",
            "contact_id": "p1",
            "expected_close_date": "2024-09-30T00:00:00",
            "description": null,
            "updated_at": "2024-05-01T10:00:00"
        });
        let deal: Deal = serde_json::from_value(fetched.clone()).unwrap();
        assert_eq!(serde_json::to_value(&deal).unwrap(), fetched);
    }

    #[test]
    fn test_probability_stays_integer() {
        let fetched = json!({"id": "d1", "title": "Fleet", "probability": 40});
        let deal: Deal = serde_json::from_value(fetched).unwrap();
        assert_eq!(deal.probability, 40);

        let sent = serde_json::to_value(&deal).unwrap();
        assert_eq!(sent["probability"], json!(40));
        assert!(sent["probability"].is_u64());

        let fractional = serde_json::from_value::<Deal>(json!({"title": "Fleet", "probability": 40.5}));
        assert!(fractional.is_err());
    }

    #[test]
    fn test_probability_bounds() {
        let mut deal = Deal::new("Fleet renewal");
        deal.probability = 100;
        assert!(deal.validate().is_ok());

        deal.probability = 101;
        assert!(deal.validate().is_err());
    }

    #[test]
    fn test_closed_stages() {
        assert!(DealStage::ClosedLost.is_closed());
        assert!(!DealStage::Proposal.is_closed());
    }
}
