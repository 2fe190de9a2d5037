//! Polymorphic `related_to_type` / `related_to_id` relation.
//!
//! The two wire fields are always read and written as one pair. A record
//! with only one of them set fails to deserialize.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{EntityId, EntityType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelatedKind {
    Company,
    Person,
}

impl RelatedKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Company => "company",
            Self::Person => "person",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "company" => Some(Self::Company),
            "person" => Some(Self::Person),
            _ => None,
        }
    }

    pub fn entity_type(&self) -> EntityType {
        match self {
            Self::Company => EntityType::Company,
            Self::Person => EntityType::Person,
        }
    }
}

impl fmt::Display for RelatedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wire shape shared by [`RelatedTo`] and [`Relation`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelationFields {
    #[serde(default)]
    related_to_type: Option<String>,
    #[serde(default)]
    related_to_id: Option<String>,
}

impl RelationFields {
    fn into_pair(self) -> Result<Option<RelatedTo>, String> {
        // The web forms used "" for an unset relation.
        let kind = self.related_to_type.filter(|s| !s.is_empty());
        let id = self.related_to_id.filter(|s| !s.is_empty());

        match (kind, id) {
            (None, None) => Ok(None),
            (Some(kind), Some(id)) => {
                let kind = RelatedKind::parse(&kind)
                    .ok_or_else(|| format!("unknown related_to_type {:?}", kind))?;
                Ok(Some(RelatedTo {
                    kind,
                    id: EntityId::new(id),
                }))
            }
            _ => Err("related_to_type and related_to_id must be set together".to_string()),
        }
    }
}

/// A set relation pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RelationFields", into = "RelationFields")]
pub struct RelatedTo {
    pub kind: RelatedKind,
    pub id: EntityId,
}

impl RelatedTo {
    pub fn new(kind: RelatedKind, id: EntityId) -> Self {
        Self { kind, id }
    }

    pub fn company(id: EntityId) -> Self {
        Self::new(RelatedKind::Company, id)
    }

    pub fn person(id: EntityId) -> Self {
        Self::new(RelatedKind::Person, id)
    }
}

impl TryFrom<RelationFields> for RelatedTo {
    type Error = String;

    fn try_from(fields: RelationFields) -> Result<Self, Self::Error> {
        fields
            .into_pair()?
            .ok_or_else(|| "related_to_type and related_to_id are required".to_string())
    }
}

impl From<RelatedTo> for RelationFields {
    fn from(related: RelatedTo) -> Self {
        Self {
            related_to_type: Some(related.kind.as_str().to_string()),
            related_to_id: Some(related.id.to_string()),
        }
    }
}

/// An optional relation pair: either both fields or neither.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RelationFields", into = "RelationFields")]
pub struct Relation(Option<RelatedTo>);

impl Relation {
    pub fn none() -> Self {
        Self(None)
    }

    pub fn get(&self) -> Option<&RelatedTo> {
        self.0.as_ref()
    }

    pub fn set(&mut self, related: Option<RelatedTo>) {
        self.0 = related;
    }

    pub fn is_set(&self) -> bool {
        self.0.is_some()
    }
}

impl From<Option<RelatedTo>> for Relation {
    fn from(related: Option<RelatedTo>) -> Self {
        Self(related)
    }
}

impl TryFrom<RelationFields> for Relation {
    type Error = String;

    fn try_from(fields: RelationFields) -> Result<Self, Self::Error> {
        fields.into_pair().map(Self)
    }
}

impl From<Relation> for RelationFields {
    fn from(relation: Relation) -> Self {
        match relation.0 {
            Some(related) => related.into(),
            None => Self::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_relation_pair_round_trip() {
        let relation: Relation =
            serde_json::from_value(json!({"related_to_type": "company", "related_to_id": "c1"}))
                .unwrap();
        assert_eq!(relation.get(), Some(&RelatedTo::company(EntityId::from("c1"))));

        let value = serde_json::to_value(&relation).unwrap();
        assert_eq!(value, json!({"related_to_type": "company", "related_to_id": "c1"}));
    }

    #[test]
    fn test_empty_strings_mean_unset() {
        let relation: Relation =
            serde_json::from_value(json!({"related_to_type": "", "related_to_id": ""})).unwrap();
        assert!(!relation.is_set());

        let value = serde_json::to_value(&relation).unwrap();
        assert_eq!(value, json!({"related_to_type": null, "related_to_id": null}));
    }

    #[test]
    fn test_partial_pair_rejected() {
        let result: Result<Relation, _> =
            serde_json::from_value(json!({"related_to_type": "company"}));
        assert!(result.is_err());

        let result: Result<Relation, _> = serde_json::from_value(json!({"related_to_id": "c1"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_required_pair() {
        let result: Result<RelatedTo, _> = serde_json::from_value(json!({}));
        assert!(result.is_err());

        let related: RelatedTo =
            serde_json::from_value(json!({"related_to_type": "Person", "related_to_id": "p1"}))
                .unwrap();
        assert_eq!(related.kind, RelatedKind::Person);
    }
}
