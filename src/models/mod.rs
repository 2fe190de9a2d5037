use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::error::ApiError;

/// Enum over the fixed labels the backend stores. Unknown labels are kept
/// verbatim in `Other` so a record round-trips unchanged.
macro_rules! label_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $label:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant,)+
            Other(String),
        }

        impl $name {
            pub const LABELS: &'static [&'static str] = &[$($label),+];

            pub fn as_str(&self) -> &str {
                match self {
                    $(Self::$variant => $label,)+
                    Self::Other(s) => s.as_str(),
                }
            }

            pub fn parse(s: &str) -> Self {
                match s {
                    $($label => Self::$variant,)+
                    other => Self::Other(other.to_string()),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = <String as serde::Deserialize>::deserialize(deserializer)?;
                Ok(Self::parse(&s))
            }
        }
    };
}

mod company;
mod deal;
mod id;
mod lead;
mod note;
mod person;
mod product;
mod relation;
mod task;

pub use company::{Company, CompanySize, Industry};
pub use deal::{Deal, DealStage};
pub use id::{normalize_collection, normalize_record, EntityId};
pub use lead::{Lead, LeadSource, LeadStatus, LeadThread, SyncMailResponse};
pub use note::Note;
pub use person::Person;
pub use product::{Product, ProductCategory, ProductStatus};
pub use relation::{RelatedKind, RelatedTo, Relation, RelationFields};
pub use task::{Task, TaskPriority, TaskStatus};

/// Display fallback for a missing company on deals and people.
pub const INDIVIDUAL: &str = "Individual";
/// Display fallback for a missing company on notes and products.
pub const UNKNOWN_COMPANY: &str = "Unknown Company";
pub const UNKNOWN_PERSON: &str = "Unknown Person";

/// The kinds of record the CRM manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityType {
    Company,
    Person,
    Deal,
    Product,
    Task,
    Note,
    Lead,
}

impl EntityType {
    pub const ALL: [EntityType; 7] = [
        Self::Company,
        Self::Person,
        Self::Deal,
        Self::Product,
        Self::Task,
        Self::Note,
        Self::Lead,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Company => "company",
            Self::Person => "person",
            Self::Deal => "deal",
            Self::Product => "product",
            Self::Task => "task",
            Self::Note => "note",
            Self::Lead => "lead",
        }
    }

    /// REST base path, without trailing slash.
    pub fn base_path(&self) -> &'static str {
        match self {
            Self::Company => "/companies",
            Self::Person => "/people",
            Self::Deal => "/deals",
            Self::Product => "/products",
            Self::Task => "/tasks",
            Self::Note => "/notes",
            Self::Lead => "/leads",
        }
    }

    /// Path for listing and creating.
    pub fn collection_path(&self) -> String {
        format!("{}/", self.base_path())
    }

    /// Types whose cached views go stale when a record of this type changes.
    /// Always includes the type itself.
    pub fn dependents(&self) -> &'static [EntityType] {
        match self {
            // People, products and deals show the company name.
            Self::Company => &[Self::Company, Self::Person, Self::Product, Self::Deal],
            // Deals show the contact name.
            Self::Person => &[Self::Person, Self::Deal],
            Self::Deal => &[Self::Deal],
            Self::Product => &[Self::Product],
            Self::Task => &[Self::Task],
            Self::Note => &[Self::Note],
            Self::Lead => &[Self::Lead],
        }
    }

    /// Fields that hold numbers when given as text on the command line.
    pub fn numeric_fields(&self) -> &'static [&'static str] {
        match self {
            Self::Deal => &["value"],
            Self::Product => &["price"],
            _ => &[],
        }
    }

    /// Fields that hold whole numbers when given as text on the command line.
    pub fn integer_fields(&self) -> &'static [&'static str] {
        match self {
            Self::Deal => &["probability"],
            _ => &[],
        }
    }

    /// Fields that hold booleans when given as text on the command line.
    pub fn bool_fields(&self) -> &'static [&'static str] {
        match self {
            Self::Person => &["is_primary_contact"],
            Self::Note => &["is_pinned"],
            _ => &[],
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "company" | "companies" => Ok(Self::Company),
            "person" | "people" => Ok(Self::Person),
            "deal" | "deals" => Ok(Self::Deal),
            "product" | "products" => Ok(Self::Product),
            "task" | "tasks" => Ok(Self::Task),
            "note" | "notes" => Ok(Self::Note),
            "lead" | "leads" => Ok(Self::Lead),
            other => Err(format!("unknown entity type: {}", other)),
        }
    }
}

/// A typed CRM record.
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const TYPE: EntityType;

    /// `None` until the server has assigned one.
    fn id(&self) -> Option<&EntityId>;

    /// Human-readable name used in option lists and denormalized columns.
    fn label(&self) -> String;

    /// Client-side required-field checks, run before a payload is sent.
    fn validate(&self) -> Result<(), ApiError> {
        Ok(())
    }
}

pub(crate) fn require(field: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::Validation(format!("{}: field required", field)));
    }
    Ok(())
}

pub(crate) fn require_email(field: &str, value: &str) -> Result<(), ApiError> {
    require(field, value)?;
    if !value.contains('@') {
        return Err(ApiError::Validation(format!(
            "{}: value is not a valid email address",
            field
        )));
    }
    Ok(())
}

/// Resolves relation ids against a fetched collection.
pub struct Lookup<'a, T> {
    items: &'a [T],
}

impl<'a, T: Entity> Lookup<'a, T> {
    pub fn new(items: &'a [T]) -> Self {
        Self { items }
    }

    pub fn find(&self, id: &EntityId) -> Option<&'a T> {
        self.items.iter().find(|item| item.id() == Some(id))
    }

    /// Label of the referenced record, or `fallback` when unset or dangling.
    pub fn label_or(&self, id: Option<&EntityId>, fallback: &str) -> String {
        id.and_then(|id| self.find(id))
            .map(|item| item.label())
            .unwrap_or_else(|| fallback.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_dependents_include_self() {
        for entity_type in EntityType::ALL {
            assert!(entity_type.dependents().contains(&entity_type));
        }
    }

    #[test]
    fn test_company_dependents() {
        let deps = EntityType::Company.dependents();
        for t in [EntityType::Person, EntityType::Product, EntityType::Deal] {
            assert!(deps.contains(&t));
        }
        assert!(!deps.contains(&EntityType::Task));
        assert_eq!(EntityType::Person.dependents(), &[EntityType::Person, EntityType::Deal]);
    }

    #[test]
    fn test_paths() {
        assert_eq!(EntityType::Person.collection_path(), "/people/");
        assert_eq!(EntityType::Company.base_path(), "/companies");
    }

    #[test]
    fn test_parse_entity_type() {
        assert_eq!("People".parse::<EntityType>().unwrap(), EntityType::Person);
        assert_eq!("deal".parse::<EntityType>().unwrap(), EntityType::Deal);
        assert!("widgets".parse::<EntityType>().is_err());
    }

    #[test]
    fn test_lookup_fallbacks() {
        let companies: Vec<Company> = serde_json::from_value(json!([
            {"id": "c1", "name": "Acme Corp"}
        ]))
        .unwrap();
        let lookup = Lookup::new(&companies);

        assert_eq!(lookup.label_or(Some(&EntityId::from("c1")), INDIVIDUAL), "Acme Corp");
        assert_eq!(lookup.label_or(Some(&EntityId::from("gone")), INDIVIDUAL), "Individual");
        assert_eq!(lookup.label_or(None, UNKNOWN_COMPANY), "Unknown Company");
    }

    #[test]
    fn test_label_enum_keeps_unknown() {
        let stage: DealStage = serde_json::from_value(json!("Discovery")).unwrap();
        assert_eq!(stage, DealStage::Other("Discovery".to_string()));
        assert_eq!(serde_json::to_value(&stage).unwrap(), json!("Discovery"));

        let stage: DealStage = serde_json::from_value(json!("Closed Won")).unwrap();
        assert_eq!(stage, DealStage::ClosedWon);
    }
}
