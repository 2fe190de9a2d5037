use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{require, Entity, EntityId, EntityType, RelatedTo};
use crate::error::ApiError;

/// A note always belongs to exactly one company or person.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EntityId>,
    pub title: Option<String>,
    pub content: String,
    #[serde(default)]
    pub is_pinned: bool,
    #[serde(flatten)]
    pub related: RelatedTo,
    pub created_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Note {
    pub fn new(related: RelatedTo, content: impl Into<String>) -> Self {
        Self {
            id: None,
            title: None,
            content: content.into(),
            is_pinned: false,
            related,
            created_at: None,
            extra: Map::new(),
        }
    }
}

impl Entity for Note {
    const TYPE: EntityType = EntityType::Note;

    fn id(&self) -> Option<&EntityId> {
        self.id.as_ref()
    }

    fn label(&self) -> String {
        match &self.title {
            Some(title) if !title.is_empty() => title.clone(),
            _ => self.content.lines().next().unwrap_or_default().to_string(),
        }
    }

    fn validate(&self) -> Result<(), ApiError> {
        require("content", &self.content)
    }
}
