use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{require, Entity, EntityId, EntityType, RelatedTo, Relation};
use crate::error::ApiError;

label_enum! {
    TaskPriority {
        Low => "Low",
        Medium => "Medium",
        High => "High",
        Urgent => "Urgent",
    }
}

impl Default for TaskPriority {
    fn default() -> Self {
        Self::Medium
    }
}

label_enum! {
    TaskStatus {
        Todo => "Todo",
        InProgress => "In Progress",
        Done => "Done",
    }
}

impl Default for TaskStatus {
    fn default() -> Self {
        Self::Todo
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EntityId>,
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<String>,
    #[serde(default)]
    pub priority: TaskPriority,
    #[serde(default)]
    pub status: TaskStatus,
    /// Optional link to a company or person.
    #[serde(flatten)]
    pub related: Relation,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Task {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: None,
            title: title.into(),
            description: None,
            due_date: None,
            priority: TaskPriority::default(),
            status: TaskStatus::default(),
            related: Relation::none(),
            extra: Map::new(),
        }
    }

    pub fn related_to(&self) -> Option<&RelatedTo> {
        self.related.get()
    }

    pub fn is_done(&self) -> bool {
        self.status == TaskStatus::Done
    }
}

impl Entity for Task {
    const TYPE: EntityType = EntityType::Task;

    fn id(&self) -> Option<&EntityId> {
        self.id.as_ref()
    }

    fn label(&self) -> String {
        self.title.clone()
    }

    fn validate(&self) -> Result<(), ApiError> {
        require("title", &self.title)
    }
}
